//! Early stopping over the running score history

/// Stagnation and decline thresholds; percentages are relative to the
/// earlier score
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EarlyStopRules {
    pub stagnation_rounds: usize,
    pub stagnation_pct: f64,
    pub decline_rounds: usize,
    pub decline_pct: f64,
}

impl Default for EarlyStopRules {
    fn default() -> Self {
        Self {
            stagnation_rounds: 4,
            stagnation_pct: 0.5,
            decline_rounds: 2,
            decline_pct: 1.0,
        }
    }
}

impl EarlyStopRules {
    /// Every score in the last `stagnation_rounds + 1` stays within
    /// `stagnation_pct` of the first one; never true for a zero base
    pub fn is_stagnant(&self, scores: &[f64]) -> bool {
        let window = self.stagnation_rounds + 1;
        if scores.len() < window {
            return false;
        }
        let tail = &scores[scores.len() - window..];
        let base = tail[0];
        base != 0.0
            && tail[1..]
                .iter()
                .all(|s| (s - base).abs() / base.abs() * 100.0 < self.stagnation_pct)
    }

    /// Each of the last `decline_rounds` steps fell by more than `decline_pct`
    pub fn is_declining(&self, scores: &[f64]) -> bool {
        let window = self.decline_rounds + 1;
        if scores.len() < window {
            return false;
        }
        scores[scores.len() - window..].windows(2).all(|pair| {
            let (prev, next) = (pair[0], pair[1]);
            prev != 0.0 && (prev - next) / prev.abs() * 100.0 > self.decline_pct
        })
    }

    /// Reason to stop now, if any; stagnation is reported first
    pub fn check(&self, scores: &[f64]) -> Option<String> {
        if self.is_stagnant(scores) {
            Some(format!(
                "stagnation (<{}% for {} rounds)",
                self.stagnation_pct, self.stagnation_rounds
            ))
        } else if self.is_declining(scores) {
            Some(format!(
                "score declined >{}% for {} consecutive rounds",
                self.decline_pct, self.decline_rounds
            ))
        } else {
            None
        }
    }
}
