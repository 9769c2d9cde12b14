//! Parameter auto-tuning
//!
//! The tuner treats the whole pipeline as a black box: each trial maps a
//! parameter vector to a configuration, cleans the file once and scores the
//! result. Sampling is seeded, so two runs over the same file without
//! advisor hints reach the same best score.

pub mod advisor;
pub mod early_stop;
pub mod registry;
pub mod sampler;
pub mod space;

pub use advisor::{Advisor, AdvisorDecision, CompletionClient, Suggestion};
pub use early_stop::EarlyStopRules;
pub use registry::{TuningRegistry, TuningState, TuningStatus};
pub use space::{SearchSpace, TrialParams};

use crate::analysis::{detect_dominant_track_type, TrackType};
use crate::config::Config;
use crate::error::Result;
use crate::midi::MidiFile;
use crate::pipeline::run_pipeline;
use crate::qa::{score_midi, QualityMetrics};
use advisor::{identify_issues, AdvisorContext, RecentTrial};
use sampler::{Observation, TpeSampler, DEFAULT_SEED};
use serde::{Deserialize, Serialize};

pub const DEFAULT_MAX_TRIALS: usize = 40;

/// Trials needed, and the score window inspected, before asking the advisor
const ADVISOR_STALL_ROUNDS: usize = 2;

/// Relative change (percent) under which the advisor is consulted
const ADVISOR_STALL_PCT: f64 = 0.5;

/// One evaluated parameter vector
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrialRecord {
    pub number: usize,
    pub score: f64,
    pub params: TrialParams,
    pub metrics: QualityMetrics,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptimizationResult {
    pub best_params: TrialParams,
    pub best_score: f64,
    pub best_config: Config,
    pub trials: Vec<TrialRecord>,
    pub stop_reason: String,
    pub track_type: TrackType,
    pub advisor_decisions: Vec<AdvisorDecision>,
}

pub struct AutoTuner<'a> {
    file: &'a MidiFile,
    max_trials: usize,
    track_type: TrackType,
    space: SearchSpace,
    sampler: TpeSampler,
    rules: EarlyStopRules,
    advisor: Option<Advisor>,
    pending_suggestion: Option<Suggestion>,
    trials: Vec<TrialRecord>,
    history: Vec<Observation>,
    metrics_before: QualityMetrics,
}

impl<'a> AutoTuner<'a> {
    pub fn new(file: &'a MidiFile, max_trials: usize) -> Self {
        let track_type = detect_dominant_track_type(file);
        Self {
            file,
            max_trials,
            track_type,
            space: SearchSpace::for_track_type(track_type),
            sampler: TpeSampler::new(DEFAULT_SEED),
            rules: EarlyStopRules::default(),
            advisor: None,
            pending_suggestion: None,
            trials: Vec::new(),
            history: Vec::new(),
            metrics_before: QualityMetrics::default(),
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.sampler = TpeSampler::new(seed);
        self
    }

    pub fn with_rules(mut self, rules: EarlyStopRules) -> Self {
        self.rules = rules;
        self
    }

    pub fn with_advisor(mut self, advisor: Advisor) -> Self {
        self.advisor = Some(advisor);
        self
    }

    pub fn track_type(&self) -> TrackType {
        self.track_type
    }

    pub fn space(&self) -> &SearchSpace {
        &self.space
    }

    /// Run trials until an early-stop rule fires or `max_trials` is reached
    ///
    /// `on_trial` sees every record as soon as it is scored. A pipeline
    /// error aborts the run.
    pub fn optimize<F>(&mut self, mut on_trial: F) -> Result<OptimizationResult>
    where
        F: FnMut(&TrialRecord),
    {
        self.metrics_before = score_midi(self.file).1;
        let mut stop_reason = None;

        tracing::info!(
            "Tuning {} trials max, dominant track type '{}'",
            self.max_trials,
            self.track_type
        );

        for number in 0..self.max_trials {
            self.maybe_ask_advisor(number);

            let params = match self.pending_suggestion.take() {
                Some(suggestion) => suggestion.to_params(),
                None => {
                    let values = self.sampler.sample(&self.space, &self.history);
                    self.space.decode(&values)
                }
            };

            let record = self.evaluate(number, params)?;
            on_trial(&record);

            self.history.push(Observation {
                values: self.space.encode(&record.params),
                score: record.score,
            });
            self.trials.push(record);

            let scores: Vec<f64> = self.trials.iter().map(|t| t.score).collect();
            if let Some(reason) = self.rules.check(&scores) {
                stop_reason = Some(reason);
                break;
            }
        }

        let stop_reason = stop_reason.unwrap_or_else(|| format!("max trials ({})", self.max_trials));
        let best = best_trial(&self.trials).ok_or_else(|| {
            crate::CleanerError::TuningFailed("no trials were run".to_string())
        })?;

        tracing::info!(
            "Tuning finished after {} trials: best score {:.4} (trial {}), {}",
            self.trials.len(),
            best.score,
            best.number,
            stop_reason
        );

        Ok(OptimizationResult {
            best_params: best.params.clone(),
            best_score: best.score,
            best_config: best.params.to_config(),
            trials: self.trials.clone(),
            stop_reason,
            track_type: self.track_type,
            advisor_decisions: self
                .advisor
                .as_ref()
                .map(|a| a.decisions().to_vec())
                .unwrap_or_default(),
        })
    }

    fn evaluate(&self, number: usize, params: TrialParams) -> Result<TrialRecord> {
        let config = params.to_config();
        let output = run_pipeline(self.file, &config)?;
        let (score, metrics) = score_midi(&output.file);

        tracing::info!(
            "Trial {:3} | score={:8.4} | pitches={} avg_dur={:.0} short={:.3} overlaps={} voices={}",
            number,
            score,
            metrics.unique_pitches,
            metrics.avg_duration,
            metrics.short_note_ratio,
            metrics.overlap_count,
            metrics.voice_count
        );

        Ok(TrialRecord {
            number,
            score,
            params,
            metrics,
        })
    }

    /// Consult the advisor when the last two scores barely moved
    fn maybe_ask_advisor(&mut self, trial_number: usize) {
        let Some(advisor) = self.advisor.as_mut() else {
            return;
        };
        if advisor.calls_remaining() == 0
            || trial_number < ADVISOR_STALL_ROUNDS
            || self.trials.len() < ADVISOR_STALL_ROUNDS
        {
            return;
        }

        let recent = &self.trials[self.trials.len() - ADVISOR_STALL_ROUNDS..];
        let base = recent[0].score;
        let stalled = base != 0.0
            && recent[1..]
                .iter()
                .all(|t| (t.score - base).abs() / base.abs() * 100.0 < ADVISOR_STALL_PCT);
        if !stalled {
            return;
        }

        let last = &recent[recent.len() - 1];
        let context = AdvisorContext {
            track_type_guess: self.track_type,
            metrics_before: self.metrics_before,
            metrics_after: last.metrics,
            last_trial_params: last.params.clone(),
            last_trial_score: last.score,
            top_issues: identify_issues(&last.metrics),
            recent_trials: self
                .trials
                .iter()
                .rev()
                .take(3)
                .rev()
                .map(|t| RecentTrial {
                    params: t.params.clone(),
                    score: t.score,
                    metrics: t.metrics,
                })
                .collect(),
        };

        if let Some(suggestion) = advisor.suggest(&context) {
            tracing::info!("Next trial uses advisor parameters {:?}", suggestion);
            self.pending_suggestion = Some(suggestion);
        }
    }
}

/// First trial reaching the highest score
pub fn best_trial(trials: &[TrialRecord]) -> Option<&TrialRecord> {
    trials.iter().fold(None, |best: Option<&TrialRecord>, t| match best {
        Some(b) if b.score >= t.score => Some(b),
        _ => Some(t),
    })
}
