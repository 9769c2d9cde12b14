//! Optional parameter hints from an external text-completion service
//!
//! The advisor never touches MIDI. It sees metrics and recent trials, and
//! may answer with a JSON object of parameter suggestions. Calls are capped
//! per run, bounded by a timeout, and any failure resolves to "no
//! suggestion".

use super::space::TrialParams;
use crate::analysis::TrackType;
use crate::qa::QualityMetrics;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a MIDI cleaning strategy advisor. \
You receive quality metrics and recent tuning trials for an AI-transcribed MIDI file. \
Respond with a single JSON object and nothing else. Allowed keys: min_duration (ticks), \
min_velocity (0-127), cluster_window (ticks), cluster_pitch (semitones), \
triplet_tolerance (0.05-0.30), quantize, remove_triplets, merge_voices (booleans).";

/// Parameter names a suggestion may carry
pub const ALLOWED_PARAMS: [&str; 8] = [
    "min_duration",
    "min_velocity",
    "cluster_window",
    "cluster_pitch",
    "triplet_tolerance",
    "quantize",
    "remove_triplets",
    "merge_voices",
];

/// Transport to a chat-completion endpoint
#[cfg_attr(test, mockall::automock)]
pub trait CompletionClient: Send + Sync {
    fn complete(&self, system_prompt: &str, user_message: &str) -> anyhow::Result<String>;
}

/// Parameters suggested by the advisor; absent keys use fixed fallbacks
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Suggestion {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_duration: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_velocity: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cluster_window: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cluster_pitch: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub triplet_tolerance: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quantize: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remove_triplets: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub merge_voices: Option<bool>,
}

impl Suggestion {
    pub fn is_empty(&self) -> bool {
        *self == Suggestion::default()
    }

    /// Parameters for the trial this suggestion replaces
    pub fn to_params(&self) -> TrialParams {
        TrialParams {
            min_duration: self.min_duration.unwrap_or(120),
            min_velocity: self.min_velocity.unwrap_or(10),
            cluster_window: self.cluster_window.unwrap_or(20),
            cluster_pitch: self.cluster_pitch.unwrap_or(1),
            triplet_tolerance: self.triplet_tolerance.unwrap_or(0.15),
            quantize: self.quantize.unwrap_or(false),
            remove_triplets: self.remove_triplets.unwrap_or(false),
            merge_voices: self.merge_voices.unwrap_or(true),
            same_pitch_resolver: true,
        }
    }
}

fn as_count(value: &Value) -> Option<u64> {
    value
        .as_u64()
        .or_else(|| value.as_f64().filter(|f| *f >= 0.0).map(|f| f.round() as u64))
}

/// Parse a reply into a suggestion
///
/// A surrounding code fence is stripped. Keys outside `ALLOWED_PARAMS`
/// and values of the wrong type are dropped; `None` when nothing usable
/// remains.
pub fn parse_suggestion(text: &str) -> Option<Suggestion> {
    let mut body = text.trim();
    if body.starts_with("```") {
        let lines: Vec<&str> = body.lines().collect();
        if lines.len() > 2 {
            body = &body[lines[0].len()..];
            body = body.trim_end().trim_end_matches("```");
        }
    }

    let value: Value = serde_json::from_str(body.trim()).ok()?;
    let object = value.as_object()?;

    let suggestion = Suggestion {
        min_duration: object.get("min_duration").and_then(as_count),
        min_velocity: object
            .get("min_velocity")
            .and_then(as_count)
            .map(|v| v.min(127) as u8),
        cluster_window: object.get("cluster_window").and_then(as_count),
        cluster_pitch: object
            .get("cluster_pitch")
            .and_then(as_count)
            .map(|v| v.min(127) as u8),
        triplet_tolerance: object
            .get("triplet_tolerance")
            .and_then(Value::as_f64)
            .filter(|t| t.is_finite() && *t >= 0.0),
        quantize: object.get("quantize").and_then(Value::as_bool),
        remove_triplets: object.get("remove_triplets").and_then(Value::as_bool),
        merge_voices: object.get("merge_voices").and_then(Value::as_bool),
    };

    (!suggestion.is_empty()).then_some(suggestion)
}

/// Problems worth pointing out to the advisor
pub fn identify_issues(metrics: &QualityMetrics) -> Vec<String> {
    let mut issues = Vec::new();
    if metrics.short_note_ratio > 0.1 {
        issues.push("short_note_ratio high".to_string());
    }
    if metrics.overlap_count > 5 {
        issues.push("overlaps high".to_string());
    }
    if metrics.voice_count > 2 {
        issues.push("polyphony high".to_string());
    }
    issues
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecentTrial {
    pub params: TrialParams,
    pub score: f64,
    pub metrics: QualityMetrics,
}

/// JSON context sent as the user message
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AdvisorContext {
    pub track_type_guess: TrackType,
    pub metrics_before: QualityMetrics,
    pub metrics_after: QualityMetrics,
    pub last_trial_params: TrialParams,
    pub last_trial_score: f64,
    pub top_issues: Vec<String>,
    pub recent_trials: Vec<RecentTrial>,
}

/// One advisor call as recorded in the decision log
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdvisorDecision {
    pub call_number: usize,
    pub prompt_size_tokens_estimate: usize,
    pub response_length: usize,
    pub parsed_ok: bool,
    pub suggested_changes: Suggestion,
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AdvisorSettings {
    pub max_calls: usize,
    pub timeout: Duration,
    pub system_prompt: String,
}

impl Default for AdvisorSettings {
    fn default() -> Self {
        Self {
            max_calls: 3,
            timeout: Duration::from_secs(20),
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
        }
    }
}

/// Rate-limited wrapper around a `CompletionClient`
pub struct Advisor {
    client: Arc<dyn CompletionClient>,
    settings: AdvisorSettings,
    calls_made: usize,
    decisions: Vec<AdvisorDecision>,
}

impl Advisor {
    pub fn new(client: Arc<dyn CompletionClient>) -> Self {
        Self::with_settings(client, AdvisorSettings::default())
    }

    pub fn with_settings(client: Arc<dyn CompletionClient>, settings: AdvisorSettings) -> Self {
        Self {
            client,
            settings,
            calls_made: 0,
            decisions: Vec::new(),
        }
    }

    pub fn calls_remaining(&self) -> usize {
        self.settings.max_calls.saturating_sub(self.calls_made)
    }

    pub fn decisions(&self) -> &[AdvisorDecision] {
        &self.decisions
    }

    /// Ask for a suggestion; every call, successful or not, is logged
    pub fn suggest(&mut self, context: &AdvisorContext) -> Option<Suggestion> {
        if self.calls_remaining() == 0 {
            return None;
        }
        self.calls_made += 1;

        let mut decision = AdvisorDecision {
            call_number: self.calls_made,
            ..Default::default()
        };

        let user_message = match serde_json::to_string(context) {
            Ok(message) => message,
            Err(e) => {
                decision.error = Some(e.to_string());
                self.decisions.push(decision);
                return None;
            }
        };
        decision.prompt_size_tokens_estimate = self.settings.system_prompt.split_whitespace().count()
            + user_message.split_whitespace().count();

        tracing::info!(
            "Advisor call #{} (~{} prompt tokens)",
            decision.call_number,
            decision.prompt_size_tokens_estimate
        );

        let suggestion = match self.call_with_timeout(user_message) {
            Ok(reply) => {
                decision.response_length = reply.chars().count();
                let parsed = parse_suggestion(&reply);
                match &parsed {
                    Some(s) => {
                        decision.parsed_ok = true;
                        decision.suggested_changes = s.clone();
                        tracing::info!("Advisor call #{} suggested {:?}", decision.call_number, s);
                    }
                    None => {
                        decision.error = Some("empty or invalid params".to_string());
                        tracing::warn!(
                            "Advisor call #{} reply yielded no valid params",
                            decision.call_number
                        );
                    }
                }
                parsed
            }
            Err(e) => {
                tracing::warn!("Advisor call #{} failed: {}", decision.call_number, e);
                decision.error = Some(e);
                None
            }
        };

        self.decisions.push(decision);
        suggestion
    }

    /// Run the client on a helper thread and stop waiting after the timeout
    fn call_with_timeout(&self, user_message: String) -> Result<String, String> {
        let (tx, rx) = crossbeam::channel::bounded(1);
        let client = Arc::clone(&self.client);
        let system_prompt = self.settings.system_prompt.clone();

        std::thread::spawn(move || {
            let result = client
                .complete(&system_prompt, &user_message)
                .map_err(|e| e.to_string());
            let _ = tx.send(result);
        });

        match rx.recv_timeout(self.settings.timeout) {
            Ok(result) => result,
            Err(crossbeam::channel::RecvTimeoutError::Timeout) => Err(format!(
                "timed out after {:.1}s",
                self.settings.timeout.as_secs_f64()
            )),
            Err(crossbeam::channel::RecvTimeoutError::Disconnected) => {
                Err("completion worker exited without a reply".to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_strips_code_fence() {
        let reply = "```json\n{\"min_duration\": 100, \"quantize\": true}\n```";
        let s = parse_suggestion(reply).unwrap();
        assert_eq!(s.min_duration, Some(100));
        assert_eq!(s.quantize, Some(true));
    }

    #[test]
    fn test_parse_drops_unknown_keys() {
        assert_eq!(parse_suggestion("{\"tempo\": 120}"), None);
        let s = parse_suggestion("{\"min_velocity\": 12.0, \"foo\": 1}").unwrap();
        assert_eq!(s.min_velocity, Some(12));
    }

    #[test]
    fn test_parse_rejects_non_object() {
        assert_eq!(parse_suggestion("[1, 2]"), None);
        assert_eq!(parse_suggestion("not json"), None);
    }

    #[test]
    fn test_fallbacks_fill_missing_params() {
        let s = Suggestion {
            min_duration: Some(90),
            ..Default::default()
        };
        let p = s.to_params();
        assert_eq!(p.min_duration, 90);
        assert_eq!(p.min_velocity, 10);
        assert!(!p.quantize);
        assert!(p.merge_voices);
    }

    #[test]
    fn test_rate_limit_stops_calling() {
        let mut client = MockCompletionClient::new();
        client
            .expect_complete()
            .times(1)
            .returning(|_, _| Ok("{\"cluster_pitch\": 2}".to_string()));

        let settings = AdvisorSettings {
            max_calls: 1,
            ..Default::default()
        };
        let mut advisor = Advisor::with_settings(Arc::new(client), settings);
        let context = AdvisorContext {
            track_type_guess: TrackType::Guitar,
            metrics_before: QualityMetrics::default(),
            metrics_after: QualityMetrics::default(),
            last_trial_params: Suggestion::default().to_params(),
            last_trial_score: 1.0,
            top_issues: vec![],
            recent_trials: vec![],
        };

        assert!(advisor.suggest(&context).is_some());
        assert!(advisor.suggest(&context).is_none());
        assert_eq!(advisor.decisions().len(), 1);
        assert!(advisor.decisions()[0].parsed_ok);
    }
}
