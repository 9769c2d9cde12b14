//! Background tuning runs, one per session, with pollable status

use super::advisor::{Advisor, AdvisorDecision};
use super::space::TrialParams;
use super::{best_trial, AutoTuner, TrialRecord};
use crate::analysis::TrackType;
use crate::config::Config;
use crate::error::{CleanerError, Result};
use crate::midi::MidiFile;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::JoinHandle;

pub const MAX_TRIALS_LIMIT: usize = 100;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TuningState {
    #[default]
    Idle,
    Running,
    Done,
    Error,
}

/// Failure surfaced to pollers as kind plus message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorDescription {
    pub kind: String,
    pub message: String,
}

impl From<&CleanerError> for ErrorDescription {
    fn from(err: &CleanerError) -> Self {
        Self {
            kind: err.kind().to_string(),
            message: err.to_string(),
        }
    }
}

/// Snapshot returned by `TuningRegistry::status`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TuningStatus {
    pub status: TuningState,
    pub current_trial: usize,
    pub total_trials: usize,
    pub best_score: Option<f64>,
    pub best_params: Option<TrialParams>,
    pub current_params: Option<TrialParams>,
    pub track_type: Option<TrackType>,
    pub stop_reason: Option<String>,
    pub trials: Vec<TrialRecord>,
    pub advisor_decisions: Vec<AdvisorDecision>,
    pub best_config: Option<Config>,
    pub error: Option<ErrorDescription>,
}

impl TuningStatus {
    fn record_trial(&mut self, record: &TrialRecord) {
        self.current_trial = record.number + 1;
        self.current_params = Some(record.params.clone());
        self.trials.push(record.clone());
        if let Some(best) = best_trial(&self.trials) {
            self.best_score = Some(best.score);
            self.best_params = Some(best.params.clone());
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StartResponse {
    pub status: &'static str,
    pub max_trials: usize,
}

#[derive(Default)]
struct RunEntry {
    status: TuningStatus,
    handle: Option<JoinHandle<()>>,
}

/// In-flight and finished tuning runs keyed by session id
///
/// Workers update the shared map after every trial; readers always get a
/// cloned snapshot, never a partially written record.
#[derive(Clone, Default)]
pub struct TuningRegistry {
    runs: RunMap,
}

impl TuningRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a background run; `max_trials` is clamped to `1..=100`
    pub fn start(
        &self,
        session: &str,
        file: MidiFile,
        max_trials: usize,
        advisor: Option<Advisor>,
    ) -> Result<StartResponse> {
        let max_trials = max_trials.clamp(1, MAX_TRIALS_LIMIT);

        let mut runs = self.runs.lock();
        if runs
            .get(session)
            .map(|r| r.status.status == TuningState::Running)
            .unwrap_or(false)
        {
            return Err(CleanerError::TuningConflict(session.to_string()));
        }

        let entry = runs.entry(session.to_string()).or_default();
        entry.status = TuningStatus {
            status: TuningState::Running,
            total_trials: max_trials,
            ..Default::default()
        };

        let shared = Arc::clone(&self.runs);
        let key = session.to_string();
        let spawned = std::thread::Builder::new()
            .name(format!("tuner-{}", session))
            .spawn(move || {
                let runs = Arc::clone(&shared);
                let worker_key = key.clone();
                run_guarded(&shared, &key, move || {
                    run_worker(runs, worker_key, file, max_trials, advisor)
                })
            });
        match spawned {
            Ok(handle) => entry.handle = Some(handle),
            Err(err) => {
                let err = CleanerError::from(err);
                entry.status.status = TuningState::Error;
                entry.status.error = Some(ErrorDescription::from(&err));
                return Err(err);
            }
        }

        tracing::info!("Tuning started for session '{}' ({} trials max)", session, max_trials);

        Ok(StartResponse {
            status: "started",
            max_trials,
        })
    }

    /// Current snapshot; `Idle` for unknown sessions
    pub fn status(&self, session: &str) -> TuningStatus {
        self.runs
            .lock()
            .get(session)
            .map(|r| r.status.clone())
            .unwrap_or_default()
    }

    pub fn is_running(&self, session: &str) -> bool {
        self.status(session).status == TuningState::Running
    }

    /// Block until the session's worker finishes, then return its snapshot
    pub fn wait(&self, session: &str) -> Option<TuningStatus> {
        let handle = self.runs.lock().get_mut(session)?.handle.take();
        if let Some(handle) = handle {
            if handle.join().is_err() {
                let mut runs = self.runs.lock();
                if let Some(entry) = runs.get_mut(session) {
                    entry.status.status = TuningState::Error;
                    entry.status.error = Some(ErrorDescription {
                        kind: "panic".to_string(),
                        message: "tuning worker panicked".to_string(),
                    });
                }
            }
        }
        Some(self.status(session))
    }
}

type RunMap = Arc<Mutex<HashMap<String, RunEntry>>>;

/// Run `body`, turning a panic into an `Error` status pollers can see
fn run_guarded<F: FnOnce()>(runs: &RunMap, session: &str, body: F) {
    if panic::catch_unwind(AssertUnwindSafe(body)).is_err() {
        tracing::warn!("Tuning worker for session '{}' panicked", session);
        if let Some(entry) = runs.lock().get_mut(session) {
            entry.status.status = TuningState::Error;
            entry.status.error = Some(ErrorDescription {
                kind: "panic".to_string(),
                message: "tuning worker panicked".to_string(),
            });
        }
    }
}

fn run_worker(
    runs: RunMap,
    session: String,
    file: MidiFile,
    max_trials: usize,
    advisor: Option<Advisor>,
) {
    let mut tuner = AutoTuner::new(&file, max_trials);
    if let Some(advisor) = advisor {
        tuner = tuner.with_advisor(advisor);
    }

    if let Some(entry) = runs.lock().get_mut(&session) {
        entry.status.track_type = Some(tuner.track_type());
    }

    let outcome = tuner.optimize(|record| {
        if let Some(entry) = runs.lock().get_mut(&session) {
            entry.status.record_trial(record);
        }
    });

    let mut guard = runs.lock();
    let Some(entry) = guard.get_mut(&session) else {
        return;
    };
    match outcome {
        Ok(result) => {
            let status = &mut entry.status;
            status.status = TuningState::Done;
            status.best_score = Some(result.best_score);
            status.best_params = Some(result.best_params);
            status.best_config = Some(result.best_config);
            status.stop_reason = Some(result.stop_reason);
            status.trials = result.trials;
            status.advisor_decisions = result.advisor_decisions;
        }
        Err(err) => {
            tracing::warn!("Tuning failed for session '{}': {}", session, err);
            entry.status.status = TuningState::Error;
            entry.status.error = Some(ErrorDescription::from(&err));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_panicking_worker_is_visible_to_pollers() {
        let registry = TuningRegistry::new();
        registry.runs.lock().insert(
            "crash".to_string(),
            RunEntry {
                status: TuningStatus {
                    status: TuningState::Running,
                    ..Default::default()
                },
                handle: None,
            },
        );

        run_guarded(&registry.runs, "crash", || panic!("trial blew up"));

        let status = registry.status("crash");
        assert!(!registry.is_running("crash"));
        assert_eq!(status.status, TuningState::Error);
        assert_eq!(status.error.map(|e| e.kind), Some("panic".to_string()));
    }

    #[test]
    fn test_clean_worker_leaves_status_alone() {
        let registry = TuningRegistry::new();
        run_guarded(&registry.runs, "quiet", || {});
        assert_eq!(registry.status("quiet").status, TuningState::Idle);
    }
}
