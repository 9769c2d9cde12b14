//! Per-step instrumentation and the pipeline run report

use crate::config::Config;
use crate::qa::QualityMetrics;
use serde::{Deserialize, Serialize};
use std::time::Instant;

/// Version stamped into every report
pub const PIPELINE_VERSION: &str = env!("CARGO_PKG_VERSION");

pub const TEMPO_DEDUPLICATOR: &str = "TempoDeduplicator";
pub const PITCH_CLUSTER: &str = "PitchCluster";
pub const VOICE_MERGER: &str = "VoiceMerger";
pub const CC_FILTER: &str = "CCFilter";
pub const TRIPLET_REMOVER: &str = "TripletRemover";
pub const QUANTIZER: &str = "Quantizer";
pub const NOISE_FILTER: &str = "NoiseFilter";
pub const SAME_PITCH_OVERLAP_RESOLVER: &str = "SamePitchOverlapResolver";
pub const FINAL_CHORD_ALIGNMENT: &str = "FinalChordAlignment";
pub const MERGE_TRACKS: &str = "MergeTracksToSingleTrack";

/// Counters for one stage run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepTelemetry {
    pub name: String,
    pub enabled: bool,
    /// Absent for file-level steps
    #[serde(skip_serializing_if = "Option::is_none")]
    pub track_index: Option<usize>,
    pub duration_us: u64,
    pub input_note_count: usize,
    pub output_note_count: usize,
    pub notes_removed: usize,
    pub clusters_merged: usize,
    pub overlaps_resolved: usize,
    pub tempo_events_removed: usize,
    pub tracks_merged: bool,
}

/// Summary of a whole pipeline run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineReport {
    pub pipeline_version: String,
    pub track_names: Vec<String>,
    pub input_metrics: RunMetrics,
    pub output_metrics: RunMetrics,
    pub steps: Vec<StepTelemetry>,
    pub total_duration_ms: u64,
    pub config_used: Config,
}

impl PipelineReport {
    /// Steps recorded under one name, in execution order
    pub fn steps_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a StepTelemetry> + 'a {
        self.steps.iter().filter(move |s| s.name == name)
    }
}

/// File-level counts plus the quality metrics of that file
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunMetrics {
    pub total_notes: usize,
    pub tracks: usize,
    pub score: f64,
    pub quality: QualityMetrics,
}

/// Collects step records while the pipeline runs
pub struct PipelineContext {
    config: Config,
    started: Instant,
    steps: Vec<StepTelemetry>,
    current: Option<(StepTelemetry, Instant)>,
}

impl PipelineContext {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            started: Instant::now(),
            steps: Vec::new(),
            current: None,
        }
    }

    /// Open a step; an unfinished previous step is discarded
    pub fn begin_step(
        &mut self,
        name: &str,
        enabled: bool,
        track_index: Option<usize>,
        input_note_count: usize,
    ) {
        let step = StepTelemetry {
            name: name.to_string(),
            enabled,
            track_index,
            input_note_count,
            ..Default::default()
        };
        self.current = Some((step, Instant::now()));
    }

    /// Close the open step and derive its removal counters
    pub fn end_step(&mut self, output_note_count: usize) -> Option<&mut StepTelemetry> {
        let (mut step, started) = self.current.take()?;

        step.duration_us = started.elapsed().as_micros() as u64;
        step.output_note_count = output_note_count;
        step.notes_removed = step.input_note_count.saturating_sub(output_note_count);

        match step.name.as_str() {
            PITCH_CLUSTER => step.clusters_merged = step.notes_removed,
            VOICE_MERGER | SAME_PITCH_OVERLAP_RESOLVER => step.overlaps_resolved = step.notes_removed,
            _ => {}
        }

        self.steps.push(step);
        self.steps.last_mut()
    }

    pub fn steps(&self) -> &[StepTelemetry] {
        &self.steps
    }

    pub fn finalize(
        self,
        track_names: Vec<String>,
        input_metrics: RunMetrics,
        output_metrics: RunMetrics,
    ) -> PipelineReport {
        PipelineReport {
            pipeline_version: PIPELINE_VERSION.to_string(),
            track_names,
            input_metrics,
            output_metrics,
            steps: self.steps,
            total_duration_ms: self.started.elapsed().as_millis() as u64,
            config_used: self.config,
        }
    }
}
