//! MIDI Cleaner
//!
//! Cleans multi-track Standard MIDI Files produced by AI transcription
//! tools: duplicated tempo events, near-duplicate pitch clusters, split
//! voices, triplet-ish durations, off-grid timing, noise notes and
//! overlapping same-pitch notes. A seeded auto-tuner searches the pipeline's
//! parameters for the best quality score.

pub mod analysis;
pub mod config;
pub mod error;
pub mod events;
pub mod midi;
pub mod passes;
pub mod pipeline;
pub mod presets;
pub mod qa;
pub mod telemetry;
pub mod tuner;

pub use config::Config;
pub use error::{CleanerError, Result};
pub use midi::MidiFile;
pub use pipeline::{run_pipeline, PipelineOutput};
pub use telemetry::PipelineReport;

use std::path::Path;

/// Cleaning pipeline bound to one configuration
pub struct MidiCleaner {
    config: Config,
}

impl MidiCleaner {
    /// Create a new cleaner with the given configuration
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Clean an in-memory file
    pub fn process(&self, file: &MidiFile) -> Result<PipelineOutput> {
        run_pipeline(file, &self.config)
    }

    /// Clean a file on disk and write the result
    pub fn process_file<P: AsRef<Path>, Q: AsRef<Path>>(
        &self,
        input_path: P,
        output_path: Q,
    ) -> Result<PipelineReport> {
        let file = MidiFile::load(input_path)?;
        let output = self.process(&file)?;
        output.file.save(output_path)?;
        Ok(output.report)
    }
}

/// Validate configuration and decode the input file
pub fn validate_input<P: AsRef<Path>>(input_path: P, config: &Config) -> Result<MidiFile> {
    config::validate_config(config)?;
    let file = MidiFile::load(input_path)?;
    if file.ticks_per_beat == 0 {
        return Err(CleanerError::InvalidInput(
            "ticks per beat must be greater than zero".to_string(),
        ));
    }
    Ok(file)
}
