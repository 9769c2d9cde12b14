//! Error types for the MIDI cleaner

use thiserror::Error;

/// Custom error type for MIDI cleaning and tuning
#[derive(Debug, Error)]
pub enum CleanerError {
    /// E001: The MIDI container could not be decoded
    #[error("E001: MIDI decode error - {0}")]
    MidiDecode(String),
    /// E002: The MIDI container could not be encoded
    #[error("E002: MIDI encode error - {0}")]
    MidiEncode(String),
    /// E003: SMPTE timecode files have no PPQ grid to work on
    #[error("E003: Unsupported timing - {0}")]
    UnsupportedTiming(String),
    /// E004: Structurally invalid input (e.g. zero ticks per beat)
    #[error("E004: Invalid input - {0}")]
    InvalidInput(String),
    /// E005: Configuration validation failed
    #[error("E005: Configuration validation failed - {0}")]
    ConfigValidation(String),
    /// E006: File I/O error
    #[error("E006: File I/O error - {0}")]
    Io(#[from] std::io::Error),
    /// E007: JSON (de)serialization error
    #[error("E007: JSON error - {0}")]
    Json(#[from] serde_json::Error),
    /// E008: A tuning run is already in flight for the session
    #[error("E008: Tuning already in progress for session '{0}'")]
    TuningConflict(String),
    /// E009: A tuning trial failed and aborted the run
    #[error("E009: Tuning failed - {0}")]
    TuningFailed(String),
    /// E010: Preset id not found in the catalog
    #[error("E010: Unknown preset '{0}'")]
    UnknownPreset(String),
}

impl From<midly::Error> for CleanerError {
    fn from(err: midly::Error) -> Self {
        CleanerError::MidiDecode(err.to_string())
    }
}

impl CleanerError {
    /// Short machine-readable kind, used in structured status reports
    pub fn kind(&self) -> &'static str {
        match self {
            CleanerError::MidiDecode(_) => "midi_decode",
            CleanerError::MidiEncode(_) => "midi_encode",
            CleanerError::UnsupportedTiming(_) => "unsupported_timing",
            CleanerError::InvalidInput(_) => "invalid_input",
            CleanerError::ConfigValidation(_) => "config_validation",
            CleanerError::Io(_) => "io",
            CleanerError::Json(_) => "json",
            CleanerError::TuningConflict(_) => "tuning_conflict",
            CleanerError::TuningFailed(_) => "tuning_failed",
            CleanerError::UnknownPreset(_) => "unknown_preset",
        }
    }
}

/// Result type alias for MIDI cleaner operations
pub type Result<T> = std::result::Result<T, CleanerError>;
