//! Configuration system for the MIDI cleaning pipeline

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Main configuration structure
///
/// JSON keys are camelCase; unknown keys are ignored so that newer front-ends
/// can send settings an older pipeline does not know about.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Config {
    pub tempo_deduplicator: ToggleConfig,
    pub merge_voices: bool,
    pub remove_overlaps: bool,
    pub remove_triplets: bool,
    pub triplet_tolerance: f64,
    pub quantize: bool,
    pub quantize_grid: QuantizeGrid,
    pub remove_cc: bool,
    pub cc_numbers: Vec<u8>,
    pub pitch_cluster: PitchClusterConfig,
    pub filter_noise: bool,
    pub min_duration_ticks: u64,
    pub min_velocity: u8,
    pub same_pitch_overlap_resolver: ToggleConfig,
    /// 1-indexed bar at which processing starts
    pub start_bar: u32,
    pub merge_tracks: MergeTracksConfig,
    /// Track index (as a string, the way JSON object keys arrive) to overrides
    pub track_overrides: BTreeMap<String, ConfigOverride>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            tempo_deduplicator: ToggleConfig { enabled: true },
            merge_voices: true,
            remove_overlaps: true,
            remove_triplets: true,
            triplet_tolerance: 0.15,
            quantize: true,
            quantize_grid: QuantizeGrid::Eighth,
            remove_cc: true,
            cc_numbers: vec![64, 68],
            pitch_cluster: PitchClusterConfig::default(),
            filter_noise: true,
            min_duration_ticks: 120,
            min_velocity: 20,
            same_pitch_overlap_resolver: ToggleConfig { enabled: true },
            start_bar: 1,
            merge_tracks: MergeTracksConfig::default(),
            track_overrides: BTreeMap::new(),
        }
    }
}

/// A section that only carries an on/off switch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToggleConfig {
    pub enabled: bool,
}

impl Default for ToggleConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

/// Pitch cluster collapse configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PitchClusterConfig {
    pub enabled: bool,
    pub time_window_ticks: u64,
    pub pitch_threshold: u8,
}

impl Default for PitchClusterConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            time_window_ticks: 20,
            pitch_threshold: 1,
        }
    }
}

/// Track flattening configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MergeTracksConfig {
    pub enabled: bool,
    pub include_cc: bool,
    /// Empty whitelist keeps every controller when `include_cc` is set
    pub cc_whitelist: Vec<u8>,
}

impl Default for MergeTracksConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            include_cc: false,
            cc_whitelist: vec![64, 68],
        }
    }
}

/// Named quantization grids
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuantizeGrid {
    Whole,
    Half,
    Quarter,
    Eighth,
    Sixteenth,
    Thirtysecond,
}

impl QuantizeGrid {
    /// Grid divisions per quarter note; below 1 for grids longer than a beat
    pub fn divisor(self) -> f64 {
        match self {
            QuantizeGrid::Whole => 0.25,
            QuantizeGrid::Half => 0.5,
            QuantizeGrid::Quarter => 1.0,
            QuantizeGrid::Eighth => 2.0,
            QuantizeGrid::Sixteenth => 4.0,
            QuantizeGrid::Thirtysecond => 8.0,
        }
    }

    /// Grid size in ticks for the given resolution
    pub fn grid_ticks(self, ticks_per_beat: u16) -> f64 {
        ticks_per_beat as f64 / self.divisor()
    }
}

impl Default for QuantizeGrid {
    fn default() -> Self {
        QuantizeGrid::Eighth
    }
}

/// Sparse configuration overlay used for per-track overrides and presets
///
/// Top-level fields replace the base value; nested sections are merged
/// field by field.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ConfigOverride {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tempo_deduplicator: Option<ToggleOverride>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub merge_voices: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remove_overlaps: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remove_triplets: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub triplet_tolerance: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quantize: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quantize_grid: Option<QuantizeGrid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remove_cc: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cc_numbers: Option<Vec<u8>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pitch_cluster: Option<PitchClusterOverride>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter_noise: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_duration_ticks: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_velocity: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub same_pitch_overlap_resolver: Option<ToggleOverride>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_bar: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub merge_tracks: Option<MergeTracksOverride>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToggleOverride {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PitchClusterOverride {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_window_ticks: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pitch_threshold: Option<u8>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MergeTracksOverride {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub include_cc: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cc_whitelist: Option<Vec<u8>>,
}

fn set<T: Clone>(target: &mut T, value: &Option<T>) {
    if let Some(v) = value {
        *target = v.clone();
    }
}

impl Config {
    /// Return a copy of this configuration with `overlay` applied on top
    pub fn apply_override(&self, overlay: &ConfigOverride) -> Config {
        let mut merged = self.clone();

        if let Some(t) = &overlay.tempo_deduplicator {
            set(&mut merged.tempo_deduplicator.enabled, &t.enabled);
        }
        set(&mut merged.merge_voices, &overlay.merge_voices);
        set(&mut merged.remove_overlaps, &overlay.remove_overlaps);
        set(&mut merged.remove_triplets, &overlay.remove_triplets);
        set(&mut merged.triplet_tolerance, &overlay.triplet_tolerance);
        set(&mut merged.quantize, &overlay.quantize);
        set(&mut merged.quantize_grid, &overlay.quantize_grid);
        set(&mut merged.remove_cc, &overlay.remove_cc);
        set(&mut merged.cc_numbers, &overlay.cc_numbers);
        if let Some(pc) = &overlay.pitch_cluster {
            set(&mut merged.pitch_cluster.enabled, &pc.enabled);
            set(&mut merged.pitch_cluster.time_window_ticks, &pc.time_window_ticks);
            set(&mut merged.pitch_cluster.pitch_threshold, &pc.pitch_threshold);
        }
        set(&mut merged.filter_noise, &overlay.filter_noise);
        set(&mut merged.min_duration_ticks, &overlay.min_duration_ticks);
        set(&mut merged.min_velocity, &overlay.min_velocity);
        if let Some(t) = &overlay.same_pitch_overlap_resolver {
            set(&mut merged.same_pitch_overlap_resolver.enabled, &t.enabled);
        }
        set(&mut merged.start_bar, &overlay.start_bar);
        if let Some(mt) = &overlay.merge_tracks {
            set(&mut merged.merge_tracks.enabled, &mt.enabled);
            set(&mut merged.merge_tracks.include_cc, &mt.include_cc);
            set(&mut merged.merge_tracks.cc_whitelist, &mt.cc_whitelist);
        }

        merged
    }

    /// Effective configuration for one track: global settings plus that
    /// track's override, if any
    pub fn for_track(&self, track_index: usize) -> Config {
        match self.track_overrides.get(&track_index.to_string()) {
            Some(overlay) => self.apply_override(overlay),
            None => self.clone(),
        }
    }
}

/// Validate configuration parameters
///
/// Only checks values that would make a stage misbehave; musical sanity of
/// thresholds is left to the caller.
pub fn validate_config(config: &Config) -> crate::Result<()> {
    if !config.triplet_tolerance.is_finite() || config.triplet_tolerance < 0.0 {
        return Err(crate::CleanerError::ConfigValidation(format!(
            "tripletTolerance must be a non-negative number, got {}",
            config.triplet_tolerance
        )));
    }

    for (key, overlay) in &config.track_overrides {
        if key.parse::<usize>().is_err() {
            return Err(crate::CleanerError::ConfigValidation(format!(
                "trackOverrides key '{}' is not a track index",
                key
            )));
        }
        if let Some(tol) = overlay.triplet_tolerance {
            if !tol.is_finite() || tol < 0.0 {
                return Err(crate::CleanerError::ConfigValidation(format!(
                    "trackOverrides[{}].tripletTolerance must be a non-negative number",
                    key
                )));
            }
        }
    }

    Ok(())
}

/// Load configuration from JSON file
pub fn load_config<P: AsRef<std::path::Path>>(path: P) -> crate::Result<Config> {
    let content = std::fs::read_to_string(path)?;
    let config: Config = serde_json::from_str(&content)?;
    validate_config(&config)?;
    Ok(config)
}

/// Save configuration to JSON file
pub fn save_config<P: AsRef<std::path::Path>>(config: &Config, path: P) -> crate::Result<()> {
    let content = serde_json::to_string_pretty(config)?;
    std::fs::write(path, content)?;
    Ok(())
}
