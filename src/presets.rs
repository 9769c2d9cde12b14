//! Built-in presets: named configuration overlays per instrument family

use crate::analysis::TrackType;
use crate::config::{
    Config, ConfigOverride, PitchClusterOverride, QuantizeGrid, ToggleOverride,
};
use crate::error::{CleanerError, Result};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Preset {
    pub id: &'static str,
    pub label: &'static str,
    pub description: &'static str,
    pub track_types: Vec<TrackType>,
    pub config: ConfigOverride,
}

/// Settings every preset shares: noise filter and overlap handling on
fn base(min_duration: u64, min_velocity: u8, cluster: Option<(u64, u8)>) -> ConfigOverride {
    let pitch_cluster = match cluster {
        Some((window, threshold)) => PitchClusterOverride {
            enabled: Some(true),
            time_window_ticks: Some(window),
            pitch_threshold: Some(threshold),
        },
        None => PitchClusterOverride {
            enabled: Some(false),
            ..Default::default()
        },
    };

    ConfigOverride {
        filter_noise: Some(true),
        min_duration_ticks: Some(min_duration),
        min_velocity: Some(min_velocity),
        pitch_cluster: Some(pitch_cluster),
        same_pitch_overlap_resolver: Some(ToggleOverride { enabled: Some(true) }),
        remove_overlaps: Some(true),
        ..Default::default()
    }
}

/// Leaves timing alone: no triplet removal, no quantization
fn preserve(
    min_duration: u64,
    min_velocity: u8,
    cluster: Option<(u64, u8)>,
    merge_voices: bool,
    remove_cc: bool,
) -> ConfigOverride {
    ConfigOverride {
        remove_triplets: Some(false),
        quantize: Some(false),
        merge_voices: Some(merge_voices),
        remove_cc: Some(remove_cc),
        cc_numbers: remove_cc.then(|| vec![64, 68]),
        ..base(min_duration, min_velocity, cluster)
    }
}

/// Straightens timing onto an eighth grid and drops sustain/legato CCs
fn cleaner(min_duration: u64, min_velocity: u8, window: u64) -> ConfigOverride {
    ConfigOverride {
        remove_triplets: Some(true),
        quantize: Some(true),
        quantize_grid: Some(QuantizeGrid::Eighth),
        merge_voices: Some(true),
        remove_cc: Some(true),
        cc_numbers: Some(vec![64, 68]),
        ..base(min_duration, min_velocity, Some((window, 1)))
    }
}

/// Every preset, in display order
pub fn list_presets() -> Vec<Preset> {
    use TrackType::*;
    vec![
        Preset {
            id: "fx_preserve",
            label: "FX / Preserve",
            description: "Keep original FX character, only remove obvious noise.",
            track_types: vec![Guitar, Other],
            config: preserve(60, 3, Some((15, 1)), true, false),
        },
        Preset {
            id: "fx_cleaner",
            label: "FX / Cleaner",
            description: "Aggressive cleanup for FX tracks: tighter filtering, quantized.",
            track_types: vec![Guitar, Other],
            config: cleaner(120, 15, 30),
        },
        Preset {
            id: "strings_preserve",
            label: "Strings / Preserve",
            description: "Keep legato phrasing and polyphony with gentle noise removal.",
            track_types: vec![Strings],
            config: preserve(80, 5, Some((10, 1)), false, false),
        },
        Preset {
            id: "strings_cleaner",
            label: "Strings / Cleaner",
            description: "Tighter string cleanup with merged voices for a cleaner score.",
            track_types: vec![Strings],
            config: cleaner(120, 12, 20),
        },
        Preset {
            id: "vocals_preserve",
            label: "Vocals / Preserve",
            description: "Keep the melody intact: minimal filtering, no quantization.",
            track_types: vec![Vocal],
            config: preserve(60, 5, Some((10, 0)), true, false),
        },
        Preset {
            id: "guitar_preserve",
            label: "Guitar / Preserve",
            description: "Clean guitar: remove short artifacts, keep note feel.",
            track_types: vec![Guitar],
            config: preserve(100, 10, Some((20, 1)), true, true),
        },
        Preset {
            id: "bass_preserve",
            label: "Bass / Preserve",
            description: "Bass cleanup: remove ghost notes, keep timing.",
            track_types: vec![Bass],
            config: preserve(100, 12, Some((20, 1)), true, true),
        },
        Preset {
            id: "drums_preserve",
            label: "Drums / Preserve",
            description: "Keep drum hits: very short minimum duration, low velocity floor.",
            track_types: vec![Drums],
            config: preserve(30, 5, None, false, false),
        },
    ]
}

pub fn get_preset(id: &str) -> Option<Preset> {
    list_presets().into_iter().find(|p| p.id == id)
}

/// Overlay a preset onto `config`
pub fn apply_preset(config: &Config, id: &str) -> Result<Config> {
    let preset = get_preset(id).ok_or_else(|| CleanerError::UnknownPreset(id.to_string()))?;
    tracing::debug!("Applying preset '{}'", preset.id);
    Ok(config.apply_override(&preset.config))
}

/// The "preserve" preset matching an instrument family
pub fn suggest_preset(track_type: TrackType) -> &'static str {
    match track_type {
        TrackType::Guitar => "fx_preserve",
        TrackType::Vocal => "vocals_preserve",
        TrackType::Strings => "strings_preserve",
        TrackType::Bass => "bass_preserve",
        TrackType::Drums => "drums_preserve",
        TrackType::Other => "fx_preserve",
    }
}
