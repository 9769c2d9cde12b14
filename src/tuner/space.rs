//! Parameter space explored by the tuner

use crate::analysis::TrackType;
use crate::config::{Config, PitchClusterConfig, ToggleConfig};
use serde::{Deserialize, Serialize};

/// One point of the search space
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrialParams {
    pub min_duration: u64,
    pub min_velocity: u8,
    pub cluster_window: u64,
    pub cluster_pitch: u8,
    pub triplet_tolerance: f64,
    pub quantize: bool,
    pub remove_triplets: bool,
    pub merge_voices: bool,
    pub same_pitch_resolver: bool,
}

impl TrialParams {
    /// Full pipeline configuration for these parameters
    ///
    /// Noise filtering, overlap removal, tempo deduplication and CC removal
    /// are always on; pitch clustering is always enabled.
    pub fn to_config(&self) -> Config {
        Config {
            min_duration_ticks: self.min_duration,
            min_velocity: self.min_velocity,
            pitch_cluster: PitchClusterConfig {
                enabled: true,
                time_window_ticks: self.cluster_window,
                pitch_threshold: self.cluster_pitch,
            },
            triplet_tolerance: self.triplet_tolerance,
            quantize: self.quantize,
            remove_triplets: self.remove_triplets,
            merge_voices: self.merge_voices,
            filter_noise: true,
            same_pitch_overlap_resolver: ToggleConfig {
                enabled: self.same_pitch_resolver,
            },
            tempo_deduplicator: ToggleConfig { enabled: true },
            remove_overlaps: true,
            remove_cc: true,
            ..Config::default()
        }
    }
}

/// Value domain of one dimension
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Domain {
    /// Inclusive range sampled on a step grid
    Stepped { low: f64, high: f64, step: f64 },
    Bool,
}

impl Domain {
    pub fn bounds(&self) -> (f64, f64) {
        match *self {
            Domain::Stepped { low, high, .. } => (low, high),
            Domain::Bool => (0.0, 1.0),
        }
    }

    /// Clamp into range and onto the grid
    pub fn snap(&self, value: f64) -> f64 {
        match *self {
            Domain::Stepped { low, high, step } => {
                let clamped = value.clamp(low, high);
                let units = ((clamped - low) / step).round();
                let snapped = (low + units * step).min(high);
                (snapped * 1e4).round() / 1e4
            }
            Domain::Bool => {
                if value >= 0.5 {
                    1.0
                } else {
                    0.0
                }
            }
        }
    }

    /// Number of grid points
    pub fn cardinality(&self) -> usize {
        match *self {
            Domain::Stepped { low, high, step } => ((high - low) / step).round() as usize + 1,
            Domain::Bool => 2,
        }
    }

    /// Value of the `index`-th grid point
    pub fn point(&self, index: usize) -> f64 {
        match *self {
            Domain::Stepped { low, step, .. } => self.snap(low + index as f64 * step),
            Domain::Bool => index.min(1) as f64,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Dimension {
    pub name: &'static str,
    pub domain: Domain,
}

/// Ranges for noise filter and clustering for one instrument family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TypeRanges {
    pub min_duration: (u64, u64),
    pub min_velocity: (u8, u8),
    pub cluster_window: (u64, u64),
}

impl TypeRanges {
    pub fn for_track_type(track_type: TrackType) -> Self {
        let (min_duration, min_velocity, cluster_window) = match track_type {
            TrackType::Guitar => ((80, 240), (5, 40), (10, 80)),
            TrackType::Bass => ((100, 240), (10, 40), (15, 100)),
            TrackType::Vocal => ((40, 200), (0, 25), (10, 60)),
            TrackType::Drums => ((40, 120), (0, 15), (10, 40)),
            TrackType::Strings => ((60, 240), (0, 30), (10, 80)),
            TrackType::Other => ((40, 240), (0, 40), (10, 120)),
        };
        Self {
            min_duration,
            min_velocity,
            cluster_window,
        }
    }
}

/// Ordered dimensions; the order matches `TrialParams` field order
#[derive(Debug, Clone, PartialEq)]
pub struct SearchSpace {
    pub dimensions: Vec<Dimension>,
}

fn stepped(name: &'static str, low: f64, high: f64, step: f64) -> Dimension {
    Dimension {
        name,
        domain: Domain::Stepped { low, high, step },
    }
}

fn boolean(name: &'static str) -> Dimension {
    Dimension {
        name,
        domain: Domain::Bool,
    }
}

impl SearchSpace {
    pub fn for_track_type(track_type: TrackType) -> Self {
        let r = TypeRanges::for_track_type(track_type);
        Self {
            dimensions: vec![
                stepped("min_duration", r.min_duration.0 as f64, r.min_duration.1 as f64, 10.0),
                stepped("min_velocity", r.min_velocity.0 as f64, r.min_velocity.1 as f64, 1.0),
                stepped("cluster_window", r.cluster_window.0 as f64, r.cluster_window.1 as f64, 5.0),
                stepped("cluster_pitch", 0.0, 2.0, 1.0),
                stepped("triplet_tolerance", 0.05, 0.30, 0.01),
                boolean("quantize"),
                boolean("remove_triplets"),
                boolean("merge_voices"),
                boolean("same_pitch_resolver"),
            ],
        }
    }

    /// Values are expected snapped, in dimension order
    pub fn decode(&self, values: &[f64]) -> TrialParams {
        let get = |i: usize| values.get(i).copied().unwrap_or(0.0);
        TrialParams {
            min_duration: get(0).round().max(0.0) as u64,
            min_velocity: get(1).round().clamp(0.0, 127.0) as u8,
            cluster_window: get(2).round().max(0.0) as u64,
            cluster_pitch: get(3).round().clamp(0.0, 127.0) as u8,
            triplet_tolerance: get(4),
            quantize: get(5) >= 0.5,
            remove_triplets: get(6) >= 0.5,
            merge_voices: get(7) >= 0.5,
            same_pitch_resolver: get(8) >= 0.5,
        }
    }

    pub fn encode(&self, params: &TrialParams) -> Vec<f64> {
        let flag = |b: bool| if b { 1.0 } else { 0.0 };
        vec![
            params.min_duration as f64,
            params.min_velocity as f64,
            params.cluster_window as f64,
            params.cluster_pitch as f64,
            params.triplet_tolerance,
            flag(params.quantize),
            flag(params.remove_triplets),
            flag(params.merge_voices),
            flag(params.same_pitch_resolver),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snap_stays_on_grid() {
        let domain = Domain::Stepped {
            low: 0.05,
            high: 0.30,
            step: 0.01,
        };
        assert_eq!(domain.snap(0.123), 0.12);
        assert_eq!(domain.snap(1.0), 0.30);
        assert_eq!(domain.cardinality(), 26);
    }

    #[test]
    fn test_drums_ranges_are_narrow() {
        let drums = TypeRanges::for_track_type(TrackType::Drums);
        let other = TypeRanges::for_track_type(TrackType::Other);
        assert!(drums.cluster_window.1 < other.cluster_window.1);
        assert_eq!(drums.min_duration, (40, 120));
    }
}
