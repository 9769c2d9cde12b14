//! Pass 6: Noise Filter

use crate::config::Config;
use crate::events::{extract_non_note_events, extract_note_pairs, rebuild_track, Note};
use crate::midi::{Tick, Track};

/// Drop notes shorter than `minDurationTicks` or quieter than `minVelocity`
pub fn run(track: Track, config: &Config) -> Track {
    if !config.filter_noise {
        return track;
    }

    let notes = extract_note_pairs(&track);
    if notes.is_empty() {
        return track;
    }
    let non_notes = extract_non_note_events(&track);

    let kept = filter_noise(&notes, config.min_duration_ticks, config.min_velocity);
    tracing::debug!(
        "Pass 6: Noise Filter removed {} notes (min_dur={}, min_vel={})",
        notes.len() - kept.len(),
        config.min_duration_ticks,
        config.min_velocity
    );

    rebuild_track(&kept, non_notes, None)
}

pub fn filter_noise(notes: &[Note], min_duration: Tick, min_velocity: u8) -> Vec<Note> {
    notes
        .iter()
        .filter(|n| n.duration() >= min_duration && n.velocity >= min_velocity)
        .copied()
        .collect()
}
