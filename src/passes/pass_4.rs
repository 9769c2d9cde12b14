//! Pass 4: Triplet Removal
//!
//! Durations that land near a triplet value are rewritten to a straight
//! eighth note. Onsets are never moved.

use crate::config::Config;
use crate::events::{extract_non_note_events, extract_note_pairs, rebuild_track, Note};
use crate::midi::{Tick, Track};

pub fn run(track: Track, ticks_per_beat: u16, config: &Config) -> Track {
    if !config.remove_triplets {
        return track;
    }

    let mut notes = extract_note_pairs(&track);
    if notes.is_empty() {
        return track;
    }
    let non_notes = extract_non_note_events(&track);

    let rewritten = straighten_triplets(&mut notes, ticks_per_beat, config.triplet_tolerance);
    tracing::debug!(
        "Pass 4: Triplet Removal rewrote {} of {} notes (tolerance={})",
        rewritten,
        notes.len(),
        config.triplet_tolerance
    );

    rebuild_track(&notes, non_notes, None)
}

/// Triplet half, quarter, eighth and sixteenth lengths in ticks
pub fn triplet_references(ticks_per_beat: u16) -> [f64; 4] {
    let p = ticks_per_beat as f64;
    [4.0 * p / 3.0, 2.0 * p / 3.0, p / 3.0, p / 6.0]
}

/// Relative error against any reference within `tolerance`
pub fn is_triplet(duration: Tick, references: &[f64], tolerance: f64) -> bool {
    references
        .iter()
        .filter(|r| **r > 0.0)
        .any(|r| (duration as f64 - r).abs() / r <= tolerance)
}

/// Rewrite triplet-like durations in place; returns how many changed
pub fn straighten_triplets(notes: &mut [Note], ticks_per_beat: u16, tolerance: f64) -> usize {
    let references = triplet_references(ticks_per_beat);
    let straight_eighth = (ticks_per_beat as f64 / 2.0).round_ties_even() as Tick;
    let mut rewritten = 0;

    for note in notes.iter_mut() {
        if is_triplet(note.duration(), &references, tolerance) {
            note.offset = note.onset + straight_eighth;
            rewritten += 1;
        }
    }

    rewritten
}
