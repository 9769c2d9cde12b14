//! Quality scoring of a processed file
//!
//! The score is a heuristic: it rewards pitch variety and reasonable note
//! lengths, and penalizes very short notes, same-pitch overlaps and notes
//! spread over several channels.

use crate::events::{extract_note_pairs, Note};
use crate::midi::{MidiFile, Tick};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Notes shorter than this count as short
pub const SHORT_NOTE_TICKS: Tick = 60;

/// Average duration is normalised by this many ticks
const DURATION_NORM_TICKS: f64 = 480.0;

/// Ceiling on the duration term
const MAX_DURATION_BONUS: f64 = 10.0;

/// Measurements behind a score
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QualityMetrics {
    pub unique_pitches: usize,
    /// Rounded to 0.1 tick
    pub avg_duration: f64,
    /// Rounded to four places
    pub short_note_ratio: f64,
    pub overlap_count: usize,
    pub voice_count: usize,
}

fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

/// Score every note of every track; an empty file scores 0 with zero metrics
pub fn score_midi(file: &MidiFile) -> (f64, QualityMetrics) {
    let notes: Vec<Note> = file.tracks.iter().flat_map(extract_note_pairs).collect();
    score_notes(&notes)
}

pub fn score_notes(notes: &[Note]) -> (f64, QualityMetrics) {
    if notes.is_empty() {
        return (0.0, QualityMetrics::default());
    }

    let unique_pitches = notes.iter().map(|n| n.pitch).collect::<BTreeSet<_>>().len();
    let voice_count = notes.iter().map(|n| n.channel).collect::<BTreeSet<_>>().len();

    let total: Tick = notes.iter().map(Note::duration).sum();
    let avg_duration = total as f64 / notes.len() as f64;
    let duration_term = (avg_duration / DURATION_NORM_TICKS).min(MAX_DURATION_BONUS);

    let short = notes.iter().filter(|n| n.duration() < SHORT_NOTE_TICKS).count();
    let short_note_ratio = short as f64 / notes.len() as f64;

    let overlap_count = count_same_pitch_overlaps(notes);

    let score = unique_pitches as f64 * 2.0 + duration_term
        - short_note_ratio * 5.0
        - overlap_count as f64 * 3.0
        - voice_count as f64 * 4.0;

    let metrics = QualityMetrics {
        unique_pitches,
        avg_duration: round_to(avg_duration, 1),
        short_note_ratio: round_to(short_note_ratio, 4),
        overlap_count,
        voice_count,
    };

    (round_to(score, 4), metrics)
}

/// Adjacent overlapping pairs within each (channel, pitch), in onset order
///
/// Notes sharing an onset keep their input order.
pub fn count_same_pitch_overlaps(notes: &[Note]) -> usize {
    let mut groups: BTreeMap<(u8, u8), Vec<&Note>> = BTreeMap::new();
    for note in notes {
        groups.entry((note.channel, note.pitch)).or_default().push(note);
    }

    groups
        .into_values()
        .map(|mut group| {
            group.sort_by_key(|n| n.onset);
            group.windows(2).filter(|w| w[1].onset < w[0].offset).count()
        })
        .sum()
}
