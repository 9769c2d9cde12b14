//! Pass 5: Bar-Aware Quantization
//!
//! Onsets snap to the nearest grid line and durations to a whole number of
//! grid units. A note never rings past the end of the bar its quantized
//! onset falls in; when clipping leaves less than one grid unit the note is
//! dropped.

use crate::config::Config;
use crate::events::{extract_non_note_events, extract_note_pairs, rebuild_track, sort_notes, Note};
use crate::midi::{bar_ticks, Tick, Track};

pub fn run(track: Track, ticks_per_beat: u16, time_signature: (u32, u32), config: &Config) -> Track {
    if !config.quantize {
        return track;
    }

    let notes = extract_note_pairs(&track);
    if notes.is_empty() {
        return track;
    }
    let non_notes = extract_non_note_events(&track);

    let grid = config.quantize_grid.grid_ticks(ticks_per_beat);
    let bar = bar_ticks(ticks_per_beat, time_signature);
    let input_count = notes.len();
    let quantized = quantize_notes(notes, grid, bar);

    tracing::debug!(
        "Pass 5: Quantization grid={:?} ({} ticks) bar={} ticks, {} -> {} notes",
        config.quantize_grid,
        grid,
        bar,
        input_count,
        quantized.len()
    );

    rebuild_track(&quantized, non_notes, None)
}

fn snap(tick: Tick, grid: Tick) -> Tick {
    ((tick as f64 / grid as f64).round() as Tick) * grid
}

/// Quantize notes against `grid_ticks`, clipping at `bar_ticks` boundaries
///
/// The grid is rounded to whole ticks. A zero grid leaves the notes as they
/// are; a zero bar length disables clipping.
pub fn quantize_notes(notes: Vec<Note>, grid_ticks: f64, bar_ticks: Tick) -> Vec<Note> {
    let grid = grid_ticks.round().max(0.0) as Tick;
    if grid == 0 {
        return notes;
    }

    let mut result: Vec<Note> = notes
        .into_iter()
        .filter_map(|note| {
            let onset = snap(note.onset, grid);
            let units = ((note.duration() as f64 / grid as f64).round() as Tick).max(1);
            let mut offset = onset + units * grid;

            if bar_ticks > 0 {
                let bar_end = (onset / bar_ticks + 1) * bar_ticks;
                offset = offset.min(bar_end);
            }

            if offset - onset < grid {
                return None;
            }
            Some(Note::new(note.pitch, note.channel, note.velocity, onset, offset))
        })
        .collect();

    sort_notes(&mut result);
    result
}
