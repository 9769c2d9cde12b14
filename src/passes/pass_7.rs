//! Pass 7: Same-Pitch Overlap Resolution
//!
//! Where two notes of the same pitch on the same channel overlap, one of
//! them is discarded whole. Nothing is trimmed.

use crate::config::Config;
use crate::events::{extract_non_note_events, extract_note_pairs, rebuild_track, sort_notes, Note};
use crate::midi::Track;
use std::cmp::Ordering;
use std::collections::BTreeMap;

pub fn run(track: Track, config: &Config) -> Track {
    if !config.same_pitch_overlap_resolver.enabled {
        return track;
    }

    let notes = extract_note_pairs(&track);
    if notes.is_empty() {
        return track;
    }
    let non_notes = extract_non_note_events(&track);

    let resolved = resolve_overlaps(&notes);
    tracing::debug!(
        "Pass 7: Same-Pitch Overlap Resolution dropped {} notes",
        notes.len() - resolved.len()
    );

    rebuild_track(&resolved, non_notes, None)
}

/// Longer note wins, then louder, then earlier; `a` on a full tie
pub fn pick_winner(a: Note, b: Note) -> Note {
    let preference = a
        .duration()
        .cmp(&b.duration())
        .then(a.velocity.cmp(&b.velocity))
        .then(b.onset.cmp(&a.onset));

    match preference {
        Ordering::Less => b,
        _ => a,
    }
}

/// Greedy sweep per (channel, pitch) in (onset, offset) order
pub fn resolve_overlaps(notes: &[Note]) -> Vec<Note> {
    let mut groups: BTreeMap<(u8, u8), Vec<Note>> = BTreeMap::new();
    for note in notes {
        groups.entry((note.channel, note.pitch)).or_default().push(*note);
    }

    let mut result = Vec::with_capacity(notes.len());
    for (_, mut group) in groups {
        group.sort_by_key(|n| (n.onset, n.offset, n.velocity));
        let mut kept: Vec<Note> = Vec::with_capacity(group.len());

        for note in group {
            match kept.last_mut() {
                Some(last) if note.onset < last.offset => *last = pick_winner(*last, note),
                _ => kept.push(note),
            }
        }
        result.extend(kept);
    }

    sort_notes(&mut result);
    result
}
