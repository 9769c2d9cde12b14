//! Pass 2: Voice Merge & Chord Alignment
//!
//! Notation renderers split a track into several voices whenever its notes
//! live on different channels or chord members end at different ticks. This
//! pass moves everything to the track's dominant channel, folds same-pitch
//! duplicates created by that move, and trims each chord to its shortest
//! member.

use crate::config::Config;
use crate::events::{
    extract_non_note_events, extract_note_pairs, rebuild_track, sort_notes, AbsEvent, Note,
};
use crate::midi::{Tick, Track};
use std::collections::BTreeMap;

pub fn run(track: Track, config: &Config) -> Track {
    if !config.merge_voices {
        return track;
    }

    let mut notes = extract_note_pairs(&track);
    if notes.is_empty() {
        return track;
    }
    let primary = primary_channel(&track);
    let non_notes: Vec<AbsEvent> = extract_non_note_events(&track)
        .into_iter()
        .map(|e| AbsEvent::new(e.tick, e.kind.with_channel(primary)))
        .collect();

    let input_count = notes.len();
    for note in notes.iter_mut() {
        note.channel = primary;
    }

    if config.remove_overlaps {
        notes = merge_overlaps(notes);
    }
    let notes = align_chord_durations(notes);

    tracing::debug!(
        "Pass 2: Voice Merge -> channel {}, {} notes in, {} out",
        primary,
        input_count,
        notes.len()
    );

    rebuild_track(&notes, non_notes, Some(primary))
}

/// Channel carrying the most note-ons; ties go to the lowest channel,
/// and a track without notes reports channel 0
pub fn primary_channel(track: &Track) -> u8 {
    let mut counts: BTreeMap<u8, usize> = BTreeMap::new();
    for event in track {
        if event.kind.is_note_on() {
            if let Some(channel) = event.kind.channel() {
                *counts.entry(channel).or_default() += 1;
            }
        }
    }

    counts
        .into_iter()
        .fold(None, |best: Option<(u8, usize)>, (channel, count)| match best {
            Some((_, best_count)) if best_count >= count => best,
            _ => Some((channel, count)),
        })
        .map(|(channel, _)| channel)
        .unwrap_or(0)
}

/// Merge overlapping notes sharing (channel, pitch)
///
/// A note starting before the running group's offset is absorbed: the group
/// keeps its onset, extends to the later offset and takes the louder velocity.
pub fn merge_overlaps(notes: Vec<Note>) -> Vec<Note> {
    let mut groups: BTreeMap<(u8, u8), Vec<Note>> = BTreeMap::new();
    for note in notes {
        groups.entry((note.channel, note.pitch)).or_default().push(note);
    }

    let mut merged = Vec::new();
    for (_, mut group) in groups {
        group.sort_by_key(|n| (n.onset, n.offset, n.velocity));
        let mut current: Option<Note> = None;

        for note in group {
            current = match current {
                Some(mut acc) if note.onset < acc.offset => {
                    acc.offset = acc.offset.max(note.offset);
                    acc.velocity = acc.velocity.max(note.velocity);
                    Some(acc)
                }
                Some(acc) => {
                    merged.push(acc);
                    Some(note)
                }
                None => Some(note),
            };
        }
        merged.extend(current);
    }

    sort_notes(&mut merged);
    merged
}

/// Give every note of a same-onset chord the chord's shortest duration
pub fn align_chord_durations(notes: Vec<Note>) -> Vec<Note> {
    let mut chords: BTreeMap<Tick, Vec<Note>> = BTreeMap::new();
    for note in notes {
        chords.entry(note.onset).or_default().push(note);
    }

    let mut aligned = Vec::new();
    for (_, mut chord) in chords {
        if let Some(shortest) = chord.iter().map(Note::duration).min() {
            if chord.iter().any(|n| n.duration() != shortest) {
                for note in chord.iter_mut() {
                    note.offset = note.onset + shortest;
                }
            }
        }
        aligned.extend(chord);
    }

    sort_notes(&mut aligned);
    aligned
}

/// Chord alignment over a whole track, keeping every note on its channel
///
/// Run again at the end of the chain because later passes can leave chord
/// members with different lengths.
pub fn align_track_chords(track: Track) -> Track {
    let notes = extract_note_pairs(&track);
    if notes.is_empty() {
        return track;
    }
    let non_notes = extract_non_note_events(&track);
    let aligned = align_chord_durations(notes);
    rebuild_track(&aligned, non_notes, None)
}
