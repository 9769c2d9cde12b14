//! Track and file builders shared by the integration tests

#![allow(dead_code)]

use midi_cleaner::events::{extract_note_pairs, rebuild_track, to_absolute, Note};
use midi_cleaner::midi::{EventKind, MetaEvent, MidiFile, Track, TrackEvent};
use midly::Format;

pub const PPQ: u16 = 480;

/// Channel 0, velocity 100
pub fn note(pitch: u8, onset: u64, duration: u64) -> Note {
    Note::new(pitch, 0, 100, onset, onset + duration)
}

pub fn track_from_notes(notes: &[Note]) -> Track {
    rebuild_track(notes, Vec::new(), None)
}

pub fn ev(delta: u32, kind: EventKind) -> TrackEvent {
    TrackEvent { delta, kind }
}

pub fn tempo(delta: u32, micros: u32) -> TrackEvent {
    ev(delta, EventKind::Meta(MetaEvent::Tempo(micros)))
}

pub fn track_name(name: &str) -> TrackEvent {
    ev(0, EventKind::Meta(MetaEvent::TrackName(name.as_bytes().to_vec())))
}

pub fn end_of_track(delta: u32) -> TrackEvent {
    ev(delta, EventKind::Meta(MetaEvent::EndOfTrack))
}

pub fn file_with(tracks: Vec<Track>) -> MidiFile {
    let format = if tracks.len() > 1 {
        Format::Parallel
    } else {
        Format::SingleTrack
    };
    let mut file = MidiFile::new(format, PPQ);
    file.tracks = tracks;
    file
}

pub fn notes_of(track: &Track) -> Vec<Note> {
    extract_note_pairs(track)
}

pub fn tempo_values(track: &Track) -> Vec<u32> {
    track.iter().filter_map(|e| e.kind.tempo()).collect()
}

/// Absolute tick of every event matching `predicate`
pub fn ticks_where<F: Fn(&EventKind) -> bool>(track: &Track, predicate: F) -> Vec<u64> {
    to_absolute(track)
        .into_iter()
        .filter(|e| predicate(&e.kind))
        .map(|e| e.tick)
        .collect()
}
