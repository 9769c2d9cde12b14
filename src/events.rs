//! Absolute/delta time conversion, note pairing and track reconstruction

use crate::midi::{EventKind, MetaEvent, Tick, Track, TrackEvent};
use midly::MidiMessage;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};

/// A sounding note with absolute onset and offset ticks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Note {
    pub pitch: u8,
    pub channel: u8,
    pub velocity: u8,
    pub onset: Tick,
    pub offset: Tick,
}

impl Note {
    pub fn new(pitch: u8, channel: u8, velocity: u8, onset: Tick, offset: Tick) -> Self {
        Self {
            pitch,
            channel,
            velocity,
            onset,
            offset: offset.max(onset),
        }
    }

    pub fn duration(&self) -> Tick {
        self.offset.saturating_sub(self.onset)
    }
}

/// Event paired with its absolute tick
#[derive(Debug, Clone, PartialEq)]
pub struct AbsEvent {
    pub tick: Tick,
    pub kind: EventKind,
}

impl AbsEvent {
    pub fn new(tick: Tick, kind: EventKind) -> Self {
        Self { tick, kind }
    }
}

/// Running sum of delta times
pub fn to_absolute(track: &Track) -> Vec<AbsEvent> {
    let mut tick: Tick = 0;
    track
        .iter()
        .map(|event| {
            tick += event.delta as Tick;
            AbsEvent::new(tick, event.kind.clone())
        })
        .collect()
}

/// Consecutive differences; an out-of-order tick yields a zero delta
pub fn to_delta(events: Vec<AbsEvent>) -> Track {
    let mut prev: Tick = 0;
    events
        .into_iter()
        .map(|event| {
            let delta = event.tick.saturating_sub(prev);
            prev = prev.max(event.tick);
            TrackEvent {
                delta: delta.min(u32::MAX as Tick) as u32,
                kind: event.kind,
            }
        })
        .collect()
}

/// Pair note-ons with note-offs, FIFO per (channel, pitch)
///
/// Note-ons still open at the end are closed at the track's last event tick.
/// The result is sorted by (onset, pitch).
pub fn extract_note_pairs(track: &Track) -> Vec<Note> {
    let abs_events = to_absolute(track);
    let mut active: HashMap<(u8, u8), VecDeque<(Tick, u8)>> = HashMap::new();
    let mut notes = Vec::new();

    for event in &abs_events {
        let (channel, message) = match &event.kind {
            EventKind::Midi { channel, message } => (*channel, message),
            _ => continue,
        };

        match *message {
            MidiMessage::NoteOn { key, vel } if vel.as_int() > 0 => {
                active
                    .entry((channel, key.as_int()))
                    .or_default()
                    .push_back((event.tick, vel.as_int()));
            }
            MidiMessage::NoteOn { key, .. } | MidiMessage::NoteOff { key, .. } => {
                if let Some(pending) = active.get_mut(&(channel, key.as_int())) {
                    if let Some((onset, velocity)) = pending.pop_front() {
                        notes.push(Note::new(key.as_int(), channel, velocity, onset, event.tick));
                    }
                }
            }
            _ => {}
        }
    }

    if let Some(last) = abs_events.last() {
        for ((channel, pitch), pending) in active {
            for (onset, velocity) in pending {
                notes.push(Note::new(pitch, channel, velocity, onset, last.tick));
            }
        }
    }

    sort_notes(&mut notes);
    notes
}

/// Sort by (onset, pitch), then by the remaining fields so the order never
/// depends on hash-map iteration
pub fn sort_notes(notes: &mut [Note]) {
    notes.sort_by_key(|n| (n.onset, n.pitch, n.channel, n.offset, n.velocity));
}

/// Every event other than note-on/note-off, with absolute ticks
pub fn extract_non_note_events(track: &Track) -> Vec<AbsEvent> {
    to_absolute(track)
        .into_iter()
        .filter(|event| !event.kind.is_note())
        .collect()
}

/// Stable sort by tick and same-tick priority
pub fn sort_events(events: &mut [AbsEvent]) {
    events.sort_by_key(|event| (event.tick, event.kind.same_tick_priority()));
}

/// Interleave notes and non-note events back into a delta-time track
///
/// At equal ticks the order is meta, note-off, other channel events,
/// note-on. `end_of_track` markers are collected and a single one is
/// appended at the last tick.
pub fn rebuild_track(notes: &[Note], non_notes: Vec<AbsEvent>, force_channel: Option<u8>) -> Track {
    let mut events = Vec::with_capacity(notes.len() * 2 + non_notes.len() + 1);
    let mut end_tick: Tick = 0;
    let mut had_end = false;

    for event in non_notes {
        if event.kind.is_end_of_track() {
            end_tick = end_tick.max(event.tick);
            had_end = true;
        } else {
            events.push(event);
        }
    }

    for note in notes {
        let channel = force_channel.unwrap_or(note.channel);
        events.push(AbsEvent::new(
            note.onset,
            EventKind::note_on(channel, note.pitch, note.velocity),
        ));
        events.push(AbsEvent::new(note.offset, EventKind::note_off(channel, note.pitch)));
    }

    sort_events(&mut events);

    if had_end || !events.is_empty() {
        let last = events.last().map(|e| e.tick).unwrap_or(0);
        events.push(AbsEvent::new(
            last.max(end_tick),
            EventKind::Meta(MetaEvent::EndOfTrack),
        ));
    }

    to_delta(events)
}

/// Count note-on events with non-zero velocity
pub fn count_notes(track: &Track) -> usize {
    track.iter().filter(|event| event.kind.is_note_on()).count()
}

/// Make sure the track finishes with exactly one terminal `end_of_track`
pub fn ensure_end_of_track(mut track: Track) -> Track {
    if !track.last().map(|e| e.kind.is_end_of_track()).unwrap_or(false) {
        track.push(TrackEvent {
            delta: 0,
            kind: EventKind::Meta(MetaEvent::EndOfTrack),
        });
    }
    track
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ev(delta: u32, kind: EventKind) -> TrackEvent {
        TrackEvent { delta, kind }
    }

    #[test]
    fn test_fifo_pairing_closes_oldest_first() {
        let track = vec![
            ev(0, EventKind::note_on(0, 60, 100)),
            ev(10, EventKind::note_on(0, 60, 80)),
            ev(10, EventKind::note_off(0, 60)),
            ev(10, EventKind::note_off(0, 60)),
        ];
        let notes = extract_note_pairs(&track);
        assert_eq!(notes.len(), 2);
        assert_eq!((notes[0].onset, notes[0].offset, notes[0].velocity), (0, 20, 100));
        assert_eq!((notes[1].onset, notes[1].offset, notes[1].velocity), (10, 30, 80));
    }

    #[test]
    fn test_hanging_note_closed_at_last_tick() {
        let track = vec![
            ev(0, EventKind::note_on(0, 60, 100)),
            ev(480, EventKind::Meta(MetaEvent::EndOfTrack)),
        ];
        let notes = extract_note_pairs(&track);
        assert_eq!(notes, vec![Note::new(60, 0, 100, 0, 480)]);
    }

    #[test]
    fn test_to_delta_clamps_out_of_order_ticks() {
        let events = vec![
            AbsEvent::new(100, EventKind::Meta(MetaEvent::Tempo(500_000))),
            AbsEvent::new(50, EventKind::Meta(MetaEvent::Tempo(400_000))),
            AbsEvent::new(120, EventKind::Meta(MetaEvent::EndOfTrack)),
        ];
        let track = to_delta(events);
        let deltas: Vec<u32> = track.iter().map(|e| e.delta).collect();
        assert_eq!(deltas, vec![100, 0, 20]);
    }

    #[test]
    fn test_rebuild_puts_note_off_before_note_on() {
        let notes = vec![Note::new(60, 0, 100, 0, 480), Note::new(62, 0, 100, 480, 960)];
        let track = rebuild_track(&notes, Vec::new(), None);
        let abs = to_absolute(&track);
        let at_480: Vec<&EventKind> = abs.iter().filter(|e| e.tick == 480).map(|e| &e.kind).collect();
        assert!(at_480[0].is_note_off());
        assert!(at_480[1].is_note_on());
        assert!(abs.last().unwrap().kind.is_end_of_track());
    }
}
