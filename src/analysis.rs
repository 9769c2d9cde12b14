//! Track inspection and instrument-type detection

use crate::midi::{EventKind, MetaEvent, MidiFile, Tick, Track};
use midly::MidiMessage;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Instrument family guessed for a track
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackType {
    Guitar,
    Vocal,
    Strings,
    Bass,
    Drums,
    Other,
}

impl TrackType {
    pub const ALL: [TrackType; 6] = [
        TrackType::Guitar,
        TrackType::Vocal,
        TrackType::Strings,
        TrackType::Bass,
        TrackType::Drums,
        TrackType::Other,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            TrackType::Guitar => "guitar",
            TrackType::Vocal => "vocal",
            TrackType::Strings => "strings",
            TrackType::Bass => "bass",
            TrackType::Drums => "drums",
            TrackType::Other => "other",
        }
    }

    /// Name keywords; checked family by family in `ALL` order
    fn keywords(&self) -> &'static [&'static str] {
        match self {
            TrackType::Guitar => &[
                "guitar",
                "gtr",
                "git",
                "guit",
                "distortion",
                "overdrive",
                "lead",
                "rhythm",
            ],
            TrackType::Vocal => &["vocal", "vox", "voice", "sing", "choir"],
            TrackType::Strings => &["string", "violin", "viola", "cello", "orchestra"],
            TrackType::Bass => &["bass", "bas"],
            TrackType::Drums => &["drum", "perc", "kit"],
            TrackType::Other => &[],
        }
    }
}

impl fmt::Display for TrackType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// General MIDI guitar family (nylon through harmonics)
const GUITAR_PROGRAMS: std::ops::RangeInclusive<u8> = 24..=31;

/// Classify by track name, falling back to the guitar program range
pub fn detect_track_type(track_name: &str, program: Option<u8>) -> TrackType {
    let name = track_name.to_lowercase();
    if !name.is_empty() {
        for track_type in TrackType::ALL {
            if track_type.keywords().iter().any(|k| name.contains(k)) {
                return track_type;
            }
        }
    }

    match program {
        Some(p) if GUITAR_PROGRAMS.contains(&p) => TrackType::Guitar,
        _ => TrackType::Other,
    }
}

/// Summary of one track
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackInfo {
    pub name: String,
    pub index: usize,
    pub channel: u8,
    pub program: Option<u8>,
    pub track_type: TrackType,
    pub note_count: usize,
    pub note_range: (u8, u8),
    pub channels_used: Vec<u8>,
    pub has_notes: bool,
    pub total_ticks: Tick,
}

/// Text of the last `track_name` meta event, if any
pub fn track_name(track: &Track) -> Option<String> {
    track
        .iter()
        .filter_map(|event| match &event.kind {
            EventKind::Meta(MetaEvent::TrackName(bytes)) => {
                Some(String::from_utf8_lossy(bytes).into_owned())
            }
            _ => None,
        })
        .last()
}

/// Inspect a track: name, dominant channel and its program, note statistics
pub fn track_info(track: &Track, index: usize) -> TrackInfo {
    let mut channels: BTreeMap<u8, usize> = BTreeMap::new();
    let mut programs: BTreeMap<u8, u8> = BTreeMap::new();
    let mut note_count = 0;
    let mut min_note = 127u8;
    let mut max_note = 0u8;
    let mut total_ticks: Tick = 0;

    for event in track {
        total_ticks += event.delta as Tick;
        if let EventKind::Midi { channel, message } = &event.kind {
            match *message {
                MidiMessage::ProgramChange { program } => {
                    programs.insert(*channel, program.as_int());
                }
                MidiMessage::NoteOn { key, vel } if vel.as_int() > 0 => {
                    note_count += 1;
                    *channels.entry(*channel).or_default() += 1;
                    min_note = min_note.min(key.as_int());
                    max_note = max_note.max(key.as_int());
                }
                _ => {}
            }
        }
    }

    let channel = crate::passes::pass_2::primary_channel(track);
    let program = programs.get(&channel).copied();
    let name = track_name(track).filter(|n| !n.is_empty());
    let track_type = detect_track_type(name.as_deref().unwrap_or(""), program);

    TrackInfo {
        name: name.unwrap_or_else(|| format!("Track {}", index)),
        index,
        channel,
        program,
        track_type,
        note_count,
        note_range: if note_count > 0 { (min_note, max_note) } else { (0, 0) },
        channels_used: channels.into_keys().collect(),
        has_notes: note_count > 0,
        total_ticks,
    }
}

/// Info for every track of a file
pub fn analyze_file(file: &MidiFile) -> Vec<TrackInfo> {
    file.tracks
        .iter()
        .enumerate()
        .map(|(index, track)| track_info(track, index))
        .collect()
}

/// Type with the most notes across note-bearing tracks; `Other` when
/// nothing sounds. Ties go to the type seen first.
pub fn detect_dominant_track_type(file: &MidiFile) -> TrackType {
    let mut totals: Vec<(TrackType, usize)> = Vec::new();
    for info in analyze_file(file).into_iter().filter(|i| i.has_notes) {
        match totals.iter_mut().find(|(t, _)| *t == info.track_type) {
            Some((_, count)) => *count += info.note_count,
            None => totals.push((info.track_type, info.note_count)),
        }
    }

    totals
        .into_iter()
        .fold(None, |best: Option<(TrackType, usize)>, (t, count)| match best {
            Some((_, best_count)) if best_count >= count => best,
            _ => Some((t, count)),
        })
        .map(|(t, _)| t)
        .unwrap_or(TrackType::Other)
}

/// Noise-filter thresholds that suit an instrument family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThresholdSuggestion {
    pub min_duration_ticks: u64,
    pub min_velocity: u8,
}

pub fn suggest_thresholds(track_type: TrackType) -> ThresholdSuggestion {
    let (min_duration_ticks, min_velocity) = match track_type {
        TrackType::Guitar => (160, 25),
        TrackType::Vocal => (80, 15),
        TrackType::Strings => (100, 15),
        TrackType::Bass => (120, 20),
        TrackType::Drums => (30, 10),
        TrackType::Other => (120, 20),
    };
    ThresholdSuggestion {
        min_duration_ticks,
        min_velocity,
    }
}
