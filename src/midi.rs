//! Owned Standard MIDI File model and `midly` decode/encode

use crate::error::{CleanerError, Result};
use midly::num::{u15, u24, u28, u4, u7};
use midly::{Format, Header, MetaMessage, MidiMessage, Smf, SmpteTime, Timing, TrackEventKind};
use std::path::Path;

/// Absolute tick position
pub type Tick = u64;

/// Ordered, delta-time encoded event list
pub type Track = Vec<TrackEvent>;

/// Largest delta representable in a variable-length quantity
const MAX_DELTA: u32 = 0x0FFF_FFFF;

/// Decoded MIDI file that owns all of its event payloads
#[derive(Debug, Clone, PartialEq)]
pub struct MidiFile {
    pub format: Format,
    pub ticks_per_beat: u16,
    pub tracks: Vec<Track>,
}

/// One event with its delta time in ticks
#[derive(Debug, Clone, PartialEq)]
pub struct TrackEvent {
    pub delta: u32,
    pub kind: EventKind,
}

/// Event payload
#[derive(Debug, Clone, PartialEq)]
pub enum EventKind {
    Midi { channel: u8, message: MidiMessage },
    Meta(MetaEvent),
    SysEx(Vec<u8>),
    Escape(Vec<u8>),
}

/// Meta event payload, owned
#[derive(Debug, Clone, PartialEq)]
pub enum MetaEvent {
    TrackNumber(Option<u16>),
    Text(Vec<u8>),
    Copyright(Vec<u8>),
    TrackName(Vec<u8>),
    InstrumentName(Vec<u8>),
    Lyric(Vec<u8>),
    Marker(Vec<u8>),
    CuePoint(Vec<u8>),
    ProgramName(Vec<u8>),
    DeviceName(Vec<u8>),
    MidiChannel(u8),
    MidiPort(u8),
    EndOfTrack,
    /// Microseconds per quarter note
    Tempo(u32),
    SmpteOffset(SmpteTime),
    /// Numerator, denominator as a power of two, clocks per click, 32nds per quarter
    TimeSignature(u8, u8, u8, u8),
    /// Sharps (negative for flats), minor
    KeySignature(i8, bool),
    SequencerSpecific(Vec<u8>),
    Unknown(u8, Vec<u8>),
}

impl EventKind {
    pub fn note_on(channel: u8, key: u8, vel: u8) -> Self {
        EventKind::Midi {
            channel,
            message: MidiMessage::NoteOn {
                key: u7::from(key),
                vel: u7::from(vel),
            },
        }
    }

    pub fn note_off(channel: u8, key: u8) -> Self {
        EventKind::Midi {
            channel,
            message: MidiMessage::NoteOff {
                key: u7::from(key),
                vel: u7::from(0),
            },
        }
    }

    pub fn controller(channel: u8, controller: u8, value: u8) -> Self {
        EventKind::Midi {
            channel,
            message: MidiMessage::Controller {
                controller: u7::from(controller),
                value: u7::from(value),
            },
        }
    }

    pub fn program_change(channel: u8, program: u8) -> Self {
        EventKind::Midi {
            channel,
            message: MidiMessage::ProgramChange {
                program: u7::from(program),
            },
        }
    }

    pub fn is_meta(&self) -> bool {
        matches!(self, EventKind::Meta(_))
    }

    /// Note-on with a non-zero velocity
    pub fn is_note_on(&self) -> bool {
        matches!(
            self,
            EventKind::Midi {
                message: MidiMessage::NoteOn { vel, .. },
                ..
            } if vel.as_int() > 0
        )
    }

    /// Note-off, or the running-status idiom of a zero-velocity note-on
    pub fn is_note_off(&self) -> bool {
        match self {
            EventKind::Midi { message, .. } => match message {
                MidiMessage::NoteOff { .. } => true,
                MidiMessage::NoteOn { vel, .. } => vel.as_int() == 0,
                _ => false,
            },
            _ => false,
        }
    }

    pub fn is_note(&self) -> bool {
        matches!(
            self,
            EventKind::Midi {
                message: MidiMessage::NoteOn { .. } | MidiMessage::NoteOff { .. },
                ..
            }
        )
    }

    pub fn is_end_of_track(&self) -> bool {
        matches!(self, EventKind::Meta(MetaEvent::EndOfTrack))
    }

    /// Channel of a channel-voice message
    pub fn channel(&self) -> Option<u8> {
        match self {
            EventKind::Midi { channel, .. } => Some(*channel),
            _ => None,
        }
    }

    /// Same event moved to another channel; non-channel events are unchanged
    pub fn with_channel(&self, new_channel: u8) -> Self {
        match self {
            EventKind::Midi { message, .. } => EventKind::Midi {
                channel: new_channel,
                message: *message,
            },
            other => other.clone(),
        }
    }

    /// Controller number of a control-change message
    pub fn controller_number(&self) -> Option<u8> {
        match self {
            EventKind::Midi {
                message: MidiMessage::Controller { controller, .. },
                ..
            } => Some(controller.as_int()),
            _ => None,
        }
    }

    /// Tempo of a `set_tempo` meta event
    pub fn tempo(&self) -> Option<u32> {
        match self {
            EventKind::Meta(MetaEvent::Tempo(t)) => Some(*t),
            _ => None,
        }
    }

    /// Ordering rank among events sharing one tick: meta, note-off,
    /// other channel events, note-on
    pub fn same_tick_priority(&self) -> u8 {
        if self.is_meta() {
            0
        } else if self.is_note_off() {
            1
        } else if self.is_note_on() {
            3
        } else {
            2
        }
    }

    fn from_midly(kind: &TrackEventKind<'_>) -> Self {
        match kind {
            TrackEventKind::Midi { channel, message } => EventKind::Midi {
                channel: channel.as_int(),
                message: *message,
            },
            TrackEventKind::SysEx(data) => EventKind::SysEx(data.to_vec()),
            TrackEventKind::Escape(data) => EventKind::Escape(data.to_vec()),
            TrackEventKind::Meta(meta) => EventKind::Meta(MetaEvent::from_midly(meta)),
        }
    }

    fn to_midly(&self) -> TrackEventKind<'_> {
        match self {
            EventKind::Midi { channel, message } => TrackEventKind::Midi {
                channel: u4::from(*channel),
                message: *message,
            },
            EventKind::SysEx(data) => TrackEventKind::SysEx(data),
            EventKind::Escape(data) => TrackEventKind::Escape(data),
            EventKind::Meta(meta) => TrackEventKind::Meta(meta.to_midly()),
        }
    }
}

impl MetaEvent {
    fn from_midly(meta: &MetaMessage<'_>) -> Self {
        match *meta {
            MetaMessage::TrackNumber(n) => MetaEvent::TrackNumber(n),
            MetaMessage::Text(d) => MetaEvent::Text(d.to_vec()),
            MetaMessage::Copyright(d) => MetaEvent::Copyright(d.to_vec()),
            MetaMessage::TrackName(d) => MetaEvent::TrackName(d.to_vec()),
            MetaMessage::InstrumentName(d) => MetaEvent::InstrumentName(d.to_vec()),
            MetaMessage::Lyric(d) => MetaEvent::Lyric(d.to_vec()),
            MetaMessage::Marker(d) => MetaEvent::Marker(d.to_vec()),
            MetaMessage::CuePoint(d) => MetaEvent::CuePoint(d.to_vec()),
            MetaMessage::ProgramName(d) => MetaEvent::ProgramName(d.to_vec()),
            MetaMessage::DeviceName(d) => MetaEvent::DeviceName(d.to_vec()),
            MetaMessage::MidiChannel(c) => MetaEvent::MidiChannel(c.as_int()),
            MetaMessage::MidiPort(p) => MetaEvent::MidiPort(p.as_int()),
            MetaMessage::EndOfTrack => MetaEvent::EndOfTrack,
            MetaMessage::Tempo(t) => MetaEvent::Tempo(t.as_int()),
            MetaMessage::SmpteOffset(s) => MetaEvent::SmpteOffset(s),
            MetaMessage::TimeSignature(n, d, c, b) => MetaEvent::TimeSignature(n, d, c, b),
            MetaMessage::KeySignature(sharps, minor) => sanitize_key_signature(sharps, minor),
            MetaMessage::SequencerSpecific(d) => MetaEvent::SequencerSpecific(d.to_vec()),
            MetaMessage::Unknown(t, d) => MetaEvent::Unknown(t, d.to_vec()),
        }
    }

    fn to_midly(&self) -> MetaMessage<'_> {
        match self {
            MetaEvent::TrackNumber(n) => MetaMessage::TrackNumber(*n),
            MetaEvent::Text(d) => MetaMessage::Text(d),
            MetaEvent::Copyright(d) => MetaMessage::Copyright(d),
            MetaEvent::TrackName(d) => MetaMessage::TrackName(d),
            MetaEvent::InstrumentName(d) => MetaMessage::InstrumentName(d),
            MetaEvent::Lyric(d) => MetaMessage::Lyric(d),
            MetaEvent::Marker(d) => MetaMessage::Marker(d),
            MetaEvent::CuePoint(d) => MetaMessage::CuePoint(d),
            MetaEvent::ProgramName(d) => MetaMessage::ProgramName(d),
            MetaEvent::DeviceName(d) => MetaMessage::DeviceName(d),
            MetaEvent::MidiChannel(c) => MetaMessage::MidiChannel(u4::from(*c)),
            MetaEvent::MidiPort(p) => MetaMessage::MidiPort(u7::from(*p)),
            MetaEvent::EndOfTrack => MetaMessage::EndOfTrack,
            MetaEvent::Tempo(t) => MetaMessage::Tempo(u24::from(*t)),
            MetaEvent::SmpteOffset(s) => MetaMessage::SmpteOffset(*s),
            MetaEvent::TimeSignature(n, d, c, b) => MetaMessage::TimeSignature(*n, *d, *c, *b),
            MetaEvent::KeySignature(sharps, minor) => MetaMessage::KeySignature(*sharps, *minor),
            MetaEvent::SequencerSpecific(d) => MetaMessage::SequencerSpecific(d),
            MetaEvent::Unknown(t, d) => MetaMessage::Unknown(*t, d),
        }
    }
}

/// Generative tools emit key signatures outside -7..=7; fall back to C major
fn sanitize_key_signature(sharps: i8, minor: bool) -> MetaEvent {
    if (-7..=7).contains(&sharps) {
        MetaEvent::KeySignature(sharps, minor)
    } else {
        tracing::warn!(
            "Replacing malformed key signature ({} sharps) with C major",
            sharps
        );
        MetaEvent::KeySignature(0, false)
    }
}

impl MidiFile {
    /// Create an empty file
    pub fn new(format: Format, ticks_per_beat: u16) -> Self {
        Self {
            format,
            ticks_per_beat,
            tracks: Vec::new(),
        }
    }

    /// Decode a Standard MIDI File from bytes
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        let smf = Smf::parse(bytes)?;

        let ticks_per_beat = match smf.header.timing {
            Timing::Metrical(tpb) => tpb.as_int(),
            Timing::Timecode(fps, subframes) => {
                return Err(CleanerError::UnsupportedTiming(format!(
                    "SMPTE timecode ({:?}, {} subframes) has no ticks-per-beat grid",
                    fps, subframes
                )))
            }
        };

        let tracks = smf
            .tracks
            .iter()
            .map(|track| {
                track
                    .iter()
                    .map(|event| TrackEvent {
                        delta: event.delta.as_int(),
                        kind: EventKind::from_midly(&event.kind),
                    })
                    .collect()
            })
            .collect();

        Ok(Self {
            format: smf.header.format,
            ticks_per_beat,
            tracks,
        })
    }

    /// Read and decode a MIDI file from disk
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let bytes = std::fs::read(path)?;
        Self::parse(&bytes)
    }

    /// Encode to Standard MIDI File bytes
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let header = Header {
            format: self.format,
            timing: Timing::Metrical(u15::from(self.ticks_per_beat)),
        };

        let tracks = self
            .tracks
            .iter()
            .map(|track| {
                track
                    .iter()
                    .map(|event| midly::TrackEvent {
                        delta: u28::from(event.delta.min(MAX_DELTA)),
                        kind: event.kind.to_midly(),
                    })
                    .collect::<Vec<_>>()
            })
            .collect::<Vec<_>>();

        let smf = Smf { header, tracks };

        let mut bytes = Vec::new();
        smf.write_std(&mut bytes)
            .map_err(|e| CleanerError::MidiEncode(format!("Failed to write MIDI data: {}", e)))?;
        Ok(bytes)
    }

    /// Encode and write to disk
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let bytes = self.to_bytes()?;
        std::fs::write(path, bytes)?;
        Ok(())
    }

    /// Number of sounding note-on events across all tracks
    pub fn note_count(&self) -> usize {
        self.tracks.iter().map(|t| crate::events::count_notes(t)).sum()
    }

    /// Time signature from the conductor track as (numerator, denominator),
    /// 4/4 when absent
    pub fn time_signature(&self) -> (u32, u32) {
        self.tracks
            .first()
            .and_then(|track| {
                track.iter().find_map(|event| match event.kind {
                    EventKind::Meta(MetaEvent::TimeSignature(num, dd, _, _)) => {
                        Some((num as u32, 1u32 << dd.min(31)))
                    }
                    _ => None,
                })
            })
            .unwrap_or((4, 4))
    }
}

/// Ticks in one bar for the given resolution and time signature
pub fn bar_ticks(ticks_per_beat: u16, time_sig: (u32, u32)) -> Tick {
    let (numerator, denominator) = time_sig;
    let denominator = denominator.max(1) as u64;
    ticks_per_beat as u64 * numerator as u64 * 4 / denominator
}
