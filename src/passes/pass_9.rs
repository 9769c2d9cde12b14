//! Pass 9: Track Flattening
//!
//! Every track is merged into one, written as a format 0 file.

use crate::config::{Config, MergeTracksConfig};
use crate::events::{sort_events, to_absolute, to_delta, AbsEvent};
use crate::midi::{EventKind, MetaEvent, MidiFile, TrackEvent};
use midly::{Format, MidiMessage};

pub fn run(file: MidiFile, config: &Config) -> MidiFile {
    if !config.merge_tracks.enabled {
        return file;
    }

    let flattened = flatten(&file, &config.merge_tracks);
    tracing::debug!(
        "Pass 9: Track Flattening merged {} tracks ({} notes)",
        file.tracks.len(),
        flattened.note_count()
    );
    flattened
}

/// Whether an event survives flattening
///
/// Controllers need `includeCc`, and must be whitelisted unless the
/// whitelist is empty. Everything else is kept.
pub fn should_include(kind: &EventKind, cfg: &MergeTracksConfig) -> bool {
    match kind {
        EventKind::Midi {
            message: MidiMessage::Controller { controller, .. },
            ..
        } => {
            cfg.include_cc
                && (cfg.cc_whitelist.is_empty() || cfg.cc_whitelist.contains(&controller.as_int()))
        }
        _ => true,
    }
}

/// Merge all tracks by (tick, same-tick priority)
///
/// Same-tick events of equal priority keep track order, then in-track order.
pub fn flatten(file: &MidiFile, cfg: &MergeTracksConfig) -> MidiFile {
    let mut events: Vec<AbsEvent> = file
        .tracks
        .iter()
        .flat_map(|track| to_absolute(track))
        .filter(|event| !event.kind.is_end_of_track() && should_include(&event.kind, cfg))
        .collect();

    sort_events(&mut events);

    let mut track = to_delta(events);
    track.push(TrackEvent {
        delta: 0,
        kind: EventKind::Meta(MetaEvent::EndOfTrack),
    });

    let mut merged = MidiFile::new(Format::SingleTrack, file.ticks_per_beat);
    merged.tracks.push(track);
    merged
}
