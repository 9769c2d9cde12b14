//! Validation tests for Pass 9: Track Flattening

mod common;

use common::*;
use midi_cleaner::config::{Config, MergeTracksConfig};
use midi_cleaner::events::to_absolute;
use midi_cleaner::midi::EventKind;
use midi_cleaner::passes::pass_9::{self, flatten, should_include};
use midly::Format;

#[cfg(test)]
mod tests {
    use super::*;

    fn two_track_file() -> midi_cleaner::midi::MidiFile {
        let conductor = vec![tempo(0, 500_000), end_of_track(0)];
        let melody = vec![
            track_name("Melody"),
            ev(0, EventKind::controller(0, 64, 127)),
            ev(0, EventKind::controller(0, 7, 100)),
            ev(0, EventKind::note_on(0, 60, 100)),
            ev(480, EventKind::note_off(0, 60)),
            end_of_track(0),
        ];
        let bass = vec![
            ev(240, EventKind::note_on(1, 36, 90)),
            ev(480, EventKind::note_off(1, 36)),
            end_of_track(0),
        ];
        file_with(vec![conductor, melody, bass])
    }

    #[test]
    fn test_flatten_produces_single_track() {
        let mut config = Config::default();
        config.merge_tracks.enabled = true;

        let merged = pass_9::run(two_track_file(), &config);

        assert_eq!(merged.format, Format::SingleTrack);
        assert_eq!(merged.tracks.len(), 1);
        assert_eq!(merged.note_count(), 2);
        let track = &merged.tracks[0];
        assert_eq!(tempo_values(track), vec![500_000]);
        assert_eq!(track.iter().filter(|e| e.kind.is_end_of_track()).count(), 1);
        assert!(track.last().map(|e| e.kind.is_end_of_track()).unwrap_or(false));
        assert_eq!(ticks_where(track, |k| k.is_note_on()), vec![0, 240]);
    }

    #[test]
    fn test_note_off_precedes_note_on_across_tracks() {
        let lead = vec![
            ev(480, EventKind::note_on(1, 41, 90)),
            ev(240, EventKind::note_off(1, 41)),
            end_of_track(0),
        ];
        let pad = vec![
            ev(0, EventKind::note_on(0, 60, 100)),
            ev(480, EventKind::note_off(0, 60)),
            end_of_track(0),
        ];
        let mut config = Config::default();
        config.merge_tracks.enabled = true;

        let merged = pass_9::run(file_with(vec![lead, pad]), &config);

        let at_480: Vec<(bool, bool)> = to_absolute(&merged.tracks[0])
            .into_iter()
            .filter(|e| e.tick == 480 && e.kind.is_note())
            .map(|e| (e.kind.is_note_off(), e.kind.is_note_on()))
            .collect();
        assert_eq!(at_480, vec![(true, false), (false, true)]);
        assert_eq!(merged.note_count(), 2);
    }

    #[test]
    fn test_controllers_dropped_by_default() {
        let merged = flatten(&two_track_file(), &MergeTracksConfig::default());
        assert!(merged.tracks[0].iter().all(|e| e.kind.controller_number().is_none()));
    }

    #[test]
    fn test_whitelist_filters_controllers() {
        let cfg = MergeTracksConfig {
            enabled: true,
            include_cc: true,
            cc_whitelist: vec![64],
        };
        let merged = flatten(&two_track_file(), &cfg);
        let controllers: Vec<u8> = merged.tracks[0].iter().filter_map(|e| e.kind.controller_number()).collect();
        assert_eq!(controllers, vec![64]);
    }

    #[test]
    fn test_empty_whitelist_keeps_every_controller() {
        let cfg = MergeTracksConfig {
            enabled: true,
            include_cc: true,
            cc_whitelist: Vec::new(),
        };
        assert!(should_include(&EventKind::controller(0, 11, 1), &cfg));
        assert!(should_include(&EventKind::note_on(0, 60, 1), &cfg));
    }

    #[test]
    fn test_disabled_returns_input() {
        let file = two_track_file();
        assert_eq!(pass_9::run(file.clone(), &Config::default()), file);
    }
}
