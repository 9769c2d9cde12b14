//! Validation tests for Pass 0: Tempo Deduplication

mod common;

use common::*;
use midi_cleaner::config::Config;
use midi_cleaner::passes::pass_0;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_triple_repeat_collapses_to_one() {
        let track = vec![
            tempo(0, 500_000),
            tempo(0, 500_000),
            tempo(0, 500_000),
            ev(100, midi_cleaner::midi::EventKind::note_on(0, 60, 100)),
            ev(480, midi_cleaner::midi::EventKind::note_off(0, 60)),
            end_of_track(0),
        ];

        let result = pass_0::run(track, &Config::default());

        assert_eq!(tempo_values(&result), vec![500_000]);
        assert_eq!(ticks_where(&result, |k| k.is_note_on()), vec![100]);
        assert_eq!(ticks_where(&result, |k| k.is_note_off()), vec![580]);
    }

    #[test]
    fn test_alternating_tempi_are_all_kept() {
        let track = vec![
            tempo(0, 500_000),
            tempo(960, 400_000),
            tempo(960, 500_000),
            end_of_track(0),
        ];

        let result = pass_0::run(track, &Config::default());

        assert_eq!(tempo_values(&result), vec![500_000, 400_000, 500_000]);
    }

    #[test]
    fn test_repeat_far_apart_is_dropped_but_time_kept() {
        let track = vec![
            tempo(0, 500_000),
            tempo(1920, 500_000),
            tempo(1920, 600_000),
            tempo(10, 600_000),
            end_of_track(5),
        ];

        let result = pass_0::run(track, &Config::default());

        assert_eq!(tempo_values(&result), vec![500_000, 600_000]);
        assert_eq!(ticks_where(&result, |k| k.tempo().is_some()), vec![0, 3840]);
        assert_eq!(ticks_where(&result, |k| k.is_end_of_track()), vec![3855]);
    }

    #[test]
    fn test_disabled_returns_input() {
        let track = vec![tempo(0, 500_000), tempo(0, 500_000), end_of_track(0)];
        let mut config = Config::default();
        config.tempo_deduplicator.enabled = false;

        let result = pass_0::run(track.clone(), &config);

        assert_eq!(result, track);
    }

    #[test]
    fn test_track_without_tempo_unchanged() {
        let track = track_from_notes(&[note(60, 0, 480)]);
        let result = pass_0::run(track.clone(), &Config::default());
        assert_eq!(result, track);
    }
}
