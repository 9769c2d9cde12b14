//! Validation tests for Pass 6: Noise Filter

mod common;

use common::*;
use midi_cleaner::config::Config;
use midi_cleaner::events::Note;
use midi_cleaner::passes::pass_6::{self, filter_noise};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_and_quiet_notes_removed() {
        let notes = vec![
            note(60, 0, 480),
            note(62, 480, 60),
            Note::new(64, 0, 10, 960, 1440),
        ];

        let kept = filter_noise(&notes, 120, 20);

        assert_eq!(kept, vec![note(60, 0, 480)]);
    }

    #[test]
    fn test_thresholds_are_inclusive() {
        let notes = vec![Note::new(60, 0, 20, 0, 120)];
        assert_eq!(filter_noise(&notes, 120, 20), notes);
    }

    #[test]
    fn test_run_keeps_non_note_events() {
        let mut track = vec![track_name("Lead")];
        track.extend(track_from_notes(&[note(60, 0, 480), note(62, 480, 30)]));

        let result = pass_6::run(track, &Config::default());

        assert_eq!(notes_of(&result), vec![note(60, 0, 480)]);
        assert_eq!(ticks_where(&result, |k| k.is_meta() && !k.is_end_of_track()), vec![0]);
        assert!(result.last().map(|e| e.kind.is_end_of_track()).unwrap_or(false));
    }

    #[test]
    fn test_disabled_returns_input() {
        let track = track_from_notes(&[note(60, 0, 10)]);
        let mut config = Config::default();
        config.filter_noise = false;
        assert_eq!(pass_6::run(track.clone(), &config), track);
    }
}
