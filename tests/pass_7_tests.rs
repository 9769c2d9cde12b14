//! Validation tests for Pass 7: Same-Pitch Overlap Resolution

mod common;

use common::*;
use midi_cleaner::config::Config;
use midi_cleaner::events::Note;
use midi_cleaner::passes::pass_7::{self, pick_winner, resolve_overlaps};
use midi_cleaner::qa::count_same_pitch_overlaps;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_longer_note_wins() {
        let a = note(60, 0, 480);
        let b = note(60, 100, 960);
        assert_eq!(pick_winner(a, b), b);
    }

    #[test]
    fn test_louder_note_wins_on_equal_length() {
        let a = Note::new(60, 0, 80, 0, 480);
        let b = Note::new(60, 0, 110, 240, 720);
        assert_eq!(pick_winner(a, b), b);
    }

    #[test]
    fn test_earlier_note_wins_on_full_tie() {
        let a = note(60, 0, 480);
        let b = note(60, 240, 480);
        assert_eq!(pick_winner(a, b), a);
        assert_eq!(pick_winner(b, a), a);
    }

    #[test]
    fn test_sweep_compares_against_surviving_note() {
        let a = note(60, 0, 480);
        let b = note(60, 100, 200);
        let c = note(60, 400, 500);

        assert_eq!(resolve_overlaps(&[a, b, c]), vec![c]);
    }

    #[test]
    fn test_touching_notes_are_not_overlaps() {
        let notes = vec![note(60, 0, 480), note(60, 480, 480)];
        assert_eq!(resolve_overlaps(&notes), notes);
    }

    #[test]
    fn test_channels_resolved_independently() {
        let notes = vec![Note::new(60, 0, 100, 0, 480), Note::new(60, 1, 100, 100, 580)];
        assert_eq!(resolve_overlaps(&notes).len(), 2);
    }

    #[test]
    fn test_run_leaves_no_same_pitch_overlaps() {
        let track = track_from_notes(&[
            note(60, 0, 480),
            note(60, 240, 240),
            note(62, 0, 240),
            note(62, 120, 480),
        ]);

        let result = pass_7::run(track, &Config::default());

        let notes = notes_of(&result);
        assert_eq!(count_same_pitch_overlaps(&notes), 0);
        assert_eq!(notes, vec![note(60, 0, 480), note(62, 120, 480)]);
    }

    #[test]
    fn test_disabled_returns_input() {
        let track = track_from_notes(&[note(60, 0, 480), note(60, 240, 480)]);
        let mut config = Config::default();
        config.same_pitch_overlap_resolver.enabled = false;
        assert_eq!(pass_7::run(track.clone(), &config), track);
    }
}
