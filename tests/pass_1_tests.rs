//! Validation tests for Pass 1: Pitch Cluster Collapse

mod common;

use common::*;
use midi_cleaner::config::Config;
use midi_cleaner::events::Note;
use midi_cleaner::passes::pass_1::{self, collapse_clusters, select_winner};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_near_identical_notes_collapse_to_one() {
        let notes = vec![note(60, 0, 100), note(61, 10, 100), note(60, 20, 100)];

        let result = collapse_clusters(&notes, 80, 1);

        assert_eq!(result, vec![note(60, 0, 100)]);
    }

    #[test]
    fn test_collapse_through_track() {
        let track = track_from_notes(&[note(60, 0, 100), note(61, 10, 100), note(60, 20, 100)]);
        let mut config = Config::default();
        config.pitch_cluster.time_window_ticks = 80;

        let result = pass_1::run(track, &config);

        assert_eq!(notes_of(&result).len(), 1);
    }

    #[test]
    fn test_three_semitones_apart_untouched() {
        let notes = vec![note(60, 0, 100), note(63, 10, 100)];
        assert_eq!(collapse_clusters(&notes, 80, 1), notes);
    }

    #[test]
    fn test_outside_time_window_untouched() {
        let notes = vec![note(60, 0, 100), note(61, 200, 100)];
        assert_eq!(collapse_clusters(&notes, 80, 1), notes);
    }

    #[test]
    fn test_never_merges_across_channels() {
        let notes = vec![
            Note::new(60, 0, 100, 0, 100),
            Note::new(61, 1, 100, 10, 110),
        ];
        assert_eq!(collapse_clusters(&notes, 80, 1).len(), 2);
    }

    #[test]
    fn test_cluster_is_relative_to_seed() {
        let notes = vec![note(60, 0, 100), note(61, 5, 100), note(62, 10, 100)];

        let result = collapse_clusters(&notes, 80, 1);

        assert_eq!(result, vec![note(60, 0, 100), note(62, 10, 100)]);
    }

    #[test]
    fn test_loudest_note_wins() {
        let quiet = Note::new(60, 0, 70, 0, 100);
        let loud = Note::new(61, 0, 110, 8, 108);
        assert_eq!(select_winner(&[quiet, loud]), loud);
    }

    #[test]
    fn test_longest_note_wins_on_equal_velocity() {
        let short = note(60, 0, 100);
        let long = note(61, 5, 300);
        assert_eq!(select_winner(&[short, long]), long);
    }

    #[test]
    fn test_median_pitch_breaks_ties() {
        let low = note(58, 0, 100);
        let mid = note(60, 2, 100);
        let high = note(62, 4, 100);
        assert_eq!(select_winner(&[low, mid, high]), mid);
    }

    #[test]
    fn test_disabled_returns_input() {
        let track = track_from_notes(&[note(60, 0, 100), note(61, 10, 100)]);
        let mut config = Config::default();
        config.pitch_cluster.enabled = false;

        assert_eq!(pass_1::run(track.clone(), &config), track);
    }
}
