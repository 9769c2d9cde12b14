//! Track inspection and type detection tests

mod common;

use common::*;
use midi_cleaner::analysis::{
    analyze_file, detect_dominant_track_type, detect_track_type, suggest_thresholds, track_info,
    TrackType,
};
use midi_cleaner::midi::EventKind;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_from_name_keywords() {
        assert_eq!(detect_track_type("Lead Guitar", None), TrackType::Guitar);
        assert_eq!(detect_track_type("Choir", None), TrackType::Vocal);
        assert_eq!(detect_track_type("Violin I", None), TrackType::Strings);
        assert_eq!(detect_track_type("BASS", None), TrackType::Bass);
        assert_eq!(detect_track_type("Drum Kit", None), TrackType::Drums);
        assert_eq!(detect_track_type("Synth Pad", None), TrackType::Other);
    }

    #[test]
    fn test_guitar_program_fallback() {
        assert_eq!(detect_track_type("", Some(25)), TrackType::Guitar);
        assert_eq!(detect_track_type("Track 3", Some(30)), TrackType::Guitar);
        assert_eq!(detect_track_type("", Some(0)), TrackType::Other);
        assert_eq!(detect_track_type("", None), TrackType::Other);
    }

    #[test]
    fn test_track_info_summary() {
        let track = vec![
            track_name("Rhythm"),
            ev(0, EventKind::program_change(2, 29)),
            ev(0, EventKind::note_on(2, 40, 100)),
            ev(240, EventKind::note_off(2, 40)),
            ev(0, EventKind::note_on(2, 52, 100)),
            ev(240, EventKind::note_off(2, 52)),
            end_of_track(0),
        ];

        let info = track_info(&track, 3);

        assert_eq!(info.name, "Rhythm");
        assert_eq!(info.index, 3);
        assert_eq!(info.channel, 2);
        assert_eq!(info.program, Some(29));
        assert_eq!(info.track_type, TrackType::Guitar);
        assert_eq!(info.note_count, 2);
        assert_eq!(info.note_range, (40, 52));
        assert_eq!(info.channels_used, vec![2]);
        assert!(info.has_notes);
        assert_eq!(info.total_ticks, 480);
    }

    #[test]
    fn test_unnamed_track_gets_placeholder() {
        let info = track_info(&vec![end_of_track(0)], 0);
        assert_eq!(info.name, "Track 0");
        assert!(!info.has_notes);
        assert_eq!(info.note_range, (0, 0));
    }

    #[test]
    fn test_dominant_type_counts_notes() {
        let mut bass = vec![track_name("Bass")];
        bass.extend(track_from_notes(&[note(36, 0, 480), note(38, 480, 480), note(40, 960, 480)]));
        let mut guitar = vec![track_name("Guitar")];
        guitar.extend(track_from_notes(&[note(60, 0, 480), note(64, 480, 480)]));
        let file = file_with(vec![vec![end_of_track(0)], guitar, bass]);

        assert_eq!(analyze_file(&file).len(), 3);
        assert_eq!(detect_dominant_track_type(&file), TrackType::Bass);
    }

    #[test]
    fn test_dominant_type_tie_goes_to_first_seen() {
        let mut guitar = vec![track_name("Guitar")];
        guitar.extend(track_from_notes(&[note(60, 0, 480)]));
        let mut bass = vec![track_name("Bass")];
        bass.extend(track_from_notes(&[note(36, 0, 480)]));

        assert_eq!(detect_dominant_track_type(&file_with(vec![guitar, bass])), TrackType::Guitar);
    }

    #[test]
    fn test_silent_file_is_other() {
        let file = file_with(vec![vec![end_of_track(0)]]);
        assert_eq!(detect_dominant_track_type(&file), TrackType::Other);
    }

    #[test]
    fn test_threshold_suggestions() {
        let guitar = suggest_thresholds(TrackType::Guitar);
        assert_eq!((guitar.min_duration_ticks, guitar.min_velocity), (160, 25));
        let drums = suggest_thresholds(TrackType::Drums);
        assert_eq!((drums.min_duration_ticks, drums.min_velocity), (30, 10));
    }

    #[test]
    fn test_track_type_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&TrackType::Strings).unwrap(), "\"strings\"");
        assert_eq!(TrackType::Vocal.to_string(), "vocal");
    }
}
