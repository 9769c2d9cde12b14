//! Validation tests for Pass 8: Conductor Meta Cleanup

mod common;

use common::*;
use midi_cleaner::midi::{EventKind, MetaEvent};
use midi_cleaner::passes::pass_8::{self, is_conductor_meta};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tempo_and_time_signature_stripped() {
        let track = vec![
            track_name("Bass"),
            tempo(0, 500_000),
            ev(0, EventKind::Meta(MetaEvent::TimeSignature(3, 2, 24, 8))),
            ev(0, EventKind::note_on(0, 40, 100)),
            tempo(240, 400_000),
            ev(240, EventKind::note_off(0, 40)),
            end_of_track(0),
        ];

        let result = pass_8::run(track);

        assert!(result.iter().all(|e| !is_conductor_meta(&e.kind)));
        assert_eq!(ticks_where(&result, |k| k.is_note_off()), vec![480]);
        assert_eq!(result.len(), 4);
    }

    #[test]
    fn test_end_of_track_added_when_missing() {
        let result = pass_8::run(vec![tempo(0, 500_000)]);
        assert_eq!(result, vec![end_of_track(0)]);
    }

    #[test]
    fn test_key_signature_is_not_conductor_meta() {
        assert!(!is_conductor_meta(&EventKind::Meta(MetaEvent::KeySignature(2, false))));
        assert!(is_conductor_meta(&EventKind::Meta(MetaEvent::Tempo(500_000))));
    }
}
