//! Decode and encode tests for the owned MIDI model

mod common;

use common::*;
use midi_cleaner::midi::{bar_ticks, EventKind, MetaEvent, MidiFile};

#[cfg(test)]
mod tests {
    use super::*;

    /// Single-track file whose only payload is `track_data`
    fn smf_bytes(division: [u8; 2], track_data: &[u8]) -> Vec<u8> {
        let mut bytes = b"MThd".to_vec();
        bytes.extend_from_slice(&[0, 0, 0, 6, 0, 0, 0, 1]);
        bytes.extend_from_slice(&division);
        bytes.extend_from_slice(b"MTrk");
        bytes.extend_from_slice(&(track_data.len() as u32).to_be_bytes());
        bytes.extend_from_slice(track_data);
        bytes
    }

    #[test]
    fn test_malformed_key_signature_becomes_c_major() {
        let bytes = smf_bytes([0x01, 0xE0], &[0x00, 0xFF, 0x59, 0x02, 0x14, 0x00, 0x00, 0xFF, 0x2F, 0x00]);

        let file = MidiFile::parse(&bytes).unwrap();

        assert_eq!(file.ticks_per_beat, 480);
        assert_eq!(
            file.tracks[0][0].kind,
            EventKind::Meta(MetaEvent::KeySignature(0, false))
        );
    }

    #[test]
    fn test_valid_key_signature_kept() {
        let bytes = smf_bytes([0x01, 0xE0], &[0x00, 0xFF, 0x59, 0x02, 0xFD, 0x01, 0x00, 0xFF, 0x2F, 0x00]);

        let file = MidiFile::parse(&bytes).unwrap();

        assert_eq!(
            file.tracks[0][0].kind,
            EventKind::Meta(MetaEvent::KeySignature(-3, true))
        );
    }

    #[test]
    fn test_smpte_timing_rejected() {
        let bytes = smf_bytes([0xE7, 0x28], &[0x00, 0xFF, 0x2F, 0x00]);
        let err = MidiFile::parse(&bytes).unwrap_err();
        assert_eq!(err.kind(), "unsupported_timing");
    }

    #[test]
    fn test_garbage_rejected() {
        let err = MidiFile::parse(b"not a midi file").unwrap_err();
        assert_eq!(err.kind(), "midi_decode");
    }

    #[test]
    fn test_time_signature_from_conductor_track() {
        let conductor = vec![
            ev(0, EventKind::Meta(MetaEvent::TimeSignature(3, 2, 24, 8))),
            end_of_track(0),
        ];
        let file = file_with(vec![conductor, vec![end_of_track(0)]]);

        assert_eq!(file.time_signature(), (3, 4));
        assert_eq!(bar_ticks(file.ticks_per_beat, file.time_signature()), 1440);
        assert_eq!(file_with(vec![vec![end_of_track(0)]]).time_signature(), (4, 4));
    }

    #[test]
    fn test_encode_decode_keeps_events() {
        let mut track = vec![track_name("Piano"), tempo(0, 600_000)];
        track.extend(track_from_notes(&[note(60, 0, 480), note(64, 240, 480)]));
        let file = file_with(vec![track]);

        let decoded = MidiFile::parse(&file.to_bytes().unwrap()).unwrap();

        assert_eq!(decoded, file);
        assert_eq!(decoded.note_count(), 2);
    }
}
