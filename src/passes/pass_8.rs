//! Pass 8: Conductor Meta Cleanup
//!
//! `set_tempo` and `time_signature` belong to the conductor track only.

use crate::events::{ensure_end_of_track, to_absolute, to_delta};
use crate::midi::{EventKind, MetaEvent, Track};

pub fn is_conductor_meta(kind: &EventKind) -> bool {
    matches!(
        kind,
        EventKind::Meta(MetaEvent::Tempo(_)) | EventKind::Meta(MetaEvent::TimeSignature(..))
    )
}

/// Strip conductor-only meta events from a data track
pub fn run(track: Track) -> Track {
    let events = to_absolute(&track);
    let before = events.len();
    let kept: Vec<_> = events
        .into_iter()
        .filter(|event| !is_conductor_meta(&event.kind))
        .collect();

    if kept.len() != before {
        tracing::debug!(
            "Pass 8: Conductor Meta Cleanup stripped {} events",
            before - kept.len()
        );
    }

    ensure_end_of_track(to_delta(kept))
}
