//! Pass 0: Tempo Deduplication

use crate::config::Config;
use crate::events::{to_absolute, to_delta};
use crate::midi::Track;

/// Remove `set_tempo` events that repeat the most recently kept tempo
///
/// Real tempo changes are kept at their original tick, no matter how close
/// they are to each other. Disabled returns the input track as is.
pub fn run(track: Track, config: &Config) -> Track {
    if !config.tempo_deduplicator.enabled {
        return track;
    }

    let before = count_tempo_events(&track);
    let deduped = dedupe_tempo(&track);
    let after = count_tempo_events(&deduped);

    if before != after {
        tracing::debug!(
            "Pass 0: Tempo Deduplication removed {} of {} set_tempo events",
            before - after,
            before
        );
    }

    deduped
}

/// Drop every `set_tempo` whose value equals the last kept one
pub fn dedupe_tempo(track: &Track) -> Track {
    let mut last_tempo: Option<u32> = None;

    let kept = to_absolute(track)
        .into_iter()
        .filter(|event| match event.kind.tempo() {
            Some(tempo) if Some(tempo) == last_tempo => false,
            Some(tempo) => {
                last_tempo = Some(tempo);
                true
            }
            None => true,
        })
        .collect();

    to_delta(kept)
}

/// Number of `set_tempo` meta events in a track
pub fn count_tempo_events(track: &Track) -> usize {
    track.iter().filter(|e| e.kind.tempo().is_some()).count()
}
