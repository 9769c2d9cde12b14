//! Pass 3: Control-Change Filter

use crate::config::Config;
use crate::events::{to_absolute, to_delta};
use crate::midi::Track;
use std::collections::BTreeSet;

/// Drop controller events whose number is in `ccNumbers`
pub fn run(track: Track, config: &Config) -> Track {
    if !config.remove_cc || config.cc_numbers.is_empty() {
        return track;
    }

    let remove: BTreeSet<u8> = config.cc_numbers.iter().copied().collect();
    let before = track.len();
    let filtered = filter_controllers(&track, &remove);

    if filtered.len() != before {
        tracing::debug!(
            "Pass 3: CC Filter removed {} controller events {:?}",
            before - filtered.len(),
            remove
        );
    }

    filtered
}

/// Remove matching controllers; surrounding events keep their absolute ticks
pub fn filter_controllers(track: &Track, remove: &BTreeSet<u8>) -> Track {
    let kept = to_absolute(track)
        .into_iter()
        .filter(|event| match event.kind.controller_number() {
            Some(number) => !remove.contains(&number),
            None => true,
        })
        .collect();

    to_delta(kept)
}
