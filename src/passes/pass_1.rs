//! Pass 1: Pitch Cluster Collapse
//!
//! AI transcription often renders one musical event as a tight bundle of
//! neighbouring pitches fired within a few ticks. Each such bundle is
//! collapsed to a single representative note. Channels are never mixed.

use crate::config::Config;
use crate::events::{extract_non_note_events, extract_note_pairs, rebuild_track, sort_notes, Note};
use crate::midi::{Tick, Track};
use std::cmp::Reverse;
use std::collections::BTreeMap;

/// Collapse near-simultaneous, near-pitch notes on each channel
pub fn run(track: Track, config: &Config) -> Track {
    let cfg = &config.pitch_cluster;
    if !cfg.enabled {
        return track;
    }

    let notes = extract_note_pairs(&track);
    if notes.is_empty() {
        return track;
    }
    let non_notes = extract_non_note_events(&track);

    let collapsed = collapse_clusters(&notes, cfg.time_window_ticks, cfg.pitch_threshold);

    tracing::debug!(
        "Pass 1: Pitch Cluster Collapse kept {} of {} notes (window={} ticks, threshold={} st)",
        collapsed.len(),
        notes.len(),
        cfg.time_window_ticks,
        cfg.pitch_threshold
    );

    rebuild_track(&collapsed, non_notes, None)
}

/// Cluster and collapse notes, channel by channel
pub fn collapse_clusters(notes: &[Note], window: Tick, pitch_threshold: u8) -> Vec<Note> {
    let mut by_channel: BTreeMap<u8, Vec<Note>> = BTreeMap::new();
    for note in notes {
        by_channel.entry(note.channel).or_default().push(*note);
    }

    let mut result: Vec<Note> = by_channel
        .into_values()
        .flat_map(|channel_notes| cluster_channel(channel_notes, window, pitch_threshold))
        .collect();

    sort_notes(&mut result);
    result
}

/// Seed-relative clustering over one channel
///
/// For every unvisited seed the onset window `[onset - window, onset + window]`
/// is located with two binary searches; unvisited notes in that window whose
/// pitch lies within `pitch_threshold` of the seed form its cluster.
fn cluster_channel(mut notes: Vec<Note>, window: Tick, pitch_threshold: u8) -> Vec<Note> {
    sort_notes(&mut notes);
    let onsets: Vec<Tick> = notes.iter().map(|n| n.onset).collect();
    let mut visited = vec![false; notes.len()];
    let mut result = Vec::new();

    for i in 0..notes.len() {
        if visited[i] {
            continue;
        }
        let seed = notes[i];

        let window_start = seed.onset.saturating_sub(window);
        let window_end = seed.onset.saturating_add(window);
        let lo = onsets.partition_point(|&t| t < window_start);
        let hi = onsets.partition_point(|&t| t <= window_end);

        let members: Vec<usize> = (lo..hi)
            .filter(|&j| !visited[j] && seed.pitch.abs_diff(notes[j].pitch) <= pitch_threshold)
            .collect();

        for &j in &members {
            visited[j] = true;
        }

        if members.len() <= 1 {
            result.push(seed);
        } else {
            let cluster: Vec<Note> = members.iter().map(|&j| notes[j]).collect();
            result.push(select_winner(&cluster));
        }
    }

    result
}

/// Highest velocity, then longest duration, then closest to the cluster's
/// median pitch; remaining ties go to the earliest onset, then lowest pitch
///
/// Panics on an empty cluster.
pub fn select_winner(cluster: &[Note]) -> Note {
    let mut pitches: Vec<u8> = cluster.iter().map(|n| n.pitch).collect();
    pitches.sort_unstable();
    let median = pitches[(pitches.len() - 1) / 2];

    *cluster
        .iter()
        .min_by_key(|n| {
            (
                Reverse(n.velocity),
                Reverse(n.duration()),
                n.pitch.abs_diff(median),
                n.onset,
                n.pitch,
            )
        })
        .unwrap_or(&cluster[0])
}
