//! Pipeline orchestration
//!
//! Each note-bearing track runs through the passes in a fixed order:
//! pitch cluster, voice merge, CC filter, triplet removal, quantization,
//! noise filter, same-pitch overlap resolution and, when voices are merged,
//! a final chord alignment. Tracks without notes only get tempo
//! deduplication. Data tracks then lose their conductor meta events and the
//! file is optionally flattened.

use crate::analysis::track_info;
use crate::config::{validate_config, Config};
use crate::error::{CleanerError, Result};
use crate::events::{count_notes, ensure_end_of_track, to_absolute, to_delta, AbsEvent};
use crate::midi::{bar_ticks, EventKind, MetaEvent, MidiFile, Tick, Track};
use crate::passes::{pass_0, pass_1, pass_2, pass_3, pass_4, pass_5, pass_6, pass_7, pass_8, pass_9};
use crate::qa::score_midi;
use crate::telemetry::{self, PipelineContext, PipelineReport, RunMetrics};
use std::collections::BTreeMap;

/// Cleaned file plus the report of the run that produced it
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub file: MidiFile,
    pub report: PipelineReport,
}

fn run_metrics(file: &MidiFile) -> RunMetrics {
    let (score, quality) = score_midi(file);
    RunMetrics {
        total_notes: file.note_count(),
        tracks: file.tracks.len(),
        score,
        quality,
    }
}

/// Clean a whole file; the input is left untouched
pub fn run_pipeline(file: &MidiFile, config: &Config) -> Result<PipelineOutput> {
    if file.ticks_per_beat == 0 {
        return Err(CleanerError::InvalidInput(
            "ticks per beat must be greater than zero".to_string(),
        ));
    }
    validate_config(config)?;

    let mut ctx = PipelineContext::new(config.clone());
    let input_metrics = run_metrics(file);
    let track_names: Vec<String> = file
        .tracks
        .iter()
        .enumerate()
        .map(|(i, t)| track_info(t, i).name)
        .collect();

    let ppq = file.ticks_per_beat;
    let time_signature = file.time_signature();
    let bar = bar_ticks(ppq, time_signature);
    let split_tick = config.start_bar.saturating_sub(1) as Tick * bar;

    tracing::debug!(
        "Pipeline: {} tracks, ppq={}, time signature {}/{}, split at tick {}",
        file.tracks.len(),
        ppq,
        time_signature.0,
        time_signature.1,
        split_tick
    );

    let mut output = MidiFile::new(file.format, ppq);

    for (index, track) in file.tracks.iter().enumerate() {
        let track_config = config.for_track(index);

        let notes_in = count_notes(track);
        let tempo_in = pass_0::count_tempo_events(track);
        ctx.begin_step(
            telemetry::TEMPO_DEDUPLICATOR,
            track_config.tempo_deduplicator.enabled,
            Some(index),
            notes_in,
        );
        let deduped = pass_0::run(track.clone(), &track_config);
        let tempo_out = pass_0::count_tempo_events(&deduped);
        if let Some(step) = ctx.end_step(count_notes(&deduped)) {
            step.tempo_events_removed = tempo_in.saturating_sub(tempo_out);
        }

        if notes_in == 0 {
            output.tracks.push(deduped);
            continue;
        }

        let processed = if split_tick > 0 {
            let split = split_track_at_tick(&deduped, split_tick);
            let after = apply_passes(split.after, index, ppq, time_signature, &track_config, &mut ctx);
            merge_track_halves(split.before, after, split_tick, &split.duplicated)
        } else {
            apply_passes(deduped, index, ppq, time_signature, &track_config, &mut ctx)
        };

        // Track 0 is the conductor track and keeps tempo and meter
        let processed = if index == 0 { processed } else { pass_8::run(processed) };
        output.tracks.push(processed);
    }

    let notes_before_merge = output.note_count();
    ctx.begin_step(
        telemetry::MERGE_TRACKS,
        config.merge_tracks.enabled,
        None,
        notes_before_merge,
    );
    let tracks_before_merge = output.tracks.len();
    let output = pass_9::run(output, config);
    let merged = config.merge_tracks.enabled && tracks_before_merge > 1;
    if let Some(step) = ctx.end_step(output.note_count()) {
        step.tracks_merged = merged;
    }

    let output_metrics = run_metrics(&output);
    let report = ctx.finalize(track_names, input_metrics, output_metrics);

    tracing::debug!(
        "Pipeline finished: {} -> {} notes in {} ms",
        report.input_metrics.total_notes,
        report.output_metrics.total_notes,
        report.total_duration_ms
    );

    Ok(PipelineOutput { file: output, report })
}

fn timed_step<F>(
    ctx: &mut PipelineContext,
    name: &str,
    enabled: bool,
    index: usize,
    track: Track,
    stage: F,
) -> Track
where
    F: FnOnce(Track) -> Track,
{
    ctx.begin_step(name, enabled, Some(index), count_notes(&track));
    let result = stage(track);
    ctx.end_step(count_notes(&result));
    result
}

/// Run the per-track passes in their fixed order
pub fn apply_passes(
    track: Track,
    index: usize,
    ppq: u16,
    time_signature: (u32, u32),
    config: &Config,
    ctx: &mut PipelineContext,
) -> Track {
    let track = timed_step(ctx, telemetry::PITCH_CLUSTER, config.pitch_cluster.enabled, index, track, |t| {
        pass_1::run(t, config)
    });
    let track = timed_step(ctx, telemetry::VOICE_MERGER, config.merge_voices, index, track, |t| {
        pass_2::run(t, config)
    });
    let track = timed_step(ctx, telemetry::CC_FILTER, config.remove_cc, index, track, |t| {
        pass_3::run(t, config)
    });
    let track = timed_step(ctx, telemetry::TRIPLET_REMOVER, config.remove_triplets, index, track, |t| {
        pass_4::run(t, ppq, config)
    });
    let track = timed_step(ctx, telemetry::QUANTIZER, config.quantize, index, track, |t| {
        pass_5::run(t, ppq, time_signature, config)
    });
    let track = timed_step(ctx, telemetry::NOISE_FILTER, config.filter_noise, index, track, |t| {
        pass_6::run(t, config)
    });
    let track = timed_step(
        ctx,
        telemetry::SAME_PITCH_OVERLAP_RESOLVER,
        config.same_pitch_overlap_resolver.enabled,
        index,
        track,
        |t| pass_7::run(t, config),
    );

    if config.merge_voices {
        timed_step(ctx, telemetry::FINAL_CHORD_ALIGNMENT, true, index, track, pass_2::align_track_chords)
    } else {
        track
    }
}

/// A track cut at a tick; `after` is rebased so the cut sits at tick 0
#[derive(Debug, Clone, PartialEq)]
pub struct SplitTrack {
    pub before: Track,
    pub after: Track,
    /// Meta events copied into both halves
    pub duplicated: Vec<EventKind>,
}

/// Meta events that describe the whole track and go into both halves
fn is_track_descriptor(kind: &EventKind) -> bool {
    matches!(
        kind,
        EventKind::Meta(MetaEvent::TrackName(_))
            | EventKind::Meta(MetaEvent::InstrumentName(_))
            | EventKind::Meta(MetaEvent::KeySignature(..))
    )
}

/// Cut a track at `split_tick`
///
/// Events before the cut stay in `before`, as do the note-offs that close
/// notes opened before the cut. Track name, instrument name and key
/// signature found before the cut are also copied to the start of `after`.
pub fn split_track_at_tick(track: &Track, split_tick: Tick) -> SplitTrack {
    let mut before: Vec<AbsEvent> = Vec::new();
    let mut after: Vec<AbsEvent> = Vec::new();
    let mut duplicated = Vec::new();
    let mut open_before: BTreeMap<(u8, u8), usize> = BTreeMap::new();

    for event in to_absolute(track) {
        if event.tick < split_tick {
            if is_track_descriptor(&event.kind) {
                after.push(AbsEvent::new(0, event.kind.clone()));
                duplicated.push(event.kind.clone());
            }
            if let Some(key) = note_key(&event.kind) {
                let open = open_before.entry(key).or_default();
                if event.kind.is_note_on() {
                    *open += 1;
                } else {
                    *open = open.saturating_sub(1);
                }
            }
            before.push(event);
            continue;
        }

        if event.kind.is_note_off() {
            if let Some(open) = note_key(&event.kind).and_then(|k| open_before.get_mut(&k)) {
                if *open > 0 {
                    *open -= 1;
                    before.push(event);
                    continue;
                }
            }
        }

        after.push(AbsEvent::new(event.tick - split_tick, event.kind));
    }

    SplitTrack {
        before: to_delta(before),
        after: to_delta(after),
        duplicated,
    }
}

fn note_key(kind: &EventKind) -> Option<(u8, u8)> {
    match kind {
        EventKind::Midi { channel, message } => match *message {
            midly::MidiMessage::NoteOn { key, .. } | midly::MidiMessage::NoteOff { key, .. } => {
                Some((*channel, key.as_int()))
            }
            _ => None,
        },
        _ => None,
    }
}

/// Reattach an untouched `before` half to a processed `after` half
///
/// The copies of `duplicated` meta events at the start of `after` are
/// dropped once each. Both halves are interleaved by tick with `before`
/// winning ties, and a single `end_of_track` closes the result.
pub fn merge_track_halves(
    before: Track,
    after: Track,
    split_tick: Tick,
    duplicated: &[EventKind],
) -> Track {
    let mut pending: Vec<&EventKind> = duplicated.iter().collect();

    let before_events: Vec<AbsEvent> = to_absolute(&before)
        .into_iter()
        .filter(|e| !e.kind.is_end_of_track())
        .collect();

    let before_end = to_absolute(&before)
        .into_iter()
        .filter(|e| e.kind.is_end_of_track())
        .map(|e| e.tick);
    let after_end = to_absolute(&after)
        .into_iter()
        .filter(|e| e.kind.is_end_of_track())
        .map(|e| e.tick + split_tick);
    let end_tick = before_end.chain(after_end).max().unwrap_or(0);

    let after_events: Vec<AbsEvent> = to_absolute(&after)
        .into_iter()
        .filter(|e| {
            if e.tick == 0 {
                if let Some(pos) = pending.iter().position(|k| **k == e.kind) {
                    pending.remove(pos);
                    return false;
                }
            }
            true
        })
        .filter(|e| !e.kind.is_end_of_track())
        .map(|e| AbsEvent::new(e.tick + split_tick, e.kind))
        .collect();

    let mut merged = Vec::with_capacity(before_events.len() + after_events.len());
    let mut b = before_events.into_iter().peekable();
    let mut a = after_events.into_iter().peekable();
    loop {
        let take_before = match (b.peek(), a.peek()) {
            (Some(x), Some(y)) => x.tick <= y.tick,
            (Some(_), None) => true,
            (None, Some(_)) => false,
            (None, None) => break,
        };
        let next = if take_before { b.next() } else { a.next() };
        merged.extend(next);
    }

    let last = merged.last().map(|e| e.tick).unwrap_or(0);
    merged.push(AbsEvent::new(
        last.max(end_tick),
        EventKind::Meta(MetaEvent::EndOfTrack),
    ));

    ensure_end_of_track(to_delta(merged))
}
