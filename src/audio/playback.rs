// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Sequenced playback and timer-driven note-offs.
//!
//! Scale and progression playback step through their pitches on tokio
//! timers and resolve once the last step has finished. Single-shot
//! note-offs and paced preview steps are posted back to the event loop
//! through a channel rather than mutating state from the timer task.

use std::time::Duration;

use tokio::sync::mpsc::UnboundedSender;
use tokio::time::sleep;
use tracing::debug;

use super::{AudioError, AudioSink, ScaleDirection};
use crate::music::{ChordInstance, Pitch};

/// Percentage of each step a note sounds for
pub const NOTE_GATE_PERCENT: u32 = 90;

/// Beats each chord of a progression lasts
pub const BEATS_PER_CHORD: u32 = 2;

/// Length of one beat at `tempo_bpm`. Non-positive or non-finite tempos
/// fall back to 120 BPM.
pub fn beat_duration(tempo_bpm: f64) -> Duration {
    let tempo = if tempo_bpm.is_finite() && tempo_bpm > 0.0 {
        tempo_bpm
    } else {
        120.0
    };
    Duration::from_secs_f64(60.0 / tempo)
}

/// Playback order for a scale. `Both` goes up then down without
/// repeating the top note.
pub fn scale_order(pitches: &[Pitch], direction: ScaleDirection) -> Vec<Pitch> {
    match direction {
        ScaleDirection::Ascending => pitches.to_vec(),
        ScaleDirection::Descending => pitches.iter().rev().copied().collect(),
        ScaleDirection::Both => pitches
            .iter()
            .chain(pitches.iter().rev().skip(1))
            .copied()
            .collect(),
    }
}

/// Play a scale one note per beat; resolves after the final beat
pub async fn play_scale<S: AudioSink + ?Sized>(
    sink: &mut S,
    pitches: &[Pitch],
    tempo_bpm: f64,
    direction: ScaleDirection,
) -> Result<(), AudioError> {
    let step = beat_duration(tempo_bpm);
    let gate = step * NOTE_GATE_PERCENT / 100;
    for pitch in scale_order(pitches, direction) {
        debug!(note = %pitch, "scale step");
        sink.play_note(pitch, gate)?;
        sleep(step).await;
    }
    Ok(())
}

/// Play each chord for `BEATS_PER_CHORD` beats; resolves after the last
pub async fn play_progression<S: AudioSink + ?Sized>(
    sink: &mut S,
    chords: &[ChordInstance],
    tempo_bpm: f64,
) -> Result<(), AudioError> {
    let step = beat_duration(tempo_bpm) * BEATS_PER_CHORD;
    let gate = step * NOTE_GATE_PERCENT / 100;
    for chord in chords {
        debug!(chord = %chord.name(), "progression step");
        sink.play_chord(chord.notes(), gate)?;
        sleep(step).await;
    }
    Ok(())
}

/// Deliver `message` on `tx` after `delay`. A closed channel is ignored:
/// the event loop is gone and there is nothing left to clear.
pub fn spawn_release_timer<T: Send + 'static>(
    delay: Duration,
    message: T,
    tx: UnboundedSender<T>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        sleep(delay).await;
        let _ = tx.send(message);
    })
}

/// Deliver `steps` on `tx` one `interval` apart, the first immediately.
/// Stops early if the receiver is gone; abort the handle to cancel.
pub fn spawn_sequence<T: Send + 'static>(
    steps: Vec<T>,
    interval: Duration,
    tx: UnboundedSender<T>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        for (i, step) in steps.into_iter().enumerate() {
            if i > 0 {
                sleep(interval).await;
            }
            if tx.send(step).is_err() {
                return;
            }
        }
    })
}
