// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Audio sink contract and lifecycle.
//!
//! This module provides:
//! - The `AudioSink` trait the synthesis backend implements
//! - `AudioHandle`, an explicit Uninitialized -> Ready -> Disposed lifecycle
//! - `SinkCommand`, the note-accounting vocabulary the performance core emits
//! - An in-memory sink and async sequenced playback

pub mod memory;
pub mod playback;

pub use memory::{MemorySink, SinkCall};
pub use playback::{
    beat_duration, play_progression, play_scale, scale_order, spawn_release_timer, spawn_sequence, NOTE_GATE_PERCENT,
};

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{error, info};

use crate::music::Pitch;

/// Audio error types
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AudioError {
    /// Backend could not start; blocks all sound
    #[error("audio initialization failed: {0}")]
    InitFailed(String),
    /// Sound requested before initialization completed
    #[error("audio engine is not initialized")]
    NotReady,
    /// Sound requested after the engine was shut down
    #[error("audio engine has been disposed")]
    Disposed,
    /// Backend refused to start or stop a voice
    #[error("voice error: {0}")]
    VoiceFailed(String),
}

/// Amplitude envelope used for sustained voices
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Envelope {
    /// Piano-like decay and short release
    #[default]
    Natural,
    /// Long decay and release with a non-zero sustain level
    SustainPedal,
}

/// Order for sequenced scale playback
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScaleDirection {
    #[default]
    Ascending,
    Descending,
    /// Up then back down, sharing the top note
    Both,
}

/// Synthesis backend consumed by the performance core.
///
/// `release` on a pitch with no active voice must succeed silently.
pub trait AudioSink {
    /// One-time setup; in browser-like hosts this follows a user gesture
    fn initialize(&mut self) -> Result<(), AudioError>;

    /// Start a sustained voice for this pitch
    fn attack(&mut self, pitch: Pitch) -> Result<(), AudioError>;

    /// Stop the sustained voice for this pitch
    fn release(&mut self, pitch: Pitch) -> Result<(), AudioError>;

    /// Fire-and-forget voice of bounded duration
    fn play_note(&mut self, pitch: Pitch, duration: Duration) -> Result<(), AudioError>;

    /// Fire-and-forget chord of bounded duration
    fn play_chord(&mut self, pitches: &[Pitch], duration: Duration) -> Result<(), AudioError>;

    fn set_envelope(&mut self, envelope: Envelope) -> Result<(), AudioError>;

    /// Silence every voice immediately
    fn stop_all(&mut self) -> Result<(), AudioError>;
}

impl<T: AudioSink + ?Sized> AudioSink for Box<T> {
    fn initialize(&mut self) -> Result<(), AudioError> {
        (**self).initialize()
    }

    fn attack(&mut self, pitch: Pitch) -> Result<(), AudioError> {
        (**self).attack(pitch)
    }

    fn release(&mut self, pitch: Pitch) -> Result<(), AudioError> {
        (**self).release(pitch)
    }

    fn play_note(&mut self, pitch: Pitch, duration: Duration) -> Result<(), AudioError> {
        (**self).play_note(pitch, duration)
    }

    fn play_chord(&mut self, pitches: &[Pitch], duration: Duration) -> Result<(), AudioError> {
        (**self).play_chord(pitches, duration)
    }

    fn set_envelope(&mut self, envelope: Envelope) -> Result<(), AudioError> {
        (**self).set_envelope(envelope)
    }

    fn stop_all(&mut self) -> Result<(), AudioError> {
        (**self).stop_all()
    }
}

/// A single instruction for the audio sink produced by a state transition
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SinkCommand {
    Attack(Pitch),
    Release(Pitch),
    SetEnvelope(Envelope),
}

impl SinkCommand {
    /// Send this command to a sink
    pub fn apply<S: AudioSink + ?Sized>(&self, sink: &mut S) -> Result<(), AudioError> {
        match *self {
            SinkCommand::Attack(pitch) => sink.attack(pitch),
            SinkCommand::Release(pitch) => sink.release(pitch),
            SinkCommand::SetEnvelope(envelope) => sink.set_envelope(envelope),
        }
    }
}

/// Lifecycle of the audio backend
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinkState {
    Uninitialized,
    Ready,
    Disposed,
}

/// Owned handle to the audio backend with an explicit lifecycle
#[derive(Debug)]
pub struct AudioHandle<S> {
    sink: S,
    state: SinkState,
}

impl<S: AudioSink> AudioHandle<S> {
    /// Wrap an uninitialized sink
    pub fn new(sink: S) -> Self {
        Self {
            sink,
            state: SinkState::Uninitialized,
        }
    }

    pub fn state(&self) -> SinkState {
        self.state
    }

    pub fn is_ready(&self) -> bool {
        self.state == SinkState::Ready
    }

    /// Initialize the backend. Idempotent once ready; a failure leaves the
    /// handle uninitialized so a later gesture can retry.
    pub fn initialize(&mut self) -> Result<(), AudioError> {
        match self.state {
            SinkState::Ready => Ok(()),
            SinkState::Disposed => Err(AudioError::Disposed),
            SinkState::Uninitialized => match self.sink.initialize() {
                Ok(()) => {
                    info!("audio engine ready");
                    self.state = SinkState::Ready;
                    Ok(())
                }
                Err(e) => {
                    error!("audio engine failed to start: {}", e);
                    Err(e)
                }
            },
        }
    }

    /// Silence everything and refuse further use
    pub fn dispose(&mut self) {
        if self.state == SinkState::Ready {
            if let Err(e) = self.sink.stop_all() {
                error!("failed to silence audio during shutdown: {}", e);
            }
        }
        self.state = SinkState::Disposed;
    }

    /// The sink, if it can currently make sound
    pub fn ready_sink(&mut self) -> Result<&mut S, AudioError> {
        match self.state {
            SinkState::Ready => Ok(&mut self.sink),
            SinkState::Uninitialized => Err(AudioError::NotReady),
            SinkState::Disposed => Err(AudioError::Disposed),
        }
    }

    /// Apply commands in order, stopping at the first failure.
    /// Returns the number of commands applied alongside any error.
    pub fn apply(&mut self, commands: &[SinkCommand]) -> Result<(), (usize, AudioError)> {
        let sink = self.ready_sink().map_err(|e| (0, e))?;
        for (i, command) in commands.iter().enumerate() {
            command.apply(sink).map_err(|e| (i, e))?;
        }
        Ok(())
    }

    /// Read-only access for inspection
    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Direct access, bypassing the lifecycle checks
    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }
}
