// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! In-memory audio sink.
//!
//! Keeps a voice pool keyed by MIDI number and a log of every call, so the
//! note accounting of the performance core can be observed without a
//! synthesis backend. The terminal performer uses it to display what is
//! sounding.

use std::collections::BTreeSet;
use std::time::Duration;

use tracing::debug;

use super::{AudioError, AudioSink, Envelope};
use crate::music::{MidiNumber, Pitch};

/// One recorded sink call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SinkCall {
    Initialize,
    Attack(MidiNumber),
    Release(MidiNumber),
    PlayNote(MidiNumber, Duration),
    PlayChord(Vec<MidiNumber>, Duration),
    SetEnvelope(Envelope),
    StopAll,
}

/// Voice-tracking sink that records every call
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    calls: Vec<SinkCall>,
    voices: BTreeSet<MidiNumber>,
    envelope: Envelope,
    fail_next_init: bool,
    fail_attacks: bool,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `initialize` call fail
    pub fn fail_next_init(&mut self) {
        self.fail_next_init = true;
    }

    /// Make every `attack` fail until cleared
    pub fn set_fail_attacks(&mut self, fail: bool) {
        self.fail_attacks = fail;
    }

    /// Every call in the order received
    pub fn calls(&self) -> &[SinkCall] {
        &self.calls
    }

    pub fn clear_calls(&mut self) {
        self.calls.clear();
    }

    /// MIDI numbers with an active sustained voice, ascending
    pub fn sounding(&self) -> Vec<MidiNumber> {
        self.voices.iter().copied().collect()
    }

    pub fn envelope(&self) -> Envelope {
        self.envelope
    }

    pub fn init_count(&self) -> usize {
        self.count(|c| matches!(c, SinkCall::Initialize))
    }

    pub fn attack_count(&self, midi: MidiNumber) -> usize {
        self.count(|c| *c == SinkCall::Attack(midi))
    }

    pub fn release_count(&self, midi: MidiNumber) -> usize {
        self.count(|c| *c == SinkCall::Release(midi))
    }

    pub fn total_attacks(&self) -> usize {
        self.count(|c| matches!(c, SinkCall::Attack(_)))
    }

    pub fn total_releases(&self) -> usize {
        self.count(|c| matches!(c, SinkCall::Release(_)))
    }

    fn count(&self, pred: impl Fn(&SinkCall) -> bool) -> usize {
        self.calls.iter().filter(|c| pred(c)).count()
    }
}

impl AudioSink for MemorySink {
    fn initialize(&mut self) -> Result<(), AudioError> {
        if std::mem::take(&mut self.fail_next_init) {
            return Err(AudioError::InitFailed("no output device".to_string()));
        }
        self.calls.push(SinkCall::Initialize);
        Ok(())
    }

    fn attack(&mut self, pitch: Pitch) -> Result<(), AudioError> {
        if self.fail_attacks {
            return Err(AudioError::VoiceFailed(format!("cannot start {}", pitch)));
        }
        debug!(note = %pitch, midi = pitch.midi(), "attack");
        self.calls.push(SinkCall::Attack(pitch.midi()));
        self.voices.insert(pitch.midi());
        Ok(())
    }

    fn release(&mut self, pitch: Pitch) -> Result<(), AudioError> {
        debug!(note = %pitch, midi = pitch.midi(), "release");
        self.calls.push(SinkCall::Release(pitch.midi()));
        self.voices.remove(&pitch.midi());
        Ok(())
    }

    fn play_note(&mut self, pitch: Pitch, duration: Duration) -> Result<(), AudioError> {
        debug!(note = %pitch, ?duration, "play note");
        self.calls.push(SinkCall::PlayNote(pitch.midi(), duration));
        Ok(())
    }

    fn play_chord(&mut self, pitches: &[Pitch], duration: Duration) -> Result<(), AudioError> {
        let midi: Vec<MidiNumber> = pitches.iter().map(|p| p.midi()).collect();
        debug!(?midi, ?duration, "play chord");
        self.calls.push(SinkCall::PlayChord(midi, duration));
        Ok(())
    }

    fn set_envelope(&mut self, envelope: Envelope) -> Result<(), AudioError> {
        debug!(?envelope, "envelope");
        self.calls.push(SinkCall::SetEnvelope(envelope));
        self.envelope = envelope;
        Ok(())
    }

    fn stop_all(&mut self) -> Result<(), AudioError> {
        debug!("stop all");
        self.calls.push(SinkCall::StopAll);
        self.voices.clear();
        Ok(())
    }
}
