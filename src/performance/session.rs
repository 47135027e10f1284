// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Per-session performer handle.
//!
//! Owns the performance state, the play context, the keyboard controller
//! and the audio handle. Transitions are applied to the sink first and the
//! new state is committed only when every command succeeded, so a failing
//! backend never leaves the tracking maps half-updated.

use std::collections::BTreeMap;
use std::time::Duration;

use crossterm::event::{KeyCode, KeyEventKind, KeyModifiers};
use tracing::{debug, info, warn};

use super::state::{KeyDisposition, PerformanceState, PlayContext, Transition};
use crate::audio::{
    beat_duration, play_progression, play_scale, scale_order, AudioError, AudioHandle, AudioSink, ScaleDirection,
    SinkCommand, NOTE_GATE_PERCENT,
};
use crate::control::{FocusTarget, KeyIntent, KeyboardController, PhysicalKey};
use crate::music::{
    analyze_mode_from_notes, build_chord_from_degree, generate_diatonic_chords, generate_scale, validate_degree,
    ChordInstance, MidiNumber, ModeCandidate, ModeName, Note, Pitch, Scale, TheoryError,
};

/// Identity of one single-shot voice, used to spot stale note-offs
pub type VoiceId = u64;

/// Where a single-shot play came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Mouse,
    Touch,
    Keyboard,
}

/// A single-shot note-off waiting on a timer
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PendingRelease {
    pub pitch: Pitch,
    pub voice: VoiceId,
    pub after: Duration,
}

/// Tunables for a session
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSettings {
    pub context: PlayContext,
    pub tempo_bpm: f64,
    /// How long a click-played note sounds
    pub single_shot: Duration,
    /// How long a previewed chord sounds
    pub chord_duration: Duration,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            context: PlayContext::default(),
            tempo_bpm: 120.0,
            single_shot: Duration::from_millis(500),
            chord_duration: Duration::from_millis(1000),
        }
    }
}

/// Live performance session over an audio sink
#[derive(Debug)]
pub struct Session<S: AudioSink> {
    audio: AudioHandle<S>,
    controller: KeyboardController,
    context: PlayContext,
    state: PerformanceState,
    enabled: bool,
    help_visible: bool,
    tempo_bpm: f64,
    single_shot: Duration,
    chord_duration: Duration,
    next_voice: VoiceId,
    /// Single-shot voices currently highlighted
    active_notes: BTreeMap<MidiNumber, VoiceId>,
}

impl<S: AudioSink> Session<S> {
    /// Create a session; the performer starts disabled and audio uninitialized
    pub fn new(sink: S, controller: KeyboardController, settings: SessionSettings) -> Self {
        Self {
            audio: AudioHandle::new(sink),
            controller,
            context: settings.context,
            state: PerformanceState::new(),
            enabled: false,
            help_visible: false,
            tempo_bpm: settings.tempo_bpm,
            single_shot: settings.single_shot,
            chord_duration: settings.chord_duration,
            next_voice: 0,
            active_notes: BTreeMap::new(),
        }
    }

    /// Start the audio engine. Failure is returned so the host can report
    /// it; performance calls stay silent no-ops until this succeeds.
    pub fn initialize_audio(&mut self) -> Result<(), AudioError> {
        self.audio.initialize()
    }

    /// Flush everything and shut the audio engine down
    pub fn dispose(&mut self) {
        self.blur();
        self.audio.dispose();
    }

    /// Route one raw key event
    pub fn handle_key(
        &mut self,
        code: KeyCode,
        modifiers: KeyModifiers,
        kind: KeyEventKind,
        focus: FocusTarget,
    ) -> KeyDisposition {
        match self.controller.classify(code, modifiers, kind, focus) {
            KeyIntent::PassThrough => KeyDisposition::PassThrough,
            KeyIntent::Ignore => KeyDisposition::Consumed,
            KeyIntent::SwitchMode(mode) => {
                self.switch_mode(mode);
                KeyDisposition::Consumed
            }
            KeyIntent::TogglePerformer => {
                self.toggle_enabled();
                KeyDisposition::Consumed
            }
            KeyIntent::ToggleHelp if self.enabled => {
                self.help_visible = !self.help_visible;
                KeyDisposition::Consumed
            }
            KeyIntent::ToggleHelp => KeyDisposition::PassThrough,
            KeyIntent::SustainDown => self.sustain_down(),
            KeyIntent::SustainUp => self.sustain_up(),
            KeyIntent::NoteDown { key, chord } => self.key_down(key, chord, focus),
            KeyIntent::NoteUp { key } => self.key_up(key),
        }
    }

    pub fn key_down(&mut self, key: PhysicalKey, chord: bool, focus: FocusTarget) -> KeyDisposition {
        if !self.enabled {
            return KeyDisposition::PassThrough;
        }
        let transition = self
            .state
            .key_down(&self.context, self.controller.layout(), key, chord, focus);
        self.commit(transition)
    }

    /// Key releases are honoured even while disabled; after the disable
    /// flush they find nothing tracked and pass through.
    pub fn key_up(&mut self, key: PhysicalKey) -> KeyDisposition {
        let transition = self.state.key_up(key);
        self.commit(transition)
    }

    pub fn sustain_down(&mut self) -> KeyDisposition {
        if !self.enabled {
            return KeyDisposition::PassThrough;
        }
        let transition = self.state.sustain_down();
        self.commit(transition)
    }

    pub fn sustain_up(&mut self) -> KeyDisposition {
        if !self.enabled {
            return KeyDisposition::PassThrough;
        }
        let transition = self.state.sustain_up();
        self.commit(transition)
    }

    /// Window lost focus: release every voice and forget all tracking.
    /// The state is cleared even when the sink misbehaves.
    pub fn blur(&mut self) {
        let Transition { state, mut commands, .. } = self.state.flush();
        let tracked = self.state.sounding();
        commands.extend(
            self.active_notes
                .keys()
                .filter(|&&midi| !tracked.contains(&midi))
                .map(|&midi| SinkCommand::Release(Pitch::from_midi(midi))),
        );

        match self.audio.apply(&commands) {
            Ok(()) | Err((_, AudioError::NotReady)) | Err((_, AudioError::Disposed)) => {}
            Err((applied, e)) => {
                warn!("flush failed after {} of {} commands: {}", applied, commands.len(), e);
                if let Ok(sink) = self.audio.ready_sink() {
                    if let Err(e) = sink.stop_all() {
                        warn!("stop all failed: {}", e);
                    }
                }
            }
        }

        self.state = state;
        self.active_notes.clear();
        debug!("performance state flushed");
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        if self.enabled == enabled {
            return;
        }
        if !enabled {
            self.blur();
            self.help_visible = false;
        }
        self.enabled = enabled;
        info!(enabled, "performer toggled");
    }

    pub fn toggle_enabled(&mut self) {
        self.set_enabled(!self.enabled);
    }

    /// Change mode without flushing. Keys still down release exactly the
    /// MIDI numbers they struck.
    pub fn switch_mode(&mut self, mode: ModeName) {
        if self.context.mode != mode {
            info!(mode = mode.as_str(), "mode switched");
        }
        self.context.mode = mode;
    }

    pub fn set_root(&mut self, root: Note) {
        if self.context.root != root {
            info!(root = %root, "root changed");
        }
        self.context.root = root;
    }

    /// Move the layout's middle row. Keeps the low and high rows inside
    /// the playable octave range.
    pub fn set_base_octave(&mut self, octave: i32) -> Result<(), TheoryError> {
        if !(0..=8).contains(&octave) {
            return Err(TheoryError::InvalidPitchSpec(format!("base octave {} outside 0..=8", octave)));
        }
        self.context.base_octave = octave;
        Ok(())
    }

    pub fn set_tempo(&mut self, tempo_bpm: f64) {
        self.tempo_bpm = tempo_bpm;
    }

    /// Click or tap play, outside key and pedal tracking. Returns the
    /// note-off the caller should schedule, or `None` if nothing sounded.
    pub fn play_single_shot(&mut self, pitch: Pitch, source: SourceKind) -> Option<PendingRelease> {
        let sink = match self.audio.ready_sink() {
            Ok(sink) => sink,
            Err(e) => {
                debug!(?source, "single shot dropped: {}", e);
                return None;
            }
        };
        if let Err(e) = sink.attack(pitch) {
            warn!(note = %pitch, "single shot failed: {}", e);
            return None;
        }

        self.next_voice += 1;
        let voice = self.next_voice;
        self.active_notes.insert(pitch.midi(), voice);
        debug!(note = %pitch, voice, ?source, "single shot");
        Some(PendingRelease {
            pitch,
            voice,
            after: self.single_shot,
        })
    }

    /// Timer fired for a single-shot voice. Stale timers (the pitch was
    /// struck again, or everything was flushed) are no-ops. Returns whether
    /// the voice was released.
    pub fn complete_single_shot(&mut self, pending: PendingRelease) -> bool {
        let midi = pending.pitch.midi();
        if self.active_notes.get(&midi) != Some(&pending.voice) {
            debug!(voice = pending.voice, "stale single-shot release");
            return false;
        }
        self.active_notes.remove(&midi);

        // A key may have taken this pitch over in the meantime
        if self.state.sounding().contains(&midi) {
            return true;
        }
        if let Ok(sink) = self.audio.ready_sink() {
            if let Err(e) = sink.release(pending.pitch) {
                warn!(note = %pending.pitch, "single-shot release failed: {}", e);
            }
        }
        true
    }

    /// Pitches a key would sound right now, without playing them
    pub fn resolve_key(&self, key: PhysicalKey, chord: bool) -> Vec<Pitch> {
        self.controller
            .layout()
            .resolve(key)
            .map(|entry| self.context.resolve(entry.degree, entry.octave_offset, chord))
            .unwrap_or_default()
    }

    /// Scale pitch for a degree relative to the base octave
    pub fn degree_pitch(&self, degree: u8, octave_offset: i8) -> Option<Pitch> {
        self.context
            .resolve(degree, octave_offset, false)
            .into_iter()
            .next()
    }

    pub fn scale(&self) -> Scale {
        generate_scale(self.context.root, self.context.mode, self.context.base_octave)
    }

    pub fn diatonic_chords(&self) -> Vec<ChordInstance> {
        generate_diatonic_chords(self.context.root, self.context.mode, self.context.base_octave)
    }

    /// Sound the diatonic chord on a degree for the configured chord length
    pub fn preview_chord(&mut self, degree: u8) -> anyhow::Result<ChordInstance> {
        let degree = validate_degree(degree)?;
        let ctx = self.context;
        let chord = build_chord_from_degree(ctx.root, ctx.mode, degree, ctx.base_octave)
            .ok_or(TheoryError::InvalidDegree(degree))?;
        self.audio.ready_sink()?.play_chord(chord.notes(), self.chord_duration)?;
        Ok(chord)
    }

    /// Play the current scale at the session tempo
    pub async fn preview_scale(&mut self, direction: ScaleDirection) -> Result<(), AudioError> {
        let scale = self.scale();
        let tempo = self.tempo_bpm;
        let sink = self.audio.ready_sink()?;
        play_scale(sink, scale.notes(), tempo, direction).await
    }

    /// Pitches and beat length for a scale preview driven by the host's
    /// own timers, one `play_scale_step` per beat
    pub fn scale_preview_steps(&self, direction: ScaleDirection) -> (Vec<Pitch>, Duration) {
        (scale_order(self.scale().notes(), direction), beat_duration(self.tempo_bpm))
    }

    /// Sound one preview note for the gated part of a beat
    pub fn play_scale_step(&mut self, pitch: Pitch) -> Result<(), AudioError> {
        let gate = beat_duration(self.tempo_bpm) * NOTE_GATE_PERCENT / 100;
        debug!(note = %pitch, "scale step");
        self.audio.ready_sink()?.play_note(pitch, gate)
    }

    /// Play diatonic chords by degree at the session tempo; invalid
    /// degrees are skipped
    pub async fn preview_progression(&mut self, degrees: &[u8]) -> Result<(), AudioError> {
        let ctx = self.context;
        let chords: Vec<ChordInstance> = degrees
            .iter()
            .filter_map(|&d| build_chord_from_degree(ctx.root, ctx.mode, d, ctx.base_octave))
            .collect();
        let tempo = self.tempo_bpm;
        let sink = self.audio.ready_sink()?;
        play_progression(sink, &chords, tempo).await
    }

    /// Best-guess modes for everything currently sounding
    pub fn analyze_sounding(&self) -> Vec<ModeCandidate> {
        let pitch_classes: Vec<u8> = self
            .state
            .sounding()
            .iter()
            .chain(self.active_notes.keys())
            .map(|&midi| Pitch::from_midi(midi).pitch_class())
            .collect();
        analyze_mode_from_notes(&pitch_classes, None)
    }

    pub fn state(&self) -> &PerformanceState {
        &self.state
    }

    pub fn context(&self) -> &PlayContext {
        &self.context
    }

    pub fn controller(&self) -> &KeyboardController {
        &self.controller
    }

    pub fn audio(&self) -> &AudioHandle<S> {
        &self.audio
    }

    /// The sink, for inspection
    pub fn sink(&self) -> &S {
        self.audio.sink()
    }

    /// The sink, for backend configuration outside the lifecycle
    pub fn sink_mut(&mut self) -> &mut S {
        self.audio.sink_mut()
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn help_visible(&self) -> bool {
        self.help_visible
    }

    pub fn tempo_bpm(&self) -> f64 {
        self.tempo_bpm
    }

    pub fn single_shot_duration(&self) -> Duration {
        self.single_shot
    }

    pub fn active_notes(&self) -> &BTreeMap<MidiNumber, VoiceId> {
        &self.active_notes
    }

    /// Apply a transition's commands and commit its state if all succeed.
    /// On a mid-batch failure, voices this batch started are stopped again
    /// unless the previous state already had them sounding.
    fn commit(&mut self, transition: Transition) -> KeyDisposition {
        let Transition {
            state,
            commands,
            disposition,
        } = transition;

        if commands.is_empty() {
            self.state = state;
            return disposition;
        }

        match self.audio.apply(&commands) {
            Ok(()) => self.state = state,
            Err((_, e @ (AudioError::NotReady | AudioError::Disposed))) => {
                debug!("dropping {} sink commands: {}", commands.len(), e);
            }
            Err((applied, e)) => {
                warn!("sink command failed, keeping previous state: {}", e);
                self.roll_back(&commands[..applied]);
            }
        }
        disposition
    }

    fn roll_back(&mut self, applied: &[SinkCommand]) {
        let sounding = self.state.sounding();
        let Ok(sink) = self.audio.ready_sink() else {
            return;
        };
        for command in applied {
            if let SinkCommand::Attack(pitch) = command {
                if !sounding.contains(&pitch.midi()) {
                    if let Err(e) = sink.release(*pitch) {
                        warn!(note = %pitch, "rollback release failed: {}", e);
                    }
                }
            }
        }
    }
}
