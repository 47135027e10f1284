// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Note accounting for live keyboard performance.
//!
//! `PerformanceState` never touches the audio backend. Each operation takes
//! the current state plus one input event and returns a `Transition`: the
//! next state, the sink commands that realise it, and whether the event
//! belongs to the performer. The session applies the commands and commits
//! the state only if they all succeed.
//!
//! Per physical key the lifecycle is
//! `idle -> pressed (sounding) -> [sustained-detached] -> idle`; the
//! detached step is entered only when the pedal is down at key release and
//! left only on pedal release.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use tracing::debug;

use crate::audio::{Envelope, SinkCommand};
use crate::control::{is_navigation_key, normalize_key, FocusTarget, KeyboardLayout, PhysicalKey};
use crate::music::{build_chord_from_degree, generate_scale, MidiNumber, ModeName, Note, Pitch};

/// Musical context that turns a scale degree into pitches
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlayContext {
    pub root: Note,
    pub mode: ModeName,
    /// Octave of the layout's middle row
    pub base_octave: i32,
}

impl PlayContext {
    pub fn new(root: Note, mode: ModeName, base_octave: i32) -> Self {
        Self {
            root,
            mode,
            base_octave,
        }
    }

    /// Pitches for a degree: the diatonic chord on it, or the single scale
    /// pitch. Empty when the degree is outside 1-7.
    pub fn resolve(&self, degree: u8, octave_offset: i8, chord: bool) -> Vec<Pitch> {
        let octave = self.base_octave + i32::from(octave_offset);
        if chord {
            build_chord_from_degree(self.root, self.mode, degree, octave)
                .map(|c| c.notes().to_vec())
                .unwrap_or_default()
        } else {
            generate_scale(self.root, self.mode, octave)
                .pitch_at_degree(degree)
                .into_iter()
                .collect()
        }
    }
}

impl Default for PlayContext {
    fn default() -> Self {
        Self::new(Note::C, ModeName::Ionian, 4)
    }
}

/// Whether the host should let a key event propagate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyDisposition {
    /// Not ours; never suppress it
    PassThrough,
    /// Handled by the performer
    Consumed,
}

/// Result of one state-machine step
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub state: PerformanceState,
    pub commands: Vec<SinkCommand>,
    pub disposition: KeyDisposition,
}

impl Transition {
    fn unchanged(state: &PerformanceState, disposition: KeyDisposition) -> Self {
        Self {
            state: state.clone(),
            commands: Vec::new(),
            disposition,
        }
    }
}

/// Polyphonic key and pedal tracking
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PerformanceState {
    /// Keys physically down; dedupes auto-repeat
    pressed_keys: HashSet<PhysicalKey>,
    /// Sounding because a key is down with the pedal up
    held_notes: BTreeMap<MidiNumber, Pitch>,
    /// Kept sounding by the pedal
    sustained_notes: BTreeMap<MidiNumber, Pitch>,
    /// What each key most recently struck
    key_to_notes: HashMap<PhysicalKey, BTreeSet<MidiNumber>>,
    sustain_pedal_down: bool,
}

impl PerformanceState {
    pub fn new() -> Self {
        Self::default()
    }

    /// A mapped key went down.
    ///
    /// With the pedal down every resolved pitch is struck again, even one
    /// already sustaining. With the pedal up a pitch already held by
    /// another key is not doubled.
    pub fn key_down(
        &self,
        context: &PlayContext,
        layout: &KeyboardLayout,
        key: PhysicalKey,
        chord: bool,
        focus: FocusTarget,
    ) -> Transition {
        if focus == FocusTarget::TextInput || is_navigation_key(key) {
            return Transition::unchanged(self, KeyDisposition::PassThrough);
        }
        let Some(entry) = layout.resolve(key) else {
            return Transition::unchanged(self, KeyDisposition::PassThrough);
        };
        let key = entry.key;
        if self.pressed_keys.contains(&key) {
            debug!(key = ?key, "auto-repeat suppressed");
            return Transition::unchanged(self, KeyDisposition::Consumed);
        }

        let pitches = context.resolve(entry.degree, entry.octave_offset, chord);
        if pitches.is_empty() {
            return Transition::unchanged(self, KeyDisposition::Consumed);
        }

        let mut next = self.clone();
        let mut commands = Vec::with_capacity(pitches.len());
        let mut struck = BTreeSet::new();
        next.pressed_keys.insert(key);

        for pitch in pitches {
            let midi = pitch.midi();
            if next.sustain_pedal_down {
                commands.push(SinkCommand::Attack(pitch));
                next.sustained_notes.insert(midi, pitch);
            } else {
                if !next.held_notes.contains_key(&midi) {
                    commands.push(SinkCommand::Attack(pitch));
                }
                next.held_notes.insert(midi, pitch);
            }
            struck.insert(midi);
        }
        debug!(key = ?key, chord, notes = ?struck, "key down");
        next.key_to_notes.insert(key, struck);

        Transition {
            state: next,
            commands,
            disposition: KeyDisposition::Consumed,
        }
    }

    /// A key came up. Notes the pedal is sustaining keep sounding and keep
    /// the key's tracking entry until pedal release.
    pub fn key_up(&self, key: PhysicalKey) -> Transition {
        let key = normalize_key(key);
        let Some(notes) = self.key_to_notes.get(&key) else {
            return Transition::unchanged(self, KeyDisposition::PassThrough);
        };

        let mut next = self.clone();
        let mut commands = Vec::new();
        let mut any_sustained = false;

        for midi in notes {
            if next.sustained_notes.contains_key(midi) {
                any_sustained = true;
                // The pedal owns this voice now, unless another key is still down on it
                if !self.held_by_other_key(key, *midi) {
                    next.held_notes.remove(midi);
                }
            } else if let Some(pitch) = next.held_notes.remove(midi) {
                commands.push(SinkCommand::Release(pitch));
            }
        }

        next.pressed_keys.remove(&key);
        if !any_sustained {
            next.key_to_notes.remove(&key);
        }
        debug!(key = ?key, sustained = any_sustained, "key up");

        Transition {
            state: next,
            commands,
            disposition: KeyDisposition::Consumed,
        }
    }

    fn held_by_other_key(&self, key: PhysicalKey, midi: MidiNumber) -> bool {
        self.pressed_keys
            .iter()
            .filter(|&&pressed| pressed != key)
            .any(|pressed| self.key_to_notes.get(pressed).is_some_and(|notes| notes.contains(&midi)))
    }

    /// Pedal pressed: switch to the sustain envelope; nothing is struck
    pub fn sustain_down(&self) -> Transition {
        if self.sustain_pedal_down {
            return Transition::unchanged(self, KeyDisposition::Consumed);
        }
        let mut next = self.clone();
        next.sustain_pedal_down = true;
        Transition {
            state: next,
            commands: vec![SinkCommand::SetEnvelope(Envelope::SustainPedal)],
            disposition: KeyDisposition::Consumed,
        }
    }

    /// Pedal released: natural envelope, then free every sustained note.
    /// Pitches still held by a key that is down are left sounding.
    pub fn sustain_up(&self) -> Transition {
        if !self.sustain_pedal_down {
            return Transition::unchanged(self, KeyDisposition::Consumed);
        }

        let mut next = self.clone();
        next.sustain_pedal_down = false;
        let mut commands = vec![SinkCommand::SetEnvelope(Envelope::Natural)];
        for (midi, pitch) in std::mem::take(&mut next.sustained_notes) {
            if !next.held_notes.contains_key(&midi) {
                commands.push(SinkCommand::Release(pitch));
            }
        }
        let pressed = &next.pressed_keys;
        next.key_to_notes.retain(|key, _| pressed.contains(key));
        debug!(released = commands.len() - 1, "sustain up");

        Transition {
            state: next,
            commands,
            disposition: KeyDisposition::Consumed,
        }
    }

    /// Release everything and forget all tracking. Recovery path for lost
    /// key-up events (focus loss, performer disabled).
    pub fn flush(&self) -> Transition {
        let sounding: BTreeMap<MidiNumber, Pitch> = self
            .held_notes
            .iter()
            .chain(self.sustained_notes.iter())
            .map(|(&midi, &pitch)| (midi, pitch))
            .collect();

        let mut commands: Vec<SinkCommand> = sounding.into_values().map(SinkCommand::Release).collect();
        commands.push(SinkCommand::SetEnvelope(Envelope::Natural));

        Transition {
            state: PerformanceState::default(),
            commands,
            disposition: KeyDisposition::Consumed,
        }
    }

    pub fn pressed_keys(&self) -> &HashSet<PhysicalKey> {
        &self.pressed_keys
    }

    pub fn held_notes(&self) -> &BTreeMap<MidiNumber, Pitch> {
        &self.held_notes
    }

    pub fn sustained_notes(&self) -> &BTreeMap<MidiNumber, Pitch> {
        &self.sustained_notes
    }

    pub fn key_to_notes(&self) -> &HashMap<PhysicalKey, BTreeSet<MidiNumber>> {
        &self.key_to_notes
    }

    pub fn is_sustain_down(&self) -> bool {
        self.sustain_pedal_down
    }

    /// MIDI numbers currently held or sustained
    pub fn sounding(&self) -> BTreeSet<MidiNumber> {
        self.held_notes
            .keys()
            .chain(self.sustained_notes.keys())
            .copied()
            .collect()
    }

    /// No keys, no notes, pedal up
    pub fn is_idle(&self) -> bool {
        self.pressed_keys.is_empty()
            && self.held_notes.is_empty()
            && self.sustained_notes.is_empty()
            && self.key_to_notes.is_empty()
            && !self.sustain_pedal_down
    }
}
