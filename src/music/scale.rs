// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Scale generation for the diatonic modes.
//!
//! A scale is derived on demand from a root, a mode and an octave; it is
//! never stored. Degrees do not wrap: a scale always holds exactly seven
//! ascending pitches starting at the root.

use std::fmt;

use super::mode::ModeName;
use super::pitch::{Note, Pitch, Semitones};
use super::TheoryError;

/// Seven concrete pitches of a mode on a root in a given octave
#[derive(Debug, Clone, PartialEq)]
pub struct Scale {
    root: Note,
    mode: ModeName,
    octave: i32,
    notes: [Pitch; 7],
}

impl Scale {
    /// Parse a scale from user-supplied strings (e.g., "F#", "lydian")
    pub fn parse(root: &str, mode: &str, octave: i32) -> Result<Self, TheoryError> {
        let root_pitch = Pitch::parse(root, octave)?;
        let mode: ModeName = mode.parse()?;
        Ok(generate_scale(root_pitch.note(), mode, octave))
    }

    pub fn root(&self) -> Note {
        self.root
    }

    pub fn mode(&self) -> ModeName {
        self.mode
    }

    pub fn octave(&self) -> i32 {
        self.octave
    }

    /// Pitches for degrees 1-7, ascending
    pub fn notes(&self) -> &[Pitch; 7] {
        &self.notes
    }

    /// Pitch at a 1-based degree
    pub fn pitch_at_degree(&self, degree: u8) -> Option<Pitch> {
        if degree == 0 || degree > 7 {
            return None;
        }
        Some(self.notes[degree as usize - 1])
    }

    /// 1-based degree of a pitch class, if it belongs to the scale
    pub fn degree_of(&self, note: Note) -> Option<u8> {
        self.notes
            .iter()
            .position(|p| p.note() == note)
            .map(|i| i as u8 + 1)
    }

    pub fn pitch_classes(&self) -> [u8; 7] {
        self.notes.map(|p| p.pitch_class())
    }

    pub fn contains_pitch_class(&self, pc: u8) -> bool {
        self.notes.iter().any(|p| p.pitch_class() == pc % 12)
    }

    /// The seven scale pitches plus the root an octave up
    pub fn with_octave_note(&self) -> Vec<Pitch> {
        let mut pitches = self.notes.to_vec();
        pitches.push(self.notes[0].transpose(12));
        pitches
    }

    /// Root of the major scale this mode is drawn from (D dorian -> C)
    pub fn parent_ionian_root(&self) -> Note {
        let ionian = ModeName::Ionian.descriptor();
        let offset = ionian.intervals[self.mode.number() as usize - 1];
        self.root.transpose(-(offset as Semitones))
    }
}

impl fmt::Display for Scale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.root, self.mode)
    }
}

/// Degree `i` is the root pitch raised by the mode's i-th interval
pub fn generate_scale(root: Note, mode: ModeName, octave: i32) -> Scale {
    let root_pitch = Pitch::new(root, octave);
    let intervals = mode.descriptor().intervals;
    Scale {
        root,
        mode,
        octave,
        notes: intervals.map(|i| root_pitch.transpose(i as Semitones)),
    }
}
