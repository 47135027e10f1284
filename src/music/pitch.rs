// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Pitch model: note names, MIDI numbering, and frequency conversion.
//!
//! Every `Pitch` is derived from its MIDI number, so transposition and
//! round-trips are exact. Frequencies use twelve-tone equal temperament
//! referenced to A4 = 440 Hz (MIDI 69).

use std::fmt;
use std::ops::RangeInclusive;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::TheoryError;

/// MIDI note number. Wider than a byte so octaves outside the MIDI
/// range still transpose without wrapping.
pub type MidiNumber = i32;

/// Semitone offset type
pub type Semitones = i32;

/// MIDI number of the tuning reference
pub const A4_MIDI: MidiNumber = 69;

/// Frequency of the tuning reference in Hz
pub const A4_FREQUENCY: f64 = 440.0;

/// Octaves accepted when parsing pitches at the input boundary
pub const OCTAVE_RANGE: RangeInclusive<i32> = -1..=9;

/// Note names (pitch classes)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Note {
    C,
    Cs, // C# / Db
    D,
    Ds, // D# / Eb
    E,
    F,
    Fs, // F# / Gb
    G,
    Gs, // G# / Ab
    A,
    As, // A# / Bb
    B,
}

impl Note {
    /// All notes in chromatic order
    pub const ALL: [Note; 12] = [
        Note::C,
        Note::Cs,
        Note::D,
        Note::Ds,
        Note::E,
        Note::F,
        Note::Fs,
        Note::G,
        Note::Gs,
        Note::A,
        Note::As,
        Note::B,
    ];

    /// Chromatic index (0-11) for this note
    pub fn pitch_class(self) -> u8 {
        self as u8
    }

    /// Note for a chromatic index; any integer wraps into 0-11
    pub fn from_pitch_class(pc: i32) -> Self {
        Note::ALL[pc.rem_euclid(12) as usize]
    }

    /// Transpose the pitch class by semitones, ignoring octaves
    pub fn transpose(self, semitones: Semitones) -> Self {
        Note::from_pitch_class(self.pitch_class() as i32 + semitones)
    }

    /// Ascending interval in semitones to another note (0-11)
    pub fn interval_to(self, other: Note) -> u8 {
        (other.pitch_class() as i32 - self.pitch_class() as i32).rem_euclid(12) as u8
    }

    /// Display name, always spelled with sharps
    pub fn name(self) -> &'static str {
        match self {
            Note::C => "C",
            Note::Cs => "C#",
            Note::D => "D",
            Note::Ds => "D#",
            Note::E => "E",
            Note::F => "F",
            Note::Fs => "F#",
            Note::G => "G",
            Note::Gs => "G#",
            Note::A => "A",
            Note::As => "A#",
            Note::B => "B",
        }
    }
}

impl FromStr for Note {
    type Err = TheoryError;

    /// Parse a note name (e.g., "C", "C#", "Db", "f#")
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_uppercase();
        match upper.as_str() {
            "C" | "B#" | "BS" => Ok(Note::C),
            "C#" | "CS" | "DB" => Ok(Note::Cs),
            "D" => Ok(Note::D),
            "D#" | "DS" | "EB" => Ok(Note::Ds),
            "E" | "FB" => Ok(Note::E),
            "F" | "E#" | "ES" => Ok(Note::F),
            "F#" | "FS" | "GB" => Ok(Note::Fs),
            "G" => Ok(Note::G),
            "G#" | "GS" | "AB" => Ok(Note::Gs),
            "A" => Ok(Note::A),
            "A#" | "AS" | "BB" => Ok(Note::As),
            "B" | "CB" => Ok(Note::B),
            _ => Err(TheoryError::InvalidPitchSpec(format!(
                "unknown pitch class {:?}",
                s
            ))),
        }
    }
}

/// Octave shift for spellings that cross the B/C boundary: B#4 sounds as C5, Cb4 as B3
fn octave_carry(name: &str) -> i32 {
    match name.trim().to_uppercase().as_str() {
        "B#" | "BS" => 1,
        "CB" => -1,
        _ => 0,
    }
}

impl fmt::Display for Note {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A concrete pitch: pitch class plus octave, with its MIDI number and
/// frequency derived from them.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Pitch {
    note: Note,
    octave: i32,
    midi: MidiNumber,
    frequency: f64,
}

impl Pitch {
    /// Build a pitch from a note name and octave (C4 = MIDI 60)
    pub fn new(note: Note, octave: i32) -> Self {
        Self::from_midi((octave + 1) * 12 + note.pitch_class() as i32)
    }

    /// Build a pitch from a MIDI number
    pub fn from_midi(midi: MidiNumber) -> Self {
        Self {
            note: Note::from_pitch_class(midi),
            octave: midi.div_euclid(12) - 1,
            midi,
            frequency: midi_to_frequency(midi),
        }
    }

    /// Validate and build a pitch from user-supplied text
    pub fn parse(name: &str, octave: i32) -> Result<Self, TheoryError> {
        let note: Note = name.parse()?;
        if !OCTAVE_RANGE.contains(&octave) {
            return Err(TheoryError::InvalidPitchSpec(format!(
                "octave {} outside {}..={}",
                octave,
                OCTAVE_RANGE.start(),
                OCTAVE_RANGE.end()
            )));
        }
        Ok(Self::new(note, octave).transpose(octave_carry(name) * 12))
    }

    /// New pitch `semitones` away; name and octave are re-derived
    pub fn transpose(self, semitones: Semitones) -> Self {
        Self::from_midi(self.midi + semitones)
    }

    pub fn note(&self) -> Note {
        self.note
    }

    pub fn octave(&self) -> i32 {
        self.octave
    }

    pub fn midi(&self) -> MidiNumber {
        self.midi
    }

    pub fn frequency(&self) -> f64 {
        self.frequency
    }

    pub fn pitch_class(&self) -> u8 {
        self.note.pitch_class()
    }
}

impl fmt::Display for Pitch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.note, self.octave)
    }
}

/// Equal-tempered frequency of a MIDI number
pub fn midi_to_frequency(midi: MidiNumber) -> f64 {
    A4_FREQUENCY * 2.0_f64.powf((midi - A4_MIDI) as f64 / 12.0)
}

/// Nearest MIDI number for a frequency
pub fn frequency_to_midi(frequency: f64) -> Result<MidiNumber, TheoryError> {
    if !frequency.is_finite() || frequency <= 0.0 {
        return Err(TheoryError::InvalidFrequency(frequency));
    }
    let exact = A4_MIDI as f64 + 12.0 * (frequency / A4_FREQUENCY).log2();
    Ok(exact.round() as MidiNumber)
}

/// Twelve ascending pitches starting at `root` in `octave`
pub fn chromatic_scale_from(root: Note, octave: i32) -> [Pitch; 12] {
    let start = Pitch::new(root, octave);
    std::array::from_fn(|i| start.transpose(i as Semitones))
}
