// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Chord construction and diatonic harmonization.
//!
//! Chord qualities and harmonic functions are closed enums with exhaustive
//! interval and symbol tables. Diatonic chords are built from the mode
//! catalog's per-degree definitions on top of a generated scale.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::mode::ModeName;
use super::pitch::{Note, Pitch, Semitones};
use super::scale::generate_scale;

/// Chord qualities supported by the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChordQuality {
    Major,
    Minor,
    Diminished,
    Augmented,
    Dominant7,
    Major7,
    Minor7,
    HalfDiminished7,
    Diminished7,
}

impl ChordQuality {
    pub const ALL: [ChordQuality; 9] = [
        ChordQuality::Major,
        ChordQuality::Minor,
        ChordQuality::Diminished,
        ChordQuality::Augmented,
        ChordQuality::Dominant7,
        ChordQuality::Major7,
        ChordQuality::Minor7,
        ChordQuality::HalfDiminished7,
        ChordQuality::Diminished7,
    ];

    /// Semitones above the chord root, root first
    pub fn intervals(self) -> &'static [Semitones] {
        match self {
            ChordQuality::Major => &[0, 4, 7],
            ChordQuality::Minor => &[0, 3, 7],
            ChordQuality::Diminished => &[0, 3, 6],
            ChordQuality::Augmented => &[0, 4, 8],
            ChordQuality::Dominant7 => &[0, 4, 7, 10],
            ChordQuality::Major7 => &[0, 4, 7, 11],
            ChordQuality::Minor7 => &[0, 3, 7, 10],
            ChordQuality::HalfDiminished7 => &[0, 3, 6, 10],
            ChordQuality::Diminished7 => &[0, 3, 6, 9],
        }
    }

    /// Suffix used in chord names (C + "m7" = "Cm7")
    pub fn symbol(self) -> &'static str {
        match self {
            ChordQuality::Major => "",
            ChordQuality::Minor => "m",
            ChordQuality::Diminished => "°",
            ChordQuality::Augmented => "+",
            ChordQuality::Dominant7 => "7",
            ChordQuality::Major7 => "maj7",
            ChordQuality::Minor7 => "m7",
            ChordQuality::HalfDiminished7 => "ø7",
            ChordQuality::Diminished7 => "°7",
        }
    }

    /// Human-readable name
    pub fn name(self) -> &'static str {
        match self {
            ChordQuality::Major => "Major",
            ChordQuality::Minor => "Minor",
            ChordQuality::Diminished => "Diminished",
            ChordQuality::Augmented => "Augmented",
            ChordQuality::Dominant7 => "Dominant 7th",
            ChordQuality::Major7 => "Major 7th",
            ChordQuality::Minor7 => "Minor 7th",
            ChordQuality::HalfDiminished7 => "Half-Diminished 7th",
            ChordQuality::Diminished7 => "Diminished 7th",
        }
    }
}

impl fmt::Display for ChordQuality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Harmonic function of a diatonic chord
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HarmonicFunction {
    Tonic,
    Subdominant,
    Dominant,
    Other,
}

impl HarmonicFunction {
    pub fn name(self) -> &'static str {
        match self {
            HarmonicFunction::Tonic => "tonic",
            HarmonicFunction::Subdominant => "subdominant",
            HarmonicFunction::Dominant => "dominant",
            HarmonicFunction::Other => "other",
        }
    }
}

impl fmt::Display for HarmonicFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A concrete chord: root pitch, quality, and the pitches it contains.
/// Diatonic chords also carry their Roman numeral and function.
#[derive(Debug, Clone, PartialEq)]
pub struct ChordInstance {
    root: Pitch,
    quality: ChordQuality,
    notes: Vec<Pitch>,
    roman_numeral: Option<&'static str>,
    function: Option<HarmonicFunction>,
}

impl ChordInstance {
    pub fn root(&self) -> Pitch {
        self.root
    }

    pub fn quality(&self) -> ChordQuality {
        self.quality
    }

    /// Chord pitches, root first, ascending
    pub fn notes(&self) -> &[Pitch] {
        &self.notes
    }

    pub fn roman_numeral(&self) -> Option<&'static str> {
        self.roman_numeral
    }

    pub fn function(&self) -> Option<HarmonicFunction> {
        self.function
    }

    /// Chord symbol such as "F#m" or "Bø7"
    pub fn name(&self) -> String {
        format_chord_name(self.root.note(), self.quality)
    }

    pub fn pitch_classes(&self) -> Vec<u8> {
        self.notes.iter().map(|p| p.pitch_class()).collect()
    }
}

impl fmt::Display for ChordInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(numeral) = self.roman_numeral {
            write!(f, "{} ", numeral)?;
        }
        write!(f, "{} [", self.name())?;
        for (i, pitch) in self.notes.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{}", pitch)?;
        }
        f.write_str("]")
    }
}

/// Stack a quality's intervals on a root pitch
pub fn build_chord(root: Pitch, quality: ChordQuality) -> ChordInstance {
    ChordInstance {
        root,
        quality,
        notes: quality.intervals().iter().map(|&i| root.transpose(i)).collect(),
        roman_numeral: None,
        function: None,
    }
}

/// Root name plus quality symbol
pub fn format_chord_name(root: Note, quality: ChordQuality) -> String {
    format!("{}{}", root, quality.symbol())
}

/// The seven diatonic chords of a mode, in scale-degree order
pub fn generate_diatonic_chords(root: Note, mode: ModeName, octave: i32) -> Vec<ChordInstance> {
    let scale = generate_scale(root, mode, octave);
    mode.descriptor()
        .chords
        .iter()
        .zip(scale.notes())
        .map(|(def, &pitch)| ChordInstance {
            roman_numeral: Some(def.roman_numeral),
            function: Some(def.function),
            ..build_chord(pitch, def.quality)
        })
        .collect()
}

/// Diatonic chord on a single scale degree (1-7); `None` outside that range
pub fn build_chord_from_degree(
    root: Note,
    mode: ModeName,
    degree: u8,
    octave: i32,
) -> Option<ChordInstance> {
    if !(1..=7).contains(&degree) {
        return None;
    }
    let def = &mode.descriptor().chords[degree as usize - 1];
    let chord_root = generate_scale(root, mode, octave).pitch_at_degree(degree)?;
    Some(ChordInstance {
        roman_numeral: Some(def.roman_numeral),
        function: Some(def.function),
        ..build_chord(chord_root, def.quality)
    })
}
