// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Catalog of the seven diatonic modes.
//!
//! The catalog is a static table: interval pattern, characteristic degrees,
//! diatonic chord definitions, brightness rank and display metadata for
//! each mode. Nothing here is mutable.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::chord::{ChordQuality, HarmonicFunction};
use super::TheoryError;

use super::chord::ChordQuality::{Diminished as Dim, Major as Maj, Minor as Min};
use super::chord::HarmonicFunction::{Dominant as D, Other as O, Subdominant as S, Tonic as T};

/// Mode identity, declared in traditional order (the degree of the major
/// scale each mode starts on)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModeName {
    Ionian,
    Dorian,
    Phrygian,
    Lydian,
    Mixolydian,
    Aeolian,
    Locrian,
}

impl ModeName {
    /// Traditional order: ionian, dorian, ... locrian
    pub const ALL: [ModeName; 7] = [
        ModeName::Ionian,
        ModeName::Dorian,
        ModeName::Phrygian,
        ModeName::Lydian,
        ModeName::Mixolydian,
        ModeName::Aeolian,
        ModeName::Locrian,
    ];

    /// Position in traditional order, 1-7
    pub fn number(self) -> u8 {
        self as u8 + 1
    }

    /// Mode for a traditional-order position, 1-7
    pub fn from_number(n: u8) -> Option<Self> {
        match n {
            1..=7 => Some(ModeName::ALL[n as usize - 1]),
            _ => None,
        }
    }

    /// Static descriptor for this mode
    pub fn descriptor(self) -> &'static Mode {
        &MODES[self as usize]
    }

    /// Lowercase identifier
    pub fn as_str(self) -> &'static str {
        match self {
            ModeName::Ionian => "ionian",
            ModeName::Dorian => "dorian",
            ModeName::Phrygian => "phrygian",
            ModeName::Lydian => "lydian",
            ModeName::Mixolydian => "mixolydian",
            ModeName::Aeolian => "aeolian",
            ModeName::Locrian => "locrian",
        }
    }
}

impl FromStr for ModeName {
    type Err = TheoryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim().to_lowercase().replace([' ', '-', '_'], "");
        match key.as_str() {
            "ionian" | "major" => Ok(ModeName::Ionian),
            "dorian" => Ok(ModeName::Dorian),
            "phrygian" => Ok(ModeName::Phrygian),
            "lydian" => Ok(ModeName::Lydian),
            "mixolydian" => Ok(ModeName::Mixolydian),
            "aeolian" | "minor" | "naturalminor" => Ok(ModeName::Aeolian),
            "locrian" => Ok(ModeName::Locrian),
            _ => Err(TheoryError::InvalidModeName(s.to_string())),
        }
    }
}

impl fmt::Display for ModeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.descriptor().display_name)
    }
}

/// The diatonic chord built on one scale degree of a mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiatonicChordDef {
    pub roman_numeral: &'static str,
    pub quality: ChordQuality,
    pub function: HarmonicFunction,
}

/// Static description of a diatonic mode
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mode {
    pub name: ModeName,
    pub display_name: &'static str,
    /// Semitones above the root for degrees 1-7
    pub intervals: [u8; 7],
    /// Whole/half step pattern, e.g. "W-W-H-W-W-W-H"
    pub formula: &'static str,
    /// Degrees that set this mode apart from its neighbours
    pub characteristic_degrees: &'static [u8],
    /// Chords on degrees 1-7
    pub chords: [DiatonicChordDef; 7],
    /// 1 = darkest, 7 = brightest
    pub brightness: u8,
    pub color: &'static str,
    pub mood: &'static str,
    pub description: &'static str,
}

impl Mode {
    /// Intervals as pitch classes relative to the root
    pub fn pitch_class_set(&self) -> [bool; 12] {
        let mut set = [false; 12];
        for &interval in &self.intervals {
            set[interval as usize] = true;
        }
        set
    }

    /// Whether a degree (1-7) is characteristic of this mode
    pub fn is_characteristic(&self, degree: u8) -> bool {
        self.characteristic_degrees.contains(&degree)
    }
}

const fn chord(
    roman_numeral: &'static str,
    quality: ChordQuality,
    function: HarmonicFunction,
) -> DiatonicChordDef {
    DiatonicChordDef {
        roman_numeral,
        quality,
        function,
    }
}

static MODES: [Mode; 7] = [
    Mode {
        name: ModeName::Ionian,
        display_name: "Ionian",
        intervals: [0, 2, 4, 5, 7, 9, 11],
        formula: "W-W-H-W-W-W-H",
        characteristic_degrees: &[4, 7],
        chords: [
            chord("I", Maj, T),
            chord("ii", Min, S),
            chord("iii", Min, O),
            chord("IV", Maj, S),
            chord("V", Maj, D),
            chord("vi", Min, T),
            chord("vii°", Dim, D),
        ],
        brightness: 6,
        color: "#f5c542",
        mood: "Happy, stable, resolved",
        description: "The major scale. Bright and settled, the reference point for the other modes.",
    },
    Mode {
        name: ModeName::Dorian,
        display_name: "Dorian",
        intervals: [0, 2, 3, 5, 7, 9, 10],
        formula: "W-H-W-W-W-H-W",
        characteristic_degrees: &[6],
        chords: [
            chord("i", Min, T),
            chord("ii", Min, S),
            chord("♭III", Maj, O),
            chord("IV", Maj, S),
            chord("v", Min, D),
            chord("vi°", Dim, O),
            chord("♭VII", Maj, D),
        ],
        brightness: 4,
        color: "#4a90d9",
        mood: "Soulful, cool, hopeful minor",
        description: "Minor with a raised sixth. Common in jazz, funk and folk.",
    },
    Mode {
        name: ModeName::Phrygian,
        display_name: "Phrygian",
        intervals: [0, 1, 3, 5, 7, 8, 10],
        formula: "H-W-W-W-H-W-W",
        characteristic_degrees: &[2],
        chords: [
            chord("i", Min, T),
            chord("♭II", Maj, S),
            chord("♭III", Maj, O),
            chord("iv", Min, S),
            chord("v°", Dim, O),
            chord("♭VI", Maj, T),
            chord("♭vii", Min, D),
        ],
        brightness: 2,
        color: "#a83232",
        mood: "Exotic, tense, Spanish",
        description: "Minor with a lowered second. Heard in flamenco and metal.",
    },
    Mode {
        name: ModeName::Lydian,
        display_name: "Lydian",
        intervals: [0, 2, 4, 6, 7, 9, 11],
        formula: "W-W-W-H-W-W-H",
        characteristic_degrees: &[4],
        chords: [
            chord("I", Maj, T),
            chord("II", Maj, S),
            chord("iii", Min, O),
            chord("♯iv°", Dim, O),
            chord("V", Maj, D),
            chord("vi", Min, T),
            chord("vii", Min, D),
        ],
        brightness: 7,
        color: "#9b59b6",
        mood: "Dreamy, floating, magical",
        description: "Major with a raised fourth. A staple of film scores.",
    },
    Mode {
        name: ModeName::Mixolydian,
        display_name: "Mixolydian",
        intervals: [0, 2, 4, 5, 7, 9, 10],
        formula: "W-W-H-W-W-H-W",
        characteristic_degrees: &[7],
        chords: [
            chord("I", Maj, T),
            chord("ii", Min, S),
            chord("iii°", Dim, O),
            chord("IV", Maj, S),
            chord("v", Min, D),
            chord("vi", Min, T),
            chord("♭VII", Maj, D),
        ],
        brightness: 5,
        color: "#e67e22",
        mood: "Bluesy, relaxed, rock",
        description: "Major with a lowered seventh. The sound of blues and classic rock.",
    },
    Mode {
        name: ModeName::Aeolian,
        display_name: "Aeolian",
        intervals: [0, 2, 3, 5, 7, 8, 10],
        formula: "W-H-W-W-H-W-W",
        characteristic_degrees: &[6],
        chords: [
            chord("i", Min, T),
            chord("ii°", Dim, S),
            chord("♭III", Maj, T),
            chord("iv", Min, S),
            chord("v", Min, D),
            chord("♭VI", Maj, S),
            chord("♭VII", Maj, D),
        ],
        brightness: 3,
        color: "#34495e",
        mood: "Sad, serious, introspective",
        description: "The natural minor scale. Melancholy with a lowered sixth.",
    },
    Mode {
        name: ModeName::Locrian,
        display_name: "Locrian",
        intervals: [0, 1, 3, 5, 6, 8, 10],
        formula: "H-W-W-H-W-W-W",
        characteristic_degrees: &[2, 5],
        chords: [
            chord("i°", Dim, T),
            chord("♭II", Maj, S),
            chord("♭iii", Min, O),
            chord("iv", Min, S),
            chord("♭V", Maj, O),
            chord("♭VI", Maj, T),
            chord("♭vii", Min, D),
        ],
        brightness: 1,
        color: "#2c2c2c",
        mood: "Unstable, dark, unresolved",
        description: "Diminished tonic with lowered second and fifth. Rarely used as a home key.",
    },
];

/// Descriptor lookup; total over the seven names
pub fn mode_by_name(name: ModeName) -> &'static Mode {
    name.descriptor()
}

/// Ionian through Locrian
pub fn all_modes_in_traditional_order() -> [&'static Mode; 7] {
    ModeName::ALL.map(ModeName::descriptor)
}

/// Darkest (locrian) to brightest (lydian)
pub fn all_modes_by_brightness() -> [&'static Mode; 7] {
    let mut modes = all_modes_in_traditional_order();
    modes.sort_by_key(|m| m.brightness);
    modes
}
