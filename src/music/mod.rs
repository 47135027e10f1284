// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Music theory engine.
//!
//! This module provides the pitch model, the static catalog of the seven
//! diatonic modes, scale and chord construction, and mode inference from
//! sounding pitch classes. Everything here is pure and deterministic.

pub mod analysis;
pub mod chord;
pub mod mode;
pub mod pitch;
pub mod scale;

pub use analysis::{analyze_mode_from_notes, ModeCandidate};
pub use chord::{
    build_chord, build_chord_from_degree, format_chord_name, generate_diatonic_chords,
    ChordInstance, ChordQuality, HarmonicFunction,
};
pub use mode::{
    all_modes_by_brightness, all_modes_in_traditional_order, mode_by_name, DiatonicChordDef, Mode,
    ModeName,
};
pub use pitch::{
    chromatic_scale_from, frequency_to_midi, midi_to_frequency, MidiNumber, Note, Pitch, Semitones,
};
pub use scale::{generate_scale, Scale};

use thiserror::Error;

/// Caller contract violations at the theory boundary
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TheoryError {
    /// Unknown pitch-class name or unusable octave
    #[error("invalid pitch: {0}")]
    InvalidPitchSpec(String),
    /// Unknown mode name
    #[error("unknown mode: {0:?}")]
    InvalidModeName(String),
    /// Scale degree outside 1-7
    #[error("scale degree {0} is outside 1..=7")]
    InvalidDegree(u8),
    /// Frequency that is not positive and finite
    #[error("frequency {0} Hz is not a positive finite value")]
    InvalidFrequency(f64),
}

/// Check a 1-based scale degree at an input boundary
pub fn validate_degree(degree: u8) -> Result<u8, TheoryError> {
    if (1..=7).contains(&degree) {
        Ok(degree)
    } else {
        Err(TheoryError::InvalidDegree(degree))
    }
}
