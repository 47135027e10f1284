// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Control system for computer-keyboard performance input.
//!
//! This module provides:
//! - Keyboard layouts mapping physical keys to scale degrees
//! - Reserved control and navigation keys
//! - Classification of raw key events into performance intents

pub mod keyboard;

pub use keyboard::{
    format_key, is_navigation_key, normalize_key, parse_key, ControlKeys, KeyboardController,
    KeyboardLayout, LayoutEntry, LayoutKind,
};

use crossterm::event::KeyCode;
use thiserror::Error;

use crate::music::ModeName;

/// Physical key identifier
pub type PhysicalKey = KeyCode;

/// Where keyboard focus currently sits in the host UI
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FocusTarget {
    /// The instrument (or nothing in particular)
    #[default]
    Performance,
    /// A text field or other typing control; every key belongs to it
    TextInput,
}

/// What a raw key event means to the performer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyIntent {
    /// Not ours; the host must let the event propagate untouched
    PassThrough,
    /// Ours, but nothing to do (e.g. release of a toggle key)
    Ignore,
    /// Select a mode in traditional order (shift + digit)
    SwitchMode(ModeName),
    TogglePerformer,
    ToggleHelp,
    SustainDown,
    SustainUp,
    NoteDown { key: PhysicalKey, chord: bool },
    NoteUp { key: PhysicalKey },
}

/// Layout construction errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LayoutError {
    #[error("scale degree {0} is outside 1..=7")]
    InvalidDegree(u8),
    #[error("octave offset {0} is outside -1..=1")]
    InvalidOctaveOffset(i8),
    #[error("key {0} is reserved as a control key")]
    ControlKeyCollision(String),
    #[error("control keys must be distinct, {0} is used twice")]
    DuplicateControlKey(String),
    #[error("unknown key name {0:?}")]
    UnknownKey(String),
}
