// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Diatonic mode explorer.
//!
//! A music theory engine for the seven diatonic modes, a keyboard-driven
//! performance core that tracks held and pedal-sustained notes, and the
//! audio sink abstraction the core drives.

pub mod audio;
pub mod config;
pub mod control;
pub mod music;
pub mod performance;
pub mod ui;
