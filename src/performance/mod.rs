// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Live performance core.
//!
//! This module provides:
//! - Pure key/pedal transitions producing audio sink commands
//! - A session handle that applies them against an audio backend
//! - Single-shot (click/tap) voices with stale-timer detection

pub mod session;
pub mod state;

pub use session::{PendingRelease, Session, SessionSettings, SourceKind, VoiceId};
pub use state::{KeyDisposition, PerformanceState, PlayContext, Transition};
