// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Configuration system for modekeys.
//!
//! This module provides data structures for loading and validating
//! session files: the starting root, mode and octave, playback timing,
//! keyboard layout overrides and control key bindings.

use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use tracing::Level;

use crate::audio::ScaleDirection;
use crate::control::{parse_key, ControlKeys, KeyboardLayout, LayoutEntry};
use crate::music::{ModeName, Note};
use crate::performance::{PlayContext, SessionSettings};

/// Root configuration for a performance session
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct SessionFile {
    /// Musical and timing settings
    #[serde(default)]
    pub session: SessionConfig,
    /// Additions to or overrides of the built-in layout
    #[serde(default)]
    pub keyboard: Vec<KeyMapping>,
    /// Reserved control keys
    #[serde(default)]
    pub controls: ControlsConfig,
}

impl SessionFile {
    /// Load a session file; the format follows the extension (.yaml, .yml, .toml)
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("toml") => Self::from_toml(&contents),
            Some("yaml") | Some("yml") | None => Self::from_yaml(&contents),
            Some(other) => bail!("Unsupported config format: .{}", other),
        }
    }

    /// Parse a session from YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml).context("Failed to parse YAML configuration")
    }

    /// Parse a session from TOML string
    pub fn from_toml(text: &str) -> Result<Self> {
        toml::from_str(text).context("Failed to parse TOML configuration")
    }

    /// Serialize to YAML string
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).context("Failed to serialize configuration to YAML")
    }

    /// Serialize to TOML string
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string(self).context("Failed to serialize configuration to TOML")
    }

    /// Save configuration, choosing the format from the extension
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let text = match path.extension().and_then(|e| e.to_str()) {
            Some("toml") => self.to_toml()?,
            _ => self.to_yaml()?,
        };
        fs::write(path, text).with_context(|| format!("Failed to write config file: {:?}", path))
    }

    /// Check every field that could not be checked by deserialization
    pub fn validate(&self) -> Result<()> {
        self.settings()?;
        self.layout()?;
        self.log_level()?;
        Ok(())
    }

    /// Session tunables with root and mode parsed
    pub fn settings(&self) -> Result<SessionSettings> {
        let s = &self.session;
        let root: Note = s.root.parse().with_context(|| format!("Invalid root {:?}", s.root))?;
        let mode: ModeName = s.mode.parse().with_context(|| format!("Invalid mode {:?}", s.mode))?;
        if !(0..=8).contains(&s.octave) {
            bail!("Base octave {} outside 0..=8", s.octave);
        }
        if !s.tempo.is_finite() || s.tempo <= 0.0 {
            bail!("Tempo must be a positive number of BPM, got {}", s.tempo);
        }
        if s.single_shot_ms == 0 || s.chord_ms == 0 {
            bail!("Note durations must be greater than zero");
        }

        Ok(SessionSettings {
            context: PlayContext::new(root, mode, s.octave),
            tempo_bpm: s.tempo,
            single_shot: Duration::from_millis(s.single_shot_ms),
            chord_duration: Duration::from_millis(s.chord_ms),
        })
    }

    /// The built-in scale-degree layout with this file's controls and
    /// mappings applied
    pub fn layout(&self) -> Result<KeyboardLayout> {
        let c = &self.controls;
        let controls = ControlKeys::new(
            parse_key(&c.toggle).context("Invalid toggle key")?,
            parse_key(&c.sustain).context("Invalid sustain key")?,
            parse_key(&c.help).context("Invalid help key")?,
        )?;

        let mut layout = KeyboardLayout::scale_degree();
        layout.set_controls(controls).context("Control key clashes with the built-in layout")?;

        for mapping in &self.keyboard {
            let key = parse_key(&mapping.key)?;
            let label = mapping
                .label
                .clone()
                .unwrap_or_else(|| mapping.degree.to_string());
            layout
                .insert(LayoutEntry::new(key, mapping.degree, mapping.octave, label))
                .with_context(|| format!("Invalid keyboard mapping for {:?}", mapping.key))?;
        }
        Ok(layout)
    }

    /// Configured log level
    pub fn log_level(&self) -> Result<Level> {
        self.session
            .log_level
            .parse()
            .map_err(|_| anyhow::anyhow!("Invalid log level {:?}", self.session.log_level))
    }
}

/// Session-level configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionConfig {
    /// Root pitch class (e.g., "C", "F#", "Bb")
    #[serde(default = "default_root")]
    pub root: String,
    /// Mode name (e.g., "dorian", "major")
    #[serde(default = "default_mode")]
    pub mode: String,
    /// Octave of the layout's middle row
    #[serde(default = "default_octave")]
    pub octave: i32,
    /// Playback tempo in BPM
    #[serde(default = "default_tempo")]
    pub tempo: f64,
    /// Click-played note length in milliseconds
    #[serde(default = "default_single_shot_ms")]
    pub single_shot_ms: u64,
    /// Chord preview length in milliseconds
    #[serde(default = "default_chord_ms")]
    pub chord_ms: u64,
    /// Scale preview direction
    #[serde(default)]
    pub direction: ScaleDirection,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_root() -> String {
    "C".to_string()
}
fn default_mode() -> String {
    "ionian".to_string()
}
fn default_octave() -> i32 {
    4
}
fn default_tempo() -> f64 {
    120.0
}
fn default_single_shot_ms() -> u64 {
    500
}
fn default_chord_ms() -> u64 {
    1000
}
fn default_log_level() -> String {
    "info".to_string()
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            root: default_root(),
            mode: default_mode(),
            octave: default_octave(),
            tempo: default_tempo(),
            single_shot_ms: default_single_shot_ms(),
            chord_ms: default_chord_ms(),
            direction: ScaleDirection::default(),
            log_level: default_log_level(),
        }
    }
}

/// One extra key mapping
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct KeyMapping {
    /// Single character or key name ("space", "f1", ...)
    pub key: String,
    /// Scale degree, 1-7
    pub degree: u8,
    /// Octave offset from the base octave, -1..=1
    #[serde(default)]
    pub octave: i8,
    #[serde(default)]
    pub label: Option<String>,
}

/// Control key bindings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ControlsConfig {
    #[serde(default = "default_toggle")]
    pub toggle: String,
    #[serde(default = "default_sustain")]
    pub sustain: String,
    #[serde(default = "default_help")]
    pub help: String,
}

fn default_toggle() -> String {
    "`".to_string()
}
fn default_sustain() -> String {
    "space".to_string()
}
fn default_help() -> String {
    "?".to_string()
}

impl Default for ControlsConfig {
    fn default() -> Self {
        Self {
            toggle: default_toggle(),
            sustain: default_sustain(),
            help: default_help(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyCode;
    use tempfile::tempdir;

    #[test]
    fn test_parse_session_config() {
        let yaml = r#"
session:
  root: "D"
  mode: "dorian"
  octave: 3
  tempo: 90
  direction: both

keyboard:
  - { key: "k", degree: 1, octave: 1, label: "1'" }
  - key: "l"
    degree: 2
    octave: 1
"#;

        let config = SessionFile::from_yaml(yaml).unwrap();
        assert_eq!(config.session.root, "D");
        assert_eq!(config.session.tempo, 90.0);
        assert_eq!(config.session.direction, ScaleDirection::Both);
        assert_eq!(config.keyboard.len(), 2);
        assert_eq!(config.keyboard[1].label, None);

        let settings = config.settings().unwrap();
        assert_eq!(settings.context, PlayContext::new(Note::D, ModeName::Dorian, 3));
        assert_eq!(settings.tempo_bpm, 90.0);

        let layout = config.layout().unwrap();
        let k = layout.resolve(KeyCode::Char('k')).unwrap();
        assert_eq!((k.degree, k.octave_offset, k.label.as_str()), (1, 1, "1'"));
        assert_eq!(layout.resolve(KeyCode::Char('l')).unwrap().label, "2");
    }

    #[test]
    fn test_default_values() {
        let config = SessionFile::from_yaml("session: {}").unwrap();
        assert_eq!(config.session.root, "C");
        assert_eq!(config.session.mode, "ionian");
        assert_eq!(config.session.octave, 4);
        assert_eq!(config.session.single_shot_ms, 500);
        assert_eq!(config.controls.sustain, "space");
        assert!(config.validate().is_ok());
        assert_eq!(config.log_level().unwrap(), Level::INFO);
    }

    #[test]
    fn test_parse_toml() {
        let text = r#"
[session]
root = "F#"
mode = "lydian"
chord_ms = 750

[controls]
sustain = "f1"

[[keyboard]]
key = "k"
degree = 5
"#;

        let config = SessionFile::from_toml(text).unwrap();
        let settings = config.settings().unwrap();
        assert_eq!(settings.context.root, Note::Fs);
        assert_eq!(settings.context.mode, ModeName::Lydian);
        assert_eq!(settings.chord_duration, Duration::from_millis(750));

        let layout = config.layout().unwrap();
        assert_eq!(layout.controls().sustain, KeyCode::F(1));
        assert_eq!(layout.resolve(KeyCode::Char('k')).unwrap().degree, 5);
    }

    #[test]
    fn test_validation_errors() {
        let bad = [
            "session: { root: \"H\" }",
            "session: { mode: \"bebop\" }",
            "session: { tempo: 0 }",
            "session: { octave: 9 }",
            "session: { log_level: \"loud\" }",
            "keyboard: [ { key: \"k\", degree: 8 } ]",
            "keyboard: [ { key: \"k\", degree: 1, octave: 2 } ]",
            "keyboard: [ { key: \"space\", degree: 1 } ]",
            "keyboard: [ { key: \"hyper\", degree: 1 } ]",
            "controls: { toggle: \"x\", sustain: \"x\" }",
            "controls: { help: \"a\" }",
        ];
        for yaml in bad {
            let config = SessionFile::from_yaml(yaml).unwrap();
            assert!(config.validate().is_err(), "{} should be rejected", yaml);
        }
    }

    #[test]
    fn test_load_by_extension() {
        let dir = tempdir().unwrap();

        let yaml_path = dir.path().join("session.yaml");
        fs::write(&yaml_path, "session:\n  root: \"Eb\"\n").unwrap();
        assert_eq!(SessionFile::load(&yaml_path).unwrap().session.root, "Eb");

        let toml_path = dir.path().join("session.toml");
        fs::write(&toml_path, "[session]\nmode = \"phrygian\"\n").unwrap();
        assert_eq!(SessionFile::load(&toml_path).unwrap().session.mode, "phrygian");

        let ini_path = dir.path().join("session.ini");
        fs::write(&ini_path, "").unwrap();
        assert!(SessionFile::load(&ini_path).is_err());

        assert!(SessionFile::load(dir.path().join("missing.yaml")).is_err());
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempdir().unwrap();
        let mut original = SessionFile::default();
        original.session.root = "A".to_string();
        original.session.mode = "aeolian".to_string();
        original.keyboard.push(KeyMapping {
            key: "k".to_string(),
            degree: 3,
            octave: -1,
            label: None,
        });

        for name in ["saved.yaml", "saved.toml"] {
            let path = dir.path().join(name);
            original.save(&path).unwrap();
            let parsed = SessionFile::load(&path).unwrap();
            assert_eq!(parsed.session.root, "A");
            assert_eq!(parsed.keyboard.len(), 1);
            assert_eq!(parsed.keyboard[0].octave, -1);
        }
    }
}
