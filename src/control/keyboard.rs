// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Keyboard layouts and key-event classification.
//!
//! Maps physical keys to scale degrees across three octave rows, reserves
//! the toggle, sustain and help keys, and turns raw terminal key events
//! into performance intents.

use std::collections::HashMap;

use crossterm::event::{KeyCode, KeyEventKind, KeyModifiers};

use super::{FocusTarget, KeyIntent, LayoutError, PhysicalKey};
use crate::music::{validate_degree, ModeName};

/// Characters produced by shift + 1..7 on a US layout
const SHIFTED_DIGITS: [char; 7] = ['!', '@', '#', '$', '%', '^', '&'];

/// One physical key mapped to a scale degree
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayoutEntry {
    pub key: PhysicalKey,
    /// Scale degree, 1-7
    pub degree: u8,
    /// Octave relative to the session's base octave, -1..=1
    pub octave_offset: i8,
    /// Short label for help display
    pub label: String,
}

impl LayoutEntry {
    pub fn new(key: PhysicalKey, degree: u8, octave_offset: i8, label: impl Into<String>) -> Self {
        Self {
            key: normalize_key(key),
            degree,
            octave_offset,
            label: label.into(),
        }
    }
}

/// Reserved control keys
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlKeys {
    pub toggle: PhysicalKey,
    pub sustain: PhysicalKey,
    pub help: PhysicalKey,
}

impl ControlKeys {
    /// Build a control key set; the three keys must be distinct
    pub fn new(toggle: PhysicalKey, sustain: PhysicalKey, help: PhysicalKey) -> Result<Self, LayoutError> {
        let (toggle, sustain, help) = (normalize_key(toggle), normalize_key(sustain), normalize_key(help));
        if toggle == sustain || toggle == help {
            return Err(LayoutError::DuplicateControlKey(format_key(toggle)));
        }
        if sustain == help {
            return Err(LayoutError::DuplicateControlKey(format_key(sustain)));
        }
        Ok(Self { toggle, sustain, help })
    }

    pub fn contains(&self, key: PhysicalKey) -> bool {
        let key = normalize_key(key);
        key == self.toggle || key == self.sustain || key == self.help
    }
}

impl Default for ControlKeys {
    fn default() -> Self {
        Self {
            toggle: KeyCode::Char('`'),
            sustain: KeyCode::Char(' '),
            help: KeyCode::Char('?'),
        }
    }
}

/// Which mapping scheme a layout follows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LayoutKind {
    #[default]
    ScaleDegree,
    /// Reserved; ships empty
    Chromatic,
}

/// Physical key to scale degree table
#[derive(Debug, Clone)]
pub struct KeyboardLayout {
    kind: LayoutKind,
    entries: Vec<LayoutEntry>,
    index: HashMap<PhysicalKey, usize>,
    controls: ControlKeys,
}

impl KeyboardLayout {
    /// Create an empty layout with default control keys
    pub fn new(kind: LayoutKind) -> Self {
        Self {
            kind,
            entries: Vec::new(),
            index: HashMap::new(),
            controls: ControlKeys::default(),
        }
    }

    /// The shipped layout: three letter rows an octave apart plus the digit row
    pub fn scale_degree() -> Self {
        let mut layout = Self::new(LayoutKind::ScaleDegree);
        layout.add_default_rows();
        layout
    }

    /// Reserved chromatic layout (no mappings yet)
    pub fn chromatic() -> Self {
        Self::new(LayoutKind::Chromatic)
    }

    fn add_default_rows(&mut self) {
        let rows: [(&str, i8, &str); 4] = [
            ("zxcvbnm", -1, ","),
            ("asdfghj", 0, ""),
            ("qwertyu", 1, "'"),
            ("1234567", 0, ""),
        ];
        for (keys, offset, mark) in rows {
            for (i, c) in keys.chars().enumerate() {
                let degree = i as u8 + 1;
                self.put(LayoutEntry::new(KeyCode::Char(c), degree, offset, format!("{}{}", degree, mark)));
            }
        }
    }

    /// Add or replace a mapping
    pub fn insert(&mut self, entry: LayoutEntry) -> Result<(), LayoutError> {
        validate_degree(entry.degree).map_err(|_| LayoutError::InvalidDegree(entry.degree))?;
        if !(-1..=1).contains(&entry.octave_offset) {
            return Err(LayoutError::InvalidOctaveOffset(entry.octave_offset));
        }
        if self.controls.contains(entry.key) {
            return Err(LayoutError::ControlKeyCollision(format_key(entry.key)));
        }

        self.put(entry);
        Ok(())
    }

    fn put(&mut self, entry: LayoutEntry) {
        match self.index.get(&entry.key) {
            Some(&i) => self.entries[i] = entry,
            None => {
                self.index.insert(entry.key, self.entries.len());
                self.entries.push(entry);
            }
        }
    }

    /// Replace the control keys; none may already be mapped
    pub fn set_controls(&mut self, controls: ControlKeys) -> Result<(), LayoutError> {
        if let Some(entry) = self.entries.iter().find(|e| controls.contains(e.key)) {
            return Err(LayoutError::ControlKeyCollision(format_key(entry.key)));
        }
        self.controls = controls;
        Ok(())
    }

    /// Mapping for a physical key
    pub fn resolve(&self, key: PhysicalKey) -> Option<&LayoutEntry> {
        self.index.get(&normalize_key(key)).map(|&i| &self.entries[i])
    }

    /// Mappings in insertion order, for help display
    pub fn entries(&self) -> &[LayoutEntry] {
        &self.entries
    }

    pub fn controls(&self) -> &ControlKeys {
        &self.controls
    }

    pub fn kind(&self) -> LayoutKind {
        self.kind
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for KeyboardLayout {
    fn default() -> Self {
        Self::scale_degree()
    }
}

/// UI navigation keys that always reach the host
pub fn is_navigation_key(key: PhysicalKey) -> bool {
    matches!(
        key,
        KeyCode::Tab
            | KeyCode::BackTab
            | KeyCode::Enter
            | KeyCode::Esc
            | KeyCode::Up
            | KeyCode::Down
            | KeyCode::Left
            | KeyCode::Right
            | KeyCode::Home
            | KeyCode::End
            | KeyCode::PageUp
            | KeyCode::PageDown
    )
}

/// Letters are tracked by their lowercase key
pub fn normalize_key(key: PhysicalKey) -> PhysicalKey {
    match key {
        KeyCode::Char(c) => KeyCode::Char(c.to_ascii_lowercase()),
        other => other,
    }
}

fn mode_shortcut(code: KeyCode, modifiers: KeyModifiers) -> Option<ModeName> {
    match code {
        KeyCode::Char(c @ '1'..='7') if modifiers.contains(KeyModifiers::SHIFT) => {
            ModeName::from_number(c as u8 - b'0')
        }
        KeyCode::Char(c) => SHIFTED_DIGITS
            .iter()
            .position(|&s| s == c)
            .and_then(|i| ModeName::from_number(i as u8 + 1)),
        _ => None,
    }
}

/// Parse a key name from a config file ("a", "space", "tab", "f5", ...)
pub fn parse_key(name: &str) -> Result<PhysicalKey, LayoutError> {
    let mut chars = name.chars();
    if let (Some(c), None) = (chars.next(), chars.next()) {
        return Ok(normalize_key(KeyCode::Char(c)));
    }

    let lower = name.trim().to_lowercase();
    let key = match lower.as_str() {
        "space" => KeyCode::Char(' '),
        "tab" => KeyCode::Tab,
        "backtab" => KeyCode::BackTab,
        "enter" | "return" => KeyCode::Enter,
        "esc" | "escape" => KeyCode::Esc,
        "up" => KeyCode::Up,
        "down" => KeyCode::Down,
        "left" => KeyCode::Left,
        "right" => KeyCode::Right,
        "home" => KeyCode::Home,
        "end" => KeyCode::End,
        "pageup" => KeyCode::PageUp,
        "pagedown" => KeyCode::PageDown,
        "backspace" => KeyCode::Backspace,
        "delete" => KeyCode::Delete,
        _ => match lower.strip_prefix('f').and_then(|n| n.parse::<u8>().ok()) {
            Some(n) if (1..=12).contains(&n) => KeyCode::F(n),
            _ => return Err(LayoutError::UnknownKey(name.to_string())),
        },
    };
    Ok(key)
}

/// Format a key for display
pub fn format_key(key: PhysicalKey) -> String {
    match key {
        KeyCode::Char(' ') => "Space".to_string(),
        KeyCode::Char(c) => c.to_uppercase().to_string(),
        KeyCode::F(n) => format!("F{}", n),
        KeyCode::Up => "↑".to_string(),
        KeyCode::Down => "↓".to_string(),
        KeyCode::Left => "←".to_string(),
        KeyCode::Right => "→".to_string(),
        KeyCode::Enter => "Enter".to_string(),
        KeyCode::Esc => "Esc".to_string(),
        KeyCode::Tab | KeyCode::BackTab => "Tab".to_string(),
        KeyCode::Backspace => "Backspace".to_string(),
        KeyCode::Delete => "Delete".to_string(),
        KeyCode::Home => "Home".to_string(),
        KeyCode::End => "End".to_string(),
        KeyCode::PageUp => "PageUp".to_string(),
        KeyCode::PageDown => "PageDown".to_string(),
        _ => "?".to_string(),
    }
}

/// Classifies raw key events against a layout
#[derive(Debug, Clone)]
pub struct KeyboardController {
    layout: KeyboardLayout,
    /// Modifier that turns a note press into a chord press
    chord_modifier: KeyModifiers,
}

impl KeyboardController {
    pub fn new(layout: KeyboardLayout) -> Self {
        Self {
            layout,
            chord_modifier: KeyModifiers::SHIFT,
        }
    }

    pub fn layout(&self) -> &KeyboardLayout {
        &self.layout
    }

    pub fn set_layout(&mut self, layout: KeyboardLayout) {
        self.layout = layout;
    }

    /// Interpret one key event.
    ///
    /// Text focus, ctrl/alt chords and navigation keys always pass through.
    /// Shift + 1..7 selects a mode and wins over the digit row. Toggle and
    /// help act on press only; the sustain key reports both edges.
    pub fn classify(
        &self,
        code: KeyCode,
        modifiers: KeyModifiers,
        kind: KeyEventKind,
        focus: FocusTarget,
    ) -> KeyIntent {
        if focus == FocusTarget::TextInput {
            return KeyIntent::PassThrough;
        }
        if modifiers.intersects(KeyModifiers::CONTROL | KeyModifiers::ALT) || is_navigation_key(code) {
            return KeyIntent::PassThrough;
        }

        if let Some(mode) = mode_shortcut(code, modifiers) {
            return match kind {
                KeyEventKind::Press => KeyIntent::SwitchMode(mode),
                KeyEventKind::Repeat => KeyIntent::Ignore,
                // A digit struck before shift went down still needs its note-off
                KeyEventKind::Release => {
                    let digit = KeyCode::Char(char::from(b'0' + mode.number()));
                    match self.layout.resolve(digit) {
                        Some(_) => KeyIntent::NoteUp { key: digit },
                        None => KeyIntent::Ignore,
                    }
                }
            };
        }

        let key = normalize_key(code);
        let controls = self.layout.controls();
        if key == controls.sustain {
            return match kind {
                KeyEventKind::Release => KeyIntent::SustainUp,
                _ => KeyIntent::SustainDown,
            };
        }
        if key == controls.toggle || key == controls.help {
            if kind != KeyEventKind::Press {
                return KeyIntent::Ignore;
            }
            return if key == controls.toggle {
                KeyIntent::TogglePerformer
            } else {
                KeyIntent::ToggleHelp
            };
        }

        if self.layout.resolve(key).is_none() {
            return KeyIntent::PassThrough;
        }
        match kind {
            KeyEventKind::Release => KeyIntent::NoteUp { key },
            _ => {
                let uppercase = matches!(code, KeyCode::Char(c) if c.is_ascii_uppercase());
                KeyIntent::NoteDown {
                    key,
                    chord: uppercase || modifiers.contains(self.chord_modifier),
                }
            }
        }
    }
}

impl Default for KeyboardController {
    fn default() -> Self {
        Self::new(KeyboardLayout::scale_degree())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn press(controller: &KeyboardController, code: KeyCode, modifiers: KeyModifiers) -> KeyIntent {
        controller.classify(code, modifiers, KeyEventKind::Press, FocusTarget::Performance)
    }

    #[test]
    fn test_default_layout_rows() {
        let layout = KeyboardLayout::scale_degree();
        assert_eq!(layout.len(), 28);
        assert_eq!(layout.kind(), LayoutKind::ScaleDegree);

        let a = layout.resolve(KeyCode::Char('a')).unwrap();
        assert_eq!((a.degree, a.octave_offset), (1, 0));

        let m = layout.resolve(KeyCode::Char('m')).unwrap();
        assert_eq!((m.degree, m.octave_offset), (7, -1));
        assert_eq!(m.label, "7,");

        let t = layout.resolve(KeyCode::Char('t')).unwrap();
        assert_eq!((t.degree, t.octave_offset), (5, 1));
        assert_eq!(t.label, "5'");

        let three = layout.resolve(KeyCode::Char('3')).unwrap();
        assert_eq!((three.degree, three.octave_offset), (3, 0));

        assert!(layout.resolve(KeyCode::Char('k')).is_none());
    }

    #[test]
    fn test_default_rows_pass_insert_checks() {
        let layout = KeyboardLayout::scale_degree();
        for entry in layout.entries() {
            assert!(!layout.controls().contains(entry.key), "{:?} collides with a control", entry.key);
            let mut copy = layout.clone();
            assert_eq!(copy.insert(entry.clone()), Ok(()));
            assert_eq!(copy.len(), 28);
        }
    }

    #[test]
    fn test_uppercase_resolves_to_lowercase_mapping() {
        let layout = KeyboardLayout::scale_degree();
        assert_eq!(layout.resolve(KeyCode::Char('D')).unwrap().degree, 3);
    }

    #[test]
    fn test_chromatic_layout_is_reserved() {
        let layout = KeyboardLayout::chromatic();
        assert!(layout.is_empty());
        assert_eq!(layout.kind(), LayoutKind::Chromatic);
    }

    #[test]
    fn test_insert_validation() {
        let mut layout = KeyboardLayout::scale_degree();

        assert_eq!(
            layout.insert(LayoutEntry::new(KeyCode::Char('k'), 8, 0, "8")),
            Err(LayoutError::InvalidDegree(8))
        );
        assert_eq!(
            layout.insert(LayoutEntry::new(KeyCode::Char('k'), 1, 2, "1''")),
            Err(LayoutError::InvalidOctaveOffset(2))
        );
        assert_eq!(
            layout.insert(LayoutEntry::new(KeyCode::Char(' '), 1, 0, "1")),
            Err(LayoutError::ControlKeyCollision("Space".to_string()))
        );

        layout.insert(LayoutEntry::new(KeyCode::Char('k'), 1, 1, "1'")).unwrap();
        assert_eq!(layout.len(), 29);

        // Replacing an existing key keeps the count
        layout.insert(LayoutEntry::new(KeyCode::Char('a'), 2, 0, "2")).unwrap();
        assert_eq!(layout.len(), 29);
        assert_eq!(layout.resolve(KeyCode::Char('a')).unwrap().degree, 2);
    }

    #[test]
    fn test_control_keys() {
        assert!(matches!(
            ControlKeys::new(KeyCode::Char('x'), KeyCode::Char('x'), KeyCode::Char('?')),
            Err(LayoutError::DuplicateControlKey(_))
        ));

        let mut layout = KeyboardLayout::scale_degree();
        let clashing = ControlKeys::new(KeyCode::Char('a'), KeyCode::Char(' '), KeyCode::Char('?')).unwrap();
        assert!(matches!(layout.set_controls(clashing), Err(LayoutError::ControlKeyCollision(_))));

        let controls = ControlKeys::new(KeyCode::Char('\\'), KeyCode::Char('.'), KeyCode::Char('/')).unwrap();
        layout.set_controls(controls.clone()).unwrap();
        assert_eq!(layout.controls(), &controls);
    }

    #[test]
    fn test_parse_key() {
        assert_eq!(parse_key("a"), Ok(KeyCode::Char('a')));
        assert_eq!(parse_key("A"), Ok(KeyCode::Char('a')));
        assert_eq!(parse_key("`"), Ok(KeyCode::Char('`')));
        assert_eq!(parse_key("space"), Ok(KeyCode::Char(' ')));
        assert_eq!(parse_key("Escape"), Ok(KeyCode::Esc));
        assert_eq!(parse_key("f5"), Ok(KeyCode::F(5)));
        assert!(matches!(parse_key("hyper"), Err(LayoutError::UnknownKey(_))));
        assert!(matches!(parse_key("f13"), Err(LayoutError::UnknownKey(_))));
    }

    #[test]
    fn test_format_key() {
        assert_eq!(format_key(KeyCode::Char(' ')), "Space");
        assert_eq!(format_key(KeyCode::Char('q')), "Q");
        assert_eq!(format_key(KeyCode::Up), "↑");
        assert_eq!(format_key(KeyCode::F(5)), "F5");
    }

    #[test]
    fn test_navigation_keys() {
        for key in [KeyCode::Tab, KeyCode::Enter, KeyCode::Esc, KeyCode::Left, KeyCode::PageDown] {
            assert!(is_navigation_key(key));
        }
        assert!(!is_navigation_key(KeyCode::Char('a')));
        assert!(!is_navigation_key(KeyCode::Backspace));
    }

    #[test]
    fn test_classify_notes() {
        let controller = KeyboardController::default();

        assert_eq!(
            press(&controller, KeyCode::Char('a'), KeyModifiers::NONE),
            KeyIntent::NoteDown { key: KeyCode::Char('a'), chord: false }
        );
        assert_eq!(
            press(&controller, KeyCode::Char('A'), KeyModifiers::SHIFT),
            KeyIntent::NoteDown { key: KeyCode::Char('a'), chord: true }
        );
        // Some terminals drop the shift flag on uppercase letters
        assert_eq!(
            press(&controller, KeyCode::Char('A'), KeyModifiers::NONE),
            KeyIntent::NoteDown { key: KeyCode::Char('a'), chord: true }
        );
        assert_eq!(
            controller.classify(KeyCode::Char('A'), KeyModifiers::NONE, KeyEventKind::Release, FocusTarget::Performance),
            KeyIntent::NoteUp { key: KeyCode::Char('a') }
        );
        assert_eq!(
            controller.classify(KeyCode::Char('s'), KeyModifiers::NONE, KeyEventKind::Repeat, FocusTarget::Performance),
            KeyIntent::NoteDown { key: KeyCode::Char('s'), chord: false }
        );
        assert_eq!(press(&controller, KeyCode::Char('k'), KeyModifiers::NONE), KeyIntent::PassThrough);
    }

    #[test]
    fn test_classify_mode_shortcuts() {
        let controller = KeyboardController::default();

        assert_eq!(
            press(&controller, KeyCode::Char('2'), KeyModifiers::SHIFT),
            KeyIntent::SwitchMode(ModeName::Dorian)
        );
        assert_eq!(
            press(&controller, KeyCode::Char('&'), KeyModifiers::SHIFT),
            KeyIntent::SwitchMode(ModeName::Locrian)
        );
        assert_eq!(
            press(&controller, KeyCode::Char('!'), KeyModifiers::NONE),
            KeyIntent::SwitchMode(ModeName::Ionian)
        );
        // Unshifted digit stays a scale degree
        assert_eq!(
            press(&controller, KeyCode::Char('2'), KeyModifiers::NONE),
            KeyIntent::NoteDown { key: KeyCode::Char('2'), chord: false }
        );
        // Shift+8 is not a mode
        assert_eq!(press(&controller, KeyCode::Char('*'), KeyModifiers::SHIFT), KeyIntent::PassThrough);

        assert_eq!(
            controller.classify(KeyCode::Char('@'), KeyModifiers::SHIFT, KeyEventKind::Release, FocusTarget::Performance),
            KeyIntent::NoteUp { key: KeyCode::Char('2') }
        );
    }

    #[test]
    fn test_classify_controls() {
        let controller = KeyboardController::default();

        assert_eq!(press(&controller, KeyCode::Char(' '), KeyModifiers::NONE), KeyIntent::SustainDown);
        assert_eq!(
            controller.classify(KeyCode::Char(' '), KeyModifiers::NONE, KeyEventKind::Release, FocusTarget::Performance),
            KeyIntent::SustainUp
        );
        assert_eq!(press(&controller, KeyCode::Char('`'), KeyModifiers::NONE), KeyIntent::TogglePerformer);
        assert_eq!(
            controller.classify(KeyCode::Char('`'), KeyModifiers::NONE, KeyEventKind::Release, FocusTarget::Performance),
            KeyIntent::Ignore
        );
        assert_eq!(press(&controller, KeyCode::Char('?'), KeyModifiers::SHIFT), KeyIntent::ToggleHelp);
    }

    #[test]
    fn test_classify_pass_through() {
        let mut layout = KeyboardLayout::scale_degree();
        layout.insert(LayoutEntry::new(KeyCode::Enter, 1, 0, "1")).unwrap();
        let controller = KeyboardController::new(layout);

        // Navigation wins even when mapped
        assert_eq!(press(&controller, KeyCode::Enter, KeyModifiers::NONE), KeyIntent::PassThrough);
        assert_eq!(press(&controller, KeyCode::Char('c'), KeyModifiers::CONTROL), KeyIntent::PassThrough);
        assert_eq!(
            controller.classify(KeyCode::Char('a'), KeyModifiers::NONE, KeyEventKind::Press, FocusTarget::TextInput),
            KeyIntent::PassThrough
        );
        assert_eq!(
            controller.classify(KeyCode::Char('@'), KeyModifiers::SHIFT, KeyEventKind::Press, FocusTarget::TextInput),
            KeyIntent::PassThrough
        );
    }
}
