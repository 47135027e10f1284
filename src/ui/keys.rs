// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Keyboard layout display widget.

use std::collections::BTreeSet;

use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Paragraph, Widget},
};

use crate::control::{format_key, KeyboardLayout};
use crate::music::MidiNumber;
use crate::performance::PlayContext;

/// One key as displayed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyCell {
    /// Key cap ("Q", "Space", ...)
    pub key: String,
    /// Degree label from the layout ("5'", "3,")
    pub label: String,
    /// Pitch the key plays as a single note
    pub note: String,
    pub lit: bool,
    /// Degree is characteristic of the current mode
    pub characteristic: bool,
}

/// A run of keys sharing one octave offset
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyRow {
    pub octave_offset: i8,
    pub cells: Vec<KeyCell>,
}

/// Group layout entries into display rows, highest octave first.
/// Consecutive entries with the same offset share a row.
pub fn key_rows(layout: &KeyboardLayout, context: &PlayContext, sounding: &BTreeSet<MidiNumber>) -> Vec<KeyRow> {
    let mode = context.mode.descriptor();
    let mut rows: Vec<KeyRow> = Vec::new();

    for entry in layout.entries() {
        let pitch = context
            .resolve(entry.degree, entry.octave_offset, false)
            .into_iter()
            .next();
        let cell = KeyCell {
            key: format_key(entry.key),
            label: entry.label.clone(),
            note: pitch.map(|p| p.to_string()).unwrap_or_default(),
            lit: pitch.is_some_and(|p| sounding.contains(&p.midi())),
            characteristic: mode.is_characteristic(entry.degree),
        };

        match rows.last_mut() {
            Some(row) if row.octave_offset == entry.octave_offset => row.cells.push(cell),
            _ => rows.push(KeyRow {
                octave_offset: entry.octave_offset,
                cells: vec![cell],
            }),
        }
    }

    rows.sort_by(|a, b| b.octave_offset.cmp(&a.octave_offset));
    rows
}

/// Widget drawing the layout rows with sounding keys lit
pub struct KeysWidget<'a> {
    rows: &'a [KeyRow],
    block: Option<Block<'a>>,
}

impl<'a> KeysWidget<'a> {
    pub fn new(rows: &'a [KeyRow]) -> Self {
        Self { rows, block: None }
    }

    /// Set the block wrapper
    pub fn block(mut self, block: Block<'a>) -> Self {
        self.block = Some(block);
        self
    }
}

impl Widget for KeysWidget<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let area = if let Some(block) = self.block {
            let inner = block.inner(area);
            block.render(area, buf);
            inner
        } else {
            area
        };

        if self.rows.is_empty() {
            Paragraph::new("Layout has no mapped keys")
                .style(Style::default().fg(Color::DarkGray))
                .render(area, buf);
            return;
        }

        let lines: Vec<Line> = self
            .rows
            .iter()
            .map(|row| {
                let mut spans = vec![Span::styled(
                    format!("{:+} ", row.octave_offset),
                    Style::default().fg(Color::DarkGray),
                )];
                for cell in &row.cells {
                    spans.push(Span::styled(
                        format!("[{} {:<3}{:>4}] ", cell.key, cell.label, cell.note),
                        cell_style(cell),
                    ));
                }
                Line::from(spans)
            })
            .collect();

        Paragraph::new(lines).render(area, buf);
    }
}

fn cell_style(cell: &KeyCell) -> Style {
    if cell.lit {
        Style::default().fg(Color::Black).bg(Color::Green).add_modifier(Modifier::BOLD)
    } else if cell.characteristic {
        Style::default().fg(Color::Yellow)
    } else {
        Style::default().fg(Color::White)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::music::{ModeName, Note};

    #[test]
    fn test_key_rows_order_and_grouping() {
        let layout = KeyboardLayout::scale_degree();
        let ctx = PlayContext::new(Note::C, ModeName::Ionian, 4);
        let rows = key_rows(&layout, &ctx, &BTreeSet::new());

        let offsets: Vec<i8> = rows.iter().map(|r| r.octave_offset).collect();
        assert_eq!(offsets, vec![1, 0, 0, -1]);
        assert!(rows.iter().all(|r| r.cells.len() == 7));
        assert_eq!(rows[0].cells[0].key, "Q");
        assert_eq!(rows[0].cells[0].note, "C5");
        assert_eq!(rows[3].cells[6].note, "B3");
    }

    #[test]
    fn test_key_rows_light_sounding_pitches() {
        let layout = KeyboardLayout::scale_degree();
        let ctx = PlayContext::new(Note::D, ModeName::Dorian, 4);
        let sounding: BTreeSet<MidiNumber> = [62].into_iter().collect();
        let rows = key_rows(&layout, &ctx, &sounding);

        let lit: Vec<&str> = rows
            .iter()
            .flat_map(|r| r.cells.iter())
            .filter(|c| c.lit)
            .map(|c| c.key.as_str())
            .collect();
        // Home-row A and digit 1 both play D4
        assert_eq!(lit, vec!["A", "1"]);

        // Dorian's raised sixth
        let sixth = &rows[1].cells[5];
        assert!(sixth.characteristic);
        assert!(!rows[1].cells[4].characteristic);
    }

    #[test]
    fn test_empty_layout() {
        let rows = key_rows(&KeyboardLayout::chromatic(), &PlayContext::default(), &BTreeSet::new());
        assert!(rows.is_empty());
    }
}
