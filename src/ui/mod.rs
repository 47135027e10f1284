// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Terminal UI for the modekeys performer.
//!
//! Provides a ratatui-based screen with the current mode, the keyboard
//! layout with sounding keys lit, and a running guess at the mode being
//! played. This is the host side of the performer: it owns the terminal,
//! feeds raw events to the session and acts on keys the session passes
//! through.

mod keys;

pub use keys::{key_rows, KeyCell, KeyRow, KeysWidget};

use std::collections::BTreeSet;
use std::io::{self, Stdout};
use std::time::{Duration, Instant};

use crossterm::{
    event::{
        self, DisableFocusChange, DisableMouseCapture, EnableFocusChange, EnableMouseCapture, Event, KeyCode,
        KeyEvent, KeyEventKind, KeyModifiers, KeyboardEnhancementFlags, MouseButton, MouseEvent, MouseEventKind,
        PopKeyboardEnhancementFlags, PushKeyboardEnhancementFlags,
    },
    execute,
    terminal::{
        disable_raw_mode, enable_raw_mode, supports_keyboard_enhancement, EnterAlternateScreen,
        LeaveAlternateScreen,
    },
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame, Terminal,
};
use tokio::runtime::Runtime;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::audio::{spawn_release_timer, spawn_sequence, MemorySink, ScaleDirection};
use crate::control::{format_key, FocusTarget, KeyIntent};
use crate::music::{ModeCandidate, ModeName, Note, Pitch};
use crate::performance::{KeyDisposition, PendingRelease, Session, SourceKind};

/// Snapshot of everything the screen shows
#[derive(Debug, Clone)]
pub struct UiState {
    pub root: Note,
    pub mode: ModeName,
    pub base_octave: i32,
    pub tempo: f64,
    pub direction: ScaleDirection,
    pub enabled: bool,
    pub sustain_down: bool,
    pub show_help: bool,
    /// Terminal reports key releases
    pub release_events: bool,
    pub rows: Vec<KeyRow>,
    pub sounding: Vec<Pitch>,
    pub candidates: Vec<ModeCandidate>,
    /// Status message
    pub status_message: Option<String>,
    /// Status message timestamp
    pub status_time: Option<Instant>,
}

impl UiState {
    /// Capture the session as the screen should show it
    pub fn capture(session: &Session<MemorySink>, direction: ScaleDirection, release_events: bool) -> Self {
        let context = *session.context();
        let sounding: BTreeSet<_> = session.sink().sounding().into_iter().collect();
        Self {
            root: context.root,
            mode: context.mode,
            base_octave: context.base_octave,
            tempo: session.tempo_bpm(),
            direction,
            enabled: session.is_enabled(),
            sustain_down: session.state().is_sustain_down(),
            show_help: session.help_visible(),
            release_events,
            rows: key_rows(session.controller().layout(), &context, &sounding),
            sounding: sounding.iter().map(|&midi| Pitch::from_midi(midi)).collect(),
            candidates: session.analyze_sounding(),
            status_message: None,
            status_time: None,
        }
    }

    /// Re-capture the session, keeping the current status message
    pub fn refresh(&mut self, session: &Session<MemorySink>, direction: ScaleDirection) {
        let status_message = self.status_message.take();
        let status_time = self.status_time.take();
        *self = Self {
            status_message,
            status_time,
            ..Self::capture(session, direction, self.release_events)
        };
    }

    /// Set a status message that will be displayed temporarily
    pub fn set_status(&mut self, message: impl Into<String>) {
        self.status_message = Some(message.into());
        self.status_time = Some(Instant::now());
    }

    /// Clear expired status message
    pub fn clear_expired_status(&mut self) {
        if let Some(time) = self.status_time {
            if time.elapsed() > Duration::from_secs(3) {
                self.status_message = None;
                self.status_time = None;
            }
        }
    }
}

/// Degree and octave offset for a click: columns split the width into
/// seven degrees, rows split the height into three octaves (top is high).
pub fn click_target(column: u16, row: u16, width: u16, height: u16) -> (u8, i8) {
    let width = u32::from(width.max(1));
    let height = u32::from(height.max(1));
    let degree = (u32::from(column) * 7 / width).min(6) as u8 + 1;
    let band = (u32::from(row) * 3 / height).min(2) as i8;
    (degree, 1 - band)
}

/// Work posted back to the event loop by timer tasks
#[derive(Debug, Clone, Copy, PartialEq)]
enum TimerEvent {
    Release(PendingRelease),
    ScaleStep(Pitch),
}

/// Redraw and input poll rate
const FRAME_RATE: u64 = 60;

fn next_direction(direction: ScaleDirection) -> ScaleDirection {
    match direction {
        ScaleDirection::Ascending => ScaleDirection::Descending,
        ScaleDirection::Descending => ScaleDirection::Both,
        ScaleDirection::Both => ScaleDirection::Ascending,
    }
}

/// Terminal performer application
pub struct App {
    session: Session<MemorySink>,
    /// Terminal handle
    terminal: Terminal<CrosstermBackend<Stdout>>,
    /// Runs note-off timers and paced previews
    runtime: Runtime,
    timer_tx: UnboundedSender<TimerEvent>,
    timer_rx: UnboundedReceiver<TimerEvent>,
    /// Scale preview in progress
    preview: Option<JoinHandle<()>>,
    direction: ScaleDirection,
    /// Screen snapshot and status message
    ui: UiState,
    /// Whether to continue running
    running: bool,
}

impl App {
    /// Take over the terminal for a session
    pub fn new(session: Session<MemorySink>, direction: ScaleDirection) -> io::Result<Self> {
        let runtime = Runtime::new()?;

        // Setup terminal
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen, EnableMouseCapture, EnableFocusChange)?;
        let release_events = matches!(supports_keyboard_enhancement(), Ok(true));
        if release_events {
            execute!(
                stdout,
                PushKeyboardEnhancementFlags(KeyboardEnhancementFlags::REPORT_EVENT_TYPES)
            )?;
        }
        let backend = CrosstermBackend::new(stdout);
        let terminal = Terminal::new(backend)?;

        let (timer_tx, timer_rx) = unbounded_channel();
        let ui = UiState::capture(&session, direction, release_events);
        Ok(Self {
            session,
            terminal,
            runtime,
            timer_tx,
            timer_rx,
            preview: None,
            direction,
            ui,
            running: true,
        })
    }

    /// Stop the app
    pub fn quit(&mut self) {
        self.running = false;
    }

    /// Event loop: input, expired note-offs, redraw
    pub fn run(&mut self) -> io::Result<()> {
        self.draw()?;
        while self.running {
            if let Some(event) = self.poll_event()? {
                self.handle_event(event);
            }
            while let Ok(timer) = self.timer_rx.try_recv() {
                self.handle_timer(timer);
            }
            self.draw()?;
        }
        self.stop_preview();
        self.session.dispose();
        Ok(())
    }

    /// Poll for events with timeout
    pub fn poll_event(&self) -> io::Result<Option<Event>> {
        let timeout = Duration::from_millis(1000 / FRAME_RATE);
        if event::poll(timeout)? {
            Ok(Some(event::read()?))
        } else {
            Ok(None)
        }
    }

    fn handle_event(&mut self, event: Event) {
        match event {
            Event::Key(key) => {
                self.ensure_audio();
                self.handle_key(key);
            }
            Event::Mouse(mouse) => {
                self.ensure_audio();
                self.handle_mouse(mouse);
            }
            Event::FocusLost => {
                self.stop_preview();
                self.session.blur();
            }
            _ => {}
        }
    }

    fn handle_timer(&mut self, timer: TimerEvent) {
        match timer {
            TimerEvent::Release(pending) => {
                self.session.complete_single_shot(pending);
            }
            TimerEvent::ScaleStep(pitch) => {
                if let Err(e) = self.session.play_scale_step(pitch) {
                    warn!("scale preview failed: {}", e);
                    self.stop_preview();
                    self.set_status(format!("Scale preview failed: {}", e));
                }
            }
        }
    }

    /// Start a scale preview paced by the runtime; the event loop keeps
    /// handling input while it plays. Replaces any preview in progress.
    fn start_preview(&mut self) {
        self.stop_preview();
        let (pitches, beat) = self.session.scale_preview_steps(self.direction);
        let steps = pitches.into_iter().map(TimerEvent::ScaleStep).collect();
        let _guard = self.runtime.enter();
        self.preview = Some(spawn_sequence(steps, beat, self.timer_tx.clone()));
    }

    fn stop_preview(&mut self) {
        if let Some(handle) = self.preview.take() {
            handle.abort();
        }
    }

    /// Audio starts on the first gesture
    fn ensure_audio(&mut self) {
        if self.session.audio().is_ready() {
            return;
        }
        if let Err(e) = self.session.initialize_audio() {
            self.set_status(format!("Audio unavailable: {}", e));
        }
    }

    /// Handle a key event
    pub fn handle_key(&mut self, key: KeyEvent) {
        if !self.ui.release_events && self.handle_key_without_release(&key) {
            return;
        }
        let disposition = self
            .session
            .handle_key(key.code, key.modifiers, key.kind, FocusTarget::Performance);
        if disposition == KeyDisposition::PassThrough && key.kind == KeyEventKind::Press {
            self.handle_host_key(key.code, key.modifiers);
        }
    }

    /// Without release reporting a held note would never stop, so notes
    /// play as single shots and the sustain key latches.
    fn handle_key_without_release(&mut self, key: &KeyEvent) -> bool {
        if !self.session.is_enabled() {
            return false;
        }
        let intent = self
            .session
            .controller()
            .classify(key.code, key.modifiers, key.kind, FocusTarget::Performance);
        match intent {
            KeyIntent::NoteDown { key, chord } => {
                for pitch in self.session.resolve_key(key, chord) {
                    self.single_shot(pitch, SourceKind::Keyboard);
                }
                true
            }
            KeyIntent::SustainDown => {
                if self.session.state().is_sustain_down() {
                    self.session.sustain_up();
                } else {
                    self.session.sustain_down();
                }
                true
            }
            _ => false,
        }
    }

    /// Keys the performer passed through
    fn handle_host_key(&mut self, code: KeyCode, modifiers: KeyModifiers) {
        match code {
            KeyCode::Esc => self.quit(),
            KeyCode::Char('c') if modifiers.contains(KeyModifiers::CONTROL) => self.quit(),
            KeyCode::Enter => self.start_preview(),
            KeyCode::Tab => {
                self.direction = next_direction(self.direction);
            }
            KeyCode::Left | KeyCode::Right => {
                let step = if code == KeyCode::Left { -1 } else { 1 };
                let root = self.session.context().root.transpose(step);
                self.session.set_root(root);
            }
            KeyCode::Up | KeyCode::Down => {
                let step = if code == KeyCode::Up { 1 } else { -1 };
                let octave = self.session.context().base_octave + step;
                if let Err(e) = self.session.set_base_octave(octave) {
                    debug!("octave change ignored: {}", e);
                }
            }
            KeyCode::F(n @ 1..=7) => match self.session.preview_chord(n) {
                Ok(chord) => self.set_status(format!("{}", chord)),
                Err(e) => self.set_status(format!("Chord preview failed: {}", e)),
            },
            _ => {}
        }
    }

    fn handle_mouse(&mut self, mouse: MouseEvent) {
        if mouse.kind != MouseEventKind::Down(MouseButton::Left) {
            return;
        }
        let Ok(size) = self.terminal.size() else {
            return;
        };
        let (degree, offset) = click_target(mouse.column, mouse.row, size.width, size.height);
        if let Some(pitch) = self.session.degree_pitch(degree, offset) {
            self.single_shot(pitch, SourceKind::Mouse);
        }
    }

    fn single_shot(&mut self, pitch: Pitch, source: SourceKind) {
        if let Some(pending) = self.session.play_single_shot(pitch, source) {
            let _guard = self.runtime.enter();
            spawn_release_timer(pending.after, TimerEvent::Release(pending), self.timer_tx.clone());
        }
    }

    fn set_status(&mut self, message: String) {
        debug!("status: {}", message);
        self.ui.set_status(message);
    }

    /// Draw the UI
    pub fn draw(&mut self) -> io::Result<()> {
        self.ui.refresh(&self.session, self.direction);
        self.ui.clear_expired_status();
        let state = &self.ui;
        let controls = self.session.controller().layout().controls().clone();

        self.terminal.draw(|frame| {
            let area = frame.area();

            // Main layout: header, keys, analysis, status
            let chunks = Layout::default()
                .direction(Direction::Vertical)
                .constraints([
                    Constraint::Length(3), // Mode
                    Constraint::Min(6),    // Keys
                    Constraint::Length(4), // Analysis
                    Constraint::Length(1), // Status bar
                ])
                .split(area);

            render_header(frame, chunks[0], state);
            frame.render_widget(
                KeysWidget::new(&state.rows).block(Block::default().borders(Borders::ALL).title(" Keyboard ")),
                chunks[1],
            );
            render_analysis(frame, chunks[2], state);
            render_status_bar(frame, chunks[3], state);

            if state.show_help {
                render_help_overlay(frame, area, &controls);
            }
        })?;

        Ok(())
    }

    /// Cleanup terminal on drop
    fn cleanup(&mut self) -> io::Result<()> {
        disable_raw_mode()?;
        if self.ui.release_events {
            execute!(self.terminal.backend_mut(), PopKeyboardEnhancementFlags)?;
        }
        execute!(
            self.terminal.backend_mut(),
            LeaveAlternateScreen,
            DisableMouseCapture,
            DisableFocusChange
        )?;
        self.terminal.show_cursor()?;
        Ok(())
    }
}

impl Drop for App {
    fn drop(&mut self) {
        let _ = self.cleanup();
    }
}

/// Render mode header
fn render_header(frame: &mut Frame, area: Rect, state: &UiState) {
    let block = Block::default().borders(Borders::ALL).title(" modekeys ");
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let performer = if state.enabled {
        Span::styled("● PLAY ", Style::default().fg(Color::Green).add_modifier(Modifier::BOLD))
    } else {
        Span::styled("■ OFF  ", Style::default().fg(Color::DarkGray))
    };
    let pedal = if state.sustain_down {
        Span::styled(" PEDAL ", Style::default().fg(Color::Black).bg(Color::Yellow))
    } else {
        Span::styled(" pedal ", Style::default().fg(Color::DarkGray))
    };
    let mode = state.mode.descriptor();

    let line = Line::from(vec![
        performer,
        Span::styled(
            format!("{} {} ", state.root, mode.display_name),
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        ),
        Span::styled(format!("{} ", mode.formula), Style::default().fg(Color::White)),
        Span::styled(format!("oct {} ", state.base_octave), Style::default().fg(Color::Magenta)),
        Span::styled(format!("{:.0} BPM {:?} ", state.tempo, state.direction), Style::default().fg(Color::Magenta)),
        pedal,
    ]);
    frame.render_widget(Paragraph::new(line), inner);
}

/// Render sounding notes and mode guesses
fn render_analysis(frame: &mut Frame, area: Rect, state: &UiState) {
    let block = Block::default().borders(Borders::ALL).title(" Sounding ");
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let notes = if state.sounding.is_empty() {
        "-".to_string()
    } else {
        state.sounding.iter().map(|p| p.to_string()).collect::<Vec<_>>().join(" ")
    };
    let guesses = state
        .candidates
        .iter()
        .map(|c| format!("{} {} ({:.2})", c.root, c.mode, c.score))
        .collect::<Vec<_>>()
        .join(", ");

    let lines = vec![
        Line::from(Span::styled(notes, Style::default().fg(Color::Green))),
        Line::from(Span::styled(guesses, Style::default().fg(Color::Gray))),
    ];
    frame.render_widget(Paragraph::new(lines), inner);
}

/// Render status bar
fn render_status_bar(frame: &mut Frame, area: Rect, state: &UiState) {
    let text = if let Some(ref msg) = state.status_message {
        Span::styled(msg, Style::default().fg(Color::Yellow))
    } else if !state.release_events {
        Span::styled(
            " Terminal does not report key releases: notes play as single shots, sustain latches",
            Style::default().fg(Color::DarkGray),
        )
    } else {
        Span::styled(
            " `: Performer | Space: Sustain | Shift: Chord | Shift+1-7: Mode | ?: Help | Esc: Quit",
            Style::default().fg(Color::DarkGray),
        )
    };

    frame.render_widget(Paragraph::new(text), area);
}

/// Render help overlay
fn render_help_overlay(frame: &mut Frame, area: Rect, controls: &crate::control::ControlKeys) {
    // Calculate centered area
    let width = 50.min(area.width.saturating_sub(4));
    let height = 18.min(area.height.saturating_sub(4));
    let x = (area.width - width) / 2;
    let y = (area.height - height) / 2;
    let help_area = Rect::new(x, y, width, height);

    // Clear background
    frame.render_widget(
        Block::default().style(Style::default().bg(Color::Black)),
        help_area,
    );

    let block = Block::default()
        .borders(Borders::ALL)
        .title(" Help ")
        .style(Style::default().bg(Color::Black));

    let inner = block.inner(help_area);
    frame.render_widget(block, help_area);

    let mut help_text = vec![
        Line::from(Span::styled("Play", Style::default().add_modifier(Modifier::BOLD))),
        Line::from("  Q-U / A-J / Z-M  Degrees 1-7, high/mid/low"),
        Line::from("  1-7         Degrees 1-7, mid octave"),
        Line::from("  Shift+key   Diatonic chord on the degree"),
        Line::from(format!("  {:<11} Sustain pedal", format_key(controls.sustain))),
        Line::from(format!("  {:<11} Performer on/off", format_key(controls.toggle))),
        Line::from(""),
        Line::from(Span::styled("Explore", Style::default().add_modifier(Modifier::BOLD))),
        Line::from("  Shift+1-7   Select mode"),
        Line::from("  ←/→         Root down/up a semitone"),
        Line::from("  ↑/↓         Octave up/down"),
        Line::from("  Enter       Play scale"),
        Line::from("  Tab         Scale direction"),
        Line::from("  F1-F7       Play chord on degree"),
        Line::from(""),
    ];
    help_text.push(Line::from(format!(
        "  {:<11} Toggle help | Esc/Ctrl+c Quit",
        format_key(controls.help)
    )));

    frame.render_widget(Paragraph::new(help_text), inner);
}
