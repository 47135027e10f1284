// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Integration tests for modekeys
//!
//! These tests drive the public API the way the terminal performer does:
//! raw key events into a session, with an in-memory sink recording what
//! would have sounded.

use std::time::Duration;

use crossterm::event::{KeyCode, KeyEventKind, KeyModifiers};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use modekeys::audio::{AudioError, Envelope, MemorySink, SinkCall};
use modekeys::config::SessionFile;
use modekeys::control::{FocusTarget, KeyboardController};
use modekeys::music::{
    analyze_mode_from_notes, build_chord_from_degree, frequency_to_midi, generate_diatonic_chords, generate_scale,
    midi_to_frequency, ChordQuality, HarmonicFunction, ModeName, Note, Pitch,
};
use modekeys::performance::{KeyDisposition, Session, SessionSettings, SourceKind};

fn ready_session() -> Session<MemorySink> {
    let mut session = Session::new(MemorySink::new(), KeyboardController::default(), SessionSettings::default());
    session.initialize_audio().unwrap();
    session.set_enabled(true);
    session
}

fn key(session: &mut Session<MemorySink>, code: KeyCode, modifiers: KeyModifiers, kind: KeyEventKind) -> KeyDisposition {
    session.handle_key(code, modifiers, kind, FocusTarget::Performance)
}

fn press(session: &mut Session<MemorySink>, c: char) -> KeyDisposition {
    key(session, KeyCode::Char(c), KeyModifiers::NONE, KeyEventKind::Press)
}

fn release(session: &mut Session<MemorySink>, c: char) -> KeyDisposition {
    key(session, KeyCode::Char(c), KeyModifiers::NONE, KeyEventKind::Release)
}

fn pedal(session: &mut Session<MemorySink>, down: bool) {
    let kind = if down { KeyEventKind::Press } else { KeyEventKind::Release };
    key(session, KeyCode::Char(' '), KeyModifiers::NONE, kind);
}

fn assert_idle(session: &Session<MemorySink>) {
    let state = session.state();
    assert!(state.pressed_keys().is_empty());
    assert!(state.held_notes().is_empty());
    assert!(state.sustained_notes().is_empty());
    assert!(state.key_to_notes().is_empty());
}

/// Scales have seven ascending pitches that follow the mode's pattern
#[test]
fn test_scale_shape_for_every_root_mode_octave() {
    for root in Note::ALL {
        for mode in ModeName::ALL {
            for octave in 1..=7 {
                let scale = generate_scale(root, mode, octave);
                let notes = scale.notes();
                assert_eq!(notes.len(), 7);
                assert_eq!(notes[0].note(), root);
                assert!(notes.windows(2).all(|w| w[0].midi() < w[1].midi()));

                let intervals: Vec<i32> = notes.iter().map(|p| p.midi() - notes[0].midi()).collect();
                let expected: Vec<i32> = mode.descriptor().intervals.iter().map(|&i| i32::from(i)).collect();
                assert_eq!(intervals, expected, "{} {} {}", root, mode, octave);
            }
        }
    }
}

#[test]
fn test_transpose_round_trip() {
    let mut rng = StdRng::seed_from_u64(7);
    for _ in 0..500 {
        let pitch = Pitch::from_midi(rng.gen_range(12..=108));
        let n = rng.gen_range(-36..=36);
        assert_eq!(pitch.transpose(n).transpose(-n), pitch);
    }
}

#[test]
fn test_frequency_round_trip_within_half_semitone() {
    let mut rng = StdRng::seed_from_u64(440);
    for _ in 0..500 {
        let f: f64 = rng.gen_range(27.5..=4186.0);
        let midi = frequency_to_midi(f).unwrap();
        let back = midi_to_frequency(midi);
        let semitones = 12.0 * (back / f).log2();
        assert!(semitones.abs() <= 0.5 + 1e-9, "{} Hz -> {} -> {} Hz", f, midi, back);
    }
}

#[test]
fn test_c_ionian_diatonic_chords() {
    let chords = generate_diatonic_chords(Note::C, ModeName::Ionian, 4);
    let expected = [
        ("I", "C", [Note::C, Note::E, Note::G], HarmonicFunction::Tonic),
        ("ii", "Dm", [Note::D, Note::F, Note::A], HarmonicFunction::Subdominant),
        ("iii", "Em", [Note::E, Note::G, Note::B], HarmonicFunction::Other),
        ("IV", "F", [Note::F, Note::A, Note::C], HarmonicFunction::Subdominant),
        ("V", "G", [Note::G, Note::B, Note::D], HarmonicFunction::Dominant),
        ("vi", "Am", [Note::A, Note::C, Note::E], HarmonicFunction::Tonic),
        ("vii°", "B°", [Note::B, Note::D, Note::F], HarmonicFunction::Dominant),
    ];

    assert_eq!(chords.len(), 7);
    for (chord, (numeral, name, notes, function)) in chords.iter().zip(expected) {
        assert_eq!(chord.roman_numeral(), Some(numeral));
        assert_eq!(chord.name(), name);
        let actual: Vec<Note> = chord.notes().iter().map(|p| p.note()).collect();
        assert_eq!(actual, notes);
        assert_eq!(chord.function(), Some(function));
    }
    assert_eq!(chords[6].quality(), ChordQuality::Diminished);

    // Same inputs, same chords
    assert_eq!(chords, generate_diatonic_chords(Note::C, ModeName::Ionian, 4));
}

#[test]
fn test_dorian_tonic_is_minor() {
    let chord = build_chord_from_degree(Note::D, ModeName::Dorian, 1, 3).unwrap();
    assert_eq!(chord.quality(), ChordQuality::Minor);
    let names: Vec<String> = chord.notes().iter().map(|p| p.to_string()).collect();
    assert_eq!(names, vec!["D3", "F3", "A3"]);

    assert!(build_chord_from_degree(Note::D, ModeName::Dorian, 0, 3).is_none());
    assert!(build_chord_from_degree(Note::D, ModeName::Dorian, 8, 3).is_none());
}

#[test]
fn test_major_pitch_classes_rank_ionian_first() {
    let candidates = analyze_mode_from_notes(&[0, 2, 4, 5, 7, 9, 11], Some(Note::C));
    assert_eq!(candidates[0].mode, ModeName::Ionian);
    assert_eq!(candidates[0].root, Note::C);
    assert!((candidates[0].score - 1.1).abs() < 1e-9);
    assert!(candidates.iter().skip(1).all(|c| c.score < candidates[0].score));
}

#[test]
fn test_press_release_leaves_nothing_sounding() {
    let mut session = ready_session();
    assert_eq!(press(&mut session, 'a'), KeyDisposition::Consumed);
    assert_eq!(release(&mut session, 'a'), KeyDisposition::Consumed);

    assert_idle(&session);
    assert!(session.sink().sounding().is_empty());
}

#[test]
fn test_auto_repeat_attacks_once() {
    let mut session = ready_session();
    press(&mut session, 'a');
    key(&mut session, KeyCode::Char('a'), KeyModifiers::NONE, KeyEventKind::Repeat);
    press(&mut session, 'a');

    assert_eq!(session.sink().attack_count(60), 1);
    release(&mut session, 'a');
    assert_eq!(session.sink().release_count(60), 1);
}

#[test]
fn test_sustain_compounds_restrikes() {
    let mut session = ready_session();
    pedal(&mut session, true);
    assert_eq!(session.sink().envelope(), Envelope::SustainPedal);

    for _ in 0..3 {
        press(&mut session, 'a');
        release(&mut session, 'a');
    }
    assert_eq!(session.sink().attack_count(60), 3);
    assert_eq!(session.sink().release_count(60), 0);
    assert!(session.state().sustained_notes().contains_key(&60));
    // The key still owns its sustained note
    assert!(session.state().key_to_notes().contains_key(&KeyCode::Char('a')));

    pedal(&mut session, false);
    assert_eq!(session.sink().release_count(60), 1);
    assert_eq!(session.sink().envelope(), Envelope::Natural);
    assert_idle(&session);
}

#[test]
fn test_pedal_up_spares_keys_still_down() {
    let mut session = ready_session();
    press(&mut session, 'a');
    pedal(&mut session, true);
    pedal(&mut session, false);

    assert_eq!(session.sink().sounding(), vec![60]);
    release(&mut session, 'a');
    assert!(session.sink().sounding().is_empty());
}

#[test]
fn test_shared_pitch_survives_restrike_release() {
    let mut session = ready_session();
    press(&mut session, 'a');
    pedal(&mut session, true);
    press(&mut session, '1');
    release(&mut session, '1');
    pedal(&mut session, false);

    // 'a' is still down on C4
    assert_eq!(session.sink().sounding(), vec![60]);
    assert!(session.state().held_notes().contains_key(&60));

    release(&mut session, 'a');
    assert!(session.sink().sounding().is_empty());
    assert_idle(&session);
}

#[test]
fn test_chord_release_frees_every_note() {
    let mut session = ready_session();
    key(&mut session, KeyCode::Char('A'), KeyModifiers::SHIFT, KeyEventKind::Press);
    assert_eq!(session.sink().sounding(), vec![60, 64, 67]);

    key(&mut session, KeyCode::Char('A'), KeyModifiers::SHIFT, KeyEventKind::Release);
    for midi in [60, 64, 67] {
        assert_eq!(session.sink().release_count(midi), 1);
    }
    assert_idle(&session);
}

#[test]
fn test_blur_releases_held_and_sustained() {
    let mut session = ready_session();
    press(&mut session, 'a');
    press(&mut session, 's');
    pedal(&mut session, true);
    press(&mut session, 'd');
    release(&mut session, 'd');
    session.sink_mut().clear_calls();

    session.blur();

    assert_eq!(session.sink().total_releases(), 3);
    assert!(session.sink().sounding().is_empty());
    assert_eq!(session.sink().envelope(), Envelope::Natural);
    assert_idle(&session);
    assert!(!session.state().is_sustain_down());

    // Releases arriving after the flush are harmless
    assert_eq!(release(&mut session, 'a'), KeyDisposition::PassThrough);
    assert_eq!(session.sink().total_releases(), 3);
}

#[test]
fn test_disable_flushes() {
    let mut session = ready_session();
    press(&mut session, 'a');
    key(&mut session, KeyCode::Char('`'), KeyModifiers::NONE, KeyEventKind::Press);

    assert!(!session.is_enabled());
    assert!(session.sink().sounding().is_empty());
    assert_idle(&session);
}

#[test]
fn test_not_ready_calls_are_no_ops() {
    let mut session = Session::new(MemorySink::new(), KeyboardController::default(), SessionSettings::default());
    session.set_enabled(true);

    press(&mut session, 'a');
    pedal(&mut session, true);
    release(&mut session, 'a');
    session.blur();

    assert!(session.sink().calls().is_empty());
    assert_idle(&session);

    // Initialization failure is reported, and the session recovers on retry
    session.sink_mut().fail_next_init();
    assert!(matches!(session.initialize_audio(), Err(AudioError::InitFailed(_))));
    session.initialize_audio().unwrap();
    press(&mut session, 'a');
    assert_eq!(session.sink().sounding(), vec![60]);
}

#[test]
fn test_failed_attack_keeps_state_consistent() {
    let mut session = ready_session();
    press(&mut session, 's');
    session.sink_mut().set_fail_attacks(true);

    key(&mut session, KeyCode::Char('A'), KeyModifiers::SHIFT, KeyEventKind::Press);
    assert!(!session.state().pressed_keys().contains(&KeyCode::Char('a')));
    assert_eq!(session.state().held_notes().keys().copied().collect::<Vec<_>>(), vec![62]);
    assert_eq!(session.sink().sounding(), vec![62]);

    session.sink_mut().set_fail_attacks(false);
    press(&mut session, 'a');
    assert_eq!(session.sink().sounding(), vec![60, 62]);
}

#[test]
fn test_navigation_and_text_focus_pass_through() {
    let mut session = ready_session();
    for code in [KeyCode::Tab, KeyCode::Enter, KeyCode::Esc, KeyCode::Left, KeyCode::PageDown] {
        assert_eq!(key(&mut session, code, KeyModifiers::NONE, KeyEventKind::Press), KeyDisposition::PassThrough);
    }

    let typed = session.handle_key(KeyCode::Char('a'), KeyModifiers::NONE, KeyEventKind::Press, FocusTarget::TextInput);
    assert_eq!(typed, KeyDisposition::PassThrough);
    assert!(session.sink().calls().iter().all(|c| matches!(c, SinkCall::Initialize)));
}

#[test]
fn test_shift_digit_selects_mode_even_when_disabled() {
    let mut session = ready_session();
    session.set_enabled(false);

    key(&mut session, KeyCode::Char('5'), KeyModifiers::SHIFT, KeyEventKind::Press);
    assert_eq!(session.context().mode, ModeName::Mixolydian);
    key(&mut session, KeyCode::Char('&'), KeyModifiers::SHIFT, KeyEventKind::Press);
    assert_eq!(session.context().mode, ModeName::Locrian);
    assert_eq!(session.sink().total_attacks(), 0);

    // Unshifted digits are scale degrees: locrian's flat second
    session.set_enabled(true);
    press(&mut session, '2');
    assert_eq!(session.sink().sounding(), vec![61]);
}

#[test]
fn test_single_shot_is_separate_from_key_tracking() {
    let mut session = ready_session();
    let pending = session.play_single_shot(Pitch::new(Note::A, 4), SourceKind::Touch).unwrap();
    assert_eq!(pending.after, Duration::from_millis(500));
    assert_idle(&session);
    assert_eq!(session.sink().sounding(), vec![69]);

    assert!(session.complete_single_shot(pending));
    assert!(session.sink().sounding().is_empty());
}

#[test]
fn test_session_from_config_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("session.toml");
    std::fs::write(
        &path,
        r#"
[session]
root = "D"
mode = "dorian"
octave = 3

[[keyboard]]
key = "l"
degree = 3
octave = 1

[controls]
sustain = "f1"
"#,
    )
    .unwrap();

    let file = SessionFile::load(&path).unwrap();
    file.validate().unwrap();
    let mut session = Session::new(
        MemorySink::new(),
        KeyboardController::new(file.layout().unwrap()),
        file.settings().unwrap(),
    );
    session.initialize_audio().unwrap();
    session.set_enabled(true);

    // D dorian degree 3 one octave above base: F4
    press(&mut session, 'l');
    assert_eq!(session.sink().sounding(), vec![65]);

    key(&mut session, KeyCode::F(1), KeyModifiers::NONE, KeyEventKind::Press);
    assert!(session.state().is_sustain_down());
    // Space is an ordinary unmapped key now
    assert_eq!(press(&mut session, ' '), KeyDisposition::PassThrough);
}
