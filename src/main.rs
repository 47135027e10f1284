// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

use std::env;
use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Mutex;

use anyhow::{Context, Result};
use tracing::Level;

use modekeys::audio::MemorySink;
use modekeys::config::SessionFile;
use modekeys::control::KeyboardController;
use modekeys::music::{
    all_modes_by_brightness, all_modes_in_traditional_order, analyze_mode_from_notes, generate_diatonic_chords,
    Note, Scale,
};
use modekeys::performance::Session;
use modekeys::ui::App;

fn print_usage() {
    println!("modekeys - Diatonic mode explorer");
    println!();
    println!("Usage: modekeys [OPTIONS]");
    println!();
    println!("Options:");
    println!("  --modes [--brightness]         List the seven modes (darkest first with --brightness)");
    println!("  --scale <ROOT> <MODE> [OCT]    Print a scale (default octave 4)");
    println!("  --chords <ROOT> <MODE> [OCT]   Print the diatonic triads of a scale");
    println!("  --analyze <PC>... [--root N]   Guess modes from pitch classes (0-11 or note names)");
    println!("  --play [CONFIG] [--log FILE]   Interactive keyboard performer");
    println!("  --verbose                      Debug logging");
    println!("  --help                         Show this help message");
}

fn init_logging(level: Level) {
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();
}

/// The performer owns the terminal, so its log goes to a file or nowhere
fn init_file_logging(path: &str, level: Level) -> Result<()> {
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("Failed to open log file {}", path))?;
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_ansi(false)
        .with_writer(Mutex::new(file))
        .init();
    Ok(())
}

fn list_modes(by_brightness: bool) {
    let modes = if by_brightness {
        all_modes_by_brightness()
    } else {
        all_modes_in_traditional_order()
    };
    for mode in modes {
        println!(
            "{:<11} {:<15} brightness {}  {:<9} {}",
            mode.display_name, mode.formula, mode.brightness, mode.color, mode.mood
        );
        println!("            {}", mode.description);
    }
}

/// Parse `ROOT MODE [OCT]` starting at `args[start]`
fn parse_scale_args(args: &[String], start: usize, option: &str) -> Result<Scale> {
    if args.len() < start + 2 {
        anyhow::bail!("{} requires a root and a mode, e.g. {} D dorian", option, option);
    }
    let octave: i32 = match args.get(start + 2) {
        Some(text) => text
            .parse()
            .map_err(|_| anyhow::anyhow!("Invalid octave: {}", text))?,
        None => 4,
    };
    Ok(Scale::parse(&args[start], &args[start + 1], octave)?)
}

fn print_scale(scale: &Scale) {
    let mode = scale.mode().descriptor();
    println!("{} {} ({})", scale.root(), mode.display_name, mode.formula);
    for (i, pitch) in scale.with_octave_note().iter().enumerate() {
        let degree = i % 7 + 1;
        let marker = if i < 7 && mode.is_characteristic(degree as u8) { "*" } else { " " };
        println!("  {}{} {:<4} MIDI {:>3}  {:>8.2} Hz", degree, marker, pitch, pitch.midi(), pitch.frequency());
    }
    if scale.mode() != modekeys::music::ModeName::Ionian {
        println!("  Parent major: {}", scale.parent_ionian_root());
    }
}

fn print_chords(scale: &Scale) {
    let chords = generate_diatonic_chords(scale.root(), scale.mode(), scale.octave());
    println!("{}", scale);
    for chord in &chords {
        let notes: Vec<String> = chord.notes().iter().map(|p| p.to_string()).collect();
        println!(
            "  {:<5} {:<6} {:<12} {}",
            chord.roman_numeral().unwrap_or("-"),
            chord.name(),
            chord.function().map(|f| f.name()).unwrap_or("-"),
            notes.join(" ")
        );
    }
}

/// Pitch classes as numbers or note names, plus an optional `--root`
fn parse_analyze_args(args: &[String]) -> Result<(Vec<u8>, Option<Note>)> {
    let mut pitch_classes = Vec::new();
    let mut root = None;
    let mut i = 0;
    while i < args.len() {
        let arg = &args[i];
        if arg == "--root" {
            let name = args
                .get(i + 1)
                .ok_or_else(|| anyhow::anyhow!("--root requires a note name"))?;
            root = Some(name.parse::<Note>()?);
            i += 2;
            continue;
        }
        let pc = match arg.parse::<i32>() {
            Ok(n) => Note::from_pitch_class(n).pitch_class(),
            Err(_) => arg.parse::<Note>()?.pitch_class(),
        };
        pitch_classes.push(pc);
        i += 1;
    }
    Ok((pitch_classes, root))
}

fn analyze(args: &[String]) -> Result<()> {
    let (pitch_classes, root) = parse_analyze_args(args)?;
    if pitch_classes.is_empty() {
        anyhow::bail!("--analyze requires at least one pitch class");
    }
    for candidate in analyze_mode_from_notes(&pitch_classes, root) {
        println!("  {:<3} {:<11} {:.2}", candidate.root, candidate.mode.to_string(), candidate.score);
    }
    Ok(())
}

fn play(config: Option<&str>) -> Result<()> {
    let file = match config {
        Some(path) => SessionFile::load(Path::new(path))?,
        None => SessionFile::default(),
    };
    file.validate()?;
    let settings = file.settings()?;
    let layout = file.layout()?;

    let session = Session::new(MemorySink::new(), KeyboardController::new(layout), settings);
    let mut app = App::new(session, file.session.direction).context("Failed to start terminal UI")?;
    app.run().context("Terminal UI failed")?;
    Ok(())
}

fn main() -> Result<()> {
    let mut args: Vec<String> = env::args().collect();
    let verbose = args.iter().any(|a| a == "--verbose" || a == "-v");
    args.retain(|a| a != "--verbose" && a != "-v");

    if args.len() < 2 {
        println!("modekeys - Diatonic mode explorer");
        println!("Run with --help for usage information");
        return Ok(());
    }

    if args[1] != "--play" {
        init_logging(if verbose { Level::DEBUG } else { Level::WARN });
    }

    match args[1].as_str() {
        "--modes" => {
            list_modes(args.iter().any(|a| a == "--brightness"));
        }
        "--scale" => {
            let scale = parse_scale_args(&args, 2, "--scale")?;
            print_scale(&scale);
        }
        "--chords" => {
            let scale = parse_scale_args(&args, 2, "--chords")?;
            print_chords(&scale);
        }
        "--analyze" => {
            analyze(&args[2..])?;
        }
        "--play" => {
            let mut config = None;
            let mut log = None;
            let mut rest = args[2..].iter();
            while let Some(arg) = rest.next() {
                if arg == "--log" {
                    log = Some(
                        rest.next()
                            .ok_or_else(|| anyhow::anyhow!("--log requires a file path"))?
                            .clone(),
                    );
                } else {
                    config = Some(arg.clone());
                }
            }
            if let Some(path) = log {
                let level = match &config {
                    _ if verbose => Level::DEBUG,
                    Some(path) => SessionFile::load(path)?.log_level()?,
                    None => Level::INFO,
                };
                init_file_logging(&path, level)?;
            }
            play(config.as_deref())?;
        }
        "--help" | "-h" => {
            print_usage();
        }
        _ => {
            eprintln!("Unknown option: {}", args[1]);
            print_usage();
            std::process::exit(1);
        }
    }

    Ok(())
}
