// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Best-effort mode inference from a set of sounding pitch classes.
//!
//! Every (root, mode) pair is scored by the fraction of sounding pitch
//! classes it contains, with a fixed bonus for a closed match. This is a
//! heuristic ranking, not exact inference.

use super::mode::ModeName;
use super::pitch::Note;

/// Bonus added when every sounding pitch class belongs to the scale
pub const EXACT_MATCH_BONUS: f64 = 0.1;

/// Maximum number of candidates returned
pub const MAX_CANDIDATES: usize = 3;

/// A ranked guess at the mode being played
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModeCandidate {
    pub root: Note,
    pub mode: ModeName,
    pub score: f64,
}

/// Rank up to three modes that explain the sounding pitch classes.
///
/// Candidate roots are all twelve notes, or only `possible_root` when
/// given. Each mode appears at most once, with its best-scoring root.
/// Equal scores keep enumeration order (roots C..B, modes ionian..locrian),
/// which carries no musical meaning.
pub fn analyze_mode_from_notes(pitch_classes: &[u8], possible_root: Option<Note>) -> Vec<ModeCandidate> {
    let mut sounding = [false; 12];
    for &pc in pitch_classes {
        sounding[(pc % 12) as usize] = true;
    }
    let sounding_count = sounding.iter().filter(|&&s| s).count();
    if sounding_count == 0 {
        return Vec::new();
    }

    let roots: Vec<Note> = match possible_root {
        Some(root) => vec![root],
        None => Note::ALL.to_vec(),
    };

    let mut candidates = Vec::with_capacity(roots.len() * ModeName::ALL.len());
    for root in roots {
        for mode in ModeName::ALL {
            let mut in_scale = [false; 12];
            for &interval in &mode.descriptor().intervals {
                in_scale[(root.pitch_class() + interval) as usize % 12] = true;
            }
            let matches = (0..12).filter(|&pc| sounding[pc] && in_scale[pc]).count();
            let mut score = matches as f64 / sounding_count as f64;
            if matches == sounding_count {
                score += EXACT_MATCH_BONUS;
            }
            candidates.push(ModeCandidate { root, mode, score });
        }
    }

    // Stable sort keeps enumeration order among ties
    candidates.sort_by(|a, b| b.score.total_cmp(&a.score));

    let mut ranked: Vec<ModeCandidate> = Vec::with_capacity(MAX_CANDIDATES);
    for candidate in candidates {
        if ranked.iter().any(|c| c.mode == candidate.mode) {
            continue;
        }
        ranked.push(candidate);
        if ranked.len() == MAX_CANDIDATES {
            break;
        }
    }
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_major_scale_with_root_ranks_ionian_first() {
        let ranked = analyze_mode_from_notes(&[0, 2, 4, 5, 7, 9, 11], Some(Note::C));
        assert_eq!(ranked.len(), 3);
        assert_eq!(ranked[0].mode, ModeName::Ionian);
        assert_eq!(ranked[0].root, Note::C);
        assert!((ranked[0].score - 1.1).abs() < 1e-9);
        assert!(ranked[1].score < ranked[0].score);
    }

    #[test]
    fn test_without_root_every_rotation_matches_exactly() {
        // The white keys are an exact match for all seven modes on some root;
        // ties fall back to enumeration order (C ionian first).
        let ranked = analyze_mode_from_notes(&[0, 2, 4, 5, 7, 9, 11], None);
        assert_eq!(ranked.len(), 3);
        assert!(ranked.iter().all(|c| (c.score - 1.1).abs() < 1e-9));
        assert_eq!((ranked[0].root, ranked[0].mode), (Note::C, ModeName::Ionian));
        assert_eq!((ranked[1].root, ranked[1].mode), (Note::D, ModeName::Dorian));
        assert_eq!((ranked[2].root, ranked[2].mode), (Note::E, ModeName::Phrygian));
    }

    #[test]
    fn test_modes_are_deduplicated() {
        let ranked = analyze_mode_from_notes(&[0, 4, 7], None);
        let mut modes: Vec<ModeName> = ranked.iter().map(|c| c.mode).collect();
        modes.sort();
        modes.dedup();
        assert_eq!(modes.len(), ranked.len());
    }

    #[test]
    fn test_partial_match_score() {
        // C D Eb: dorian and aeolian hold all three, ionian only two
        let ranked = analyze_mode_from_notes(&[0, 2, 3], Some(Note::C));
        assert_eq!(ranked[0].mode, ModeName::Dorian);
        assert!((ranked[0].score - 1.1).abs() < 1e-9);
        assert_eq!(ranked[1].mode, ModeName::Aeolian);
        assert_eq!(ranked[2].mode, ModeName::Ionian);
        assert!((ranked[2].score - 2.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_duplicates_and_octaves_count_once() {
        let a = analyze_mode_from_notes(&[0, 12, 24, 4, 16, 7], Some(Note::C));
        let b = analyze_mode_from_notes(&[0, 4, 7], Some(Note::C));
        assert_eq!(a, b);
    }

    #[test]
    fn test_empty_input() {
        assert!(analyze_mode_from_notes(&[], None).is_empty());
    }

    #[test]
    fn test_no_exact_match_still_ranks() {
        // All twelve pitch classes: no mode holds them, every mode scores 7/12
        let chromatic: Vec<u8> = (0..12).collect();
        let ranked = analyze_mode_from_notes(&chromatic, Some(Note::C));
        assert_eq!(ranked.len(), 3);
        assert!(ranked.iter().all(|c| (c.score - 7.0 / 12.0).abs() < 1e-9));
        assert!(!analyze_mode_from_notes(&[1], Some(Note::C)).is_empty());
    }

    #[test]
    fn test_lydian_sharp_four() {
        let ranked = analyze_mode_from_notes(&[5, 7, 9, 11, 0, 2, 4], Some(Note::F));
        assert_eq!(ranked[0].mode, ModeName::Lydian);
    }
}
