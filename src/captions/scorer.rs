//! Song-likelihood heuristics for caption segments.
//!
//! score = 0.40 * density + 0.35 * repetition + 0.25 * keywords, clamped to [0, 1].

use super::CaptionSegment;
use crate::chapters::{placeholder_label, Candidate, SectionSource};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;
use tracing::debug;

pub const WEIGHT_DENSITY: f64 = 0.40;
pub const WEIGHT_REPETITION: f64 = 0.35;
pub const WEIGHT_KEYWORDS: f64 = 0.25;

/// Labels are cut to this many characters
pub const MAX_CAPTION_LABEL_CHARS: usize = 60;

/// Keyword hits at which the keyword sub-score saturates
const KEYWORD_SATURATION: f64 = 3.0;

/// Music markers and onomatopoeia, counted once per occurrence
static MUSIC_TOKENS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)[♪♫♬♩🎵🎶]|\[(?:music|singing|音楽)\]|\((?:music|singing|音楽)\)|\b(?:la|na|da|oh|ah|yeah|woah|whoa)(?:[\s\-~]+(?:la|na|da|oh|ah|yeah|woah|whoa))+\b|\b(?:lalala+|nanana+|dadada+|shalala+)\b",
    )
    .expect("music token pattern is valid")
});

/// Held vowels: "ooooh", "yeaaah", "あーー", "〜〜"
static VOWEL_EXTENSION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)a{3,}|e{3,}|i{3,}|o{3,}|u{3,}|ー{2,}|〜{2,}|~{2,}")
        .expect("vowel extension pattern is valid")
});

/// Scores caption segments; never drops any
#[derive(Debug, Clone, Default)]
pub struct CaptionScorer;

impl CaptionScorer {
    pub fn new() -> Self {
        Self
    }

    /// One candidate per input segment, in input order
    pub fn score(&self, segments: &[CaptionSegment]) -> Vec<Candidate> {
        let baseline = density_baseline(segments);
        let line_sets: Vec<HashSet<String>> = segments
            .iter()
            .map(|s| normalized_lines(&s.text).into_iter().collect())
            .collect();

        segments
            .iter()
            .enumerate()
            .map(|(i, segment)| {
                let density = density_score(segment, baseline);
                let repetition = repetition_score(
                    &segment.text,
                    i.checked_sub(1).and_then(|p| line_sets.get(p)),
                    line_sets.get(i + 1),
                );
                let keywords = keyword_score(&segment.text);

                let combined = WEIGHT_DENSITY * density
                    + WEIGHT_REPETITION * repetition
                    + WEIGHT_KEYWORDS * keywords;
                let score = if combined.is_finite() { combined.clamp(0.0, 1.0) } else { 0.0 };

                debug!(
                    "Caption segment {}-{}s: density={:.2} repetition={:.2} keywords={:.2} -> {:.2}",
                    segment.start_sec, segment.end_sec, density, repetition, keywords, score
                );

                // Candidates always span at least one second
                let start_sec = segment.start_sec.min(u32::MAX - 1);
                let end_sec = segment.end_sec.max(start_sec + 1);

                Candidate {
                    start_sec,
                    end_sec,
                    score,
                    label: caption_label(&segment.text, i + 1),
                    source: SectionSource::Caption,
                }
            })
            .collect()
    }
}

fn char_count(text: &str) -> usize {
    text.chars().filter(|c| !c.is_whitespace()).count()
}

fn chars_per_second(segment: &CaptionSegment) -> f64 {
    let seconds = segment.end_sec.saturating_sub(segment.start_sec).max(1);
    char_count(&segment.text) as f64 / seconds as f64
}

/// Mean characters-per-second over all segments
fn density_baseline(segments: &[CaptionSegment]) -> f64 {
    if segments.is_empty() {
        return 0.0;
    }
    segments.iter().map(chars_per_second).sum::<f64>() / segments.len() as f64
}

/// A segment at the baseline scores 0.5, twice the baseline or more scores 1.0
fn density_score(segment: &CaptionSegment, baseline: f64) -> f64 {
    if baseline <= 0.0 {
        return 0.0;
    }
    (chars_per_second(segment) / (2.0 * baseline)).min(1.0)
}

/// Lowercased lines with punctuation stripped; single-line text is split into phrases
fn normalized_lines(text: &str) -> Vec<String> {
    let raw: Vec<&str> = if text.lines().filter(|l| !l.trim().is_empty()).count() > 1 {
        text.lines().collect()
    } else {
        text.split([',', '.', '!', '?', '、', '。']).collect()
    };

    raw.into_iter()
        .map(|line| {
            line.chars()
                .filter(|c| c.is_alphanumeric() || c.is_whitespace())
                .collect::<String>()
                .to_lowercase()
                .split_whitespace()
                .collect::<Vec<_>>()
                .join(" ")
        })
        .filter(|line| !line.is_empty())
        .collect()
}

/// Max of in-segment duplication and overlap with neighbouring segments
fn repetition_score(
    text: &str,
    previous: Option<&HashSet<String>>,
    next: Option<&HashSet<String>>,
) -> f64 {
    let lines = normalized_lines(text);
    if lines.is_empty() {
        return 0.0;
    }

    let unique: HashSet<&String> = lines.iter().collect();
    let within = if lines.len() > 1 {
        (lines.len() - unique.len()) as f64 / (lines.len() - 1) as f64
    } else {
        0.0
    };

    let shared = unique
        .iter()
        .filter(|line| {
            previous.is_some_and(|p| p.contains(**line)) || next.is_some_and(|n| n.contains(**line))
        })
        .count();
    let adjacent = shared as f64 / unique.len() as f64;

    within.max(adjacent).clamp(0.0, 1.0)
}

fn keyword_score(text: &str) -> f64 {
    let hits = MUSIC_TOKENS.find_iter(text).count() + VOWEL_EXTENSION.find_iter(text).count();
    (hits as f64 / KEYWORD_SATURATION).min(1.0)
}

/// First non-empty line, cut to `MAX_CAPTION_LABEL_CHARS`
fn caption_label(text: &str, position: usize) -> String {
    text.lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .map(|line| line.chars().take(MAX_CAPTION_LABEL_CHARS).collect::<String>())
        .unwrap_or_else(|| placeholder_label(position))
}
