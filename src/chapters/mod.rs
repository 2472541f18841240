//! Clip-candidate detection
//!
//! Turns a video's description, its comments, its platform chapters and its
//! caption track into a single ordered list of non-overlapping time ranges.

pub mod grammar;
pub mod extractor;
pub mod comments;
pub mod merger;
pub mod detector;

// Re-export main types
pub use grammar::TimestampGrammar;
pub use extractor::ChapterExtractor;
pub use comments::CommentSource;
pub use merger::CandidateMerger;
pub use detector::{CandidateDetector, DetectionRequest, RegistrationOutcome};

use crate::error::DetectionError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Provenance of a candidate. Declaration order is merge priority.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SectionSource {
    VideoDescription,
    Comment,
    YoutubeChapter,
    Caption,
}

impl SectionSource {
    /// Merge priority, 0 is highest
    pub fn priority(self) -> u8 {
        match self {
            Self::VideoDescription => 0,
            Self::Comment => 1,
            Self::YoutubeChapter => 2,
            Self::Caption => 3,
        }
    }

    /// Sources that come from authored structure rather than heuristics
    pub fn is_authored(self) -> bool {
        !matches!(self, Self::Caption)
    }
}

impl fmt::Display for SectionSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::VideoDescription => "VIDEO_DESCRIPTION",
            Self::Comment => "COMMENT",
            Self::YoutubeChapter => "YOUTUBE_CHAPTER",
            Self::Caption => "CAPTION",
        };
        f.write_str(name)
    }
}

/// Which sources a detection run consults
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum DetectionMode {
    /// Description, comment and platform chapters
    Chapters,
    /// Caption track only
    Captions,
    /// Every source, authored ones taking priority
    Combined,
}

impl DetectionMode {
    /// Whether candidates from `source` take part in this mode
    pub fn includes(self, source: SectionSource) -> bool {
        match self {
            Self::Chapters => source.is_authored(),
            Self::Captions => source == SectionSource::Caption,
            Self::Combined => true,
        }
    }
}

impl Default for DetectionMode {
    fn default() -> Self {
        Self::Combined
    }
}

impl fmt::Display for DetectionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Chapters => "chapters",
            Self::Captions => "captions",
            Self::Combined => "combined",
        };
        f.write_str(name)
    }
}

impl FromStr for DetectionMode {
    type Err = DetectionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "chapters" => Ok(Self::Chapters),
            "captions" => Ok(Self::Captions),
            "combined" => Ok(Self::Combined),
            other => Err(DetectionError::Validation(format!(
                "unknown mode '{}', expected chapters, captions or combined",
                other
            ))),
        }
    }
}

/// One timestamp hit inside a line of text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawMatch {
    /// Ordinal or bullet marker in front of the timestamp, as written
    pub prefix_consumed: String,
    pub hours: Option<u32>,
    pub minutes: u32,
    pub seconds: u32,
    /// Remainder of the line, trimmed. May be empty.
    pub label: String,
}

impl RawMatch {
    pub fn start_sec(&self) -> u32 {
        self.hours.unwrap_or(0) * 3600 + self.minutes * 60 + self.seconds
    }
}

/// A detected time range inside a video
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    pub start_sec: u32,
    /// Always greater than `start_sec`
    pub end_sec: u32,
    /// Confidence in [0, 1]
    pub score: f64,
    pub label: String,
    pub source: SectionSource,
}

impl Candidate {
    pub fn duration_secs(&self) -> u32 {
        self.end_sec.saturating_sub(self.start_sec)
    }

    /// Half-open range intersection
    pub fn overlaps(&self, other: &Candidate) -> bool {
        self.start_sec < other.end_sec && other.start_sec < self.end_sec
    }
}

/// Wire shape of a candidate handed to the routing layer
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CandidateResponse {
    pub start_sec: u32,
    pub end_sec: u32,
    pub score: f64,
    pub label: String,
}

impl From<&Candidate> for CandidateResponse {
    fn from(candidate: &Candidate) -> Self {
        Self {
            start_sec: candidate.start_sec,
            end_sec: candidate.end_sec,
            score: candidate.score,
            label: candidate.label.clone(),
        }
    }
}

/// Placeholder label for a segment with no text of its own (1-based position)
pub fn placeholder_label(position: usize) -> String {
    format!("Segment {}", position)
}
