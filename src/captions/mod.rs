//! Caption track handling: parsing subtitle files into segments and scoring
//! segments for song likelihood.

pub mod scorer;
pub mod srt;

pub use scorer::CaptionScorer;
pub use srt::{CaptionCue, CaptionTrackParser};

use serde::{Deserialize, Serialize};

/// A caption chunk with its time range, as supplied by the caption collaborator
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CaptionSegment {
    pub start_sec: u32,
    pub end_sec: u32,
    pub text: String,
}

impl CaptionSegment {
    pub fn new(start_sec: u32, end_sec: u32, text: impl Into<String>) -> Self {
        Self {
            start_sec,
            end_sec,
            text: text.into(),
        }
    }
}
