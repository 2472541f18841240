/// Clip Detector
///
/// Finds song and segment boundaries inside hosted videos from their
/// descriptions, top-level comments, platform chapters and caption tracks.

pub mod captions;
pub mod chapters;
pub mod config;
pub mod error;
pub mod providers;
pub mod registry;

// Re-export main types for easy access
pub use crate::captions::{CaptionScorer, CaptionSegment, CaptionTrackParser};
pub use crate::chapters::{
    Candidate, CandidateDetector, CandidateMerger, CandidateResponse, ChapterExtractor,
    CommentSource, DetectionMode, DetectionRequest, RawMatch, RegistrationOutcome, SectionSource,
    TimestampGrammar,
};
pub use crate::config::Config;
pub use crate::error::{DetectionError, FetchError};
pub use crate::providers::{Collaborators, Credential, LocalLibrary, VideoDetails, YouTubeClient};
pub use crate::registry::{JsonFileRegistry, RegistrationStatus, VideoRecord, VideoRegistry};
