//! Error types surfaced by the detection pipeline and its collaborators.

use thiserror::Error;

/// Errors a caller of `detect` or `register_and_detect` can receive.
///
/// Upstream failures of individual sources never show up here during
/// detection; they degrade to an empty candidate list for that source.
#[derive(Error, Debug)]
pub enum DetectionError {
    /// Unknown mode, missing video id, unparseable video URL
    #[error("invalid request: {0}")]
    Validation(String),

    /// The video id does not resolve to a known video
    #[error("video not found: {0}")]
    NotFound(String),

    /// Metadata could not be fetched while registering a new video
    #[error("upstream provider failed: {0}")]
    Upstream(String),

    /// The video registry rejected a read or write
    #[error("video registry error: {0}")]
    Registry(String),
}

impl DetectionError {
    /// True for errors caused by the caller's input rather than by a provider
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::Validation(_) | Self::NotFound(_))
    }
}

/// Errors reported by the external collaborators (metadata, comments, captions, credentials).
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("resource not found: {0}")]
    NotFound(String),

    #[error("credential rejected: {0}")]
    Unauthorized(String),

    #[error("provider error: {0}")]
    Upstream(String),

    #[error("network request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON parse failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl FetchError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

pub type Result<T, E = DetectionError> = std::result::Result<T, E>;
