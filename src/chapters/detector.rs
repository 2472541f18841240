//! Detection coordinator that runs the sources a mode asks for and merges their output

use super::{
    Candidate, CandidateMerger, ChapterExtractor, CommentSource, DetectionMode, SectionSource,
};
use crate::captions::CaptionScorer;
use crate::config::{Config, DetectionConfig};
use crate::error::{DetectionError, FetchError, Result};
use crate::providers::{create_collaborators, Collaborators, Credential, VideoDetails};
use crate::registry::{parse_video_url, RegistrationStatus, VideoRecord, VideoRegistry};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// A detection call as received from the routing layer
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DetectionRequest {
    pub video_id: String,
    pub mode: String,
}

impl DetectionRequest {
    pub fn new(video_id: impl Into<String>, mode: DetectionMode) -> Self {
        Self {
            video_id: video_id.into(),
            mode: mode.to_string(),
        }
    }

    /// Checked video id and parsed mode
    pub fn validate(&self) -> Result<(&str, DetectionMode)> {
        let video_id = validate_video_id(&self.video_id)?;
        let mode = self.mode.parse::<DetectionMode>()?;
        Ok((video_id, mode))
    }
}

/// Result of registering a video and detecting its candidates
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationOutcome {
    pub video: VideoRecord,
    pub candidates: Vec<Candidate>,
    pub status: RegistrationStatus,
}

/// Main detector that coordinates the chapter, comment and caption sources
#[derive(Clone)]
pub struct CandidateDetector {
    collaborators: Collaborators,
    extractor: ChapterExtractor,
    scorer: CaptionScorer,
    merger: CandidateMerger,
    comments: CommentSource,
}

impl CandidateDetector {
    /// Create a detector with default detection settings
    pub fn new(collaborators: Collaborators) -> Self {
        Self::with_settings(collaborators, &DetectionConfig::default())
    }

    /// Create a detector with custom detection settings
    pub fn with_settings(collaborators: Collaborators, settings: &DetectionConfig) -> Self {
        let comments = CommentSource::new(collaborators.comments.clone())
            .with_max_pages(settings.comment_page_limit());

        Self {
            collaborators,
            extractor: ChapterExtractor::new(),
            scorer: CaptionScorer::new(),
            merger: CandidateMerger::new(settings.min_caption_score),
            comments,
        }
    }

    /// Create a detector backed by the collaborators the configuration selects
    pub fn from_config(config: &Config) -> std::result::Result<Self, FetchError> {
        let collaborators = create_collaborators(config)?;
        info!("🔍 Candidate detector initialized");
        debug!("{}", config.summary());
        Ok(Self::with_settings(collaborators, &config.detection))
    }

    /// Detect candidates for a routing-layer request
    pub async fn detect(&self, request: &DetectionRequest) -> Result<Vec<Candidate>> {
        let (video_id, mode) = request.validate()?;
        self.detect_with_cancel(video_id, mode, &CancellationToken::new()).await
    }

    /// Detect candidates for `video_id` using the sources `mode` names
    pub async fn detect_with_mode(
        &self,
        video_id: &str,
        mode: DetectionMode,
    ) -> Result<Vec<Candidate>> {
        self.detect_with_cancel(video_id, mode, &CancellationToken::new()).await
    }

    /// Like `detect_with_mode`, stopping comment pagination once `cancel` fires
    pub async fn detect_with_cancel(
        &self,
        video_id: &str,
        mode: DetectionMode,
        cancel: &CancellationToken,
    ) -> Result<Vec<Candidate>> {
        let video_id = validate_video_id(video_id)?;
        info!("🔍 Starting candidate detection for {} ({} mode)", video_id, mode);

        let credential = self.credential().await;
        let details = match &credential {
            Some(credential) => self.fetch_details(video_id, credential).await?,
            None => None,
        };

        self.run_sources(video_id, mode, credential.as_ref(), details.as_ref(), cancel)
            .await
    }

    /// Register the video behind `url` if it is new, then detect in combined mode
    pub async fn register_and_detect(
        &self,
        url: &str,
        registry: &dyn VideoRegistry,
    ) -> Result<RegistrationOutcome> {
        let video_id = parse_video_url(url)?;

        let existing = registry
            .find_by_video_id(&video_id)
            .await
            .map_err(|e| DetectionError::Registry(format!("{:#}", e)))?;

        if let Some(video) = existing {
            info!("📋 Video {} already registered", video_id);
            let candidates = self.detect_with_mode(&video_id, DetectionMode::Combined).await?;
            return Ok(RegistrationOutcome {
                video,
                candidates,
                status: RegistrationStatus::Reused,
            });
        }

        let credential = self
            .collaborators
            .credentials
            .video_auth_credential()
            .await
            .map_err(|e| DetectionError::Upstream(e.to_string()))?;

        let details = self
            .collaborators
            .metadata
            .video_details(&video_id, &credential)
            .await
            .map_err(|e| match e {
                FetchError::NotFound(_) => DetectionError::NotFound(video_id.clone()),
                other => DetectionError::Upstream(other.to_string()),
            })?;

        let record = VideoRecord::new(
            &video_id,
            url.trim(),
            details.title.clone(),
            details.duration_sec,
        );
        let record_id = record.id;
        let video = registry
            .insert(record)
            .await
            .map_err(|e| DetectionError::Registry(format!("{:#}", e)))?;

        // Another caller may have registered the same video since the lookup
        let status = if video.id == record_id {
            info!("🆕 Registered video {} as {}", video_id, video.id);
            RegistrationStatus::Created
        } else {
            info!("📋 Video {} was registered concurrently", video_id);
            RegistrationStatus::Reused
        };

        let candidates = self
            .run_sources(
                &video_id,
                DetectionMode::Combined,
                Some(&credential),
                Some(&details),
                &CancellationToken::new(),
            )
            .await?;

        Ok(RegistrationOutcome {
            video,
            candidates,
            status,
        })
    }

    /// Credential for this run; a failure leaves every source empty
    async fn credential(&self) -> Option<Credential> {
        match self.collaborators.credentials.video_auth_credential().await {
            Ok(credential) => Some(credential),
            Err(e) => {
                warn!("❌ No video credential available: {}", e);
                None
            }
        }
    }

    /// Video metadata. An unknown video is an error, anything else degrades to no details.
    async fn fetch_details(
        &self,
        video_id: &str,
        credential: &Credential,
    ) -> Result<Option<VideoDetails>> {
        match self.collaborators.metadata.video_details(video_id, credential).await {
            Ok(details) => Ok(Some(details)),
            Err(FetchError::NotFound(_)) => Err(DetectionError::NotFound(video_id.to_string())),
            Err(e) => {
                warn!("❌ Failed to get metadata for {}: {}", video_id, e);
                Ok(None)
            }
        }
    }

    async fn run_sources(
        &self,
        video_id: &str,
        mode: DetectionMode,
        credential: Option<&Credential>,
        details: Option<&VideoDetails>,
        cancel: &CancellationToken,
    ) -> Result<Vec<Candidate>> {
        let duration = details.and_then(|d| d.duration_sec);
        let mut by_source: HashMap<SectionSource, Vec<Candidate>> = HashMap::new();

        if mode.includes(SectionSource::VideoDescription) {
            if let Some(details) = details {
                let description = self
                    .extractor
                    .extract(&details.description, duration, SectionSource::VideoDescription);
                let platform = self
                    .extractor
                    .from_platform_chapters(&details.platform_chapters, duration);
                by_source.insert(SectionSource::VideoDescription, description);
                by_source.insert(SectionSource::YoutubeChapter, platform);
            }

            let description_found = by_source
                .get(&SectionSource::VideoDescription)
                .is_some_and(|c| !c.is_empty());

            if mode == DetectionMode::Chapters && description_found {
                debug!("Description has chapters, skipping comments for {}", video_id);
            } else if let Some(credential) = credential {
                let comments = self.comments.fetch(video_id, credential, duration, cancel).await;
                by_source.insert(SectionSource::Comment, comments);
            }
        }

        if mode.includes(SectionSource::Caption) {
            if let Some(credential) = credential {
                let fetched = self
                    .collaborators
                    .captions
                    .caption_segments(video_id, credential)
                    .await;
                let captions = match fetched {
                    Ok(segments) => self.scorer.score(&segments),
                    Err(e) => {
                        warn!("❌ Failed to get captions for {}: {}", video_id, e);
                        Vec::new()
                    }
                };
                by_source.insert(SectionSource::Caption, captions);
            }
        }

        for (source, candidates) in &by_source {
            debug!("{}: {} candidates", source, candidates.len());
        }

        let merged = self.merger.merge(&by_source, mode);
        if merged.is_empty() {
            warn!("⚠️ No candidates found for {}", video_id);
        } else {
            info!("✅ Found {} candidates for {}", merged.len(), video_id);
        }
        Ok(merged)
    }
}

fn validate_video_id(video_id: &str) -> Result<&str> {
    let video_id = video_id.trim();
    if video_id.is_empty() {
        return Err(DetectionError::Validation("videoId is required".to_string()));
    }
    Ok(video_id)
}
