//! External collaborators consumed by the detection pipeline.
//!
//! Each collaborator is a trait so callers (and tests) inject their own
//! implementation per detector instance.

pub mod local;
pub mod youtube;

use crate::captions::CaptionSegment;
use crate::config::Config;
use crate::error::FetchError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

pub use local::LocalLibrary;
pub use youtube::YouTubeClient;

/// Opaque credential handed to the fetchers
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    pub fn new(secret: impl Into<String>) -> Self {
        Self(secret.into())
    }

    /// Credential for providers that need none
    pub fn anonymous() -> Self {
        Self(String::new())
    }

    pub fn is_anonymous(&self) -> bool {
        self.0.is_empty()
    }

    pub fn secret(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_anonymous() {
            f.write_str("Credential(anonymous)")
        } else {
            f.write_str("Credential(***)")
        }
    }
}

/// Chapter declared by the hosting platform itself
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PlatformChapter {
    pub start_sec: u32,
    pub end_sec: Option<u32>,
    pub title: Option<String>,
}

/// Everything the pipeline needs to know about a video up front
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct VideoDetails {
    pub title: Option<String>,
    pub description: String,
    pub duration_sec: Option<u32>,
    pub platform_chapters: Vec<PlatformChapter>,
}

/// One page of top-level comments
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommentPage {
    pub bodies: Vec<String>,
    pub next_page_token: Option<String>,
}

/// Description, duration and platform chapters
#[async_trait]
pub trait MetadataProvider: Send + Sync {
    async fn video_details(
        &self,
        video_id: &str,
        credential: &Credential,
    ) -> Result<VideoDetails, FetchError>;
}

/// Paginated top-level comment listing
#[async_trait]
pub trait CommentProvider: Send + Sync {
    async fn list_top_level_comments(
        &self,
        video_id: &str,
        credential: &Credential,
        page_token: Option<&str>,
        max_results: u32,
    ) -> Result<CommentPage, FetchError>;
}

/// Pre-segmented caption track
#[async_trait]
pub trait CaptionProvider: Send + Sync {
    async fn caption_segments(
        &self,
        video_id: &str,
        credential: &Credential,
    ) -> Result<Vec<CaptionSegment>, FetchError>;
}

/// Source of the credential used by the other collaborators
#[async_trait]
pub trait CredentialProvider: Send + Sync {
    async fn video_auth_credential(&self) -> Result<Credential, FetchError>;
}

/// Hands out a fixed API key
#[derive(Clone)]
pub struct StaticCredentialProvider {
    api_key: Option<String>,
}

impl StaticCredentialProvider {
    pub fn new(api_key: Option<String>) -> Self {
        Self { api_key }
    }
}

#[async_trait]
impl CredentialProvider for StaticCredentialProvider {
    async fn video_auth_credential(&self) -> Result<Credential, FetchError> {
        match self.api_key.as_deref().map(str::trim) {
            Some(key) if !key.is_empty() => Ok(Credential::new(key)),
            _ => Err(FetchError::Unauthorized("no API key configured".to_string())),
        }
    }
}

/// For collaborators that read local files
#[derive(Clone, Copy, Default)]
pub struct AnonymousCredentialProvider;

#[async_trait]
impl CredentialProvider for AnonymousCredentialProvider {
    async fn video_auth_credential(&self) -> Result<Credential, FetchError> {
        Ok(Credential::anonymous())
    }
}

/// The full set of collaborators a detector runs against
#[derive(Clone)]
pub struct Collaborators {
    pub metadata: Arc<dyn MetadataProvider>,
    pub comments: Arc<dyn CommentProvider>,
    pub captions: Arc<dyn CaptionProvider>,
    pub credentials: Arc<dyn CredentialProvider>,
}

/// Build collaborators from configuration.
///
/// With an API key, metadata and comments come from the YouTube Data API;
/// otherwise everything is served from the local library. Captions always
/// come from the local library.
pub fn create_collaborators(config: &Config) -> Result<Collaborators, FetchError> {
    let library = Arc::new(LocalLibrary::new(config.library.dir.clone()));

    if config.uses_api() {
        let client = Arc::new(YouTubeClient::new(&config.youtube)?);
        Ok(Collaborators {
            metadata: client.clone(),
            comments: client,
            captions: library,
            credentials: Arc::new(StaticCredentialProvider::new(config.youtube.api_key.clone())),
        })
    } else {
        Ok(Collaborators {
            metadata: library.clone(),
            comments: library.clone(),
            captions: library,
            credentials: Arc::new(AnonymousCredentialProvider),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credential_debug_is_redacted() {
        let credential = Credential::new("AIza-secret");
        assert_eq!(format!("{:?}", credential), "Credential(***)");
        assert_eq!(credential.secret(), "AIza-secret");
        assert_eq!(format!("{:?}", Credential::anonymous()), "Credential(anonymous)");
    }

    #[tokio::test]
    async fn test_static_credential_provider() {
        let provider = StaticCredentialProvider::new(Some("key".to_string()));
        assert_eq!(provider.video_auth_credential().await.unwrap(), Credential::new("key"));

        let provider = StaticCredentialProvider::new(Some("   ".to_string()));
        assert!(matches!(
            provider.video_auth_credential().await,
            Err(FetchError::Unauthorized(_))
        ));

        let provider = StaticCredentialProvider::new(None);
        assert!(provider.video_auth_credential().await.is_err());
    }

    #[tokio::test]
    async fn test_anonymous_credential_provider() {
        let credential = AnonymousCredentialProvider.video_auth_credential().await.unwrap();
        assert!(credential.is_anonymous());
    }

    #[tokio::test]
    async fn test_collaborators_follow_config() {
        use crate::config::ConfigBuilder;

        let local = create_collaborators(&ConfigBuilder::new().build()).unwrap();
        assert!(local.credentials.video_auth_credential().await.unwrap().is_anonymous());

        let keyed_config = ConfigBuilder::new().with_api_key("key").build();
        let keyed = create_collaborators(&keyed_config).unwrap();
        assert_eq!(
            keyed.credentials.video_auth_credential().await.unwrap(),
            Credential::new("key")
        );
    }
}
