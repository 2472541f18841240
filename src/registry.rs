use crate::error::DetectionError;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tokio::sync::RwLock;
use tracing::{debug, info};
use url::Url;
use uuid::Uuid;

static VIDEO_ID: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9_-]{11}$").expect("video id pattern is valid"));

/// A video known to the catalog
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct VideoRecord {
    /// Catalog identifier
    pub id: Uuid,

    /// Platform video id
    pub video_id: String,

    /// URL the video was registered from
    pub url: String,

    pub title: Option<String>,

    pub duration_sec: Option<u32>,

    pub registered_at: DateTime<Utc>,
}

impl VideoRecord {
    pub fn new(
        video_id: impl Into<String>,
        url: impl Into<String>,
        title: Option<String>,
        duration_sec: Option<u32>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            video_id: video_id.into(),
            url: url.into(),
            title,
            duration_sec,
            registered_at: Utc::now(),
        }
    }
}

/// Whether registration stored a new record or found an existing one
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RegistrationStatus {
    Created,
    Reused,
}

/// Storage for registered videos
#[async_trait]
pub trait VideoRegistry: Send + Sync {
    async fn find_by_video_id(&self, video_id: &str) -> Result<Option<VideoRecord>>;

    async fn insert(&self, record: VideoRecord) -> Result<VideoRecord>;
}

/// Registry kept in memory and written through to a single JSON file
#[derive(Debug, Clone)]
pub struct JsonFileRegistry {
    path: PathBuf,
    records: Arc<RwLock<HashMap<String, VideoRecord>>>,
}

impl JsonFileRegistry {
    /// Open the registry at `path`, loading existing records if the file exists
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let records = if fs::try_exists(&path).await.unwrap_or(false) {
            Self::load_records(&path).await?
        } else {
            HashMap::new()
        };

        info!("📊 Video registry loaded with {} videos from {}", records.len(), path.display());

        Ok(Self {
            path,
            records: Arc::new(RwLock::new(records)),
        })
    }

    async fn load_records(path: &Path) -> Result<HashMap<String, VideoRecord>> {
        let content = fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read registry {}", path.display()))?;
        if content.trim().is_empty() {
            return Ok(HashMap::new());
        }

        let list: Vec<VideoRecord> = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse registry {}", path.display()))?;
        Ok(list.into_iter().map(|r| (r.video_id.clone(), r)).collect())
    }

    async fn persist(&self, records: &HashMap<String, VideoRecord>) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await?;
        }

        let mut list: Vec<&VideoRecord> = records.values().collect();
        list.sort_by(|a, b| {
            a.registered_at
                .cmp(&b.registered_at)
                .then_with(|| a.video_id.cmp(&b.video_id))
        });

        let json_content = serde_json::to_string_pretty(&list)?;
        fs::write(&self.path, json_content)
            .await
            .with_context(|| format!("Failed to write registry {}", self.path.display()))?;
        Ok(())
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl VideoRegistry for JsonFileRegistry {
    async fn find_by_video_id(&self, video_id: &str) -> Result<Option<VideoRecord>> {
        Ok(self.records.read().await.get(video_id).cloned())
    }

    async fn insert(&self, record: VideoRecord) -> Result<VideoRecord> {
        let mut records = self.records.write().await;
        if let Some(existing) = records.get(&record.video_id) {
            debug!("📋 Video {} already registered", record.video_id);
            return Ok(existing.clone());
        }

        let mut updated = records.clone();
        updated.insert(record.video_id.clone(), record.clone());
        self.persist(&updated).await?;
        *records = updated;

        debug!("💾 Registered video {} as {}", record.video_id, record.id);
        Ok(record)
    }
}

/// Extract the platform video id from a watch, short, embed, live or
/// short-link URL, or accept a bare id.
pub fn parse_video_url(input: &str) -> Result<String, DetectionError> {
    let input = input.trim();
    if input.is_empty() {
        return Err(DetectionError::Validation("video URL is empty".to_string()));
    }
    if VIDEO_ID.is_match(input) {
        return Ok(input.to_string());
    }

    let invalid = || DetectionError::Validation(format!("not a recognised video URL: {}", input));

    let url = Url::parse(input)
        .or_else(|_| Url::parse(&format!("https://{}", input)))
        .map_err(|_| invalid())?;

    let host = url.host_str().ok_or_else(invalid)?.to_ascii_lowercase();
    let host = host
        .strip_prefix("www.")
        .or_else(|| host.strip_prefix("m."))
        .or_else(|| host.strip_prefix("music."))
        .unwrap_or(&host);

    let segments: Vec<&str> = url
        .path_segments()
        .map(|s| s.filter(|seg| !seg.is_empty()).collect())
        .unwrap_or_default();

    let candidate = match host {
        "youtu.be" => segments.first().map(|s| s.to_string()),
        "youtube.com" | "youtube-nocookie.com" => match segments.as_slice() {
            ["watch"] => url.query_pairs().find(|(k, _)| k == "v").map(|(_, v)| v.into_owned()),
            ["shorts" | "embed" | "live" | "v", id, ..] => Some(id.to_string()),
            _ => None,
        },
        _ => None,
    };

    candidate.filter(|id| VIDEO_ID.is_match(id)).ok_or_else(invalid)
}
