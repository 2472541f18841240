//! Metadata, comments and captions read from a directory of yt-dlp downloads.
//!
//! For a video id `ID` the library looks for `ID.info.json` (written by
//! `yt-dlp --write-info-json --write-comments`) and a caption track named
//! `ID.srt`, `ID.<lang>.srt` or `ID.<lang>.vtt`.

use super::{
    CaptionProvider, CommentPage, CommentProvider, Credential, MetadataProvider, PlatformChapter,
    VideoDetails,
};
use crate::captions::{CaptionSegment, CaptionTrackParser};
use crate::error::FetchError;
use async_trait::async_trait;
use serde_json::Value;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct LocalLibrary {
    dir: PathBuf,
}

impl LocalLibrary {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn info_path(&self, video_id: &str) -> Result<PathBuf, FetchError> {
        check_video_id(video_id)?;
        Ok(self.dir.join(format!("{}.info.json", video_id)))
    }

    async fn load_info(&self, video_id: &str) -> Result<Value, FetchError> {
        let path = self.info_path(video_id)?;
        let content = match fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(FetchError::NotFound(format!("no info file at {}", path.display())));
            }
            Err(e) => return Err(e.into()),
        };
        debug!("📄 Loaded {}", path.display());
        Ok(serde_json::from_str(&content)?)
    }

    /// Caption track for `video_id`, preferring SRT over WebVTT
    async fn find_caption_track(&self, video_id: &str) -> Result<Option<PathBuf>, FetchError> {
        check_video_id(video_id)?;

        let exact = self.dir.join(format!("{}.srt", video_id));
        if fs::try_exists(&exact).await.unwrap_or(false) {
            return Ok(Some(exact));
        }

        let mut tracks = Vec::new();
        let mut entries = match fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let prefix = format!("{}.", video_id);
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name().to_string_lossy().to_string();
            if !name.starts_with(&prefix) {
                continue;
            }
            let rank = if name.ends_with(".srt") {
                0
            } else if name.ends_with(".vtt") {
                1
            } else {
                continue;
            };
            tracks.push((rank, name.len(), entry.path()));
        }

        tracks.sort();
        Ok(tracks.into_iter().next().map(|(_, _, path)| path))
    }
}

/// Ids are used as file names, so anything that could escape the directory is rejected
fn check_video_id(video_id: &str) -> Result<(), FetchError> {
    let ok = !video_id.is_empty()
        && video_id != "."
        && video_id != ".."
        && !video_id.contains(['/', '\\'])
        && !video_id.chars().any(char::is_control);
    if ok {
        Ok(())
    } else {
        Err(FetchError::NotFound(format!("invalid video id '{}'", video_id)))
    }
}

fn seconds(value: Option<&Value>) -> Option<u32> {
    value
        .and_then(Value::as_f64)
        .map(f64::round)
        .filter(|s| s.is_finite() && (0.0..=f64::from(u32::MAX)).contains(s))
        .map(|s| s as u32)
}

fn details_from_info(info: &Value) -> VideoDetails {
    let platform_chapters = info
        .get("chapters")
        .and_then(Value::as_array)
        .map(|chapters| {
            chapters
                .iter()
                .filter_map(|chapter| {
                    Some(PlatformChapter {
                        start_sec: seconds(chapter.get("start_time"))?,
                        end_sec: seconds(chapter.get("end_time")),
                        title: chapter.get("title").and_then(Value::as_str).map(str::to_string),
                    })
                })
                .collect()
        })
        .unwrap_or_default();

    VideoDetails {
        title: info.get("title").and_then(Value::as_str).map(str::to_string),
        description: info
            .get("description")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        duration_sec: seconds(info.get("duration")).filter(|&d| d > 0),
        platform_chapters,
    }
}

/// Top-level comment bodies in file order
fn top_level_comments(info: &Value) -> Vec<String> {
    info.get("comments")
        .and_then(Value::as_array)
        .map(|comments| {
            comments
                .iter()
                .filter(|c| c.get("parent").and_then(Value::as_str).map_or(true, |p| p == "root"))
                .filter_map(|c| c.get("text").and_then(Value::as_str).map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}

#[async_trait]
impl MetadataProvider for LocalLibrary {
    async fn video_details(
        &self,
        video_id: &str,
        _credential: &Credential,
    ) -> Result<VideoDetails, FetchError> {
        let info = self.load_info(video_id).await?;
        Ok(details_from_info(&info))
    }
}

#[async_trait]
impl CommentProvider for LocalLibrary {
    async fn list_top_level_comments(
        &self,
        video_id: &str,
        _credential: &Credential,
        page_token: Option<&str>,
        max_results: u32,
    ) -> Result<CommentPage, FetchError> {
        let offset = match page_token {
            None => 0,
            Some(token) => token
                .parse::<usize>()
                .map_err(|_| FetchError::Upstream(format!("invalid page token '{}'", token)))?,
        };
        let page_size = max_results.max(1) as usize;

        let info = self.load_info(video_id).await?;
        let comments = top_level_comments(&info);

        let end = offset.saturating_add(page_size).min(comments.len());
        let bodies = comments.get(offset..end).map(<[String]>::to_vec).unwrap_or_default();
        let next_page_token = (end < comments.len()).then(|| end.to_string());

        Ok(CommentPage { bodies, next_page_token })
    }
}

#[async_trait]
impl CaptionProvider for LocalLibrary {
    async fn caption_segments(
        &self,
        video_id: &str,
        _credential: &Credential,
    ) -> Result<Vec<CaptionSegment>, FetchError> {
        let Some(path) = self.find_caption_track(video_id).await? else {
            return Err(FetchError::NotFound(format!("no caption track for {}", video_id)));
        };

        let content = fs::read_to_string(&path).await?;
        let segments = CaptionTrackParser::parse_segments(&content);
        debug!("📝 {} caption segments from {}", segments.len(), path.display());
        Ok(segments)
    }
}
