use super::{CommentPage, CommentProvider, Credential, MetadataProvider, VideoDetails};
use crate::config::YouTubeConfig;
use crate::error::FetchError;
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

/// YouTube Data API v3 client for video metadata and comment threads
#[derive(Clone)]
pub struct YouTubeClient {
    base_url: String,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct VideoListResponse {
    #[serde(default)]
    items: Vec<VideoItem>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VideoItem {
    snippet: VideoSnippet,
    content_details: Option<ContentDetails>,
}

#[derive(Debug, Deserialize)]
struct VideoSnippet {
    #[serde(default)]
    title: String,
    #[serde(default)]
    description: String,
}

#[derive(Debug, Deserialize)]
struct ContentDetails {
    #[serde(default)]
    duration: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CommentThreadListResponse {
    #[serde(default)]
    items: Vec<CommentThread>,
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CommentThread {
    snippet: ThreadSnippet,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ThreadSnippet {
    top_level_comment: TopLevelComment,
}

#[derive(Debug, Deserialize)]
struct TopLevelComment {
    snippet: CommentSnippet,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CommentSnippet {
    #[serde(default)]
    text_original: String,
    #[serde(default)]
    text_display: String,
}

impl YouTubeClient {
    pub fn new(config: &YouTubeConfig) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_seconds))
            .user_agent(concat!("clip-detector/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    async fn get<T: serde::de::DeserializeOwned>(
        &self,
        endpoint: &str,
        query: &[(&str, &str)],
        credential: &Credential,
    ) -> Result<T, FetchError> {
        if credential.is_anonymous() {
            return Err(FetchError::Unauthorized(
                "YouTube Data API requires an API key".to_string(),
            ));
        }

        let url = format!("{}/{}", self.base_url, endpoint);
        debug!("Requesting {} ({:?})", url, query);

        let response = self
            .client
            .get(&url)
            .query(query)
            .query(&[("key", credential.secret())])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(error_for_status(status, &body));
        }

        let body = response.text().await?;
        Ok(serde_json::from_str(&body)?)
    }
}

#[async_trait]
impl MetadataProvider for YouTubeClient {
    async fn video_details(
        &self,
        video_id: &str,
        credential: &Credential,
    ) -> Result<VideoDetails, FetchError> {
        let response: VideoListResponse = self
            .get(
                "videos",
                &[("part", "snippet,contentDetails"), ("id", video_id)],
                credential,
            )
            .await?;

        details_from_response(video_id, response)
    }
}

#[async_trait]
impl CommentProvider for YouTubeClient {
    async fn list_top_level_comments(
        &self,
        video_id: &str,
        credential: &Credential,
        page_token: Option<&str>,
        max_results: u32,
    ) -> Result<CommentPage, FetchError> {
        let max_results = max_results.clamp(1, 100).to_string();
        let mut query = vec![
            ("part", "snippet"),
            ("videoId", video_id),
            ("maxResults", max_results.as_str()),
            ("textFormat", "plainText"),
        ];
        if let Some(token) = page_token {
            query.push(("pageToken", token));
        }

        let response: CommentThreadListResponse =
            self.get("commentThreads", &query, credential).await?;
        Ok(page_from_response(response))
    }
}

fn details_from_response(
    video_id: &str,
    response: VideoListResponse,
) -> Result<VideoDetails, FetchError> {
    let item = response
        .items
        .into_iter()
        .next()
        .ok_or_else(|| FetchError::NotFound(format!("video {}", video_id)))?;

    let duration_sec = item
        .content_details
        .and_then(|d| parse_iso_duration(&d.duration))
        .filter(|&d| d > 0);

    let title = Some(item.snippet.title).filter(|t| !t.trim().is_empty());

    Ok(VideoDetails {
        title,
        description: item.snippet.description,
        duration_sec,
        platform_chapters: Vec::new(),
    })
}

fn page_from_response(response: CommentThreadListResponse) -> CommentPage {
    let bodies = response
        .items
        .into_iter()
        .map(|thread| {
            let snippet = thread.snippet.top_level_comment.snippet;
            if snippet.text_original.is_empty() {
                snippet.text_display
            } else {
                snippet.text_original
            }
        })
        .collect();

    CommentPage {
        bodies,
        next_page_token: response.next_page_token.filter(|t| !t.is_empty()),
    }
}

fn error_for_status(status: StatusCode, body: &str) -> FetchError {
    match status {
        StatusCode::NOT_FOUND => FetchError::NotFound(format!("YouTube API {}", status)),
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            // commentsDisabled arrives as 403 but is not a credential problem
            if body.contains("commentsDisabled") {
                FetchError::Upstream("comments are disabled for this video".to_string())
            } else {
                FetchError::Unauthorized(format!("YouTube API {}", status))
            }
        }
        _ => {
            let excerpt: String = body.chars().take(200).collect();
            FetchError::Upstream(format!("YouTube API error {}: {}", status, excerpt))
        }
    }
}

/// Parse an ISO 8601 duration (`PT1H2M3S`, `P1DT2H`) into seconds
pub fn parse_iso_duration(duration: &str) -> Option<u32> {
    let rest = duration.trim().strip_prefix('P')?;
    let mut seconds: u64 = 0;
    let mut number = String::new();
    let mut in_time = false;

    for c in rest.chars() {
        match c {
            '0'..='9' => number.push(c),
            'T' if number.is_empty() => in_time = true,
            unit => {
                let n: u64 = number.parse().ok()?;
                number.clear();
                let unit_secs: u64 = match (unit, in_time) {
                    ('W', false) => 7 * 86_400,
                    ('D', false) => 86_400,
                    ('H', true) => 3600,
                    ('M', true) => 60,
                    ('S', true) => 1,
                    _ => return None,
                };
                seconds = seconds.checked_add(n.checked_mul(unit_secs)?)?;
            }
        }
    }

    if !number.is_empty() {
        return None;
    }
    u32::try_from(seconds).ok()
}
