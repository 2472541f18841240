//! Paginated search of top-level comments for a chapter list

use super::{Candidate, ChapterExtractor, SectionSource};
use crate::providers::{CommentProvider, Credential};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Comments requested per page
pub const COMMENT_PAGE_SIZE: u32 = 100;

/// Walks comment pages in order until one comment carries a chapter list
#[derive(Clone)]
pub struct CommentSource {
    provider: Arc<dyn CommentProvider>,
    extractor: ChapterExtractor,
    max_pages: Option<usize>,
}

impl CommentSource {
    pub fn new(provider: Arc<dyn CommentProvider>) -> Self {
        Self {
            provider,
            extractor: ChapterExtractor::new(),
            max_pages: None,
        }
    }

    /// Stop after this many pages even when more are available
    pub fn with_max_pages(mut self, max_pages: Option<usize>) -> Self {
        self.max_pages = max_pages.filter(|&n| n > 0);
        self
    }

    /// Candidates from the first qualifying comment, or an empty list.
    ///
    /// Pages are fetched strictly one after another. Fetch failures and
    /// cancellation both end the walk with an empty result.
    pub async fn fetch(
        &self,
        video_id: &str,
        credential: &Credential,
        video_duration_sec: Option<u32>,
        cancel: &CancellationToken,
    ) -> Vec<Candidate> {
        let mut page_token: Option<String> = None;
        let mut pages_read = 0usize;

        loop {
            if cancel.is_cancelled() {
                info!("🛑 Comment scan cancelled for {} after {} pages", video_id, pages_read);
                return Vec::new();
            }
            if self.max_pages.is_some_and(|max| pages_read >= max) {
                info!("📄 Comment page limit reached for {} ({} pages)", video_id, pages_read);
                return Vec::new();
            }

            let page = match self
                .provider
                .list_top_level_comments(
                    video_id,
                    credential,
                    page_token.as_deref(),
                    COMMENT_PAGE_SIZE,
                )
                .await
            {
                Ok(page) => page,
                Err(e) => {
                    warn!("❌ Comment fetch failed for {}: {}", video_id, e);
                    return Vec::new();
                }
            };
            pages_read += 1;
            debug!("Comment page {} for {}: {} comments", pages_read, video_id, page.bodies.len());

            for body in &page.bodies {
                let candidates = self
                    .extractor
                    .extract(body, video_duration_sec, SectionSource::Comment);
                if !candidates.is_empty() {
                    info!(
                        "✅ Found chapter comment for {} on page {} ({} chapters)",
                        video_id,
                        pages_read,
                        candidates.len()
                    );
                    return candidates;
                }
            }

            match page.next_page_token.filter(|t| !t.is_empty()) {
                Some(token) => page_token = Some(token),
                None => {
                    debug!("No chapter comment for {} in {} pages", video_id, pages_read);
                    return Vec::new();
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FetchError;
    use crate::providers::CommentPage;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Serves fixed pages; page N is requested with token "pN"
    struct PagedComments {
        pages: Vec<Vec<&'static str>>,
        requested_tokens: Mutex<Vec<Option<String>>>,
        fail_on_page: Option<usize>,
        cancel_after_first: Option<CancellationToken>,
    }

    impl PagedComments {
        fn new(pages: Vec<Vec<&'static str>>) -> Self {
            Self {
                pages,
                requested_tokens: Mutex::new(Vec::new()),
                fail_on_page: None,
                cancel_after_first: None,
            }
        }

        fn calls(&self) -> Vec<Option<String>> {
            self.requested_tokens.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl CommentProvider for PagedComments {
        async fn list_top_level_comments(
            &self,
            _video_id: &str,
            _credential: &Credential,
            page_token: Option<&str>,
            max_results: u32,
        ) -> Result<CommentPage, FetchError> {
            assert_eq!(max_results, COMMENT_PAGE_SIZE);
            self.requested_tokens.lock().unwrap().push(page_token.map(str::to_string));

            let index = match page_token {
                None => 0,
                Some(token) => token.trim_start_matches('p').parse::<usize>().unwrap(),
            };
            if self.fail_on_page == Some(index) {
                return Err(FetchError::Unauthorized("quota exceeded".to_string()));
            }
            if let Some(cancel) = &self.cancel_after_first {
                cancel.cancel();
            }

            let next_page_token = (index + 1 < self.pages.len()).then(|| format!("p{}", index + 1));
            Ok(CommentPage {
                bodies: self.pages[index].iter().map(|b| b.to_string()).collect(),
                next_page_token,
            })
        }
    }

    async fn run(provider: Arc<PagedComments>) -> Vec<Candidate> {
        CommentSource::new(provider)
            .fetch("vid", &Credential::new("key"), None, &CancellationToken::new())
            .await
    }

    #[tokio::test]
    async fn test_stops_on_first_page_hit() {
        let provider = Arc::new(PagedComments::new(vec![
            vec!["nice", "00:00 A\n01:00 B", "00:00 X\n02:00 Y\n03:00 Z"],
            vec!["never read"],
        ]));
        let candidates = run(provider.clone()).await;

        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[0].label, "A");
        assert_eq!(provider.calls(), vec![None]);
    }

    #[tokio::test]
    async fn test_second_page_carries_continuation_token() {
        let provider = Arc::new(PagedComments::new(vec![
            vec!["Great video!"],
            vec!["00:00 Intro\n05:30 Main\n10:00 Outro"],
        ]));
        let candidates = run(provider.clone()).await;

        assert_eq!(provider.calls(), vec![None, Some("p1".to_string())]);
        assert_eq!(candidates.len(), 3);
        assert_eq!(candidates[0].start_sec, 0);
        assert!(candidates.iter().all(|c| c.source == SectionSource::Comment));
    }

    #[tokio::test]
    async fn test_single_timestamp_comments_never_qualify() {
        let provider = Arc::new(PagedComments::new(vec![vec!["3:15 best part"], vec!["1:00 lol"]]));
        let candidates = run(provider.clone()).await;

        assert!(candidates.is_empty());
        assert_eq!(provider.calls().len(), 2);
    }

    #[tokio::test]
    async fn test_fetch_error_yields_empty() {
        let mut provider = PagedComments::new(vec![vec!["nothing"], vec!["00:00 A\n01:00 B"]]);
        provider.fail_on_page = Some(1);
        let candidates = run(Arc::new(provider)).await;
        assert!(candidates.is_empty());
    }

    #[tokio::test]
    async fn test_cancellation_between_pages() {
        let cancel = CancellationToken::new();
        let mut provider = PagedComments::new(vec![vec!["nothing"], vec!["00:00 A\n01:00 B"]]);
        provider.cancel_after_first = Some(cancel.clone());
        let provider = Arc::new(provider);

        let candidates = CommentSource::new(provider.clone())
            .fetch("vid", &Credential::new("key"), None, &cancel)
            .await;

        assert!(candidates.is_empty());
        assert_eq!(provider.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_max_pages_cap() {
        let pages = vec![vec!["a"], vec!["b"], vec!["00:00 A\n01:00 B"]];
        let provider = Arc::new(PagedComments::new(pages));
        let candidates = CommentSource::new(provider.clone())
            .with_max_pages(Some(2))
            .fetch("vid", &Credential::new("key"), None, &CancellationToken::new())
            .await;

        assert!(candidates.is_empty());
        assert_eq!(provider.calls().len(), 2);
    }
}
