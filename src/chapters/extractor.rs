//! Converts timestamp lines in a text blob into ordered candidates

use super::grammar::TimestampGrammar;
use super::{placeholder_label, Candidate, RawMatch, SectionSource};
use crate::providers::PlatformChapter;
use std::collections::HashSet;
use tracing::{debug, warn};

/// End of the last segment when the video duration is unknown
pub const MIN_SEGMENT_FLOOR_SECS: u32 = 30;

/// Score of authored chapters read in document order
pub const AUTHORED_SCORE: f64 = 1.0;

/// Score of a chapter whose timestamp goes backwards relative to an earlier line
pub const OUT_OF_ORDER_SCORE: f64 = 0.4;

/// Minimum number of timestamp hits before a comment is trusted as a chapter list
pub const MIN_COMMENT_MATCHES: usize = 2;

/// Deterministic chapter-list extraction, no I/O
#[derive(Debug, Clone, Default)]
pub struct ChapterExtractor;

impl ChapterExtractor {
    pub fn new() -> Self {
        Self
    }

    /// Extract candidates from one description or one comment body
    pub fn extract(
        &self,
        text: &str,
        video_duration_sec: Option<u32>,
        source: SectionSource,
    ) -> Vec<Candidate> {
        let matches = TimestampGrammar::scan(text);

        if source == SectionSource::Comment && matches.len() < MIN_COMMENT_MATCHES {
            if !matches.is_empty() {
                debug!("Ignoring comment with a single timestamp");
            }
            return Vec::new();
        }

        let matches = self.drop_duplicate_starts(matches);
        let matches = self.drop_past_duration(matches, video_duration_sec);
        let starts: Vec<u32> = matches.iter().map(RawMatch::start_sec).collect();

        let mut candidates = Vec::with_capacity(matches.len());
        let mut latest_start: Option<u32> = None;

        for (i, raw) in matches.into_iter().enumerate() {
            let start_sec = starts[i];
            let end_sec = resolve_end(start_sec, &starts[i + 1..], video_duration_sec);

            let score = match latest_start {
                Some(latest) if start_sec < latest => OUT_OF_ORDER_SCORE,
                _ => AUTHORED_SCORE,
            };
            latest_start = Some(latest_start.map_or(start_sec, |l| l.max(start_sec)));

            let label = if raw.label.is_empty() {
                placeholder_label(i + 1)
            } else {
                raw.label
            };

            candidates.push(Candidate {
                start_sec,
                end_sec,
                score,
                label,
                source,
            });
        }

        debug!("📝 Extracted {} {} candidates", candidates.len(), source);
        candidates
    }

    /// Convert platform-declared chapters, keeping their explicit ends when usable
    pub fn from_platform_chapters(
        &self,
        chapters: &[PlatformChapter],
        video_duration_sec: Option<u32>,
    ) -> Vec<Candidate> {
        let mut sorted: Vec<&PlatformChapter> = chapters
            .iter()
            .filter(|c| {
                let keep = video_duration_sec.map_or(true, |d| c.start_sec < d)
                    && c.start_sec.checked_add(MIN_SEGMENT_FLOOR_SECS).is_some();
                if !keep {
                    warn!("⚠️ Skipping platform chapter starting at {}s", c.start_sec);
                }
                keep
            })
            .collect();
        sorted.sort_by_key(|c| c.start_sec);

        let mut seen = HashSet::new();
        sorted.retain(|c| seen.insert(c.start_sec));

        let starts: Vec<u32> = sorted.iter().map(|c| c.start_sec).collect();

        sorted
            .iter()
            .enumerate()
            .map(|(i, chapter)| {
                let end_sec = match chapter.end_sec {
                    Some(end) if end > chapter.start_sec => end,
                    _ => resolve_end(chapter.start_sec, &starts[i + 1..], video_duration_sec),
                };
                let label = chapter
                    .title
                    .as_deref()
                    .map(str::trim)
                    .filter(|t| !t.is_empty())
                    .map(str::to_string)
                    .unwrap_or_else(|| placeholder_label(i + 1));

                Candidate {
                    start_sec: chapter.start_sec,
                    end_sec,
                    score: AUTHORED_SCORE,
                    label,
                    source: SectionSource::YoutubeChapter,
                }
            })
            .collect()
    }

    /// Keep only the first line for each distinct start time
    fn drop_duplicate_starts(&self, matches: Vec<RawMatch>) -> Vec<RawMatch> {
        let mut seen = HashSet::new();
        matches
            .into_iter()
            .filter(|m| seen.insert(m.start_sec()))
            .collect()
    }

    fn drop_past_duration(&self, matches: Vec<RawMatch>, duration: Option<u32>) -> Vec<RawMatch> {
        let Some(duration) = duration else {
            return matches;
        };

        matches
            .into_iter()
            .filter(|m| {
                let keep = m.start_sec() < duration;
                if !keep {
                    warn!(
                        "⚠️ Skipping timestamp {}s beyond video duration {}s",
                        m.start_sec(),
                        duration
                    );
                }
                keep
            })
            .collect()
    }
}

/// End of a segment: the next later start that is strictly greater, else the
/// video duration, else the fixed floor.
fn resolve_end(start_sec: u32, later_starts: &[u32], video_duration_sec: Option<u32>) -> u32 {
    if let Some(next) = later_starts.iter().copied().find(|&s| s > start_sec) {
        return next;
    }
    match video_duration_sec {
        Some(duration) if duration > start_sec => duration,
        _ => start_sec.saturating_add(MIN_SEGMENT_FLOOR_SECS),
    }
}
