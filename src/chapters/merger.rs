//! Merges per-source candidate lists into one ordered, non-overlapping list

use super::{Candidate, DetectionMode, SectionSource};
use std::cmp::Ordering;
use std::collections::HashMap;
use tracing::debug;

/// Score given to authored candidates in combined mode
pub const COMBINED_AUTHORED_SCORE: f64 = 1.0;

/// Default floor below which caption candidates are dropped
pub const DEFAULT_MIN_CAPTION_SCORE: f64 = 0.35;

#[derive(Debug, Clone)]
pub struct CandidateMerger {
    min_caption_score: f64,
}

impl Default for CandidateMerger {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_CAPTION_SCORE)
    }
}

impl CandidateMerger {
    pub fn new(min_caption_score: f64) -> Self {
        Self {
            min_caption_score: min_caption_score.clamp(0.0, 1.0),
        }
    }

    pub fn merge(
        &self,
        by_source: &HashMap<SectionSource, Vec<Candidate>>,
        mode: DetectionMode,
    ) -> Vec<Candidate> {
        let description_found = by_source
            .get(&SectionSource::VideoDescription)
            .is_some_and(|c| !c.is_empty());

        // the description outranks comments outright in chapters mode
        let skip_comments = mode == DetectionMode::Chapters && description_found;

        let mut pool: Vec<Candidate> = by_source
            .iter()
            .filter(|(source, _)| mode.includes(**source))
            .filter(|(source, _)| !(skip_comments && **source == SectionSource::Comment))
            .flat_map(|(_, candidates)| candidates.iter().cloned())
            .filter(|c| c.source != SectionSource::Caption || c.score >= self.min_caption_score)
            .collect();

        if mode == DetectionMode::Combined {
            for candidate in pool.iter_mut().filter(|c| c.source.is_authored()) {
                candidate.score = COMBINED_AUTHORED_SCORE;
            }
            pool = suppress_captions_under_authored(pool);
        }

        pool.sort_by(compare_candidates);

        let mut retained: Vec<Candidate> = Vec::with_capacity(pool.len());
        for candidate in pool {
            if let Some(previous) = retained.last() {
                if candidate.start_sec < previous.end_sec {
                    debug!(
                        "Suppressing {} candidate at {}s inside {} candidate {}-{}s",
                        candidate.source,
                        candidate.start_sec,
                        previous.source,
                        previous.start_sec,
                        previous.end_sec
                    );
                    continue;
                }
            }
            retained.push(candidate);
        }

        debug!("🔀 Merged {} candidates in {} mode", retained.len(), mode);
        retained
    }
}

/// Ascending start, then descending score, then source priority
fn compare_candidates(a: &Candidate, b: &Candidate) -> Ordering {
    a.start_sec
        .cmp(&b.start_sec)
        .then_with(|| b.score.total_cmp(&a.score))
        .then_with(|| a.source.priority().cmp(&b.source.priority()))
}

/// Drop caption candidates whose range intersects any authored candidate
fn suppress_captions_under_authored(pool: Vec<Candidate>) -> Vec<Candidate> {
    let (authored, captions): (Vec<Candidate>, Vec<Candidate>) =
        pool.into_iter().partition(|c| c.source.is_authored());

    let kept_captions = captions
        .into_iter()
        .filter(|caption| !authored.iter().any(|a| a.overlaps(caption)));

    authored.iter().cloned().chain(kept_captions).collect()
}
