use clip_detector::config::ConfigBuilder;
use clip_detector::{
    CandidateDetector, CandidateMerger, CaptionScorer, CaptionSegment, CaptionTrackParser,
    ChapterExtractor, DetectionMode, SectionSource, TimestampGrammar,
};
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use std::collections::HashMap;

fn chapter_list(count: u32) -> String {
    (0..count)
        .map(|i| {
            let start = i * 197;
            format!(
                "{}. {}:{:02}:{:02} Track number {} (live)\n",
                i + 1,
                start / 3600,
                (start % 3600) / 60,
                start % 60,
                i + 1
            )
        })
        .collect()
}

fn caption_track(cues: u32) -> String {
    (0..cues)
        .map(|i| {
            let text = if i % 4 == 0 {
                "♪ oh oh oh ♪"
            } else {
                "and then we went back to the studio"
            };
            format!(
                "{}\n00:{:02}:{:02},000 --> 00:{:02}:{:02},500\n{}\n\n",
                i + 1,
                (i * 2) / 60,
                (i * 2) % 60,
                (i * 2 + 1) / 60,
                (i * 2 + 1) % 60,
                text
            )
        })
        .collect()
}

fn bench_grammar(c: &mut Criterion) {
    let description = format!("Setlist below!\n\n{}\nThanks for watching", chapter_list(40));

    c.bench_function("grammar_scan_40_lines", |b| {
        b.iter(|| black_box(TimestampGrammar::scan(black_box(&description))))
    });

    c.bench_function("grammar_single_line", |b| {
        let line = "12) 1:02:03 Encore - Song Title";
        b.iter(|| black_box(TimestampGrammar::match_line(black_box(line))))
    });
}

fn bench_extraction(c: &mut Criterion) {
    let extractor = ChapterExtractor::new();
    let small = chapter_list(10);
    let large = chapter_list(200);

    c.bench_function("extract_10_chapters", |b| {
        b.iter(|| black_box(extractor.extract(&small, Some(3600), SectionSource::VideoDescription)))
    });

    c.bench_function("extract_200_chapters", |b| {
        b.iter(|| black_box(extractor.extract(&large, None, SectionSource::VideoDescription)))
    });
}

fn bench_captions(c: &mut Criterion) {
    let track = caption_track(600);

    c.bench_function("caption_parse_segments", |b| {
        b.iter(|| black_box(CaptionTrackParser::parse_segments(black_box(&track))))
    });

    let segments: Vec<CaptionSegment> = (0..300)
        .map(|i| {
            let text = if i % 3 == 0 {
                "♪ la la la ♪\n♪ la la la ♪"
            } else {
                "talking about the record"
            };
            CaptionSegment::new(i * 20, i * 20 + 20, text)
        })
        .collect();
    let scorer = CaptionScorer::new();

    c.bench_function("caption_score_300_segments", |b| {
        b.iter(|| black_box(scorer.score(black_box(&segments))))
    });
}

fn bench_merge(c: &mut Criterion) {
    let extractor = ChapterExtractor::new();
    let scorer = CaptionScorer::new();
    let merger = CandidateMerger::default();

    let mut by_source = HashMap::new();
    by_source.insert(
        SectionSource::VideoDescription,
        extractor.extract(&chapter_list(50), Some(10_000), SectionSource::VideoDescription),
    );
    let segments: Vec<CaptionSegment> = (0..500)
        .map(|i| CaptionSegment::new(i * 20, i * 20 + 25, "♪ oh oh ♪\n♪ oh oh ♪"))
        .collect();
    by_source.insert(SectionSource::Caption, scorer.score(&segments));

    c.bench_function("merge_combined_550_candidates", |b| {
        b.iter(|| black_box(merger.merge(black_box(&by_source), DetectionMode::Combined)))
    });
}

fn bench_detect_local_library(c: &mut Criterion) {
    let temp_dir = tempfile::TempDir::new().expect("temp dir");
    let comments: Vec<serde_json::Value> = (0..250)
        .map(|i| serde_json::json!({"text": format!("comment {}", i), "parent": "root"}))
        .chain(std::iter::once(serde_json::json!({"text": chapter_list(12), "parent": "root"})))
        .collect();
    let info = serde_json::json!({
        "title": "Bench",
        "description": "no chapters here",
        "duration": 3000,
        "comments": comments,
    });
    let info_path = temp_dir.path().join("benchvideo0.info.json");
    std::fs::write(info_path, info.to_string()).expect("write info");

    let config = ConfigBuilder::new()
        .with_library_dir(temp_dir.path().to_path_buf())
        .prefer_local(true)
        .build();
    let detector = CandidateDetector::from_config(&config).expect("detector");

    c.bench_function("detect_chapters_third_comment_page", |b| {
        b.iter(|| {
            black_box(tokio_test::block_on(
                detector.detect_with_mode("benchvideo0", DetectionMode::Chapters),
            ))
        })
    });
}

criterion_group!(
    benches,
    bench_grammar,
    bench_extraction,
    bench_captions,
    bench_merge,
    bench_detect_local_library
);
criterion_main!(benches);
