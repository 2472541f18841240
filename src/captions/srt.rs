use super::CaptionSegment;
use anyhow::{anyhow, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use tracing::{debug, warn};

/// Cues further apart than this start a new segment
pub const MAX_CUE_GAP_SECS: u64 = 3;

/// Segments are cut once they grow past this length
pub const MAX_SEGMENT_SECS: u64 = 240;

static INLINE_TAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<[^>]*>").expect("inline tag pattern is valid"));

/// One timed cue from an SRT or WebVTT file
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CaptionCue {
    /// Sequential number
    pub index: u32,
    pub start: Duration,
    pub end: Duration,
    /// Cue text, one caption line per text line
    pub text: String,
}

impl CaptionCue {
    pub fn new(index: u32, start: Duration, end: Duration, text: String) -> Self {
        Self {
            index,
            start,
            end,
            text: text.trim().to_string(),
        }
    }
}

impl fmt::Display for CaptionCue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}\n{} --> {}\n{}\n",
            self.index,
            format_duration(self.start),
            format_duration(self.end),
            self.text
        )
    }
}

/// Parser for SRT and WebVTT caption tracks
pub struct CaptionTrackParser;

impl CaptionTrackParser {
    /// Parse cues from SRT or WebVTT content. Malformed cues are skipped.
    pub fn parse(content: &str) -> Vec<CaptionCue> {
        let normalized = content.replace("\r\n", "\n").replace('\r', "\n");
        let mut cues = Vec::new();

        for block in normalized.split("\n\n") {
            let lines: Vec<&str> = block.lines().map(str::trim).filter(|l| !l.is_empty()).collect();
            let Some(timing_pos) = lines.iter().position(|l| l.contains("-->")) else {
                continue;
            };

            let (start, end) = match parse_timing_line(lines[timing_pos]) {
                Ok(range) => range,
                Err(e) => {
                    debug!("Skipping malformed cue timing '{}': {}", lines[timing_pos], e);
                    continue;
                }
            };

            let text = lines[timing_pos + 1..]
                .iter()
                .map(|l| Self::clean_text(l))
                .filter(|l| !l.is_empty())
                .collect::<Vec<_>>()
                .join("\n");

            cues.push(CaptionCue::new((cues.len() + 1) as u32, start, end, text));
        }

        cues.sort_by(|a, b| a.start.cmp(&b.start));
        for (i, cue) in cues.iter_mut().enumerate() {
            cue.index = (i + 1) as u32;
        }

        debug!("📄 Parsed {} caption cues", cues.len());
        cues
    }

    /// Group consecutive cues into segments, splitting on silence gaps and
    /// on segments growing past `MAX_SEGMENT_SECS`.
    pub fn segment(cues: &[CaptionCue]) -> Vec<CaptionSegment> {
        let mut segments = Vec::new();
        let mut current: Option<(Duration, Duration, Vec<String>)> = None;

        for cue in cues {
            if let Some((start, end, lines)) = current.as_mut() {
                let gap = cue.start.saturating_sub(*end);
                let length = cue.end.saturating_sub(*start);
                if gap.as_secs() <= MAX_CUE_GAP_SECS && length.as_secs() <= MAX_SEGMENT_SECS {
                    *end = (*end).max(cue.end);
                    if !cue.text.is_empty() {
                        lines.push(cue.text.clone());
                    }
                    continue;
                }
            }

            if let Some(done) = current.take() {
                segments.extend(to_segment(done));
            }
            let lines = if cue.text.is_empty() { Vec::new() } else { vec![cue.text.clone()] };
            current = Some((cue.start, cue.end, lines));
        }

        if let Some(done) = current {
            segments.extend(to_segment(done));
        }

        segments
    }

    /// Parse and segment in one step
    pub fn parse_segments(content: &str) -> Vec<CaptionSegment> {
        Self::segment(&Self::parse(content))
    }

    /// Strip inline markup (`<c>`, `<i>`, karaoke timestamps) and collapse whitespace
    pub fn clean_text(text: &str) -> String {
        INLINE_TAG
            .replace_all(text, "")
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Whole-second segment; `None` when the times do not fit in `u32` seconds
fn to_segment((start, end, lines): (Duration, Duration, Vec<String>)) -> Option<CaptionSegment> {
    let round_up = u64::from(end.subsec_millis() > 0);
    let start_sec = u32::try_from(start.as_secs()).ok();
    let end_sec = end
        .as_secs()
        .checked_add(round_up)
        .and_then(|s| u32::try_from(s).ok());

    match (start_sec, end_sec) {
        (Some(start_sec), Some(end_sec)) => {
            Some(CaptionSegment::new(start_sec, end_sec, lines.join("\n")))
        }
        _ => {
            warn!(
                "⚠️ Skipping caption segment at {} beyond the supported range",
                format_duration(start)
            );
            None
        }
    }
}

/// Format duration as SRT timestamp (HH:MM:SS,mmm)
fn format_duration(duration: Duration) -> String {
    let total_seconds = duration.as_secs();
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;
    let milliseconds = duration.subsec_millis();

    format!("{:02}:{:02}:{:02},{:03}", hours, minutes, seconds, milliseconds)
}

/// Parse "start --> end [cue settings]"
fn parse_timing_line(line: &str) -> Result<(Duration, Duration)> {
    let parts: Vec<&str> = line.split("-->").collect();
    if parts.len() != 2 {
        return Err(anyhow!("Invalid timing line"));
    }

    let start = parse_single_timestamp(parts[0].trim())?;
    let end_token = parts[1]
        .split_whitespace()
        .next()
        .ok_or_else(|| anyhow!("Missing end timestamp"))?;
    let end = parse_single_timestamp(end_token)?;

    Ok((start, end))
}

/// Parse a single timestamp (HH:MM:SS,mmm / HH:MM:SS.mmm / MM:SS.mmm)
fn parse_single_timestamp(timestamp: &str) -> Result<Duration> {
    let (clock, millis) = match timestamp.rsplit_once([',', '.']) {
        Some((clock, millis)) => (clock, millis.parse::<u64>()?),
        None => (timestamp, 0),
    };

    let hms_parts: Vec<&str> = clock.split(':').collect();
    let (hours, minutes, seconds): (u64, u64, u64) = match hms_parts.as_slice() {
        [h, m, s] => (h.parse()?, m.parse()?, s.parse()?),
        [m, s] => (0, m.parse()?, s.parse()?),
        _ => return Err(anyhow!("Invalid time format")),
    };

    let total_millis = hours
        .checked_mul(3600)
        .and_then(|h| minutes.checked_mul(60).and_then(|m| h.checked_add(m)))
        .and_then(|hm| hm.checked_add(seconds))
        .and_then(|total| total.checked_mul(1000))
        .and_then(|total| total.checked_add(millis))
        .ok_or_else(|| anyhow!("Timestamp out of range"))?;
    Ok(Duration::from_millis(total_millis))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SRT: &str = "1\n00:00:01,000 --> 00:00:04,500\nHello everyone\n\n2\n00:00:05,000 --> 00:00:08,000\n♪ la la la ♪\n♪ la la la ♪\n\n3\n00:01:00,000 --> 00:01:03,000\nWelcome back\n";

    const VTT: &str = "WEBVTT\nKind: captions\nLanguage: en\n\n00:00:01.000 --> 00:00:03.000 align:start position:0%\n<c>oh</c><00:00:01.500><c> yeah</c>\n\n00:03.000 --> 00:05.200\nsecond line\n";

    #[test]
    fn test_parse_srt() {
        let cues = CaptionTrackParser::parse(SRT);
        assert_eq!(cues.len(), 3);
        assert_eq!(cues[0].start, Duration::from_secs(1));
        assert_eq!(cues[0].end, Duration::from_millis(4500));
        assert_eq!(cues[1].text, "♪ la la la ♪\n♪ la la la ♪");
        assert_eq!(cues[2].start, Duration::from_secs(60));
    }

    #[test]
    fn test_parse_webvtt_with_inline_tags() {
        let cues = CaptionTrackParser::parse(VTT);
        assert_eq!(cues.len(), 2);
        assert_eq!(cues[0].text, "oh yeah");
        assert_eq!(cues[1].start, Duration::from_secs(3));
        assert_eq!(cues[1].end, Duration::from_millis(5200));
    }

    #[test]
    fn test_malformed_cues_are_skipped() {
        let content = "1\nnot a time --> at all\ntext\n\n2\n00:00:02,000 --> 00:00:03,000\nkept\n";
        let cues = CaptionTrackParser::parse(content);
        assert_eq!(cues.len(), 1);
        assert_eq!(cues[0].text, "kept");
        assert_eq!(cues[0].index, 1);
    }

    #[test]
    fn test_overflowing_timestamps_are_malformed() {
        let content = "1\n99999999999999:00:00,000 --> 99999999999999:00:05,000\nhuge\n\n2\n00:00:02,000 --> 00:00:03,000\nkept\n";
        let cues = CaptionTrackParser::parse(content);
        assert_eq!(cues.len(), 1);
        assert_eq!(cues[0].text, "kept");
    }

    #[test]
    fn test_segments_beyond_u32_seconds_are_dropped() {
        let content = "1\n00:00:02,000 --> 00:00:03,000\nkept\n\n2\n1193047:00:00,000 --> 1193047:00:05,000\ntoo late\n";
        let segments = CaptionTrackParser::parse_segments(content);
        assert_eq!(segments.len(), 1);
        assert_eq!((segments[0].start_sec, segments[0].end_sec), (2, 3));
        assert_eq!(segments[0].text, "kept");
    }

    #[test]
    fn test_segment_splits_on_gaps() {
        let segments = CaptionTrackParser::parse_segments(SRT);
        assert_eq!(segments.len(), 2);
        assert_eq!((segments[0].start_sec, segments[0].end_sec), (1, 8));
        assert_eq!(segments[0].text, "Hello everyone\n♪ la la la ♪\n♪ la la la ♪");
        assert_eq!((segments[1].start_sec, segments[1].end_sec), (60, 63));
    }

    #[test]
    fn test_segment_rounds_end_up() {
        let segments = CaptionTrackParser::parse_segments(VTT);
        assert_eq!(segments.len(), 1);
        assert_eq!((segments[0].start_sec, segments[0].end_sec), (1, 6));
    }

    #[test]
    fn test_cue_display() {
        let cue = CaptionCue::new(
            1,
            Duration::from_secs(10),
            Duration::from_secs(15),
            "Test".to_string(),
        );
        let output = cue.to_string();
        assert!(output.contains("00:00:10,000 --> 00:00:15,000"));
        assert!(output.contains("Test"));
    }

    #[test]
    fn test_duration_formatting() {
        assert_eq!(format_duration(Duration::from_secs(3661)), "01:01:01,000");
        assert_eq!(format_duration(Duration::from_millis(1500)), "00:00:01,500");
    }

    #[test]
    fn test_text_cleaning() {
        assert_eq!(
            CaptionTrackParser::clean_text("  <i>This\thas</i>   spaces "),
            "This has spaces"
        );
    }
}
