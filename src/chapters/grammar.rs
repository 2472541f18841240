//! Line-level timestamp recognition: `[marker] H:MM:SS|MM:SS label`

use super::RawMatch;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::trace;

/// Optional leading marker (ordinal with `.`, `)` or whitespace, or a bullet glyph),
/// then the timestamp, then the rest of the line.
/// `â€¢` is the UTF-8 bullet read back as Windows-1252.
static TIMESTAMP_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^[\s\x{FEFF}\x{200B}]*(?P<prefix>\d{1,3}(?:[.)]\s*|\s+)|(?:-|•|â€¢)\s*)?(?:(?P<h>\d{1,2}):)?(?P<m>\d{1,2}):(?P<s>\d{2})(?P<rest>.*)$",
    )
    .expect("timestamp line pattern is valid")
});

/// Recognizer for chapter-list style timestamp lines
pub struct TimestampGrammar;

impl TimestampGrammar {
    /// Match a single line. Only the first timestamp on the line counts;
    /// anything after it, including further timestamps, is label text.
    pub fn match_line(line: &str) -> Option<RawMatch> {
        let caps = TIMESTAMP_LINE.captures(line)?;

        let rest = caps.name("rest").map(|m| m.as_str()).unwrap_or("");
        // "00:205" and "00:20:5" are malformed timestamps, not a timestamp plus a label
        let mut tail = rest.chars();
        let truncated = match tail.next() {
            Some(c) if c.is_ascii_digit() => true,
            Some(':') => tail.next().is_some_and(|c| c.is_ascii_digit()),
            _ => false,
        };
        if truncated {
            return None;
        }

        let hours = match caps.name("h") {
            Some(h) => Some(h.as_str().parse::<u32>().ok()?),
            None => None,
        };
        let minutes: u32 = caps.name("m")?.as_str().parse().ok()?;
        let seconds: u32 = caps.name("s")?.as_str().parse().ok()?;

        if seconds >= 60 || (hours.is_some() && minutes >= 60) {
            trace!("Rejecting out-of-range timestamp in line: {}", line);
            return None;
        }

        Some(RawMatch {
            prefix_consumed: caps
                .name("prefix")
                .map(|m| m.as_str().to_string())
                .unwrap_or_default(),
            hours,
            minutes,
            seconds,
            label: rest.trim().to_string(),
        })
    }

    /// Match every line of a block, in document order
    pub fn scan(text: &str) -> Vec<RawMatch> {
        text.lines().filter_map(Self::match_line).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn start_and_label(line: &str) -> Option<(u32, String)> {
        TimestampGrammar::match_line(line).map(|m| (m.start_sec(), m.label))
    }

    #[test]
    fn test_bare_timestamps() {
        assert_eq!(start_and_label("00:20 Song A"), Some((20, "Song A".to_string())));
        assert_eq!(start_and_label("5:30 Main"), Some((330, "Main".to_string())));
        assert_eq!(start_and_label("1:02:03 Finale"), Some((3723, "Finale".to_string())));
        assert_eq!(start_and_label("01:00:00 Encore"), Some((3600, "Encore".to_string())));
    }

    #[test]
    fn test_prefix_variants_are_equivalent() {
        let lines = [
            "1. 00:20 Song A",
            "2) 00:20 Song A",
            "3 00:20 Song A",
            "- 00:20 Song A",
            "• 00:20 Song A",
            "â€¢ 00:20 Song A",
            "  00:20   Song A  ",
        ];
        for line in lines {
            assert_eq!(
                start_and_label(line),
                Some((20, "Song A".to_string())),
                "line {:?}",
                line
            );
        }
    }

    #[test]
    fn test_prefix_is_recorded() {
        let m = TimestampGrammar::match_line("12) 1:00 Song").unwrap();
        assert_eq!(m.prefix_consumed, "12) ");
        assert_eq!(m.hours, None);
        assert_eq!(m.minutes, 1);

        let m = TimestampGrammar::match_line("•00:05 Tight bullet").unwrap();
        assert_eq!(m.prefix_consumed, "•");
        assert_eq!(m.label, "Tight bullet");
    }

    #[test]
    fn test_empty_label_is_allowed() {
        let m = TimestampGrammar::match_line("03:15").unwrap();
        assert_eq!(m.start_sec(), 195);
        assert!(m.label.is_empty());
    }

    #[test]
    fn test_only_first_timestamp_counts() {
        let m = TimestampGrammar::match_line("00:10 Song A 00:50 Song B").unwrap();
        assert_eq!(m.start_sec(), 10);
        assert_eq!(m.label, "Song A 00:50 Song B");
    }

    #[test]
    fn test_non_latin_labels() {
        assert_eq!(
            start_and_label("1. 0:45 夜に駆ける"),
            Some((45, "夜に駆ける".to_string()))
        );
        assert_eq!(
            start_and_label("02:10 Песня"),
            Some((130, "Песня".to_string()))
        );
    }

    #[test]
    fn test_malformed_lines_do_not_match() {
        assert!(TimestampGrammar::match_line("Great video!").is_none());
        assert!(TimestampGrammar::match_line("Check out 01:20 for the best part").is_none());
        assert!(TimestampGrammar::match_line("00:75 Bad seconds").is_none());
        assert!(TimestampGrammar::match_line("1:75:00 Bad minutes").is_none());
        assert!(TimestampGrammar::match_line("00:205 Too many digits").is_none());
        assert!(TimestampGrammar::match_line("123:45 Three digit minutes").is_none());
        assert!(TimestampGrammar::match_line("00:20:5 Short seconds").is_none());
        assert!(TimestampGrammar::match_line("1:02:03:04 Too many fields").is_none());
        assert!(TimestampGrammar::match_line("").is_none());
    }

    #[test]
    fn test_scan_keeps_document_order() {
        let text = "Tracklist:\n00:00 Intro\r\n10:00 Outro\n05:30 Main\nthanks for watching";
        let starts: Vec<u32> = TimestampGrammar::scan(text)
            .iter()
            .map(|m| m.start_sec())
            .collect();
        assert_eq!(starts, vec![0, 600, 330]);
    }

    #[test]
    fn test_leading_byte_order_mark() {
        assert_eq!(
            start_and_label("\u{FEFF}00:20 Song A"),
            Some((20, "Song A".to_string()))
        );
    }
}
