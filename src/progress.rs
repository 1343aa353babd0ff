//! Streaming progress parser for yt-dlp output
//!
//! yt-dlp has no machine-readable progress mode in the invocation shape this
//! engine uses, so its human-readable `[download]` lines are the wire
//! contract. [`parse_progress`] maps one captured chunk of combined
//! stdout/stderr text to at most one structured event. It is a pure function
//! of the chunk: no state is carried between calls.

use std::sync::LazyLock;

use regex::Regex;

use crate::types::ProgressEvent;

// unwrap is fine below: the patterns are compile-time constants
#[allow(clippy::unwrap_used)]
static PERCENT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[download\]\s+(\d+\.?\d*)%").unwrap());

#[allow(clippy::unwrap_used)]
static SIZE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"of\s+~?\s*([\d.]+\w+)").unwrap());

#[allow(clippy::unwrap_used)]
static SPEED_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"at\s+([\d.]+\w+/s)").unwrap());

#[allow(clippy::unwrap_used)]
static ETA_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"ETA\s+([\d:]+)").unwrap());

/// Parse one chunk of tool output into at most one progress event.
///
/// A chunk may contain zero, one, or several recognizable lines (buffered
/// reads batch them); only the last recognized line is reported, since
/// progress is monotonically informative and a stale partial line is
/// superseded by whatever follows it in the same chunk.
///
/// Recognition, in priority order per line:
/// 1. a `[download] NN.N%` line: percent is floored and clamped to
///    0..=100, message composed from the size/speed/ETA fields on that line
/// 2. a `[download] Destination:` line: percent 0, "Starting download: ..."
/// 3. an "already been downloaded" line: percent 100, complete
/// 4. post-processing phase markers (merge, audio extraction, subtitle
///    embedding): percent 100 with a phase message
pub fn parse_progress(chunk: &str) -> Option<ProgressEvent> {
    let mut last = None;
    for line in chunk.lines() {
        if let Some(event) = parse_line(line) {
            last = Some(event);
        }
    }
    last
}

fn parse_line(line: &str) -> Option<ProgressEvent> {
    if let Some(caps) = PERCENT_RE.captures(line) {
        let value: f64 = caps.get(1)?.as_str().parse().ok()?;
        let percent = (value.floor().clamp(0.0, 100.0)) as u8;

        let mut parts = Vec::new();
        if let Some(size) = SIZE_RE.captures(line) {
            parts.push(format!("of {}", &size[1]));
        }
        if let Some(speed) = SPEED_RE.captures(line) {
            parts.push(format!("at {}", &speed[1]));
        }
        if let Some(eta) = ETA_RE.captures(line) {
            parts.push(format!("ETA {}", &eta[1]));
        }

        let message = if parts.is_empty() {
            "Downloading...".to_string()
        } else {
            parts.join(" ")
        };
        return Some(ProgressEvent { percent, message });
    }

    if let Some(rest) = line.split_once("[download] Destination:").map(|(_, r)| r) {
        return Some(ProgressEvent {
            percent: 0,
            message: format!("Starting download: {}", rest.trim()),
        });
    }

    if line.contains("has already been downloaded") {
        return Some(ProgressEvent {
            percent: 100,
            message: "Download complete!".to_string(),
        });
    }

    if line.contains("[Merger]") || line.contains("Merging formats") {
        return Some(ProgressEvent {
            percent: 100,
            message: "Merging video and audio...".to_string(),
        });
    }
    if line.contains("[ExtractAudio]") {
        return Some(ProgressEvent {
            percent: 100,
            message: "Extracting audio...".to_string(),
        });
    }
    if line.contains("[EmbedSubtitle]") {
        return Some(ProgressEvent {
            percent: 100,
            message: "Embedding subtitles...".to_string(),
        });
    }

    None
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percentage_line_with_all_fields() {
        let event = parse_progress("[download]  42.0% of 10.00MiB at 1.00MiB/s ETA 00:05")
            .unwrap();
        assert_eq!(event.percent, 42);
        assert_eq!(event.message, "of 10.00MiB at 1.00MiB/s ETA 00:05");
    }

    #[test]
    fn percentage_is_floored_not_rounded() {
        let event = parse_progress("[download]  42.9% of 10.00MiB").unwrap();
        assert_eq!(event.percent, 42);
    }

    #[test]
    fn percentage_above_hundred_clamps() {
        let event = parse_progress("[download]  105.3% of 10.00MiB").unwrap();
        assert_eq!(event.percent, 100);
    }

    #[test]
    fn approximate_size_marker_is_accepted() {
        let event = parse_progress("[download]  10.0% of ~ 25.00MiB at 2.00MiB/s").unwrap();
        assert_eq!(event.message, "of 25.00MiB at 2.00MiB/s");
    }

    #[test]
    fn percentage_line_without_fields_falls_back() {
        let event = parse_progress("[download]  13.7%").unwrap();
        assert_eq!(event.percent, 13);
        assert_eq!(event.message, "Downloading...");
    }

    #[test]
    fn destination_line_starts_at_zero() {
        let event =
            parse_progress("[download] Destination: My Video [1080p+audio].mp4").unwrap();
        assert_eq!(event.percent, 0);
        assert_eq!(event.message, "Starting download: My Video [1080p+audio].mp4");
    }

    #[test]
    fn full_percent_line_reports_complete_via_percentage_rule() {
        // "[download] 100% of ..." matches the percentage rule, which takes
        // priority over the completion phrase.
        let event = parse_progress("[download] 100% of 10.00MiB in 00:08").unwrap();
        assert_eq!(event.percent, 100);
        assert_eq!(event.message, "of 10.00MiB");
    }

    #[test]
    fn already_downloaded_reports_complete() {
        let event =
            parse_progress("[download] video.mp4 has already been downloaded").unwrap();
        assert_eq!(event.percent, 100);
        assert_eq!(event.message, "Download complete!");
    }

    #[test]
    fn post_processing_phases_report_hundred_percent() {
        let merger = parse_progress("[Merger] Merging formats into \"out.mp4\"").unwrap();
        assert_eq!(merger.percent, 100);
        assert_eq!(merger.message, "Merging video and audio...");

        let extract = parse_progress("[ExtractAudio] Destination: out.mp3").unwrap();
        assert_eq!(extract.message, "Extracting audio...");

        let subs = parse_progress("[EmbedSubtitle] Embedding subtitles in out.mp4").unwrap();
        assert_eq!(subs.message, "Embedding subtitles...");
    }

    #[test]
    fn unrecognized_chunk_yields_no_event() {
        assert!(parse_progress("").is_none());
        assert!(parse_progress("[info] Downloading 1 format(s): 137+140").is_none());
        assert!(parse_progress("WARNING: unable to obtain file audio codec").is_none());
    }

    #[test]
    fn last_recognized_line_in_a_chunk_wins() {
        let chunk = "[download]  10.0% of 10.00MiB at 1.00MiB/s ETA 00:45\n\
                     [download]  55.0% of 10.00MiB at 2.00MiB/s ETA 00:11\n";
        let event = parse_progress(chunk).unwrap();
        assert_eq!(event.percent, 55);
        assert_eq!(event.message, "of 10.00MiB at 2.00MiB/s ETA 00:11");
    }

    #[test]
    fn recognized_line_survives_trailing_noise() {
        let chunk = "[download]  80.0% of 5.00MiB\n[info] some unrelated line\n";
        let event = parse_progress(chunk).unwrap();
        assert_eq!(event.percent, 80);
    }

    #[test]
    fn malformed_percentage_yields_no_event() {
        // digits are required before the percent marker
        assert!(parse_progress("[download]  % of 10MiB").is_none());
    }
}
