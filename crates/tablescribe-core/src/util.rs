//! Small cross-cutting helpers shared by several components.

use once_cell::sync::Lazy;
use regex::Regex;

static UNSAFE_CHARS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^A-Za-z0-9_-]+").unwrap());

/// Sanitize an arbitrary identifier for use as a path component.
///
/// Every run of characters outside `[A-Za-z0-9_-]` collapses to a single
/// underscore, and leading/trailing underscores are trimmed. The original
/// identifier should still be used for logging; only the sanitized form is
/// safe to use in a filesystem path.
pub fn sanitize_filename(raw: &str) -> String {
    let collapsed = UNSAFE_CHARS.replace_all(raw, "_");
    let trimmed = collapsed.trim_matches('_');
    if trimmed.is_empty() {
        "UNKNOWN".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Format seconds as `HH:MM:SS` (used by the Full/IC/OOC text formats).
pub fn format_hms(seconds: f64) -> String {
    let total = seconds.max(0.0).round() as u64;
    let h = total / 3600;
    let m = (total % 3600) / 60;
    let s = total % 60;
    format!("{h:02}:{m:02}:{s:02}")
}

/// Format seconds as `HH:MM:SS,mmm` (SRT timestamp format).
pub fn format_srt_timestamp(seconds: f64) -> String {
    let seconds = seconds.max(0.0);
    let total_ms = (seconds * 1000.0).round() as u64;
    let h = total_ms / 3_600_000;
    let m = (total_ms % 3_600_000) / 60_000;
    let s = (total_ms % 60_000) / 1000;
    let ms = total_ms % 1000;
    format!("{h:02}:{m:02}:{s:02},{ms:03}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_strips_unsafe_runs() {
        assert_eq!(sanitize_filename("SPEAKER_00"), "SPEAKER_00");
        assert_eq!(sanitize_filename("Gandalf the Grey!"), "Gandalf_the_Grey");
        assert_eq!(sanitize_filename("///"), "UNKNOWN");
        assert_eq!(sanitize_filename(""), "UNKNOWN");
    }

    #[test]
    fn sanitize_always_matches_charset() {
        let re = Regex::new(r"^[A-Za-z0-9_-]*$").unwrap();
        for raw in ["a/b\\c", "héllo wörld", "..", "SPEAKER_00", "N/A"] {
            assert!(re.is_match(&sanitize_filename(raw)));
        }
    }

    #[test]
    fn hms_formats_round_trip() {
        assert_eq!(format_hms(0.0), "00:00:00");
        assert_eq!(format_hms(3661.0), "01:01:01");
    }

    #[test]
    fn srt_timestamp_has_millis() {
        assert_eq!(format_srt_timestamp(1.5), "00:00:01,500");
        assert_eq!(format_srt_timestamp(3661.25), "01:01:01,250");
    }
}
