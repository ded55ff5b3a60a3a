//! Shared utility functions used across multiple modules.

use chrono::{DateTime, Duration, SecondsFormat, SubsecRound, Utc};

/// Normalize optional text by trimming whitespace and removing empties.
///
/// Returns `None` when the input is `None` or the trimmed value is empty.
pub fn normalize_text_option(value: Option<String>) -> Option<String> {
    let value = value?;
    let value = value.trim();
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

/// Check if a string starts with `http://` or `https://`.
pub fn is_http_url(value: &str) -> bool {
    value.starts_with("http://") || value.starts_with("https://")
}

/// Truncate text to at most 180 characters for error messages.
pub fn compact_text(value: &str) -> String {
    value.trim().chars().take(180).collect()
}

/// Format a UTC instant the way JavaScript's `toISOString` does
/// (`2026-02-18T09:30:00.000Z`), which is what the remote sheet stores.
pub fn to_iso_timestamp(instant: DateTime<Utc>) -> String {
    instant.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Current time as an ISO-8601 timestamp with millisecond precision.
pub fn now_iso() -> String {
    to_iso_timestamp(Utc::now())
}

/// Parse an ISO-8601 / RFC 3339 timestamp into UTC.
pub fn parse_iso_timestamp(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value.trim())
        .ok()
        .map(|parsed| parsed.with_timezone(&Utc))
}

/// Next `updatedAt` for a local mutation.
///
/// Never returns a value that sorts at or before `previous`, even when the
/// wall clock went backwards since the last edit.
pub fn next_updated_at(previous: &str) -> String {
    // Stored timestamps carry milliseconds; compare at that precision.
    let now = Utc::now().trunc_subsecs(3);
    match parse_iso_timestamp(previous) {
        Some(previous) if previous >= now => to_iso_timestamp(previous + Duration::milliseconds(1)),
        _ => to_iso_timestamp(now),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_text_option_rejects_empty() {
        assert_eq!(normalize_text_option(None), None);
        assert_eq!(normalize_text_option(Some("   ".to_string())), None);
    }

    #[test]
    fn normalize_text_option_trims_value() {
        assert_eq!(
            normalize_text_option(Some(" https://example.com ".to_string())),
            Some("https://example.com".to_string())
        );
    }

    #[test]
    fn is_http_url_accepts_valid_schemes() {
        assert!(is_http_url("http://localhost"));
        assert!(is_http_url("https://example.com"));
        assert!(!is_http_url("ftp://example.com"));
        assert!(!is_http_url("example.com"));
    }

    #[test]
    fn iso_timestamp_matches_javascript_format() {
        let instant = parse_iso_timestamp("2026-02-18T09:30:00+09:00").unwrap();
        assert_eq!(to_iso_timestamp(instant), "2026-02-18T00:30:00.000Z");
    }

    #[test]
    fn next_updated_at_moves_past_future_timestamps() {
        let future = "2999-01-01T00:00:00.000Z";
        assert_eq!(next_updated_at(future), "2999-01-01T00:00:00.001Z");
    }

    #[test]
    fn next_updated_at_uses_clock_for_past_timestamps() {
        let next = next_updated_at("2000-01-01T00:00:00.000Z");
        assert!(next.as_str() > "2000-01-01T00:00:00.000Z");
        assert!(parse_iso_timestamp(&next).is_some());
    }

    #[test]
    fn next_updated_at_is_strictly_newer_within_one_millisecond() {
        for _ in 0..1000 {
            let previous = now_iso();
            let next = next_updated_at(&previous);
            assert!(
                parse_iso_timestamp(&next) > parse_iso_timestamp(&previous),
                "{next} is not after {previous}"
            );
        }
    }
}
