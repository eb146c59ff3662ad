use chrono::DateTime;
use chrono_tz::Tz;

/// Renders a server timestamp as `October 15, 2026` in `tz`.
///
/// Returns `"Invalid date"` when the timestamp cannot be parsed.
pub fn format_date(raw: &str, tz: Tz) -> String {
    match DateTime::parse_from_rfc3339(raw.trim()) {
        Ok(date) => date.with_timezone(&tz).format("%B %-d, %Y").to_string(),
        Err(err) => {
            tracing::warn!("failed to format date {raw:?}: {err}");
            "Invalid date".to_string()
        }
    }
}
