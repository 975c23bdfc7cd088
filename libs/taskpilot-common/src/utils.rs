//! Utility functions shared across TaskPilot crates

use crate::constants::DUE_DATE_FORMAT;
use chrono::{DateTime, Utc};

/// Format a datetime for display
#[must_use]
pub fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.format("%Y-%m-%d %H:%M:%S UTC").to_string()
}

/// Format a due date the way it appears in prompt text
#[must_use]
pub fn format_due(dt: &DateTime<Utc>) -> String {
    dt.format(DUE_DATE_FORMAT).to_string()
}

/// Truncate a string to at most `max_len` characters, ending with "..."
#[must_use]
pub fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{kept}...")
    }
}

/// Parse a boolean flag as accepted in environment variables
#[must_use]
pub fn parse_bool(value: &str) -> bool {
    let lower = value.trim().to_lowercase();
    matches!(lower.as_str(), "true" | "1" | "yes" | "on")
}

/// Mask the password of a connection URL for logging
///
/// Strings that do not parse as URLs are returned unchanged.
#[must_use]
pub fn redact_url(raw: &str) -> String {
    match url::Url::parse(raw) {
        Ok(mut parsed) if parsed.password().is_some() => {
            if parsed.set_password(Some("***")).is_err() {
                return raw.to_string();
            }
            parsed.to_string()
        }
        _ => raw.to_string(),
    }
}
