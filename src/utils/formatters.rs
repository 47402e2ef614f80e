// Formatting utilities

use chrono::DateTime;

/// Collapse all whitespace runs to single spaces and trim the ends
pub fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Truncate string to at most `max_chars` characters, appending "..." when cut
pub fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_chars.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

/// Render a stored ISO-8601 timestamp as a Discord relative timestamp
pub fn discord_timestamp(iso: Option<&str>) -> String {
    match iso {
        Some(raw) => match DateTime::parse_from_rfc3339(raw) {
            Ok(dt) => format!("<t:{}:R>", dt.timestamp()),
            Err(_) => raw.to_string(),
        },
        None => "Never".to_string(),
    }
}

/// Show an optional free-text field, with a placeholder when empty
pub fn or_placeholder(s: &str, placeholder: &str) -> String {
    if s.trim().is_empty() {
        placeholder.to_string()
    } else {
        truncate(s, 1024)
    }
}
