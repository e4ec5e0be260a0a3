//! Display helpers for chat listings

use crate::types::{Message, Role};
use chrono::{TimeZone, Utc};

/// Longest chat title derived from a message.
const TITLE_MAX_LEN: usize = 50;

/// Truncate text to `max` characters, ellipsis included.
pub fn truncate(text: &str, max: usize) -> String {
    const SUFFIX: &str = "...";
    if text.chars().count() <= max {
        return text.to_string();
    }
    let keep = max.saturating_sub(SUFFIX.len());
    let truncated: String = text.chars().take(keep).collect();
    format!("{}{}", truncated, SUFFIX)
}

/// Derive a chat title from the first user message, if one exists.
pub fn derive_title(messages: &[Message]) -> Option<String> {
    messages
        .iter()
        .find(|m| m.role == Role::User)
        .map(|m| truncate(&m.content, TITLE_MAX_LEN))
}

/// Format a millisecond timestamp relative to now, for chat listings.
pub fn format_relative(timestamp_millis: i64) -> String {
    format_relative_at(timestamp_millis, Utc::now().timestamp_millis())
}

fn format_relative_at(timestamp_millis: i64, now_millis: i64) -> String {
    let diff_millis = (now_millis - timestamp_millis).abs();
    let minutes = diff_millis / 60_000;
    let hours = diff_millis / 3_600_000;
    let days = diff_millis / 86_400_000;

    if minutes < 1 {
        "Just now".to_string()
    } else if minutes < 60 {
        format!("{} minute{} ago", minutes, plural(minutes))
    } else if hours < 24 {
        format!("{} hour{} ago", hours, plural(hours))
    } else if days == 1 {
        "Yesterday".to_string()
    } else if days < 7 {
        format!("{} days ago", days)
    } else {
        Utc.timestamp_millis_opt(timestamp_millis)
            .single()
            .map(|dt| dt.format("%Y-%m-%d").to_string())
            .unwrap_or_else(|| "unknown".to_string())
    }
}

fn plural(n: i64) -> &'static str {
    if n == 1 { "" } else { "s" }
}
