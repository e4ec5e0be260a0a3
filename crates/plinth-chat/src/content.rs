//! Inline chart marker parsing
//!
//! Besides the out-of-band chart list delivered on `tool_end` events, the
//! remote API may reference charts inline with `<chart id=N>` markers inside
//! the message text. Both delivery paths coexist: markers split the content
//! into renderable segments, and charts never referenced by a marker are
//! rendered after the message body.

use regex::Regex;
use std::sync::LazyLock;

static CHART_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<chart\s+id\s*=\s*(\d+)\s*>").unwrap());

/// One renderable run of message content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentSegment {
    /// A run of markdown text
    Markdown { content: String },
    /// An inline chart reference, by 1-based global chart id
    Chart { chart_id: usize },
}

/// Split message content into markdown and chart segments.
///
/// Whitespace-only markdown runs between markers are dropped; content with
/// no markers comes back as a single markdown segment.
pub fn parse_segments(content: &str) -> Vec<ContentSegment> {
    if content.is_empty() {
        return vec![];
    }

    let mut segments = Vec::new();
    let mut last_end = 0;

    for captures in CHART_MARKER.captures_iter(content) {
        if let (Some(m), Some(id)) = (captures.get(0), captures.get(1)) {
            push_markdown(&mut segments, &content[last_end..m.start()]);
            if let Ok(chart_id) = id.as_str().parse::<usize>() {
                segments.push(ContentSegment::Chart { chart_id });
            }
            last_end = m.end();
        }
    }
    push_markdown(&mut segments, &content[last_end..]);

    if segments.is_empty() {
        segments.push(ContentSegment::Markdown {
            content: content.to_string(),
        });
    }
    segments
}

fn push_markdown(segments: &mut Vec<ContentSegment>, text: &str) {
    let text = text.trim();
    if !text.is_empty() {
        segments.push(ContentSegment::Markdown {
            content: text.to_string(),
        });
    }
}

/// Chart ids referenced in content, first-occurrence order, deduplicated.
pub fn referenced_chart_ids(content: &str) -> Vec<usize> {
    let mut ids = Vec::new();
    for captures in CHART_MARKER.captures_iter(content) {
        if let Ok(id) = captures[1].parse::<usize>() {
            if !ids.contains(&id) {
                ids.push(id);
            }
        }
    }
    ids
}

/// Whether content contains any chart markers.
pub fn has_chart_markers(content: &str) -> bool {
    CHART_MARKER.is_match(content)
}

/// Charts never referenced by an inline marker.
///
/// A chart's global id is `offset + index + 1`, where `offset` counts the
/// charts of earlier messages in the conversation.
pub fn unreferenced_charts<'a>(
    content: &str,
    charts: &'a [String],
    chart_offset: usize,
) -> Vec<&'a str> {
    if charts.is_empty() {
        return vec![];
    }
    let referenced = referenced_chart_ids(content);
    charts
        .iter()
        .enumerate()
        .filter(|(index, _)| !referenced.contains(&(chart_offset + index + 1)))
        .map(|(_, chart)| chart.as_str())
        .collect()
}
