//! Stream event interpretation
//!
//! Each raw record framed by the [`crate::decoder::EventDecoder`] is a JSON
//! payload with a required `type` tag. Interpretation normalizes the
//! heterogeneous payloads into the closed [`StreamEvent`] set; a malformed
//! record is dropped with a diagnostic and never aborts the stream.

use serde::Deserialize;
use serde_json::Value;

/// Name used when a `tool_start` event carries no tool name.
pub const UNKNOWN_TOOL: &str = "Unknown Tool";

/// A normalized event from the chat response stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    /// A reasoning/tool-use step started
    ToolStart {
        name: String,
        input: String,
        reasoning: String,
    },
    /// A text fragment to append to the message body
    Chunk { content: String },
    /// A tool step finished, optionally delivering rendered chart markup
    ToolEnd { chart: Option<String> },
    /// Progress heartbeat; carried in the protocol, ignored by the reducer
    Progress,
    /// Full-response echo; carried in the protocol, ignored by the reducer
    FullResponse,
}

/// Raw wire shape of one record. Fields are present or absent depending on
/// the `type` tag; unknown fields are ignored.
#[derive(Debug, Deserialize)]
struct WireEvent {
    #[serde(rename = "type")]
    kind: String,
    name: Option<String>,
    tool: Option<String>,
    input: Option<Value>,
    reasoning: Option<String>,
    content: Option<String>,
    artifacts_data: Option<ArtifactsData>,
}

#[derive(Debug, Deserialize)]
struct ArtifactsData {
    chart_svg: Option<String>,
}

/// Parse and classify one raw record.
///
/// Returns `None` for malformed payloads (logged, stream continues) and for
/// unknown event types (a no-op, not an error).
pub fn parse_record(record: &str) -> Option<StreamEvent> {
    let wire: WireEvent = match serde_json::from_str(record) {
        Ok(wire) => wire,
        Err(e) => {
            tracing::warn!("Dropping malformed stream record: {} ({})", e, record);
            return None;
        }
    };

    match wire.kind.as_str() {
        "tool_start" => Some(StreamEvent::ToolStart {
            name: wire
                .name
                .or(wire.tool)
                .unwrap_or_else(|| UNKNOWN_TOOL.to_string()),
            input: render_input(wire.input),
            reasoning: wire.reasoning.unwrap_or_default(),
        }),
        "chunk" => Some(StreamEvent::Chunk {
            content: wire.content.unwrap_or_default(),
        }),
        "tool_end" => Some(StreamEvent::ToolEnd {
            chart: wire.artifacts_data.and_then(|a| a.chart_svg),
        }),
        "progress" => Some(StreamEvent::Progress),
        "full_response" => Some(StreamEvent::FullResponse),
        other => {
            tracing::debug!("Ignoring unknown stream event type: {}", other);
            None
        }
    }
}

/// Normalize a tool's raw input into its display string.
///
/// A sequence is joined with `", "`; anything else is JSON-serialized. An
/// absent or null input serializes as the empty-string literal `""`.
fn render_input(input: Option<Value>) -> String {
    match input {
        None | Some(Value::Null) => "\"\"".to_string(),
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| match item {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .collect::<Vec<_>>()
            .join(", "),
        Some(other) => other.to_string(),
    }
}
