//! The state machine folding stream events into one message
//!
//! A message is `Streaming` from creation until its stream completes, errors,
//! or is cancelled; finalization is one-way and happens exactly once. Events
//! are applied in strict arrival order, so tool invocations, text fragments,
//! and charts land in the order the remote API reported them.

use crate::types::{Message, ToolInvocation};
use plinth_stream::StreamEvent;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ReducerState {
    Streaming,
    Finalized,
}

/// Folds an ordered event sequence into one message's mutable fields.
#[derive(Debug)]
pub struct MessageReducer {
    state: ReducerState,
}

impl MessageReducer {
    /// Create a reducer for a freshly created streaming message.
    pub fn new() -> Self {
        Self {
            state: ReducerState::Streaming,
        }
    }

    /// Whether the owning message has been finalized.
    pub fn is_finalized(&self) -> bool {
        self.state == ReducerState::Finalized
    }

    /// Apply one event to the message. Ignored after finalization.
    pub fn apply(&mut self, message: &mut Message, event: StreamEvent) {
        if self.state == ReducerState::Finalized {
            tracing::debug!("Ignoring stream event after finalization: {:?}", event);
            return;
        }

        match event {
            StreamEvent::ToolStart {
                name,
                input,
                reasoning,
            } => {
                message.tools.push(ToolInvocation {
                    name,
                    input,
                    reasoning,
                });
                // first invocation auto-expands the reasoning panel; the
                // stream never collapses it again
                if message.tools.len() == 1 {
                    message.thinking_expanded = true;
                }
            }
            StreamEvent::Chunk { content } => {
                message.content.push_str(&content);
            }
            StreamEvent::ToolEnd { chart } => {
                if let Some(chart) = chart {
                    message.charts.push(chart);
                }
            }
            StreamEvent::Progress | StreamEvent::FullResponse => {}
        }
    }

    /// Transition the message out of the streaming state. One-way; calling
    /// again is a no-op.
    pub fn finalize(&mut self, message: &mut Message) {
        if self.state == ReducerState::Finalized {
            return;
        }
        self.state = ReducerState::Finalized;
        message.is_streaming = false;
    }
}

impl Default for MessageReducer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(content: &str) -> StreamEvent {
        StreamEvent::Chunk {
            content: content.to_string(),
        }
    }

    fn tool_start(name: &str) -> StreamEvent {
        StreamEvent::ToolStart {
            name: name.to_string(),
            input: "\"\"".to_string(),
            reasoning: String::new(),
        }
    }

    #[test]
    fn test_chunks_concatenate_in_order() {
        let mut message = Message::assistant_placeholder();
        let mut reducer = MessageReducer::new();
        for fragment in ["The ", "setback ", "is ", "5m."] {
            reducer.apply(&mut message, chunk(fragment));
        }
        assert_eq!(message.content, "The setback is 5m.");
    }

    #[test]
    fn test_first_tool_start_expands_thinking() {
        let mut message = Message::assistant_placeholder();
        let mut reducer = MessageReducer::new();
        assert!(!message.thinking_expanded);

        reducer.apply(&mut message, tool_start("search"));
        assert!(message.thinking_expanded);
        assert_eq!(message.tools.len(), 1);

        // a later explicit user toggle survives further tool events
        message.thinking_expanded = false;
        reducer.apply(&mut message, tool_start("lookup"));
        assert!(!message.thinking_expanded);
        assert_eq!(message.tools.len(), 2);
    }

    #[test]
    fn test_no_tool_start_keeps_thinking_collapsed() {
        let mut message = Message::assistant_placeholder();
        let mut reducer = MessageReducer::new();
        reducer.apply(&mut message, chunk("hello"));
        reducer.finalize(&mut message);
        assert!(!message.thinking_expanded);
    }

    #[test]
    fn test_tool_order_matches_arrival_order() {
        let mut message = Message::assistant_placeholder();
        let mut reducer = MessageReducer::new();
        reducer.apply(&mut message, tool_start("first"));
        reducer.apply(&mut message, chunk("text"));
        reducer.apply(&mut message, tool_start("second"));
        let names: Vec<&str> = message.tools.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["first", "second"]);
    }

    #[test]
    fn test_tool_end_appends_chart() {
        let mut message = Message::assistant_placeholder();
        let mut reducer = MessageReducer::new();
        reducer.apply(
            &mut message,
            StreamEvent::ToolEnd {
                chart: Some("<svg/>".to_string()),
            },
        );
        reducer.apply(&mut message, StreamEvent::ToolEnd { chart: None });
        assert_eq!(message.charts, vec!["<svg/>"]);
    }

    #[test]
    fn test_progress_and_full_response_are_noops() {
        let mut message = Message::assistant_placeholder();
        let mut reducer = MessageReducer::new();
        reducer.apply(&mut message, StreamEvent::Progress);
        reducer.apply(&mut message, StreamEvent::FullResponse);
        assert!(message.content.is_empty());
        assert!(message.tools.is_empty());
        assert!(message.charts.is_empty());
    }

    #[test]
    fn test_finalize_clears_streaming_once() {
        let mut message = Message::assistant_placeholder();
        let mut reducer = MessageReducer::new();
        reducer.apply(&mut message, chunk("partial"));
        reducer.finalize(&mut message);
        assert!(!message.is_streaming);
        assert!(reducer.is_finalized());

        // idempotent
        reducer.finalize(&mut message);
        assert!(!message.is_streaming);
    }

    #[test]
    fn test_events_after_finalize_are_ignored() {
        let mut message = Message::assistant_placeholder();
        let mut reducer = MessageReducer::new();
        reducer.apply(&mut message, chunk("kept"));
        reducer.finalize(&mut message);

        reducer.apply(&mut message, chunk(" dropped"));
        reducer.apply(&mut message, tool_start("late"));
        assert_eq!(message.content, "kept");
        assert!(message.tools.is_empty());
    }
}
