//! Stream orchestration: one request/response cycle per user turn
//!
//! The client owns the turn lifecycle: it appends the user message and the
//! streaming placeholder, issues the call, drives bytes through the
//! decoder → interpreter → reducer pipeline, and finalizes the placeholder on
//! completion, cancellation, or failure. Failures never propagate to the
//! caller; the transcript always ends the turn with a terminal message.

use crate::reducer::MessageReducer;
use crate::types::{Conversation, Message};
use plinth_stream::{
    event::parse_record, ChatRequest, ChatTransport, Error as StreamError, EventDecoder,
    HttpTransport,
};
use std::sync::Arc;
use tokio_stream::StreamExt;
use tokio_util::sync::CancellationToken;

/// User-visible text a turn ends with when the transport fails.
pub const FALLBACK_ERROR_TEXT: &str = "Sorry, an error occurred.";

/// How a turn ended. All outcomes leave a finalized message behind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnOutcome {
    /// Stream ran to completion
    Completed,
    /// Turn was aborted; partial content is preserved
    Cancelled,
    /// Transport failed; content was replaced with the fallback notice
    Failed,
}

/// Stateless service value driving chat turns over an injected transport.
#[derive(Clone)]
pub struct ChatClient {
    transport: Arc<dyn ChatTransport>,
}

impl ChatClient {
    /// Create a client talking HTTP to the given chat endpoint.
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self::with_transport(Arc::new(HttpTransport::new(endpoint)))
    }

    /// Create a client over a custom transport.
    pub fn with_transport(transport: Arc<dyn ChatTransport>) -> Self {
        Self { transport }
    }

    /// Run one user turn against the conversation.
    ///
    /// Appends the user message and a streaming assistant placeholder, then
    /// folds the response stream into the placeholder until it ends, the
    /// token is cancelled, or the transport fails. The placeholder is always
    /// finalized before this returns.
    pub async fn run_turn(
        &self,
        conversation: &mut Conversation,
        query: &str,
        model_id: Option<String>,
        cancel: CancellationToken,
    ) -> TurnOutcome {
        conversation.push(Message::user(query));
        let placeholder = Message::assistant_placeholder();
        let message_id = placeholder.id.clone();
        conversation.push(placeholder);

        let request = ChatRequest::new(query, conversation.id.clone(), model_id);
        self.stream_turn(conversation, &message_id, &request, cancel)
            .await
    }

    /// Drive the decoder/interpreter/reducer pipeline for one placeholder.
    ///
    /// Events are applied to the message located by id, so overlapping turns
    /// stay isolated to their own placeholders.
    async fn stream_turn(
        &self,
        conversation: &mut Conversation,
        message_id: &str,
        request: &ChatRequest,
        cancel: CancellationToken,
    ) -> TurnOutcome {
        let mut reducer = MessageReducer::new();

        let mut stream = match self.transport.fetch(request, cancel.clone()).await {
            Ok(stream) => stream,
            Err(StreamError::Aborted) => {
                finalize(conversation, message_id, &mut reducer);
                return TurnOutcome::Cancelled;
            }
            Err(e) => {
                tracing::warn!("Chat request failed: {}", e);
                fail(conversation, message_id, &mut reducer);
                return TurnOutcome::Failed;
            }
        };

        let mut decoder = EventDecoder::new();
        loop {
            // biased: a fired cancel token stops reads before the next chunk
            // is taken, even if one is already buffered
            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    finalize(conversation, message_id, &mut reducer);
                    return TurnOutcome::Cancelled;
                }
                item = stream.next() => item,
            };

            match next {
                None => break,
                Some(Ok(chunk)) => {
                    for record in decoder.push(&chunk) {
                        apply_record(conversation, message_id, &mut reducer, &record);
                    }
                }
                Some(Err(e)) => {
                    tracing::warn!("Chat stream failed mid-turn: {}", e);
                    fail(conversation, message_id, &mut reducer);
                    return TurnOutcome::Failed;
                }
            }
        }

        // the stream may end without a trailing newline
        if let Some(record) = decoder.finish() {
            apply_record(conversation, message_id, &mut reducer, &record);
        }

        finalize(conversation, message_id, &mut reducer);
        TurnOutcome::Completed
    }
}

fn apply_record(
    conversation: &mut Conversation,
    message_id: &str,
    reducer: &mut MessageReducer,
    record: &str,
) {
    let Some(event) = parse_record(record) else {
        return;
    };
    match conversation.message_mut(message_id) {
        Some(message) => reducer.apply(message, event),
        None => tracing::warn!("Streaming message {} disappeared mid-turn", message_id),
    }
}

fn finalize(conversation: &mut Conversation, message_id: &str, reducer: &mut MessageReducer) {
    if let Some(message) = conversation.message_mut(message_id) {
        reducer.finalize(message);
    }
}

/// Finalize with the generic failure notice, keeping any tool invocations
/// and charts accumulated before the failure.
fn fail(conversation: &mut Conversation, message_id: &str, reducer: &mut MessageReducer) {
    if let Some(message) = conversation.message_mut(message_id) {
        message.content = FALLBACK_ERROR_TEXT.to_string();
        reducer.finalize(message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Role;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use plinth_stream::{api::ByteStream, Error as StreamError};

    type MockItem = Result<Vec<u8>, StreamError>;

    /// Transport yielding a canned chunk sequence, recording the request.
    struct MockTransport {
        items: Mutex<Option<Vec<MockItem>>>,
        seen_request: Mutex<Option<ChatRequest>>,
        /// When set, the token is cancelled after this many items.
        cancel_after: Option<usize>,
    }

    impl MockTransport {
        fn new(items: Vec<MockItem>) -> Arc<Self> {
            Arc::new(Self {
                items: Mutex::new(Some(items)),
                seen_request: Mutex::new(None),
                cancel_after: None,
            })
        }

        fn cancelling_after(items: Vec<MockItem>, after: usize) -> Arc<Self> {
            Arc::new(Self {
                items: Mutex::new(Some(items)),
                seen_request: Mutex::new(None),
                cancel_after: Some(after),
            })
        }
    }

    #[async_trait]
    impl ChatTransport for MockTransport {
        async fn fetch(
            &self,
            request: &ChatRequest,
            cancel: CancellationToken,
        ) -> Result<ByteStream, StreamError> {
            *self.seen_request.lock() = Some(request.clone());
            let items = self.items.lock().take().unwrap_or_default();
            let cancel_after = self.cancel_after;

            let stream = async_stream::stream! {
                for (idx, item) in items.into_iter().enumerate() {
                    if cancel_after == Some(idx) {
                        cancel.cancel();
                        // suspend so the consumer observes the token before
                        // this item is delivered
                        tokio::task::yield_now().await;
                    }
                    yield item;
                }
            };
            Ok(Box::pin(stream))
        }
    }

    /// Transport whose initial call fails outright.
    struct FailingTransport;

    #[async_trait]
    impl ChatTransport for FailingTransport {
        async fn fetch(
            &self,
            _request: &ChatRequest,
            _cancel: CancellationToken,
        ) -> Result<ByteStream, StreamError> {
            Err(StreamError::Status { status: 502 })
        }
    }

    fn data(line: &str) -> MockItem {
        Ok(format!("data: {}\n", line).into_bytes())
    }

    async fn run(
        transport: Arc<dyn ChatTransport>,
        conversation: &mut Conversation,
    ) -> TurnOutcome {
        let client = ChatClient::with_transport(transport);
        client
            .run_turn(conversation, "what are the rules?", None, CancellationToken::new())
            .await
    }

    fn assistant(conversation: &Conversation) -> &Message {
        conversation
            .messages
            .iter()
            .find(|m| m.role == Role::Assistant)
            .expect("assistant placeholder should exist")
    }

    #[tokio::test]
    async fn test_chunks_accumulate_regardless_of_transport_boundaries() {
        // one record split across three transport chunks, plus a whole one
        let transport = MockTransport::new(vec![
            Ok(b"data: {\"type\":\"chu".to_vec()),
            Ok(b"nk\",\"content\":\"hel".to_vec()),
            Ok(b"lo \"}\n".to_vec()),
            data(r#"{"type":"chunk","content":"world"}"#),
        ]);
        let mut conversation = Conversation::new();
        let outcome = run(transport, &mut conversation).await;

        assert_eq!(outcome, TurnOutcome::Completed);
        let msg = assistant(&conversation);
        assert_eq!(msg.content, "hello world");
        assert!(!msg.is_streaming);
    }

    #[tokio::test]
    async fn test_turn_appends_user_then_placeholder() {
        let transport = MockTransport::new(vec![data(r#"{"type":"chunk","content":"ok"}"#)]);
        let mut conversation = Conversation::new();
        run(transport, &mut conversation).await;

        assert_eq!(conversation.messages.len(), 2);
        assert_eq!(conversation.messages[0].role, Role::User);
        assert_eq!(conversation.messages[0].content, "what are the rules?");
        assert_eq!(conversation.messages[1].role, Role::Assistant);
    }

    #[tokio::test]
    async fn test_malformed_record_does_not_interrupt_accumulation() {
        let transport = MockTransport::new(vec![
            data(r#"{"type":"chunk","content":"hi"}"#),
            data("garbage"),
            data(r#"{"type":"chunk","content":"there"}"#),
        ]);
        let mut conversation = Conversation::new();
        let outcome = run(transport, &mut conversation).await;

        assert_eq!(outcome, TurnOutcome::Completed);
        assert_eq!(assistant(&conversation).content, "hithere");
    }

    #[tokio::test]
    async fn test_tool_start_and_chart_fold_into_message() {
        let transport = MockTransport::new(vec![
            data(r#"{"type":"tool_start","name":"regulation_search","input":["a","b"],"reasoning":"find rules"}"#),
            data(r#"{"type":"chunk","content":"Found it."}"#),
            data(r#"{"type":"tool_end","artifacts_data":{"chart_svg":"<svg>1</svg>"}}"#),
            data(r#"{"type":"progress"}"#),
            data(r#"{"type":"full_response","data":"ignored"}"#),
        ]);
        let mut conversation = Conversation::new();
        run(transport, &mut conversation).await;

        let msg = assistant(&conversation);
        assert_eq!(msg.tools.len(), 1);
        assert_eq!(msg.tools[0].name, "regulation_search");
        assert_eq!(msg.tools[0].input, "a, b");
        assert_eq!(msg.tools[0].reasoning, "find rules");
        assert!(msg.thinking_expanded);
        assert_eq!(msg.charts, vec!["<svg>1</svg>"]);
        assert_eq!(msg.content, "Found it.");
    }

    #[tokio::test]
    async fn test_cancel_mid_stream_keeps_partial_result() {
        // two chunks and a tool arrive, then the token fires; the trailing
        // chunk must not be applied
        let transport = MockTransport::cancelling_after(
            vec![
                data(r#"{"type":"chunk","content":"par"}"#),
                data(r#"{"type":"chunk","content":"tial"}"#),
                data(r#"{"type":"tool_start","name":"search"}"#),
                data(r#"{"type":"chunk","content":" dropped"}"#),
            ],
            3,
        );
        let mut conversation = Conversation::new();
        let outcome = run(transport, &mut conversation).await;

        assert_eq!(outcome, TurnOutcome::Cancelled);
        let msg = assistant(&conversation);
        assert_eq!(msg.content, "partial");
        assert_eq!(msg.tools.len(), 1);
        assert!(!msg.is_streaming);
    }

    #[tokio::test]
    async fn test_transport_failure_before_any_event_uses_fallback_text() {
        let mut conversation = Conversation::new();
        let outcome = run(Arc::new(FailingTransport), &mut conversation).await;

        assert_eq!(outcome, TurnOutcome::Failed);
        let msg = assistant(&conversation);
        assert_eq!(msg.content, FALLBACK_ERROR_TEXT);
        assert!(msg.tools.is_empty());
        assert!(msg.charts.is_empty());
        assert!(!msg.is_streaming);
    }

    #[tokio::test]
    async fn test_mid_stream_failure_preserves_tools_and_charts() {
        let transport = MockTransport::new(vec![
            data(r#"{"type":"tool_start","name":"search"}"#),
            data(r#"{"type":"tool_end","artifacts_data":{"chart_svg":"<svg/>"}}"#),
            data(r#"{"type":"chunk","content":"partial text"}"#),
            Err(StreamError::Status { status: 500 }),
        ]);
        let mut conversation = Conversation::new();
        let outcome = run(transport, &mut conversation).await;

        assert_eq!(outcome, TurnOutcome::Failed);
        let msg = assistant(&conversation);
        assert_eq!(msg.content, FALLBACK_ERROR_TEXT);
        assert_eq!(msg.tools.len(), 1);
        assert_eq!(msg.charts.len(), 1);
        assert!(!msg.is_streaming);
    }

    #[tokio::test]
    async fn test_request_carries_conversation_and_model() {
        let transport = MockTransport::new(vec![]);
        let mut conversation = Conversation::new();
        let client = ChatClient::with_transport(transport.clone());
        client
            .run_turn(
                &mut conversation,
                "q",
                Some("openai/gpt-4.1-mini".to_string()),
                CancellationToken::new(),
            )
            .await;

        let seen = transport.seen_request.lock().clone().unwrap();
        assert_eq!(seen.query, "q");
        assert_eq!(seen.conversation_id, conversation.id);
        assert_eq!(seen.model_id.as_deref(), Some("openai/gpt-4.1-mini"));
    }

    #[tokio::test]
    async fn test_unterminated_final_record_is_applied() {
        let transport = MockTransport::new(vec![Ok(
            br#"data: {"type":"chunk","content":"tail"}"#.to_vec()
        )]);
        let mut conversation = Conversation::new();
        let outcome = run(transport, &mut conversation).await;

        assert_eq!(outcome, TurnOutcome::Completed);
        assert_eq!(assistant(&conversation).content, "tail");
    }
}
