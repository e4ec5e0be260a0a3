//! Per-conversation session management
//!
//! The session holds the conversation identity and message list, delegates
//! streaming to the [`ChatClient`], and announces finalized turns on a
//! broadcast channel for persistence and rendering collaborators.

use crate::client::{ChatClient, TurnOutcome};
use crate::error::{Error, Result};
use crate::events::SessionEvent;
use crate::handle::SessionHandle;
use crate::store::SavedChat;
use crate::types::{Conversation, Message};
use crate::util;
use tokio::sync::broadcast;

/// One chat session: a conversation plus the machinery to extend it.
pub struct ChatSession {
    client: ChatClient,
    conversation: Conversation,
    title: Option<String>,
    selected_model: Option<String>,
    event_tx: broadcast::Sender<SessionEvent>,
    handle: SessionHandle,
}

impl ChatSession {
    /// Create a session with a fresh conversation id.
    pub fn new(client: ChatClient) -> Self {
        let (event_tx, _) = broadcast::channel(64);
        Self {
            client,
            conversation: Conversation::new(),
            title: None,
            selected_model: None,
            event_tx,
            handle: SessionHandle::new(),
        }
    }

    /// Subscribe to session events.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.event_tx.subscribe()
    }

    /// Get a cloneable handle for cancelling from outside.
    pub fn handle(&self) -> SessionHandle {
        self.handle.clone()
    }

    /// The current conversation.
    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    /// The current message list.
    pub fn messages(&self) -> &[Message] {
        &self.conversation.messages
    }

    /// The conversation id sent with every turn.
    pub fn conversation_id(&self) -> &str {
        &self.conversation.id
    }

    /// The session title, once derived or loaded.
    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    /// Select the model forwarded with subsequent turns.
    pub fn set_model(&mut self, model_id: Option<String>) {
        self.selected_model = model_id;
    }

    /// The currently selected model, if any.
    pub fn selected_model(&self) -> Option<&str> {
        self.selected_model.as_deref()
    }

    /// Start a new conversation, dropping the current one.
    pub fn start_new(&mut self) {
        self.conversation = Conversation::new();
        self.title = None;
    }

    /// Switch to a previously saved chat.
    ///
    /// Stale streaming flags in the stored messages are cleared; a loaded
    /// chat never resumes a stream.
    pub fn load(&mut self, chat: SavedChat) {
        let mut messages = chat.messages;
        for message in &mut messages {
            message.is_streaming = false;
        }
        self.conversation = Conversation::with_history(chat.conversation_id, messages);
        self.title = Some(chat.title);
    }

    /// Run one user turn to completion.
    ///
    /// Refuses to overlap turns: at most one outbound call is in flight per
    /// conversation. The returned outcome mirrors the terminal state of the
    /// assistant message; failures are already folded into the transcript.
    pub async fn send(&mut self, query: &str) -> Result<TurnOutcome> {
        if self.handle.is_running() {
            tracing::warn!("Refusing to start a turn while one is in flight");
            return Err(Error::TurnInFlight);
        }

        let cancel = self.handle.reset();
        self.handle.set_running(true);
        let _ = self.event_tx.send(SessionEvent::TurnStarted {
            conversation_id: self.conversation.id.clone(),
        });

        let outcome = self
            .client
            .run_turn(
                &mut self.conversation,
                query,
                self.selected_model.clone(),
                cancel,
            )
            .await;

        self.handle.set_running(false);

        if self.title.is_none() {
            self.title = util::derive_title(&self.conversation.messages);
        }

        let _ = self.event_tx.send(SessionEvent::MessageFinalized {
            conversation_id: self.conversation.id.clone(),
            outcome,
            messages: self.conversation.messages.clone(),
        });

        Ok(outcome)
    }

    /// Abort the in-flight turn, if any.
    pub fn cancel(&self) {
        self.handle.abort();
    }

    /// Toggle a message's reasoning panel. Returns the new state, or `None`
    /// if the message does not exist.
    pub fn toggle_thinking(&mut self, message_id: &str) -> Option<bool> {
        let message = self.conversation.message_mut(message_id)?;
        message.thinking_expanded = !message.thinking_expanded;
        Some(message.thinking_expanded)
    }

    /// Snapshot the session as a saved chat, deriving a title if needed.
    pub fn to_saved_chat(&self) -> SavedChat {
        let title = self
            .title
            .clone()
            .or_else(|| util::derive_title(&self.conversation.messages))
            .unwrap_or_else(|| "New Chat".to_string());
        SavedChat::new(
            title,
            self.conversation.id.clone(),
            self.conversation.messages.clone(),
        )
    }
}
