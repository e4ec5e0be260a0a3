//! Session event types

use crate::client::TurnOutcome;
use crate::types::Message;
use serde::{Deserialize, Serialize};

/// Events emitted by a session on its broadcast channel.
///
/// Persistence subscribes to `MessageFinalized` and saves on its own
/// schedule; the reducer never touches I/O.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionEvent {
    /// A user turn started streaming
    TurnStarted { conversation_id: String },

    /// The turn's assistant message was finalized (completion, cancellation,
    /// or failure); carries a snapshot of the full message list
    MessageFinalized {
        conversation_id: String,
        outcome: TurnOutcome,
        messages: Vec<Message>,
    },
}

impl SessionEvent {
    /// Check if this event marks the end of a turn.
    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionEvent::MessageFinalized { .. })
    }
}
