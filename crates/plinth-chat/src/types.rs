//! Core types for chat conversations

use serde::{Deserialize, Serialize};

/// Message roles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

/// One reasoning/tool-use step reported mid-stream by the remote API.
///
/// Immutable once appended to a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolInvocation {
    /// Tool name ("Unknown Tool" when the event carried none)
    pub name: String,
    /// Display form of the tool's input
    pub input: String,
    /// Optional reasoning text (empty when absent)
    #[serde(default)]
    pub reasoning: String,
}

/// One message in a conversation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// Unique id
    pub id: String,
    /// Role (closed set)
    pub role: Role,
    /// Text content; append-only while streaming
    pub content: String,
    /// Ordered tool invocations, in arrival order
    #[serde(default)]
    pub tools: Vec<ToolInvocation>,
    /// Ordered chart markup payloads, in arrival order
    #[serde(default)]
    pub charts: Vec<String>,
    /// Whether the reasoning panel is expanded
    #[serde(default)]
    pub thinking_expanded: bool,
    /// Whether the message is still streaming
    #[serde(default)]
    pub is_streaming: bool,
    /// Creation time, milliseconds since epoch
    #[serde(default)]
    pub timestamp: i64,
}

impl Message {
    /// Create a user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            role: Role::User,
            content: content.into(),
            tools: vec![],
            charts: vec![],
            thinking_expanded: false,
            is_streaming: false,
            timestamp: chrono::Utc::now().timestamp_millis(),
        }
    }

    /// Create the empty streaming assistant placeholder for a new turn.
    pub fn assistant_placeholder() -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            role: Role::Assistant,
            content: String::new(),
            tools: vec![],
            charts: vec![],
            thinking_expanded: false,
            is_streaming: true,
            timestamp: chrono::Utc::now().timestamp_millis(),
        }
    }

    /// Create a system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            role: Role::System,
            content: content.into(),
            tools: vec![],
            charts: vec![],
            thinking_expanded: false,
            is_streaming: false,
            timestamp: chrono::Utc::now().timestamp_millis(),
        }
    }
}

/// A conversation: an opaque id plus its ordered message list.
///
/// Mutable only by appending or by updating its streaming assistant message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    /// Conversation identifier sent with every turn of this session
    pub id: String,
    /// Messages in chronological (insertion) order
    pub messages: Vec<Message>,
}

impl Conversation {
    /// Create an empty conversation with a fresh id.
    pub fn new() -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            messages: vec![],
        }
    }

    /// Create a conversation with an existing id and message history.
    pub fn with_history(id: impl Into<String>, messages: Vec<Message>) -> Self {
        Self {
            id: id.into(),
            messages,
        }
    }

    /// Append a message.
    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    /// Look up a message by id for in-place mutation.
    pub fn message_mut(&mut self, id: &str) -> Option<&mut Message> {
        self.messages.iter_mut().find(|m| m.id == id)
    }

    /// The currently streaming message, if any.
    pub fn streaming_message(&self) -> Option<&Message> {
        self.messages.iter().find(|m| m.is_streaming)
    }

    /// Whether any turn in this conversation is still streaming.
    pub fn is_streaming(&self) -> bool {
        self.messages.iter().any(|m| m.is_streaming)
    }
}

impl Default for Conversation {
    fn default() -> Self {
        Self::new()
    }
}
