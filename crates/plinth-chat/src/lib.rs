//! plinth-chat: Conversation state and streaming for the plinth chat client
//!
//! This crate folds the wire layer's event stream into an evolving assistant
//! message, and wraps that in per-conversation session management with
//! decoupled persistence.

pub mod client;
pub mod content;
pub mod error;
pub mod events;
pub mod handle;
pub mod reducer;
pub mod session;
pub mod store;
pub mod types;
pub mod util;

pub use client::{ChatClient, TurnOutcome, FALLBACK_ERROR_TEXT};
pub use error::{Error, Result};
pub use events::SessionEvent;
pub use handle::SessionHandle;
pub use reducer::MessageReducer;
pub use session::ChatSession;
pub use store::{ChatInfo, ChatStore, SavedChat};
pub use types::{Conversation, Message, Role, ToolInvocation};
