//! plinth-stream: Wire layer for the plinth chat client
//!
//! This crate turns the remote chat API's chunked `data:`-line response into
//! a sequence of typed stream events: transport, line framing, and event
//! interpretation.

pub mod api;
pub mod decoder;
pub mod error;
pub mod event;

pub use api::{ByteStream, ChatRequest, ChatTransport, HttpTransport};
pub use decoder::EventDecoder;
pub use error::{Error, Result};
pub use event::StreamEvent;
