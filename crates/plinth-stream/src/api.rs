//! Outbound chat API call and the transport seam
//!
//! The remote chat API is a black box reached with one POST per user turn;
//! its response body is the event stream consumed by the decoder. The
//! [`ChatTransport`] trait is the seam the orchestrator is tested through.

use crate::error::{Error, Result};
use async_trait::async_trait;
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use std::pin::Pin;
use tokio_stream::Stream;
use tokio_util::sync::CancellationToken;

/// JSON body of one chat turn request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    pub query: String,
    pub conversation_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_id: Option<String>,
}

impl ChatRequest {
    /// Build a request, attaching the model selector only when one is set.
    pub fn new(
        query: impl Into<String>,
        conversation_id: impl Into<String>,
        model_id: Option<String>,
    ) -> Self {
        Self {
            query: query.into(),
            conversation_id: conversation_id.into(),
            model_id,
        }
    }
}

/// A fallible stream of raw response body chunks
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Vec<u8>>> + Send>>;

/// Transport for fetching one chat response stream
#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// Issue the call and return the response byte stream.
    ///
    /// Cancelling the token while the response is awaited returns
    /// [`Error::Aborted`].
    async fn fetch(&self, request: &ChatRequest, cancel: CancellationToken) -> Result<ByteStream>;
}

/// HTTP transport backed by `reqwest`
pub struct HttpTransport {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpTransport {
    /// Create a transport for the given chat endpoint URL.
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into(),
        }
    }
}

#[async_trait]
impl ChatTransport for HttpTransport {
    async fn fetch(&self, request: &ChatRequest, cancel: CancellationToken) -> Result<ByteStream> {
        tracing::debug!("Chat API URL: {}", self.endpoint);

        let pending = self
            .client
            .post(&self.endpoint)
            .header("Content-Type", "application/json")
            .header("Accept", "application/json")
            .json(request)
            .send();

        let response = tokio::select! {
            result = pending => result?,
            _ = cancel.cancelled() => return Err(Error::Aborted),
        };

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Status {
                status: status.as_u16(),
            });
        }
        if response.content_length() == Some(0) {
            return Err(Error::MissingBody);
        }

        let stream = response
            .bytes_stream()
            .map(|chunk| chunk.map(|bytes| bytes.to_vec()).map_err(Error::Http));

        Ok(Box::pin(stream))
    }
}
