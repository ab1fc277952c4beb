//! Model gateway trait

use crate::types::GatewayResponse;
use agenthub_core::{Message, ToolSpec};

/// Result type for gateway operations
pub type GatewayResult<T> = Result<T, GatewayError>;

/// Gateway error types. None of these are retried.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// The endpoint answered with a non-success status.
    #[error("{status}: {body}")]
    Status { status: u16, body: String },

    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

impl GatewayError {
    pub fn status_code(&self) -> Option<u16> {
        match self {
            GatewayError::Status { status, .. } => Some(*status),
            GatewayError::Network(e) => e.status().map(|s| s.as_u16()),
            GatewayError::InvalidResponse(_) => None,
        }
    }
}

impl From<GatewayError> for agenthub_core::Error {
    fn from(e: GatewayError) -> Self {
        agenthub_core::Error::gateway(e.status_code(), e.to_string())
    }
}

/// A remote chat-completion endpoint that can request tool calls.
#[async_trait::async_trait]
pub trait ModelGateway: Send + Sync {
    fn name(&self) -> &str;

    /// Send the full message list plus the tool schemas and return the
    /// model's next message. An empty `tools` slice means no tools are offered.
    async fn complete(
        &self,
        messages: &[Message],
        tools: &[ToolSpec],
    ) -> GatewayResult<GatewayResponse>;
}
