//! Error types for Agent Hub
//!
//! Only tool-level failures are absorbed locally (they become `tool_result`
//! text). Everything here surfaces to whoever drives the agent loop.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// Malformed message shape, caught before anything is sent to the model.
    #[error("validation error: {0}")]
    Validation(String),

    /// The model asked for a tool that was never advertised to it.
    #[error("unknown tool requested by model: {0}")]
    UnknownTool(String),

    #[error("gateway error: {message}")]
    Gateway { status: Option<u16>, message: String },

    #[error("session not found: {0}")]
    SessionNotFound(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn unknown_tool(name: impl Into<String>) -> Self {
        Self::UnknownTool(name.into())
    }

    pub fn gateway(status: Option<u16>, message: impl Into<String>) -> Self {
        Self::Gateway {
            status,
            message: message.into(),
        }
    }

    /// Whether this error should end the client's connection rather than
    /// just the current run.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::SessionNotFound(_) | Self::Config(_))
    }
}
