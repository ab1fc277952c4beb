//! WebSocket protocol - typed events pushed to the client
//!
//! Wire format:
//!
//! Client → Server:
//!   { "message": "Create hello.txt" }
//!
//! Server → Client (one JSON object per frame, tagged by `type`):
//!   { "type": "thinking", "content": "Thinking...", "timestamp": "..." }
//!   { "type": "status", "content": "Thinking... (iteration 1)", "done": false, "timestamp": "..." }
//!   { "type": "tool_call", "tool_name": "write_file", "arguments": {...}, "tool_call_id": "call_1", ... }
//!   { "type": "tool_result", "tool_name": "write_file", "content": "...", "success": true, ... }
//!   { "type": "file_change", "action": "write", "file_path": "hello.txt", "tool_name": "write_file",
//!     "content_before": null, "content_after": "hi", ... }
//!   { "type": "token_usage", "input_tokens": 100, "output_tokens": 50, "total_tokens": 150,
//!     "estimated_cost": 0.00125, ... }
//!   { "type": "assistant", "content": "Done.", ... }
//!   { "type": "error", "content": "...", "fatal": false, ... }

use serde::{Deserialize, Serialize};

/// Default filler text for the pre-turn `thinking` event.
pub const THINKING_TEXT: &str = "Thinking...";

// ---------------------------------------------------------------------------
// Client → Server
// ---------------------------------------------------------------------------

/// A user turn sent over the socket.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ClientMessage {
    #[serde(default)]
    pub message: String,
}

impl ClientMessage {
    /// The trimmed message, or `None` when there is nothing to send.
    pub fn text(&self) -> Option<&str> {
        let trimmed = self.message.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed)
        }
    }
}

// ---------------------------------------------------------------------------
// Server → Client
// ---------------------------------------------------------------------------

/// Event body, tagged by `type` on the wire.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerEvent {
    Status {
        content: String,
        #[serde(default)]
        done: bool,
    },
    Thinking {
        content: String,
    },
    Assistant {
        content: String,
    },
    ToolCall {
        tool_name: String,
        arguments: serde_json::Value,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        tool_call_id: Option<String>,
    },
    ToolResult {
        tool_name: String,
        content: String,
        success: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        tool_call_id: Option<String>,
    },
    FileChange {
        action: String,
        file_path: String,
        tool_name: String,
        content_before: Option<String>,
        content_after: Option<String>,
    },
    TokenUsage {
        input_tokens: u64,
        output_tokens: u64,
        total_tokens: u64,
        estimated_cost: f64,
    },
    Error {
        content: String,
        #[serde(default)]
        fatal: bool,
    },
}

impl ServerEvent {
    pub fn status(content: impl Into<String>) -> Self {
        Self::Status {
            content: content.into(),
            done: false,
        }
    }

    pub fn thinking() -> Self {
        Self::Thinking {
            content: THINKING_TEXT.to_string(),
        }
    }

    pub fn error(content: impl Into<String>, fatal: bool) -> Self {
        Self::Error {
            content: content.into(),
            fatal,
        }
    }

    /// Wire tag of this event.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Status { .. } => "status",
            Self::Thinking { .. } => "thinking",
            Self::Assistant { .. } => "assistant",
            Self::ToolCall { .. } => "tool_call",
            Self::ToolResult { .. } => "tool_result",
            Self::FileChange { .. } => "file_change",
            Self::TokenUsage { .. } => "token_usage",
            Self::Error { .. } => "error",
        }
    }
}

/// A server event stamped with its emission time.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EventFrame {
    #[serde(flatten)]
    pub event: ServerEvent,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

impl EventFrame {
    pub fn now(event: ServerEvent) -> Self {
        Self {
            event,
            timestamp: Some(chrono::Utc::now().to_rfc3339()),
        }
    }

    pub fn to_json(&self) -> crate::Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Round a cost to the 6 decimals reported on the wire.
pub fn round_cost(cost: f64) -> f64 {
    (cost * 1_000_000.0).round() / 1_000_000.0
}
