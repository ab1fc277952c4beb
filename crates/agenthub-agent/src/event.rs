//! Events emitted by the agent loop

use agenthub_core::UsageTotals;
use serde_json::Value;

/// One step of an agent run, in emission order.
///
/// This is a closed set; the transport maps each variant onto exactly one
/// wire event.
#[derive(Clone, Debug, PartialEq)]
pub enum AgentEvent {
    Status(String),
    Thinking(String),
    ToolCall {
        id: String,
        name: String,
        arguments: Value,
    },
    /// `content` is the tool output, or the failure text when the tool
    /// itself failed. Tool failures are still a delivered result.
    ToolResult {
        id: String,
        name: String,
        content: String,
        success: bool,
    },
    FileChange {
        action: String,
        path: String,
        tool_name: String,
        before: Option<String>,
        after: Option<String>,
    },
    /// Running totals for the whole session so far.
    TokenUsage(UsageTotals),
    Assistant(String),
    Error {
        message: String,
        fatal: bool,
    },
}

impl AgentEvent {
    pub fn is_terminal(&self) -> bool {
        matches!(self, AgentEvent::Assistant(_) | AgentEvent::Error { .. })
    }
}
