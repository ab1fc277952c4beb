//! Per-session audit trail
//!
//! History only keeps what the model needs to see again. The trail keeps
//! what a client needs to rebuild a session view: every message shown,
//! every tool call with its result, file snapshots and usage checkpoints.

use agenthub_agent::AgentEvent;
use agenthub_core::{round_cost, UsageTotals};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TranscriptMessage {
    pub role: String,
    pub content: String,
    /// `text`, `status`, `thinking` or `error`
    pub message_type: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ToolCallRecord {
    pub tool_call_id: String,
    pub tool_name: String,
    pub arguments: Value,
    /// Filled in when the matching result arrives.
    pub result: Option<String>,
    pub success: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FileChangeRecord {
    pub file_path: String,
    pub action: String,
    pub tool_name: String,
    pub content_before: Option<String>,
    pub content_after: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TokenUsageRecord {
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub total_tokens: u64,
    pub estimated_cost: f64,
    pub created_at: DateTime<Utc>,
}

impl From<UsageTotals> for TokenUsageRecord {
    fn from(totals: UsageTotals) -> Self {
        Self {
            input_tokens: totals.input_tokens,
            output_tokens: totals.output_tokens,
            total_tokens: totals.total_tokens(),
            estimated_cost: round_cost(totals.estimated_cost),
            created_at: Utc::now(),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct AuditTrail {
    pub messages: Vec<TranscriptMessage>,
    pub tool_calls: Vec<ToolCallRecord>,
    pub file_changes: Vec<FileChangeRecord>,
    pub token_usage: Vec<TokenUsageRecord>,
}

impl AuditTrail {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_user(&mut self, text: impl Into<String>) {
        self.push_message("user", text, "text");
    }

    /// Record a failure that ended the run outside the event stream.
    pub fn record_error(&mut self, text: impl Into<String>) {
        self.push_message("system", text, "error");
    }

    pub fn record(&mut self, event: &AgentEvent) {
        match event {
            AgentEvent::Status(text) => self.push_message("system", text.clone(), "status"),
            AgentEvent::Thinking(text) => self.push_message("assistant", text.clone(), "thinking"),
            AgentEvent::Assistant(text) => self.push_message("assistant", text.clone(), "text"),
            AgentEvent::Error { message, .. } => self.record_error(message.clone()),
            AgentEvent::ToolCall { id, name, arguments } => self.tool_calls.push(ToolCallRecord {
                tool_call_id: id.clone(),
                tool_name: name.clone(),
                arguments: arguments.clone(),
                result: None,
                success: true,
                created_at: Utc::now(),
            }),
            AgentEvent::ToolResult {
                id,
                content,
                success,
                ..
            } => {
                if let Some(call) = self.tool_calls.iter_mut().rev().find(|c| &c.tool_call_id == id) {
                    call.result = Some(content.clone());
                    call.success = *success;
                }
            }
            AgentEvent::FileChange {
                action,
                path,
                tool_name,
                before,
                after,
            } => self.file_changes.push(FileChangeRecord {
                file_path: path.clone(),
                action: action.clone(),
                tool_name: tool_name.clone(),
                content_before: before.clone(),
                content_after: after.clone(),
                created_at: Utc::now(),
            }),
            AgentEvent::TokenUsage(totals) => self.token_usage.push((*totals).into()),
        }
    }

    /// Append another trail, typically one finished turn.
    pub fn extend(&mut self, other: AuditTrail) {
        self.messages.extend(other.messages);
        self.tool_calls.extend(other.tool_calls);
        self.file_changes.extend(other.file_changes);
        self.token_usage.extend(other.token_usage);
    }

    pub fn latest_usage(&self) -> Option<&TokenUsageRecord> {
        self.token_usage.last()
    }

    fn push_message(&mut self, role: &str, content: impl Into<String>, message_type: &str) {
        self.messages.push(TranscriptMessage {
            role: role.to_string(),
            content: content.into(),
            message_type: message_type.to_string(),
            created_at: Utc::now(),
        });
    }
}
