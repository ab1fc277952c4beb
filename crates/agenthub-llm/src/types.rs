//! Gateway response types and the chat-completions wire format

use agenthub_core::{Message, ToolInvocation, ToolSpec};
use serde::{Deserialize, Serialize};

/// Sampling temperature sent with every request.
pub const TEMPERATURE: f32 = 0.7;
/// Completion token cap sent with every request.
pub const MAX_TOKENS: u32 = 4096;
/// Whole-request timeout.
pub const REQUEST_TIMEOUT_SECS: u64 = 120;

/// What one gateway call produced.
#[derive(Clone, Debug, PartialEq)]
pub struct GatewayResponse {
    /// Assistant message: text, tool calls, or both.
    pub message: Message,
    pub usage: Option<Usage>,
}

impl GatewayResponse {
    /// Plain text answer without usage (handy for scripted gateways).
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            message: Message::assistant(content),
            usage: None,
        }
    }

    pub fn tool_calls(calls: Vec<ToolInvocation>) -> Self {
        Self {
            message: Message::assistant_with_tools(None, calls),
            usage: None,
        }
    }

    pub fn with_usage(mut self, prompt_tokens: u64, completion_tokens: u64) -> Self {
        self.usage = Some(Usage {
            prompt_tokens,
            completion_tokens,
        });
        self
    }
}

/// Token usage
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    #[serde(default)]
    pub prompt_tokens: u64,
    #[serde(default)]
    pub completion_tokens: u64,
}

// ---------------------------------------------------------------------------
// Request body
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ApiMessage>,
    pub temperature: f32,
    pub max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<ApiTool>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_choice: Option<String>,
}

impl ChatRequest {
    pub fn new(model: impl Into<String>, messages: &[Message], tools: &[ToolSpec]) -> Self {
        let tools: Vec<ApiTool> = tools.iter().map(ApiTool::from).collect();
        let offered = !tools.is_empty();
        Self {
            model: model.into(),
            messages: messages.iter().map(ApiMessage::from).collect(),
            temperature: TEMPERATURE,
            max_tokens: MAX_TOKENS,
            tools: offered.then_some(tools),
            tool_choice: offered.then(|| "auto".to_string()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiMessage {
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ApiToolCall>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl From<&Message> for ApiMessage {
    fn from(m: &Message) -> Self {
        let tool_calls = m.has_tool_calls().then(|| {
            m.invocations()
                .iter()
                .map(|inv| ApiToolCall {
                    id: inv.id.clone(),
                    kind: "function".into(),
                    function: ApiFunctionCall {
                        name: inv.tool_name.clone(),
                        arguments: inv.arguments.to_string(),
                    },
                })
                .collect()
        });
        Self {
            role: m.role.as_str().to_string(),
            content: Some(m.content.clone()),
            tool_calls,
            tool_call_id: m.tool_call_id.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiToolCall {
    pub id: String,
    #[serde(rename = "type", default = "function_kind")]
    pub kind: String,
    pub function: ApiFunctionCall,
}

fn function_kind() -> String {
    "function".into()
}

/// Arguments travel as a JSON-encoded string on this API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiFunctionCall {
    pub name: String,
    #[serde(default)]
    pub arguments: String,
}

#[derive(Debug, Serialize)]
pub struct ApiTool {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub function: ApiToolFunction,
}

#[derive(Debug, Serialize)]
pub struct ApiToolFunction {
    pub name: String,
    pub description: String,
    pub parameters: serde_json::Value,
}

impl From<&ToolSpec> for ApiTool {
    fn from(spec: &ToolSpec) -> Self {
        Self {
            kind: "function",
            function: ApiToolFunction {
                name: spec.name.clone(),
                description: spec.description.clone(),
                parameters: spec.parameters.clone(),
            },
        }
    }
}

// ---------------------------------------------------------------------------
// Response body
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct ChatResponse {
    #[serde(default)]
    pub choices: Vec<ApiChoice>,
    #[serde(default)]
    pub usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
pub struct ApiChoice {
    pub message: ApiMessage,
}

/// Decode a tool call's argument string. Blank means no arguments; anything
/// other than a JSON object is rejected.
pub fn decode_arguments(raw: &str) -> Result<serde_json::Value, String> {
    if raw.trim().is_empty() {
        return Ok(serde_json::Value::Object(Default::default()));
    }
    match serde_json::from_str(raw).map_err(|e| e.to_string())? {
        v @ serde_json::Value::Object(_) => Ok(v),
        other => Err(format!("expected a JSON object, got {}", other)),
    }
}

impl ApiMessage {
    /// Convert a response message into an assistant [`Message`]; the
    /// reported role is ignored.
    pub fn into_assistant(self) -> Result<Message, String> {
        let mut calls = Vec::new();
        for tc in self.tool_calls.unwrap_or_default() {
            let arguments = decode_arguments(&tc.function.arguments).map_err(|e| {
                format!(
                    "tool call {} ({}) has malformed arguments: {}",
                    tc.id, tc.function.name, e
                )
            })?;
            calls.push(ToolInvocation::new(tc.id, tc.function.name, arguments));
        }
        Ok(Message::assistant_with_tools(self.content, calls))
    }
}
