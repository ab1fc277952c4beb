//! OpenAI-compatible chat-completions gateway (xAI Grok by default)

use crate::provider::{GatewayError, GatewayResult, ModelGateway};
use crate::types::{ApiMessage, ChatRequest, ChatResponse, GatewayResponse, REQUEST_TIMEOUT_SECS};
use agenthub_core::{Message, ToolSpec};
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, error};

/// How many trailing request messages are logged when a call fails.
const FAILURE_CONTEXT_MESSAGES: usize = 3;

pub struct OpenAiCompatGateway {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl OpenAiCompatGateway {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> GatewayResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;
        Ok(Self {
            client,
            api_key: api_key.into(),
            base_url: agenthub_core::config::DEFAULT_BASE_URL.to_string(),
            model: model.into(),
        })
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }
}

#[async_trait::async_trait]
impl ModelGateway for OpenAiCompatGateway {
    fn name(&self) -> &str {
        "openai-compat"
    }

    async fn complete(
        &self,
        messages: &[Message],
        tools: &[ToolSpec],
    ) -> GatewayResult<GatewayResponse> {
        let body = ChatRequest::new(&self.model, messages, tools);

        debug!(
            model = %body.model,
            messages = body.messages.len(),
            tools = tools.len(),
            "Sending chat completion"
        );

        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            log_failure(status.as_u16(), &error_text, &body.messages);
            return Err(GatewayError::Status {
                status: status.as_u16(),
                body: error_text,
            });
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| GatewayError::InvalidResponse(e.to_string()))?;

        let choice = parsed
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| GatewayError::InvalidResponse("no choices in response".into()))?;

        let message = choice
            .message
            .into_assistant()
            .map_err(GatewayError::InvalidResponse)?;

        Ok(GatewayResponse {
            message,
            usage: parsed.usage,
        })
    }
}

fn log_failure(status: u16, body: &str, sent: &[ApiMessage]) {
    let start = sent.len().saturating_sub(FAILURE_CONTEXT_MESSAGES);
    let tail = serde_json::to_string(&sent[start..]).unwrap_or_default();
    error!(status, body = %body, last_messages = %tail, "Chat completion failed");
}
