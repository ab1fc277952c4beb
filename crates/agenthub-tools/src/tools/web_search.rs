//! web_search - Google Custom Search

use crate::registry::{optional_str, Tool, ToolContext, ToolError, ToolOutput, ToolResult};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, warn};

const GOOGLE_SEARCH_URL: &str = "https://www.googleapis.com/customsearch/v1";
const DEFAULT_RESULTS: u64 = 5;
const MAX_RESULTS: u64 = 10;
const SEARCH_TIMEOUT_SECS: u64 = 30;

pub struct WebSearchTool {
    client: Client,
    endpoint: String,
    api_key: Option<String>,
    engine_id: Option<String>,
}

impl WebSearchTool {
    pub fn new(api_key: Option<String>, engine_id: Option<String>) -> Self {
        Self {
            client: Client::new(),
            endpoint: GOOGLE_SEARCH_URL.to_string(),
            api_key: api_key.filter(|k| !k.is_empty()),
            engine_id: engine_id.filter(|k| !k.is_empty()),
        }
    }

    pub fn with_endpoint(mut self, url: impl Into<String>) -> Self {
        self.endpoint = url.into();
        self
    }
}

#[derive(Deserialize)]
struct SearchResponse {
    #[serde(default)]
    items: Vec<SearchItem>,
}

#[derive(Deserialize)]
struct SearchItem {
    title: Option<String>,
    link: Option<String>,
    snippet: Option<String>,
}

#[async_trait::async_trait]
impl Tool for WebSearchTool {
    fn name(&self) -> &str {
        "web_search"
    }

    fn description(&self) -> &str {
        "Search the web using Google Search API. Returns top search results with titles, \
         snippets, and URLs."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "The search query string"
                },
                "num_results": {
                    "type": "integer",
                    "description": "Number of results to return (default: 5, max: 10)",
                    "default": DEFAULT_RESULTS
                }
            },
            "required": ["query"]
        })
    }

    async fn execute(&self, args: Value, _ctx: &ToolContext) -> ToolResult {
        let query = optional_str(&args, "query")
            .ok_or_else(|| ToolError::InvalidArgument("Search query is required".into()))?;
        let num = args
            .get("num_results")
            .and_then(Value::as_u64)
            .unwrap_or(DEFAULT_RESULTS)
            .clamp(1, MAX_RESULTS);

        let (Some(key), Some(cx)) = (&self.api_key, &self.engine_id) else {
            return Err(ToolError::Failed(
                "Google Search API not configured. Please set GOOGLE_API_KEY and \
                 GOOGLE_SEARCH_ENGINE_ID"
                    .into(),
            ));
        };

        debug!("web_search: {:?} (num={})", query, num);
        let num = num.to_string();

        let response = self
            .client
            .get(&self.endpoint)
            .query(&[
                ("key", key.as_str()),
                ("cx", cx.as_str()),
                ("q", query),
                ("num", num.as_str()),
            ])
            .timeout(Duration::from_secs(SEARCH_TIMEOUT_SECS))
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ToolError::Failed("Search request timed out".into())
                } else {
                    ToolError::Failed(format!("Network error during search - {}", e))
                }
            })?;

        let status = response.status();
        if status != StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), "web_search failed");
            return Err(ToolError::Failed(match status {
                StatusCode::BAD_REQUEST => format!("Invalid API request - {}", body),
                StatusCode::FORBIDDEN => "API key invalid or quota exceeded".to_string(),
                other => format!("Search API returned status {}", other.as_u16()),
            }));
        }

        let data: SearchResponse = response
            .json()
            .await
            .map_err(|e| ToolError::Failed(format!("Failed to perform search - {}", e)))?;

        if data.items.is_empty() {
            return Ok(ToolOutput::Text(format!("No results found for query: {}", query)));
        }

        let results: Vec<String> = data
            .items
            .iter()
            .enumerate()
            .map(|(idx, item)| {
                format!(
                    "{}. {}\n   URL: {}\n   {}\n",
                    idx + 1,
                    item.title.as_deref().unwrap_or("No title"),
                    item.link.as_deref().unwrap_or(""),
                    item.snippet.as_deref().unwrap_or("No description available"),
                )
            })
            .collect();

        Ok(ToolOutput::Text(format!(
            "Search results for '{}':\n\n{}",
            query,
            results.join("\n")
        )))
    }
}
