//! read_file - return the text of a workspace file

use crate::registry::{required_str, Tool, ToolContext, ToolError, ToolOutput, ToolResult};
use serde_json::{json, Value};
use tokio::fs;
use tracing::debug;

pub struct ReadFileTool;

#[async_trait::async_trait]
impl Tool for ReadFileTool {
    fn name(&self) -> &str {
        "read_file"
    }

    fn description(&self) -> &str {
        "Read the contents of a file in the workspace"
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "path": {
                    "type": "string",
                    "description": "Relative path to file"
                }
            },
            "required": ["path"]
        })
    }

    async fn execute(&self, args: Value, ctx: &ToolContext) -> ToolResult {
        let rel = required_str(&args, "path")?;
        let path = ctx.resolve(rel)?;

        if !fs::metadata(&path).await.map(|m| m.is_file()).unwrap_or(false) {
            return Err(ToolError::NotFound(rel.to_string()));
        }

        let content = fs::read_to_string(&path)
            .await
            .map_err(|e| ToolError::io("reading file", e))?;

        debug!("read_file: {} ({} chars)", rel, content.chars().count());
        Ok(ToolOutput::Text(content))
    }
}
