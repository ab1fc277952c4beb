//! list_files - one-level directory listing

use crate::registry::{optional_str, Tool, ToolContext, ToolError, ToolOutput, ToolResult};
use serde_json::{json, Value};
use std::path::PathBuf;
use tracing::debug;
use walkdir::WalkDir;

pub struct ListFilesTool;

#[async_trait::async_trait]
impl Tool for ListFilesTool {
    fn name(&self) -> &str {
        "list_files"
    }

    fn description(&self) -> &str {
        "List all files and directories in the workspace or a specific subdirectory"
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "path": {
                    "type": "string",
                    "description": "Relative path within workspace (leave empty for root)"
                }
            },
            "required": []
        })
    }

    async fn execute(&self, args: Value, ctx: &ToolContext) -> ToolResult {
        let rel = optional_str(&args, "path").unwrap_or("").to_string();
        let target = ctx.resolve(&rel)?;

        let listing = tokio::task::spawn_blocking(move || list_dir(target, &rel))
            .await
            .map_err(|e| ToolError::Failed(format!("listing task failed: {}", e)))??;

        Ok(ToolOutput::Text(listing))
    }
}

fn list_dir(target: PathBuf, rel: &str) -> ToolResult<String> {
    let shown = if rel.is_empty() { "." } else { rel };
    if !target.exists() {
        return Err(ToolError::Failed(format!("Path does not exist: {}", shown)));
    }
    if !target.is_dir() {
        return Err(ToolError::NotADirectory(shown.to_string()));
    }

    let mut lines = Vec::new();
    for entry in WalkDir::new(&target)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
        .into_iter()
        // Entries we cannot stat are skipped.
        .filter_map(|e| e.ok())
    {
        let name = entry.file_name().to_string_lossy();
        if entry.file_type().is_dir() {
            lines.push(format!("📁 {}", name));
        } else {
            match entry.metadata() {
                Ok(meta) => lines.push(format!("📄 {} ({} bytes)", name, meta.len())),
                Err(_) => lines.push(format!("📄 {}", name)),
            }
        }
    }

    debug!("list_files: {} ({} entries)", shown, lines.len());

    if lines.is_empty() {
        return Ok("Directory is empty".to_string());
    }
    let heading = if rel.is_empty() { "workspace root" } else { rel };
    Ok(format!("Contents of {}:\n\n{}\n", heading, lines.join("\n")))
}
