//! write_file - create, overwrite or append to a workspace file

use crate::registry::{
    optional_str, resolve_in_workspace, Tool, ToolContext, ToolError, ToolOutput, ToolResult,
};
use serde_json::{json, Value};
use std::path::Path;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::debug;

pub struct WriteFileTool;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum WriteMode {
    Overwrite,
    Append,
}

impl WriteMode {
    fn parse(s: Option<&str>) -> Self {
        match s {
            Some("a") => WriteMode::Append,
            _ => WriteMode::Overwrite,
        }
    }

    fn verb(self) -> &'static str {
        match self {
            WriteMode::Overwrite => "Overwritten",
            WriteMode::Append => "Appended to",
        }
    }
}

#[async_trait::async_trait]
impl Tool for WriteFileTool {
    fn name(&self) -> &str {
        "write_file"
    }

    fn description(&self) -> &str {
        "Create or overwrite a file with the given content. \
         Use this to create new files, update existing code, \
         write configuration files, documentation, etc."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "path": {
                    "type": "string",
                    "description": "Relative path to the file (from workspace root)"
                },
                "content": {
                    "type": "string",
                    "description": "The full content to write to the file"
                },
                "mode": {
                    "type": "string",
                    "enum": ["w", "a"],
                    "description": "Write mode: 'w' = overwrite (default), 'a' = append",
                    "default": "w"
                }
            },
            "required": ["path", "content"]
        })
    }

    async fn execute(&self, args: Value, ctx: &ToolContext) -> ToolResult {
        let rel = optional_str(&args, "path")
            .ok_or_else(|| ToolError::InvalidArgument("No file path provided".into()))?;
        let content = args.get("content").and_then(Value::as_str).unwrap_or("");
        let mode = WriteMode::parse(args.get("mode").and_then(Value::as_str));

        let path = ctx.resolve(rel)?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| ToolError::io(format!("Failed to write file {}", rel), e))?;
        }

        let write = async {
            match mode {
                WriteMode::Overwrite => fs::write(&path, content).await,
                WriteMode::Append => {
                    let mut file = fs::OpenOptions::new()
                        .create(true)
                        .append(true)
                        .open(&path)
                        .await?;
                    file.write_all(content.as_bytes()).await?;
                    file.flush().await
                }
            }
        };
        write.await.map_err(|e| match e.kind() {
            std::io::ErrorKind::PermissionDenied => {
                ToolError::Failed(format!("Permission denied: cannot write to {}", rel))
            }
            _ => ToolError::io(format!("Failed to write file {}", rel), e),
        })?;

        let size = content.chars().count();
        debug!("write_file: {} ({:?}, {} chars)", rel, mode, size);
        Ok(ToolOutput::Text(format!(
            "{} file successfully: {}\nSize: {} characters",
            mode.verb(),
            rel,
            size
        )))
    }
}

/// Best-effort read of a workspace file, for before/after snapshots.
/// `None` when the path is missing, unreadable, outside the workspace or
/// not UTF-8.
pub async fn read_snapshot(workspace: &Path, rel: &str) -> Option<String> {
    let path = resolve_in_workspace(workspace, rel).ok()?;
    fs::read_to_string(path).await.ok()
}
