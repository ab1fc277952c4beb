//! execute_bash - run a shell command in the workspace with a timeout
//!
//! The child is spawned with `kill_on_drop`, so a timeout or a dropped
//! agent run takes the process down with it.

use crate::registry::{Tool, ToolContext, ToolError, ToolOutput, ToolResult};
use serde_json::{json, Value};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::debug;

const DEFAULT_TIMEOUT_SECS: u64 = 60;
const MAX_OUTPUT_CHARS: usize = 30_000;

pub struct ExecuteBashTool {
    default_timeout_secs: u64,
}

impl Default for ExecuteBashTool {
    fn default() -> Self {
        Self::new()
    }
}

impl ExecuteBashTool {
    pub fn new() -> Self {
        Self {
            default_timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

#[async_trait::async_trait]
impl Tool for ExecuteBashTool {
    fn name(&self) -> &str {
        "execute_bash"
    }

    fn description(&self) -> &str {
        "Execute a bash/shell command in the current workspace directory. \
         Use this tool when you need to run commands, scripts, git operations, \
         package managers (npm/pip/uv), tests, builds, etc. \
         The command runs in a non-interactive shell."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "command": {
                    "type": "string",
                    "description": "The bash command to execute. Can be multi-line."
                },
                "timeout_seconds": {
                    "type": "integer",
                    "description": "Maximum time the command is allowed to run (default: 60)",
                    "default": DEFAULT_TIMEOUT_SECS
                }
            },
            "required": ["command"]
        })
    }

    async fn execute(&self, args: Value, ctx: &ToolContext) -> ToolResult {
        let command = args
            .get("command")
            .and_then(Value::as_str)
            .map(str::trim)
            .unwrap_or("");
        if command.is_empty() {
            return Err(ToolError::InvalidArgument("No command provided".into()));
        }

        let timeout_secs = args
            .get("timeout_seconds")
            .and_then(Value::as_u64)
            .unwrap_or(self.default_timeout_secs);

        debug!("execute_bash: {}", preview(command));

        let run = Command::new("bash")
            .arg("-c")
            .arg(command)
            .current_dir(&ctx.workspace)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output();

        let output = match tokio::time::timeout(Duration::from_secs(timeout_secs), run).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => return Err(ToolError::io("Failed to execute command", e)),
            Err(_) => return Err(ToolError::Timeout(timeout_secs)),
        };

        Ok(ToolOutput::Text(format_output(&output)))
    }
}

fn format_output(output: &std::process::Output) -> String {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);

    let mut sections = Vec::new();
    if !stdout.trim().is_empty() {
        sections.push(format!("STDOUT:\n{}", stdout.trim_end()));
    }
    if !stderr.trim().is_empty() {
        sections.push(format!("STDERR:\n{}", stderr.trim_end()));
    }
    let body = if sections.is_empty() {
        agenthub_core::NO_OUTPUT.to_string()
    } else {
        truncate(sections.join("\n\n"))
    };

    if output.status.success() {
        format!("Command completed successfully (exit code 0):\n{}", body)
    } else {
        // Signals leave no exit code.
        let code = output.status.code().unwrap_or(-1);
        format!("Command failed with exit code {}:\n{}", code, body)
    }
}

fn truncate(text: String) -> String {
    if text.len() <= MAX_OUTPUT_CHARS {
        return text;
    }
    let mut end = MAX_OUTPUT_CHARS;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    format!(
        "{}\n... [truncated, {} total chars]",
        &text[..end],
        text.len()
    )
}

fn preview(command: &str) -> &str {
    match command.char_indices().nth(80) {
        Some((idx, _)) => &command[..idx],
        None => command,
    }
}
