//! Tool registry and trait definitions
//!
//! Each tool is a self-contained module implementing the Tool trait.
//! The registry is built once at startup and shared read-only between
//! sessions, so the workspace travels with each call in a [`ToolContext`].

use agenthub_core::{Error, ToolSpec, NO_OUTPUT};
use serde_json::Value;
use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

/// Successful tool output, coerced to text before it reaches the model.
#[derive(Clone, Debug, PartialEq)]
pub enum ToolOutput {
    Text(String),
    Json(Value),
    Empty,
}

impl ToolOutput {
    pub fn text(s: impl Into<String>) -> Self {
        Self::Text(s.into())
    }

    /// Text sent back to the model. Never empty.
    pub fn into_content(self) -> String {
        match self {
            Self::Text(s) if s.is_empty() => NO_OUTPUT.to_string(),
            Self::Text(s) => s,
            Self::Json(v) => serde_json::to_string_pretty(&v).unwrap_or_else(|_| v.to_string()),
            Self::Empty => NO_OUTPUT.to_string(),
        }
    }
}

/// A tool that ran but failed. The display text is what the model sees.
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    #[error("Error: Missing required parameter: {0}")]
    MissingArgument(&'static str),

    #[error("Error: {0}")]
    InvalidArgument(String),

    #[error("Error: Path is outside workspace: {0}")]
    OutsideWorkspace(String),

    #[error("Error: File not found: {0}")]
    NotFound(String),

    #[error("Error: Path is not a directory: {0}")]
    NotADirectory(String),

    #[error("Command timed out after {0} seconds")]
    Timeout(u64),

    #[error("Error: {context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Error: {0}")]
    Failed(String),
}

impl ToolError {
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }
}

pub type ToolResult<T = ToolOutput> = Result<T, ToolError>;

/// Per-call execution context.
#[derive(Clone, Debug)]
pub struct ToolContext {
    pub workspace: PathBuf,
}

impl ToolContext {
    pub fn new(workspace: impl AsRef<Path>) -> Self {
        Self {
            workspace: workspace.as_ref().to_path_buf(),
        }
    }

    /// Resolve a workspace-relative path, refusing anything that escapes.
    pub fn resolve(&self, rel: &str) -> ToolResult<PathBuf> {
        resolve_in_workspace(&self.workspace, rel)
    }
}

/// Lexically join `rel` onto `workspace` and check containment.
///
/// `..` segments are folded before the check, so `a/../../x` is refused.
/// Symlinks inside the workspace are not followed.
pub fn resolve_in_workspace(workspace: &Path, rel: &str) -> ToolResult<PathBuf> {
    let root = normalize(workspace);
    let joined = normalize(&root.join(rel.trim()));
    if joined.starts_with(&root) {
        Ok(joined)
    } else {
        Err(ToolError::OutsideWorkspace(rel.to_string()))
    }
}

fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match out.components().next_back() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => out.push(".."),
            },
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Required string argument.
pub fn required_str<'a>(args: &'a Value, key: &'static str) -> ToolResult<&'a str> {
    args.get(key)
        .and_then(Value::as_str)
        .ok_or(ToolError::MissingArgument(key))
}

/// Optional string argument; blank counts as absent.
pub fn optional_str<'a>(args: &'a Value, key: &str) -> Option<&'a str> {
    args.get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

/// The Tool trait - implement this to add a new capability.
#[async_trait::async_trait]
pub trait Tool: Send + Sync {
    /// Unique tool name (e.g. "read_file").
    fn name(&self) -> &str;

    /// Human-readable description sent to the model.
    fn description(&self) -> &str;

    /// JSON Schema for input parameters.
    fn input_schema(&self) -> Value;

    /// Execute the tool with the given arguments.
    async fn execute(&self, args: Value, ctx: &ToolContext) -> ToolResult;

    fn to_spec(&self) -> ToolSpec {
        ToolSpec {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: self.input_schema(),
        }
    }
}

/// Ordered tool registry. Registration order is the order schemas are
/// offered to the model.
pub struct ToolRegistry {
    tools: Vec<Arc<dyn Tool>>,
    index: HashMap<String, usize>,
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Register a tool. A tool with the same name is replaced in place.
    pub fn register(&mut self, tool: impl Tool + 'static) {
        let name = tool.name().to_string();
        let tool: Arc<dyn Tool> = Arc::new(tool);
        match self.index.get(&name) {
            Some(&pos) => {
                warn!("Tool {} registered twice, replacing", name);
                self.tools[pos] = tool;
            }
            None => {
                self.index.insert(name, self.tools.len());
                self.tools.push(tool);
            }
        }
    }

    /// Find a tool by name. Unknown names are a caller error, not a tool failure.
    pub fn lookup(&self, name: &str) -> agenthub_core::Result<Arc<dyn Tool>> {
        self.index
            .get(name)
            .map(|&pos| self.tools[pos].clone())
            .ok_or_else(|| Error::unknown_tool(name))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Schemas for every tool, in registration order.
    pub fn specs(&self) -> Vec<ToolSpec> {
        self.tools.iter().map(|t| t.to_spec()).collect()
    }

    pub fn names(&self) -> Vec<&str> {
        self.tools.iter().map(|t| t.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

/// Run one tool and coerce its output to text.
pub async fn execute(tool: &dyn Tool, args: Value, ctx: &ToolContext) -> ToolResult<String> {
    debug!(tool = tool.name(), workspace = %ctx.workspace.display(), "Executing tool");
    let output = tool.execute(args, ctx).await?;
    Ok(output.into_content())
}
