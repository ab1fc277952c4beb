//! explore_project_structure - render the workspace as a file tree

use crate::registry::{optional_str, Tool, ToolContext, ToolError, ToolOutput, ToolResult};
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::{DirEntry, WalkDir};

const DEFAULT_MAX_DEPTH: u64 = 5;
const MAX_DEPTH_LIMIT: u64 = 10;

/// Build output and dependency directories never worth showing.
const IGNORED_DIRS: &[&str] = &[
    "node_modules",
    "__pycache__",
    ".git",
    ".venv",
    "venv",
    "env",
    ".pytest_cache",
    ".mypy_cache",
    "dist",
    "build",
    ".next",
    ".nuxt",
    "coverage",
    ".coverage",
    "htmlcov",
    "target",
];

pub struct ExploreStructureTool;

#[async_trait::async_trait]
impl Tool for ExploreStructureTool {
    fn name(&self) -> &str {
        "explore_project_structure"
    }

    fn description(&self) -> &str {
        "Explore and display the complete file tree structure of the workspace or a specific \
         directory. Shows all files and folders in a tree format."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "path": {
                    "type": "string",
                    "description": "Relative path within workspace to explore (leave empty for entire workspace)"
                },
                "max_depth": {
                    "type": "integer",
                    "description": "Maximum depth to traverse (default: 5, max: 10)",
                    "default": DEFAULT_MAX_DEPTH
                },
                "show_hidden": {
                    "type": "boolean",
                    "description": "Whether to show hidden files/folders (starting with .)",
                    "default": false
                }
            },
            "required": []
        })
    }

    async fn execute(&self, args: Value, ctx: &ToolContext) -> ToolResult {
        let rel = optional_str(&args, "path").unwrap_or("").to_string();
        let opts = TreeOptions {
            max_depth: args
                .get("max_depth")
                .and_then(Value::as_u64)
                .unwrap_or(DEFAULT_MAX_DEPTH)
                .min(MAX_DEPTH_LIMIT) as usize,
            show_hidden: args
                .get("show_hidden")
                .and_then(Value::as_bool)
                .unwrap_or(false),
        };
        let target = ctx.resolve(&rel)?;

        let tree = tokio::task::spawn_blocking(move || render(target, &rel, opts))
            .await
            .map_err(|e| ToolError::Failed(format!("Error exploring structure: {}", e)))??;

        Ok(ToolOutput::Text(tree))
    }
}

#[derive(Clone, Copy)]
struct TreeOptions {
    max_depth: usize,
    show_hidden: bool,
}

#[derive(Default)]
struct Counts {
    dirs: usize,
    files: usize,
}

enum NodeKind {
    Dir,
    File(Option<u64>),
    /// The directory above could not be read.
    Unreadable(String),
}

/// One walked entry. `depth` is 1 for direct children of the root.
struct Node {
    depth: usize,
    path: PathBuf,
    name: String,
    kind: NodeKind,
}

fn render(target: PathBuf, rel: &str, opts: TreeOptions) -> ToolResult<String> {
    let shown = if rel.is_empty() { "." } else { rel };
    if !target.exists() {
        return Err(ToolError::Failed(format!("Path does not exist: {}", shown)));
    }
    if !target.is_dir() {
        return Err(ToolError::NotADirectory(shown.to_string()));
    }

    let root_name = target
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| shown.to_string());

    let nodes = walk(&target, opts);
    let (lines, counts) = draw(&nodes);

    debug!(
        "explore_project_structure: {} ({} dirs, {} files)",
        shown, counts.dirs, counts.files
    );

    let mut out = vec![format!("Project Structure: {}/\n", root_name)];
    if lines.is_empty() {
        out.push("(Empty directory)".to_string());
    }
    out.extend(lines);
    out.push(format!(
        "\nSummary: {} directories, {} files",
        counts.dirs, counts.files
    ));
    Ok(out.join("\n"))
}

fn visible(entry: &DirEntry, show_hidden: bool) -> bool {
    if entry.depth() == 0 {
        return true;
    }
    let name = entry.file_name().to_string_lossy();
    (show_hidden || !name.starts_with('.')) && !IGNORED_DIRS.contains(&&*name)
}

/// Walk `root` in display order: directories first, then case-insensitive
/// by name, each directory followed by its contents.
fn walk(root: &Path, opts: TreeOptions) -> Vec<Node> {
    let walker = WalkDir::new(root)
        .min_depth(1)
        .max_depth(opts.max_depth + 1)
        .sort_by(|a, b| {
            let (a_dir, b_dir) = (a.file_type().is_dir(), b.file_type().is_dir());
            b_dir.cmp(&a_dir).then_with(|| {
                a.file_name()
                    .to_string_lossy()
                    .to_lowercase()
                    .cmp(&b.file_name().to_string_lossy().to_lowercase())
            })
        })
        .into_iter()
        .filter_entry(move |e| visible(e, opts.show_hidden));

    let mut nodes: Vec<Node> = Vec::new();
    for item in walker {
        match item {
            Ok(entry) => {
                let kind = if entry.file_type().is_dir() {
                    NodeKind::Dir
                } else {
                    NodeKind::File(entry.metadata().ok().map(|m| m.len()))
                };
                nodes.push(Node {
                    depth: entry.depth(),
                    name: entry.file_name().to_string_lossy().into_owned(),
                    path: entry.into_path(),
                    kind,
                });
            }
            Err(err) => {
                let marker = match err.io_error() {
                    Some(io) if io.kind() == std::io::ErrorKind::PermissionDenied => {
                        "[Permission Denied]".to_string()
                    }
                    Some(io) => format!("[Error: {}]", io),
                    None => format!("[Error: {}]", err),
                };
                // Attach the marker under the directory that failed to open.
                let depth = err
                    .path()
                    .and_then(|p| nodes.iter().rev().find(|n| n.path == p))
                    .map_or(1, |n| n.depth + 1);
                nodes.push(Node {
                    depth,
                    path: err.path().map(Path::to_path_buf).unwrap_or_default(),
                    name: String::new(),
                    kind: NodeKind::Unreadable(marker),
                });
            }
        }
    }
    nodes
}

/// Whether no later sibling follows `nodes[idx]`.
fn is_last_sibling(nodes: &[Node], idx: usize) -> bool {
    let depth = nodes[idx].depth;
    for next in &nodes[idx + 1..] {
        if next.depth < depth {
            return true;
        }
        if next.depth == depth && !matches!(next.kind, NodeKind::Unreadable(_)) {
            return false;
        }
    }
    true
}

fn draw(nodes: &[Node]) -> (Vec<String>, Counts) {
    let mut lines = Vec::with_capacity(nodes.len());
    let mut counts = Counts::default();
    // For each open ancestor level: was it the last of its siblings?
    let mut last_at: Vec<bool> = Vec::new();

    for (idx, node) in nodes.iter().enumerate() {
        last_at.truncate(node.depth.saturating_sub(1));
        let prefix: String = last_at
            .iter()
            .map(|&last| if last { "    " } else { "│   " })
            .collect();

        let is_last = is_last_sibling(nodes, idx);
        let branch = if is_last { "└── " } else { "├── " };

        match &node.kind {
            NodeKind::Dir => {
                counts.dirs += 1;
                lines.push(format!("{}{}📁 {}/", prefix, branch, node.name));
            }
            NodeKind::File(size) => {
                counts.files += 1;
                let label = match size {
                    Some(len) => format!("📄 {} ({})", node.name, format_size(*len)),
                    None => format!("📄 {}", node.name),
                };
                lines.push(format!("{}{}{}", prefix, branch, label));
            }
            NodeKind::Unreadable(marker) => {
                lines.push(format!("{}    {}", prefix, marker));
                continue;
            }
        }
        last_at.push(is_last);
    }
    (lines, counts)
}

fn format_size(size: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = 1024 * 1024;
    if size < KB {
        format!("{}B", size)
    } else if size < MB {
        format!("{:.1}KB", size as f64 / KB as f64)
    } else {
        format!("{:.1}MB", size as f64 / MB as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sizes() {
        assert_eq!(format_size(12), "12B");
        assert_eq!(format_size(1536), "1.5KB");
        assert_eq!(format_size(3 * 1024 * 1024), "3.0MB");
    }

    #[test]
    fn connectors_follow_sibling_order() {
        let dir = tempfile::TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("Beta/inner")).unwrap();
        std::fs::create_dir_all(dir.path().join("alpha")).unwrap();
        std::fs::write(dir.path().join("Beta/inner/x.txt"), "x").unwrap();
        std::fs::write(dir.path().join("Beta/y.txt"), "yy").unwrap();
        std::fs::write(dir.path().join("z.txt"), "").unwrap();

        let nodes = walk(dir.path(), TreeOptions { max_depth: 5, show_hidden: false });
        let (lines, counts) = draw(&nodes);
        assert_eq!(
            lines,
            vec![
                "├── 📁 alpha/",
                "├── 📁 Beta/",
                "│   ├── 📁 inner/",
                "│   │   └── 📄 x.txt (1B)",
                "│   └── 📄 y.txt (2B)",
                "└── 📄 z.txt (0B)",
            ]
        );
        assert_eq!(counts.dirs, 3);
        assert_eq!(counts.files, 3);
    }

    #[test]
    fn ignored_root_is_still_walked() {
        let dir = tempfile::TempDir::new().unwrap();
        let build = dir.path().join("build");
        std::fs::create_dir(&build).unwrap();
        std::fs::write(build.join("out.bin"), "").unwrap();
        let nodes = walk(&build, TreeOptions { max_depth: 1, show_hidden: false });
        assert_eq!(nodes.len(), 1);
        assert_eq!(nodes[0].name, "out.bin");
    }
}
