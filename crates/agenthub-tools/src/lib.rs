//! Agent Hub Tools - modular tool implementations
//!
//! Each tool is a self-contained file in src/tools/.
//! To add a tool: create the file, implement Tool trait, register below.

pub mod registry;
pub mod tools;

pub use registry::{
    execute, resolve_in_workspace, Tool, ToolContext, ToolError, ToolOutput, ToolRegistry,
    ToolResult,
};
pub use tools::write::read_snapshot;

use agenthub_core::Settings;

/// Create the default tool registry with all builtin tools.
///
/// The order here is the order the model sees the schemas in.
pub fn create_default_registry(settings: &Settings) -> ToolRegistry {
    let mut registry = ToolRegistry::new();

    registry.register(tools::read::ReadFileTool);
    registry.register(tools::write::WriteFileTool);
    registry.register(tools::bash::ExecuteBashTool::new());
    registry.register(tools::list::ListFilesTool);
    registry.register(tools::explore::ExploreStructureTool);
    registry.register(tools::web_search::WebSearchTool::new(
        settings.google_api_key.clone(),
        settings.google_search_engine_id.clone(),
    ));

    registry
}
