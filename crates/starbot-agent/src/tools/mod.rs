//! Tool modules for the StarBot agent.

pub mod base;
pub mod filesystem;
pub mod http;
pub mod registry;
pub mod shell;
pub mod sqlite;
pub mod web;

use std::sync::Arc;

use starbot_core::config::ToolsConfig;

pub use base::{optional_string, optional_string_map, require_string, Tool, ToolOutput};
pub use registry::{ToolFault, ToolRegistry};

/// Build the registry holding every built-in tool.
pub fn builtin_registry(config: &ToolsConfig) -> ToolRegistry {
    let mut registry = ToolRegistry::new();

    registry.register(Arc::new(filesystem::FileReadTool));
    registry.register(Arc::new(filesystem::FileWriteTool));
    registry.register(Arc::new(filesystem::FileSearchTool::default()));
    registry.register(Arc::new(shell::ShellExecTool::new(config.exec.timeout)));
    registry.register(Arc::new(shell::PythonExecTool::new(config.exec.timeout)));
    registry.register(Arc::new(http::HttpRequestTool::new(&config.http)));
    registry.register(Arc::new(web::WebSearchTool::new(config.search.max_results)));
    registry.register(Arc::new(sqlite::SqliteQueryTool::new(config.sqlite.row_limit)));

    registry
}
