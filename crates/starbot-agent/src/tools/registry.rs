//! Tool Registry — name → tool table plus the dispatcher.
//!
//! Built once at startup, then shared read-only behind an `Arc`.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;
use starbot_core::types::ToolDefinition;
use starbot_core::utils::truncate_string;
use thiserror::Error;
use tracing::{debug, info, warn};

use super::base::{Tool, ToolOutput};

// ─────────────────────────────────────────────
// Faults
// ─────────────────────────────────────────────

/// Why a dispatch did not produce output.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ToolFault {
    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("Invalid arguments for {tool}: {reason}")]
    InvalidArguments { tool: String, reason: String },

    #[error("{tool} failed: {message}")]
    Execution { tool: String, message: String },
}

// ─────────────────────────────────────────────
// Registry
// ─────────────────────────────────────────────

/// Stores tools keyed by name and dispatches calls.
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
        }
    }

    /// Register a tool. A later registration under the same name wins.
    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        let name = tool.name().to_string();
        if self.tools.contains_key(&name) {
            warn!(tool = %name, "tool registered twice, replacing previous definition");
        }
        debug!(tool = %name, dangerous = tool.dangerous(), "registered tool");
        self.tools.insert(name, tool);
    }

    /// Look up a tool by name.
    pub fn get(&self, name: &str) -> Option<&Arc<dyn Tool>> {
        self.tools.get(name)
    }

    /// Check if a tool is registered.
    pub fn has(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// Names of all registered tools, sorted for determinism.
    pub fn tool_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tools.keys().cloned().collect();
        names.sort();
        names
    }

    /// Model-facing definitions, sorted by name.
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        let mut defs: Vec<ToolDefinition> =
            self.tools.values().map(|t| t.to_definition()).collect();
        defs.sort_by(|a, b| a.function.name.cmp(&b.function.name));
        defs
    }

    /// Whether `name` needs approval. Unknown names are not dangerous.
    pub fn is_dangerous(&self, name: &str) -> bool {
        self.tools.get(name).is_some_and(|t| t.dangerous())
    }

    /// Resolve and run a tool from its raw argument text.
    pub async fn dispatch(&self, name: &str, arguments: &str) -> Result<ToolOutput, ToolFault> {
        let tool = self
            .tools
            .get(name)
            .ok_or_else(|| ToolFault::UnknownTool(name.to_string()))?;

        let params = parse_arguments(arguments).map_err(|reason| ToolFault::InvalidArguments {
            tool: name.to_string(),
            reason,
        })?;

        info!(tool = %name, args = %truncate_string(arguments, 200), "executing tool");
        tool.execute(params).await.map_err(|e| ToolFault::Execution {
            tool: name.to_string(),
            message: format!("{e:#}"),
        })
    }

    /// Like [`dispatch`](Self::dispatch), but always yields transcript text.
    pub async fn execute(&self, name: &str, arguments: &str) -> String {
        match self.dispatch(name, arguments).await {
            Ok(output) => output.into_text(),
            Err(fault) => {
                warn!(tool = %name, error = %fault, "tool call failed");
                format!("[error] {fault}")
            }
        }
    }

    /// Number of registered tools.
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Decode argument text into a parameter map. Blank text means `{}`.
fn parse_arguments(arguments: &str) -> Result<HashMap<String, Value>, String> {
    if arguments.trim().is_empty() {
        return Ok(HashMap::new());
    }
    match serde_json::from_str::<Value>(arguments) {
        Ok(Value::Object(map)) => Ok(map.into_iter().collect()),
        Ok(other) => Err(format!("expected a JSON object, got {other}")),
        Err(e) => Err(e.to_string()),
    }
}
