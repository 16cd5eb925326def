//! Events emitted by one agent turn, in order.

use serde::Serialize;
use starbot_core::types::UsageInfo;

/// One observable step of [`crate::Agent::run`].
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AgentEvent {
    /// A streamed piece of assistant text.
    Text { content: String },
    /// The model asked for a tool.
    ToolCall {
        id: String,
        name: String,
        arguments: String,
    },
    /// A tool call finished (or was denied).
    ToolResult {
        id: String,
        name: String,
        result: String,
    },
    /// A dangerous call is waiting for approval through the gate.
    Confirm {
        id: String,
        name: String,
        arguments: String,
    },
    /// Token usage for the last model call plus the running total.
    Usage {
        usage: UsageInfo,
        cumulative: UsageInfo,
    },
    /// The turn ended abnormally.
    Error { message: String },
}

impl AgentEvent {
    pub fn event_type(&self) -> &'static str {
        match self {
            AgentEvent::Text { .. } => "text",
            AgentEvent::ToolCall { .. } => "tool_call",
            AgentEvent::ToolResult { .. } => "tool_result",
            AgentEvent::Confirm { .. } => "confirm",
            AgentEvent::Usage { .. } => "usage",
            AgentEvent::Error { .. } => "error",
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, AgentEvent::Error { .. })
    }
}
