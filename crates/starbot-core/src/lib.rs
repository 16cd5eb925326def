//! StarBot core — wire types shared by the provider and agent crates,
//! the configuration system, and small utilities.

pub mod config;
pub mod types;
pub mod utils;

pub use config::Config;
pub use types::{
    FunctionCall, Message, StreamChunk, ToolCall, ToolCallDelta, ToolDefinition, UsageInfo,
};
