//! StarBot Agent — streaming loop, conversation, confirmation and tools.
//!
//! This crate contains:
//! - **conversation**: the transcript sent to every model call
//! - **accumulator**: reassembly of streamed tool-call fragments
//! - **confirm**: the approve/deny gate for dangerous tools
//! - **agent_loop**: the model ↔ tool loop producing [`AgentEvent`]s
//! - **tools**: Tool trait, registry/dispatcher and the built-in tools
//! - **prompt**: system prompt with an environment block

pub mod accumulator;
pub mod agent_loop;
pub mod confirm;
pub mod conversation;
pub mod event;
pub mod prompt;
pub mod tools;

pub use agent_loop::{Agent, AgentOptions, LoopState};
pub use confirm::{ConfirmationGate, PendingConfirmation};
pub use conversation::Conversation;
pub use event::AgentEvent;
pub use prompt::PromptBuilder;
pub use tools::{builtin_registry, Tool, ToolFault, ToolOutput, ToolRegistry};
