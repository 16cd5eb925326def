//! Reassembles streamed tool-call fragments into complete calls.

use std::collections::BTreeMap;

use starbot_core::types::{ToolCall, ToolCallDelta};

#[derive(Debug, Default)]
struct PartialCall {
    id: String,
    name: String,
    arguments: String,
}

/// Per-iteration map of stream index → partially built tool call.
///
/// Fragments for one index arrive in order, but indices may interleave.
/// `id` and `name` take the latest non-empty value; `arguments` concatenate.
#[derive(Debug, Default)]
pub struct ToolCallAccumulator {
    calls: BTreeMap<u32, PartialCall>,
}

impl ToolCallAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge one fragment.
    pub fn apply(&mut self, delta: &ToolCallDelta) {
        let entry = self.calls.entry(delta.index).or_default();

        if let Some(id) = delta.id.as_deref().filter(|s| !s.is_empty()) {
            entry.id = id.to_string();
        }
        if let Some(function) = &delta.function {
            if let Some(name) = function.name.as_deref().filter(|s| !s.is_empty()) {
                entry.name = name.to_string();
            }
            if let Some(args) = &function.arguments {
                entry.arguments.push_str(args);
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.calls.is_empty()
    }

    pub fn len(&self) -> usize {
        self.calls.len()
    }

    /// Completed calls in ascending index order.
    pub fn finish(self) -> Vec<ToolCall> {
        self.calls
            .into_values()
            .map(|c| ToolCall::new(c.id, c.name, c.arguments))
            .collect()
    }
}
