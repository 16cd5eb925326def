//! Conversation — the ordered transcript fed to every model call.

use starbot_core::types::{Message, ToolCall};

/// Ordered chat transcript owned by a single agent.
///
/// Holds at most one system message, always at position 0. Messages are
/// append-only; the only removal is [`Conversation::clear`].
#[derive(Clone, Debug, Default)]
pub struct Conversation {
    messages: Vec<Message>,
}

impl Conversation {
    /// Start a transcript. An empty prompt means no system message.
    pub fn new(system_prompt: &str) -> Self {
        let mut messages = Vec::new();
        if !system_prompt.is_empty() {
            messages.push(Message::system(system_prompt));
        }
        Self { messages }
    }

    pub fn add_user(&mut self, text: impl Into<String>) {
        self.messages.push(Message::user(text));
    }

    /// Append one assistant message.
    ///
    /// Empty text is stored as no content; an empty call list as no calls.
    /// With neither, the message still records the assistant role.
    pub fn add_assistant(&mut self, content: Option<String>, tool_calls: Vec<ToolCall>) {
        let content = content.filter(|c| !c.is_empty());
        let tool_calls = if tool_calls.is_empty() {
            None
        } else {
            Some(tool_calls)
        };
        self.messages.push(Message::Assistant {
            content,
            tool_calls,
        });
    }

    pub fn add_tool_result(&mut self, tool_call_id: impl Into<String>, content: impl Into<String>) {
        self.messages
            .push(Message::tool_result(tool_call_id, content));
    }

    /// The exact message list for the next model call.
    pub fn snapshot(&self) -> &[Message] {
        &self.messages
    }

    /// Drop everything except the system message.
    pub fn clear(&mut self) {
        self.messages
            .retain(|m| matches!(m, Message::System { .. }));
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}
