//! LLM Provider trait — the streaming chat abstraction.
//!
//! The agent loop only ever sees this trait; `HttpProvider` in
//! `http_provider.rs` covers every OpenAI-compatible API.

use async_trait::async_trait;
use futures::stream::BoxStream;
use starbot_core::config::ModelConfig;
use starbot_core::types::{Message, StreamChunk, ToolDefinition};

use crate::error::ProviderError;

/// An ordered, finite sequence of streamed chunks.
pub type ChunkStream = BoxStream<'static, Result<StreamChunk, ProviderError>>;

/// Configuration passed to each LLM call.
#[derive(Clone, Debug)]
pub struct LlmRequestConfig {
    /// Maximum tokens to generate.
    pub max_tokens: u32,
    /// Sampling temperature (0.0 – 2.0).
    pub temperature: f64,
}

impl Default for LlmRequestConfig {
    fn default() -> Self {
        Self {
            max_tokens: 4096,
            temperature: 0.7,
        }
    }
}

impl From<&ModelConfig> for LlmRequestConfig {
    fn from(config: &ModelConfig) -> Self {
        Self {
            max_tokens: config.max_tokens,
            temperature: config.temperature,
        }
    }
}

/// Trait that all LLM providers must implement.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Open a streaming chat completion.
    ///
    /// # Arguments
    /// * `messages` — Conversation snapshot in OpenAI format.
    /// * `tools`    — Optional list of tool definitions the LLM can call.
    /// * `model`    — Model identifier (e.g. `"gpt-4o"`).
    /// * `config`   — Temperature, max_tokens, etc.
    ///
    /// # Returns
    /// A stream of chunks carrying text deltas and/or tool-call fragments.
    /// Failing to open the stream is an `Err`; failures after that arrive as
    /// `Err` items inside the stream.
    async fn chat_stream(
        &self,
        messages: &[Message],
        tools: Option<&[ToolDefinition]>,
        model: &str,
        config: &LlmRequestConfig,
    ) -> Result<ChunkStream, ProviderError>;

    /// The default model for this provider instance.
    fn default_model(&self) -> &str;

    /// Display name for logging.
    fn display_name(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_config_from_model_config() {
        let model = ModelConfig {
            max_tokens: 1024,
            temperature: 0.2,
            ..Default::default()
        };
        let cfg = LlmRequestConfig::from(&model);
        assert_eq!(cfg.max_tokens, 1024);
        assert_eq!(cfg.temperature, 0.2);
    }
}
