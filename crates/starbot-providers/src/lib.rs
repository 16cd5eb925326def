//! LLM provider layer for StarBot.
//!
//! # Architecture
//!
//! - [`traits::LlmProvider`] — streaming chat trait that all providers implement
//! - [`http_provider::HttpProvider`] — OpenAI-compatible `/chat/completions` client (SSE)
//! - [`sse::SseDecoder`] — incremental `text/event-stream` line decoder
//! - [`error::ProviderError`] — transport and API failures

pub mod error;
pub mod http_provider;
pub mod sse;
pub mod traits;

// Re-export main types for convenience
pub use error::ProviderError;
pub use http_provider::HttpProvider;
pub use traits::{ChunkStream, LlmProvider, LlmRequestConfig};
