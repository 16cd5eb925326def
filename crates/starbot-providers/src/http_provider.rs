//! Streaming HTTP provider for OpenAI-compatible APIs.
//!
//! Talks to any `/chat/completions` endpoint that supports `stream: true`
//! (OpenAI, DeepSeek, Groq, OpenRouter, Ollama, vLLM, ...) and turns the
//! server-sent events into [`StreamChunk`]s.

use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT};
use tracing::{debug, error, trace, warn};

use starbot_core::config::ModelConfig;
use starbot_core::types::{
    ChatCompletionChunk, ChatCompletionRequest, Message, StreamChunk, StreamOptions,
    ToolDefinition,
};

use crate::error::ProviderError;
use crate::sse::{SseDecoder, SseEvent};
use crate::traits::{ChunkStream, LlmProvider, LlmRequestConfig};

/// Connect timeout; the body itself is unbounded because streams are long-lived.
const CONNECT_TIMEOUT_SECS: u64 = 30;

// ─────────────────────────────────────────────
// HttpProvider
// ─────────────────────────────────────────────

/// A streaming LLM provider that talks to any OpenAI-compatible HTTP API.
pub struct HttpProvider {
    /// HTTP client (shared, connection-pooled).
    client: reqwest::Client,
    /// API base URL (e.g. `"https://api.openai.com/v1"`).
    api_base: String,
    /// API key for Bearer authentication; empty for local endpoints.
    api_key: String,
    /// Default model for this provider instance.
    default_model: String,
    /// Extra headers to send with each request.
    extra_headers: HeaderMap,
    /// Host of the endpoint, used in logs.
    display_name: String,
}

impl std::fmt::Debug for HttpProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpProvider")
            .field("api_base", &self.api_base)
            .field("default_model", &self.default_model)
            .field("provider", &self.display_name)
            .finish()
    }
}

impl HttpProvider {
    /// Create a provider from the model section of the config.
    pub fn new(config: &ModelConfig) -> Result<Self, ProviderError> {
        let mut extra_headers = HeaderMap::new();
        for (key, value) in &config.extra_headers {
            if let (Ok(name), Ok(val)) = (
                HeaderName::from_bytes(key.as_bytes()),
                HeaderValue::from_str(value),
            ) {
                extra_headers.insert(name, val);
            } else {
                warn!("Invalid header: {}={}", key, value);
            }
        }

        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .build()
            .map_err(|e| ProviderError::Client(e.to_string()))?;

        let display_name = reqwest::Url::parse(&config.base_url)
            .ok()
            .and_then(|u| u.host_str().map(String::from))
            .unwrap_or_else(|| "openai-compatible".to_string());

        Ok(HttpProvider {
            client,
            api_base: config.base_url.clone(),
            api_key: config.api_key.clone(),
            default_model: config.model.clone(),
            extra_headers,
            display_name,
        })
    }

    /// Build the full chat completions URL.
    fn completions_url(&self) -> String {
        let base = self.api_base.trim_end_matches('/');
        format!("{}/chat/completions", base)
    }
}

#[async_trait]
impl LlmProvider for HttpProvider {
    async fn chat_stream(
        &self,
        messages: &[Message],
        tools: Option<&[ToolDefinition]>,
        model: &str,
        config: &LlmRequestConfig,
    ) -> Result<ChunkStream, ProviderError> {
        debug!(
            provider = %self.display_name,
            model = %model,
            messages = messages.len(),
            tools = tools.map_or(0, |t| t.len()),
            "Opening LLM stream"
        );

        let request_body = ChatCompletionRequest {
            model: model.to_string(),
            messages: messages.to_vec(),
            tools: tools.map(|t| t.to_vec()),
            max_tokens: Some(config.max_tokens),
            temperature: Some(config.temperature),
            stream: true,
            stream_options: Some(StreamOptions {
                include_usage: true,
            }),
        };

        let mut request = self
            .client
            .post(self.completions_url())
            .headers(self.extra_headers.clone())
            .header(ACCEPT, "text/event-stream")
            .json(&request_body);
        if !self.api_key.is_empty() {
            request = request.bearer_auth(&self.api_key);
        }

        let response = request.send().await.map_err(|e| {
            error!(provider = %self.display_name, error = %e, "HTTP request failed");
            ProviderError::Http(e)
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read error body".to_string());
            error!(
                provider = %self.display_name,
                status = %status,
                body = %body,
                "API error"
            );
            return Err(ProviderError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let provider = self.display_name.clone();
        let stream = async_stream::stream! {
            let mut bytes = response.bytes_stream();
            let mut decoder = SseDecoder::new();

            'read: while let Some(next) = bytes.next().await {
                let data = match next {
                    Ok(b) => b,
                    Err(e) => {
                        warn!(provider = %provider, error = %e, "stream interrupted");
                        yield Err(ProviderError::Stream(e.to_string()));
                        return;
                    }
                };

                for event in decoder.push(&data) {
                    match event {
                        SseEvent::Done => break 'read,
                        SseEvent::Data(payload) => match parse_payload(&provider, &payload) {
                            Ok(Some(chunk)) => yield Ok(chunk),
                            Ok(None) => {}
                            Err(e) => {
                                yield Err(e);
                                return;
                            }
                        },
                    }
                }
            }

            if let Some(SseEvent::Data(payload)) = decoder.finish() {
                match parse_payload(&provider, &payload) {
                    Ok(Some(chunk)) => yield Ok(chunk),
                    Ok(None) => {}
                    Err(e) => yield Err(e),
                }
            }

            debug!(provider = %provider, "LLM stream finished");
        };

        Ok(Box::pin(stream))
    }

    fn default_model(&self) -> &str {
        &self.default_model
    }

    fn display_name(&self) -> &str {
        &self.display_name
    }
}

/// Decode one `data:` payload.
///
/// Unparseable payloads are skipped; an `{"error": ...}` payload ends the stream.
fn parse_payload(provider: &str, payload: &str) -> Result<Option<StreamChunk>, ProviderError> {
    let value: serde_json::Value = match serde_json::from_str(payload) {
        Ok(v) => v,
        Err(e) => {
            trace!(provider = %provider, data = %payload, error = %e, "Ignoring unparseable SSE chunk");
            return Ok(None);
        }
    };

    if let Some(err) = value.get("error") {
        let message = err
            .get("message")
            .and_then(|m| m.as_str())
            .map(String::from)
            .unwrap_or_else(|| err.to_string());
        return Err(ProviderError::Stream(message));
    }

    match serde_json::from_value::<ChatCompletionChunk>(value) {
        Ok(chunk) => Ok(Some(chunk.into())),
        Err(e) => {
            trace!(provider = %provider, error = %e, "Ignoring unexpected chunk shape");
            Ok(None)
        }
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
