//! Configuration schema.
//!
//! Hierarchy: `Config` → `ModelConfig`, `AgentSettings`, `ToolsConfig`.
//!
//! JSON on disk uses **camelCase** keys; Rust uses snake_case.
//! We use `#[serde(rename_all = "camelCase")]` to handle the conversion.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Default system prompt.
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are StarBot, a capable local AI assistant. \
You can run code, work with files, search the web, call HTTP APIs and query databases. \
Call tools directly to get things done, chain several calls for complex tasks, \
analyse failures before retrying, and finish each step with a short conclusion.";

// ─────────────────────────────────────────────
// Root Config
// ─────────────────────────────────────────────

/// Root configuration — loaded from `~/.starbot/config.json` + env vars.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    pub model: ModelConfig,
    pub agent: AgentSettings,
    pub tools: ToolsConfig,
}

// ─────────────────────────────────────────────
// Model endpoint
// ─────────────────────────────────────────────

/// OpenAI-compatible endpoint and sampling settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ModelConfig {
    /// API key for Bearer authentication.
    pub api_key: String,
    /// API base URL, e.g. `https://api.openai.com/v1`.
    pub base_url: String,
    /// Model identifier.
    pub model: String,
    /// Sampling temperature (0.0 – 2.0).
    pub temperature: f64,
    /// Maximum tokens to generate per response.
    pub max_tokens: u32,
    /// Extra HTTP headers to send with each request.
    #[serde(skip_serializing_if = "HashMap::is_empty")]
    pub extra_headers: HashMap<String, String>,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-4o".to_string(),
            temperature: 0.7,
            max_tokens: 4096,
            extra_headers: HashMap::new(),
        }
    }
}

impl ModelConfig {
    /// Whether an API key has been configured.
    pub fn is_configured(&self) -> bool {
        !self.api_key.is_empty()
    }
}

// ─────────────────────────────────────────────
// Agent
// ─────────────────────────────────────────────

/// Agent loop settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AgentSettings {
    /// System prompt placed at the head of every conversation.
    pub system_prompt: String,
    /// Maximum model ↔ tool iterations per user turn.
    pub max_iterations: u32,
    /// Ask the user before running tools flagged as dangerous.
    pub confirm_dangerous: bool,
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            max_iterations: 20,
            confirm_dangerous: true,
        }
    }
}

// ─────────────────────────────────────────────
// Tools
// ─────────────────────────────────────────────

/// Settings for the built-in tools.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ToolsConfig {
    pub exec: ExecConfig,
    pub http: HttpToolConfig,
    pub search: SearchConfig,
    pub sqlite: SqliteConfig,
}

/// Shell / python execution settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExecConfig {
    /// Timeout in seconds.
    pub timeout: u64,
}

impl Default for ExecConfig {
    fn default() -> Self {
        Self { timeout: 60 }
    }
}

/// `http_request` tool settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HttpToolConfig {
    /// Request timeout in seconds.
    pub timeout: u64,
    /// Response bodies are truncated to this many characters.
    pub max_body_chars: usize,
}

impl Default for HttpToolConfig {
    fn default() -> Self {
        Self {
            timeout: 30,
            max_body_chars: 5000,
        }
    }
}

/// `web_search` tool settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SearchConfig {
    pub max_results: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self { max_results: 5 }
    }
}

/// `sqlite_query` tool settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SqliteConfig {
    /// Maximum rows returned by a query.
    pub row_limit: usize,
}

impl Default for SqliteConfig {
    fn default() -> Self {
        Self { row_limit: 200 }
    }
}
