//! `http_request` tool — call an HTTP API and return status plus body.

use std::collections::HashMap;
use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Method};
use serde_json::{json, Value};
use tracing::debug;

use starbot_core::config::HttpToolConfig;
use starbot_core::utils::take_chars;

use super::base::{optional_string, optional_string_map, require_string, Tool, ToolOutput};

const ALLOWED_METHODS: &[&str] = &["GET", "POST", "PUT", "DELETE", "PATCH"];

/// Make HTTP requests on the model's behalf.
pub struct HttpRequestTool {
    client: Client,
    max_body_chars: usize,
}

impl HttpRequestTool {
    pub fn new(config: &HttpToolConfig) -> Self {
        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(config.timeout))
                .build()
                .unwrap_or_default(),
            max_body_chars: config.max_body_chars,
        }
    }
}

#[async_trait]
impl Tool for HttpRequestTool {
    fn name(&self) -> &str {
        "http_request"
    }

    fn description(&self) -> &str {
        "Make an HTTP request (GET/POST/PUT/DELETE/PATCH) and return the response."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "method": { "type": "string", "description": "HTTP method (GET/POST/PUT/DELETE/PATCH)" },
                "url": { "type": "string", "description": "Request URL" },
                "headers": { "type": "object", "description": "Optional headers" },
                "body": { "type": "string", "description": "Optional request body (JSON string)" }
            },
            "required": ["method", "url"]
        })
    }

    async fn execute(&self, params: HashMap<String, Value>) -> anyhow::Result<ToolOutput> {
        let method_name = require_string(&params, "method")?.to_uppercase();
        let url = require_string(&params, "url")?;
        let headers = optional_string_map(&params, "headers");
        let body = optional_string(&params, "body").filter(|b| !b.is_empty());

        if !ALLOWED_METHODS.contains(&method_name.as_str()) {
            anyhow::bail!("Unsupported HTTP method: {method_name}");
        }
        let method = Method::from_bytes(method_name.as_bytes())
            .with_context(|| format!("Invalid HTTP method: {method_name}"))?;

        debug!(method = %method, url = %url, "http request");

        let mut request = self.client.request(method, &url);
        let has_content_type = headers
            .iter()
            .any(|(k, _)| k.eq_ignore_ascii_case("content-type"));
        for (key, value) in &headers {
            request = request.header(key.as_str(), value.as_str());
        }
        if let Some(body) = body {
            if !has_content_type {
                request = request.header(CONTENT_TYPE, "application/json");
            }
            request = request.body(body);
        }

        let response = request
            .send()
            .await
            .with_context(|| format!("Request to {url} failed"))?;
        let status = response.status().as_u16();
        let text = response
            .text()
            .await
            .context("Failed to read response body")?;

        Ok(ToolOutput::Text(format!(
            "[{status}]\n{}",
            take_chars(&text, self.max_body_chars)
        )))
    }
}
