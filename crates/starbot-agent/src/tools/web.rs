//! `web_search` tool — DuckDuckGo HTML results, no API key required.

use std::collections::HashMap;
use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use reqwest::Client;
use scraper::{ElementRef, Html, Selector};
use serde_json::{json, Value};
use tracing::debug;

use super::base::{require_string, Tool, ToolOutput};

/// User-Agent header.
const USER_AGENT: &str =
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 14_7_2) AppleWebKit/537.36 (KHTML, like Gecko)";

const DUCKDUCKGO_HTML: &str = "https://html.duckduckgo.com/html/";

const SEARCH_TIMEOUT_SECS: u64 = 15;

/// One parsed search hit.
#[derive(Debug, PartialEq)]
struct SearchResult {
    title: String,
    url: String,
    snippet: String,
}

/// Searches the web through DuckDuckGo's HTML endpoint.
pub struct WebSearchTool {
    client: Client,
    endpoint: String,
    max_results: usize,
}

impl WebSearchTool {
    pub fn new(max_results: usize) -> Self {
        Self::with_endpoint(DUCKDUCKGO_HTML, max_results)
    }

    /// Point the tool at a different results page (used by tests).
    pub fn with_endpoint(endpoint: impl Into<String>, max_results: usize) -> Self {
        Self {
            client: Client::builder()
                .user_agent(USER_AGENT)
                .timeout(Duration::from_secs(SEARCH_TIMEOUT_SECS))
                .build()
                .unwrap_or_default(),
            endpoint: endpoint.into(),
            max_results,
        }
    }
}

/// Collapse an element's text to single-spaced words.
fn element_text(el: ElementRef<'_>) -> String {
    el.text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

fn selector(css: &str) -> anyhow::Result<Selector> {
    Selector::parse(css).map_err(|e| anyhow::anyhow!("Invalid selector {css}: {e}"))
}

/// Extract results from a DuckDuckGo HTML page. Entries without a title are skipped.
fn parse_results(html: &str, limit: usize) -> anyhow::Result<Vec<SearchResult>> {
    let document = Html::parse_document(html);
    let result_sel = selector(".result")?;
    let title_sel = selector(".result__title")?;
    let snippet_sel = selector(".result__snippet")?;
    let url_sel = selector(".result__url")?;

    let first_text = |item: ElementRef<'_>, sel: &Selector| {
        item.select(sel).next().map(element_text).unwrap_or_default()
    };

    let results = document
        .select(&result_sel)
        .take(limit)
        .map(|item| SearchResult {
            title: first_text(item, &title_sel),
            url: first_text(item, &url_sel),
            snippet: first_text(item, &snippet_sel),
        })
        .filter(|r| !r.title.is_empty())
        .collect();
    Ok(results)
}

#[async_trait]
impl Tool for WebSearchTool {
    fn name(&self) -> &str {
        "web_search"
    }

    fn description(&self) -> &str {
        "Search the web using DuckDuckGo and return results."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "query": { "type": "string", "description": "Search query" }
            },
            "required": ["query"]
        })
    }

    async fn execute(&self, params: HashMap<String, Value>) -> anyhow::Result<ToolOutput> {
        let query = require_string(&params, "query")?;
        debug!(query = %query, "searching web");

        let html = self
            .client
            .get(&self.endpoint)
            .query(&[("q", &query)])
            .send()
            .await
            .context("Search request failed")?
            .text()
            .await
            .context("Failed to read search response")?;

        let results = parse_results(&html, self.max_results)?;
        if results.is_empty() {
            return Ok(ToolOutput::Text("No results found".to_string()));
        }

        let text = results
            .iter()
            .map(|r| format!("{}\n  {}\n  {}", r.title, r.url, r.snippet))
            .collect::<Vec<_>>()
            .join("\n\n");
        Ok(ToolOutput::Text(text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const PAGE: &str = r#"
        <html><body>
          <div class="result">
            <h2 class="result__title"><a href="https://www.rust-lang.org/">Rust  Programming
              Language</a></h2>
            <a class="result__url">www.rust-lang.org</a>
            <a class="result__snippet">A language empowering everyone.</a>
          </div>
          <div class="result">
            <h2 class="result__title"></h2>
            <a class="result__snippet">untitled entries are dropped</a>
          </div>
          <div class="result">
            <h2 class="result__title">Tokio</h2>
            <a class="result__url">tokio.rs</a>
          </div>
        </body></html>
    "#;

    #[test]
    fn test_parse_results() {
        let results = parse_results(PAGE, 5).unwrap();
        assert_eq!(
            results,
            vec![
                SearchResult {
                    title: "Rust Programming Language".into(),
                    url: "www.rust-lang.org".into(),
                    snippet: "A language empowering everyone.".into(),
                },
                SearchResult {
                    title: "Tokio".into(),
                    url: "tokio.rs".into(),
                    snippet: String::new(),
                },
            ]
        );
    }

    #[test]
    fn test_parse_results_limit_applies_before_filter() {
        assert_eq!(parse_results(PAGE, 1).unwrap().len(), 1);
        assert!(parse_results("<html></html>", 5).unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_search_formats_entries() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(query_param("q", "rust lang"))
            .respond_with(ResponseTemplate::new(200).set_body_string(PAGE))
            .mount(&server)
            .await;

        let tool = WebSearchTool::with_endpoint(server.uri(), 5);
        let mut params = HashMap::new();
        params.insert("query".to_string(), json!("rust lang"));
        let text = tool.execute(params).await.unwrap().into_text();

        assert_eq!(
            text,
            "Rust Programming Language\n  www.rust-lang.org\n  A language empowering everyone.\n\n\
             Tokio\n  tokio.rs\n  "
        );
    }

    #[tokio::test]
    async fn test_search_no_results() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html></html>"))
            .mount(&server)
            .await;

        let tool = WebSearchTool::with_endpoint(server.uri(), 5);
        let mut params = HashMap::new();
        params.insert("query".to_string(), json!("nothing"));
        assert_eq!(
            tool.execute(params).await.unwrap().into_text(),
            "No results found"
        );
    }
}
