//! `web_search` and `web_crawl`.

use crate::search::{CrawlBackend, SearchBackend, SearchQuery};
use async_trait::async_trait;
use nexagent_core::auth::AuthContext;
use nexagent_core::error::ToolError;
use nexagent_core::schema::{ArgKind, ArgumentSchema};
use nexagent_core::tool::{Tool, ToolResult};
use std::sync::Arc;

const MAX_RESULTS_CAP: u64 = 10;
/// Crawled pages longer than this are cut before reaching the model.
const MAX_PAGE_CHARS: usize = 20_000;

pub struct WebSearchTool {
    backend: Arc<dyn SearchBackend>,
    credential: String,
    default_max_results: u32,
}

impl WebSearchTool {
    pub fn new(backend: Arc<dyn SearchBackend>, credential: impl Into<String>) -> Self {
        Self {
            backend,
            credential: credential.into(),
            default_max_results: 5,
        }
    }

    pub fn with_default_max_results(mut self, n: u32) -> Self {
        self.default_max_results = n.max(1);
        self
    }
}

#[async_trait]
impl Tool for WebSearchTool {
    fn name(&self) -> &str {
        "web_search"
    }

    fn description(&self) -> &str {
        "Search the web. Returns titles, URLs and content snippets of the top results."
    }

    fn argument_schema(&self) -> ArgumentSchema {
        ArgumentSchema::new()
            .required("query", ArgKind::String, "The search query")
            .optional("max_results", ArgKind::Integer, "Number of results (default 5)")
    }

    fn required_credential(&self) -> Option<&str> {
        Some(&self.credential)
    }

    async fn execute(
        &self,
        arguments: serde_json::Value,
        _auth: &AuthContext,
    ) -> Result<ToolResult, ToolError> {
        let query = arguments["query"]
            .as_str()
            .filter(|q| !q.trim().is_empty())
            .ok_or_else(|| ToolError::InvalidArguments("'query' must not be empty".into()))?;
        let max_results = arguments["max_results"]
            .as_u64()
            .map(|n| n.clamp(1, MAX_RESULTS_CAP) as u32)
            .unwrap_or(self.default_max_results);

        let hits = self
            .backend
            .search(&SearchQuery::new(query, max_results))
            .await?;
        if hits.is_empty() {
            return Ok(ToolResult::success(format!("No results for '{query}'.")));
        }

        let output = hits
            .iter()
            .enumerate()
            .map(|(i, hit)| format!("{}. {}\n   {}\n   {}", i + 1, hit.title, hit.url, hit.content))
            .collect::<Vec<_>>()
            .join("\n\n");
        let data = serde_json::to_value(&hits).unwrap_or_default();
        Ok(ToolResult::success(output).with_data(data))
    }
}

pub struct WebCrawlTool {
    backend: Arc<dyn CrawlBackend>,
    credential: String,
}

impl WebCrawlTool {
    pub fn new(backend: Arc<dyn CrawlBackend>, credential: impl Into<String>) -> Self {
        Self {
            backend,
            credential: credential.into(),
        }
    }
}

#[async_trait]
impl Tool for WebCrawlTool {
    fn name(&self) -> &str {
        "web_crawl"
    }

    fn description(&self) -> &str {
        "Fetch a web page and return its main content as markdown."
    }

    fn argument_schema(&self) -> ArgumentSchema {
        ArgumentSchema::new().required("url", ArgKind::String, "Absolute http(s) URL to fetch")
    }

    fn required_credential(&self) -> Option<&str> {
        Some(&self.credential)
    }

    async fn execute(
        &self,
        arguments: serde_json::Value,
        _auth: &AuthContext,
    ) -> Result<ToolResult, ToolError> {
        let url = arguments["url"].as_str().unwrap_or_default().trim();
        let parsed = reqwest::Url::parse(url)
            .map_err(|e| ToolError::InvalidArguments(format!("invalid url '{url}': {e}")))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ToolError::InvalidArguments(format!(
                "unsupported scheme '{}'",
                parsed.scheme()
            )));
        }

        let page = self.backend.crawl(url).await?;
        let mut body = page.markdown;
        if body.chars().count() > MAX_PAGE_CHARS {
            body = body.chars().take(MAX_PAGE_CHARS).collect();
            body.push_str("\n\n... (page truncated)");
        }
        let output = match &page.title {
            Some(title) => format!("# {title}\nSource: {}\n\n{body}", page.url),
            None => format!("Source: {}\n\n{body}", page.url),
        };
        Ok(ToolResult::success(output))
    }
}
