//! Web search and crawl backends (Tavily, Firecrawl).

use async_trait::async_trait;
use nexagent_core::error::ToolError;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchQuery {
    pub query: String,
    pub max_results: u32,
    /// `basic` or `advanced`.
    pub search_depth: String,
}

impl SearchQuery {
    pub fn new(query: impl Into<String>, max_results: u32) -> Self {
        Self {
            query: query.into(),
            max_results,
            search_depth: "basic".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchHit {
    #[serde(default)]
    pub title: String,
    pub url: String,
    #[serde(default)]
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published_date: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CrawledPage {
    pub url: String,
    pub title: Option<String>,
    pub markdown: String,
}

#[async_trait]
pub trait SearchBackend: Send + Sync {
    async fn search(&self, query: &SearchQuery) -> Result<Vec<SearchHit>, ToolError>;
}

#[async_trait]
pub trait CrawlBackend: Send + Sync {
    async fn crawl(&self, url: &str) -> Result<CrawledPage, ToolError>;
}

fn http_client(timeout: Duration) -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .unwrap_or_else(|_| reqwest::Client::new())
}

fn remote(operation: &str, reason: impl Into<String>) -> ToolError {
    ToolError::Remote {
        operation: operation.into(),
        reason: reason.into(),
    }
}

async fn check_status(
    operation: &str,
    response: reqwest::Response,
) -> Result<reqwest::Response, ToolError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    if status.as_u16() == 401 || status.as_u16() == 403 {
        return Err(ToolError::PermissionDenied {
            tool_name: operation.into(),
            reason: format!("API key rejected (HTTP {})", status.as_u16()),
        });
    }
    let body = response.text().await.unwrap_or_default();
    Err(remote(operation, format!("HTTP {}: {body}", status.as_u16())))
}

/// Tavily search API client.
pub struct TavilyClient {
    base_url: String,
    api_key: String,
    client: reqwest::Client,
}

impl TavilyClient {
    pub fn new(base_url: &str, api_key: impl Into<String>, timeout: Duration) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            client: http_client(timeout),
        }
    }
}

#[derive(Deserialize)]
struct TavilyResponse {
    #[serde(default)]
    results: Vec<SearchHit>,
}

#[async_trait]
impl SearchBackend for TavilyClient {
    async fn search(&self, query: &SearchQuery) -> Result<Vec<SearchHit>, ToolError> {
        debug!(query = %query.query, max_results = query.max_results, "Tavily search");
        let body = serde_json::json!({
            "api_key": self.api_key,
            "query": query.query,
            "search_depth": query.search_depth,
            "max_results": query.max_results,
            "include_answer": false,
        });
        let response = self
            .client
            .post(format!("{}/search", self.base_url))
            .json(&body)
            .send()
            .await
            .map_err(|e| remote("tavily_search", e.to_string()))?;
        let response = check_status("tavily_search", response).await?;
        let parsed: TavilyResponse = response
            .json()
            .await
            .map_err(|e| remote("tavily_search", format!("invalid response: {e}")))?;
        Ok(parsed.results)
    }
}

/// Firecrawl scrape API client.
pub struct FirecrawlClient {
    base_url: String,
    api_key: String,
    client: reqwest::Client,
}

impl FirecrawlClient {
    pub fn new(base_url: &str, api_key: impl Into<String>, timeout: Duration) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            client: http_client(timeout),
        }
    }
}

#[derive(Deserialize)]
struct FirecrawlResponse {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    data: Option<FirecrawlData>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Deserialize)]
struct FirecrawlData {
    #[serde(default)]
    markdown: String,
    #[serde(default)]
    metadata: Option<FirecrawlMetadata>,
}

#[derive(Deserialize)]
struct FirecrawlMetadata {
    #[serde(default)]
    title: Option<String>,
}

#[async_trait]
impl CrawlBackend for FirecrawlClient {
    async fn crawl(&self, url: &str) -> Result<CrawledPage, ToolError> {
        debug!(%url, "Firecrawl scrape");
        let response = self
            .client
            .post(format!("{}/v1/scrape", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&serde_json::json!({ "url": url, "formats": ["markdown"] }))
            .send()
            .await
            .map_err(|e| remote("firecrawl_scrape", e.to_string()))?;
        let response = check_status("firecrawl_scrape", response).await?;
        let parsed: FirecrawlResponse = response
            .json()
            .await
            .map_err(|e| remote("firecrawl_scrape", format!("invalid response: {e}")))?;

        match (parsed.success, parsed.data) {
            (true, Some(data)) => Ok(CrawledPage {
                url: url.to_string(),
                title: data.metadata.and_then(|m| m.title),
                markdown: data.markdown,
            }),
            _ => Err(remote(
                "firecrawl_scrape",
                parsed.error.unwrap_or_else(|| "scrape returned no content".into()),
            )),
        }
    }
}
