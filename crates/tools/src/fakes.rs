//! In-memory backends for tool tests.

use crate::nexus::{GrepMatch, MemoryRecord, NexusClient, Skill};
use crate::sandbox::{Language, Sandbox, SandboxOutput};
use crate::search::{CrawlBackend, CrawledPage, SearchBackend, SearchHit, SearchQuery};
use async_trait::async_trait;
use nexagent_core::auth::AuthContext;
use nexagent_core::error::ToolError;
use std::collections::BTreeMap;
use std::sync::Mutex;

/// A Nexus server backed by a map of path → content.
#[derive(Default)]
pub struct MemoryNexus {
    pub files: Mutex<BTreeMap<String, String>>,
    pub memories: Vec<MemoryRecord>,
    pub skills: Vec<Skill>,
    /// Authorization headers seen, in call order.
    pub seen_auth: Mutex<Vec<Option<String>>>,
}

impl MemoryNexus {
    pub fn with_file(self, path: &str, content: &str) -> Self {
        self.files
            .lock()
            .unwrap()
            .insert(path.to_string(), content.to_string());
        self
    }
}

#[async_trait]
impl NexusClient for MemoryNexus {
    async fn call(
        &self,
        auth: &AuthContext,
        method: &str,
        params: serde_json::Value,
    ) -> Result<serde_json::Value, ToolError> {
        self.seen_auth
            .lock()
            .unwrap()
            .push(auth.authorization_header());
        let files = self.files.lock().unwrap().clone();
        let not_found = |path: &str| ToolError::Remote {
            operation: method.to_string(),
            reason: format!("no such file: {path}"),
        };
        match method {
            "read" => {
                let path = params["path"].as_str().unwrap_or_default();
                files
                    .get(path)
                    .map(|c| serde_json::json!(c))
                    .ok_or_else(|| not_found(path))
            }
            "write" => {
                let path = params["path"].as_str().unwrap_or_default().to_string();
                let content = params["content"].as_str().unwrap_or_default().to_string();
                let n = content.len();
                self.files.lock().unwrap().insert(path, content);
                Ok(serde_json::json!({ "bytes_written": n }))
            }
            "grep" => {
                let pattern = params["pattern"].as_str().unwrap_or_default();
                let ignore_case = params["ignore_case"].as_bool().unwrap_or(false);
                let mut matches = Vec::new();
                for (file, content) in &files {
                    for (i, line) in content.lines().enumerate() {
                        let hit = if ignore_case {
                            line.to_lowercase().contains(&pattern.to_lowercase())
                        } else {
                            line.contains(pattern)
                        };
                        if hit {
                            matches.push(GrepMatch {
                                file: file.clone(),
                                line: i as u64 + 1,
                                content: line.to_string(),
                            });
                        }
                    }
                }
                Ok(serde_json::json!({ "matches": matches }))
            }
            "glob" => {
                let suffix = params["pattern"]
                    .as_str()
                    .unwrap_or_default()
                    .trim_start_matches("**/")
                    .trim_start_matches('*')
                    .to_string();
                let found: Vec<&String> = files.keys().filter(|f| f.ends_with(&suffix)).collect();
                Ok(serde_json::json!(found))
            }
            "query_memories" => Ok(serde_json::json!({ "memories": self.memories })),
            "list_skills" => Ok(serde_json::json!({ "skills": self.skills })),
            other => Err(ToolError::Remote {
                operation: other.to_string(),
                reason: "unsupported".into(),
            }),
        }
    }

    fn server_url(&self) -> &str {
        "http://nexus.test"
    }
}

/// A sandbox that records what it was asked to run.
#[derive(Default)]
pub struct RecordingSandbox {
    pub runs: Mutex<Vec<(Language, String)>>,
    pub output: SandboxOutput,
    pub fail_with: Option<ToolError>,
}

#[async_trait]
impl Sandbox for RecordingSandbox {
    async fn run(
        &self,
        language: Language,
        source: &str,
        _auth: &AuthContext,
    ) -> Result<SandboxOutput, ToolError> {
        self.runs
            .lock()
            .unwrap()
            .push((language, source.to_string()));
        match &self.fail_with {
            Some(err) => Err(err.clone()),
            None => Ok(self.output.clone()),
        }
    }
}

/// A search backend returning canned hits and recording queries.
#[derive(Default)]
pub struct CannedSearch {
    pub hits: Vec<SearchHit>,
    pub queries: Mutex<Vec<SearchQuery>>,
}

#[async_trait]
impl SearchBackend for CannedSearch {
    async fn search(&self, query: &SearchQuery) -> Result<Vec<SearchHit>, ToolError> {
        self.queries.lock().unwrap().push(query.clone());
        Ok(self
            .hits
            .iter()
            .take(query.max_results as usize)
            .cloned()
            .collect())
    }
}

#[derive(Default)]
pub struct CannedCrawl;

#[async_trait]
impl CrawlBackend for CannedCrawl {
    async fn crawl(&self, url: &str) -> Result<CrawledPage, ToolError> {
        Ok(CrawledPage {
            url: url.to_string(),
            title: Some("Example".into()),
            markdown: "# Example\n\nBody text.".into(),
        })
    }
}
