//! `search_dental_literature`: the evidence tool behind cited answers.
//!
//! Results come back as [`CitationDraft`]s. Numbering happens later, when
//! the reasoning loop admits the drafts to the conversation's ledger.

use crate::search::{SearchBackend, SearchHit, SearchQuery};
use async_trait::async_trait;
use chrono::Datelike;
use nexagent_core::auth::AuthContext;
use nexagent_core::citation::CitationDraft;
use nexagent_core::error::ToolError;
use nexagent_core::schema::{ArgKind, ArgumentSchema};
use nexagent_core::tool::{Tool, ToolResult};
use std::sync::Arc;

const QUERY_PREFIX: &str = "dental dentistry";
const MAX_RESULTS: u32 = 5;
const STRIPPED_SUFFIXES: [&str; 5] = [".com", ".org", ".gov", ".edu", ".net"];

pub struct DentalLiteratureTool {
    backend: Arc<dyn SearchBackend>,
    credential: String,
}

impl DentalLiteratureTool {
    pub fn new(backend: Arc<dyn SearchBackend>, credential: impl Into<String>) -> Self {
        Self {
            backend,
            credential: credential.into(),
        }
    }
}

/// `https://www.ada.org/x` → `Ada`.
pub fn publication_from_url(url: &str) -> String {
    let Some(host) = reqwest::Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_string))
    else {
        return "Web Source".into();
    };
    let mut name = host.strip_prefix("www.").unwrap_or(&host).to_string();
    for suffix in STRIPPED_SUFFIXES {
        if let Some(stripped) = name.strip_suffix(suffix) {
            name = stripped.to_string();
            break;
        }
    }
    title_case(&name)
}

/// Upper-case the first letter of each alphabetic run.
fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut at_word_start = true;
    for c in s.chars() {
        if c.is_alphabetic() {
            if at_word_start {
                out.extend(c.to_uppercase());
            } else {
                out.extend(c.to_lowercase());
            }
            at_word_start = false;
        } else {
            out.push(c);
            at_word_start = true;
        }
    }
    out
}

/// Year of a published date in any of the formats search APIs return.
pub fn year_from_date(date: &str) -> Option<i32> {
    let date = date.trim();
    if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(date) {
        return Some(dt.year());
    }
    if let Ok(dt) = chrono::DateTime::parse_from_rfc2822(date) {
        return Some(dt.year());
    }
    if let Ok(d) = chrono::NaiveDate::parse_from_str(date, "%Y-%m-%d") {
        return Some(d.year());
    }
    date.get(..4)
        .filter(|y| y.chars().all(|c| c.is_ascii_digit()))
        .and_then(|y| y.parse().ok())
}

fn draft_from_hit(hit: &SearchHit) -> CitationDraft {
    CitationDraft {
        title: if hit.title.trim().is_empty() {
            "Untitled".into()
        } else {
            hit.title.clone()
        },
        publication: publication_from_url(&hit.url),
        year: hit.published_date.as_deref().and_then(year_from_date),
        url: hit.url.clone(),
    }
}

#[async_trait]
impl Tool for DentalLiteratureTool {
    fn name(&self) -> &str {
        "search_dental_literature"
    }

    fn description(&self) -> &str {
        "Search dental literature and return citable sources. Use it before giving clinical \
         information such as treatment recommendations, dosages or guidelines, and cite the \
         returned markers in the answer."
    }

    fn argument_schema(&self) -> ArgumentSchema {
        ArgumentSchema::new().required(
            "query",
            ArgKind::String,
            "The dental topic or question to search for",
        )
    }

    fn required_credential(&self) -> Option<&str> {
        Some(&self.credential)
    }

    fn is_evidence(&self) -> bool {
        true
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

        let search = SearchQuery::new(format!("{QUERY_PREFIX} {}", query.trim()), MAX_RESULTS);
        let hits = self.backend.search(&search).await?;
        let drafts: Vec<CitationDraft> = hits.iter().map(draft_from_hit).collect();

        if drafts.is_empty() {
            return Ok(ToolResult::success(format!(
                "No literature found for '{query}'."
            )));
        }

        let output = drafts
            .iter()
            .map(|d| format!("- {} ({}) {}", d.title, d.publication, d.url))
            .collect::<Vec<_>>()
            .join("\n");
        Ok(ToolResult::success(output).with_citations(drafts))
    }
}
