//! Citations produced by evidence tools.
//!
//! Evidence tools return [`CitationDraft`]s. Only the [`CitationLedger`]
//! turns drafts into [`Citation`]s, so ids and markers are unique within a
//! conversation and increase in creation order.

use serde::{Deserialize, Serialize};

/// An evidence reference before it has been numbered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CitationDraft {
    pub title: String,
    pub publication: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<i32>,
    pub url: String,
}

/// A numbered evidence reference, cited as `marker` in the answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Citation {
    /// `cite-N`
    pub id: String,
    /// `[N]`
    pub marker: String,
    pub title: String,
    pub publication: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<i32>,
    pub url: String,
}

impl Citation {
    /// One-line rendering used in tool output shown to the model.
    pub fn render(&self) -> String {
        match self.year {
            Some(year) => format!(
                "{} {} — {} ({}) {}",
                self.marker, self.title, self.publication, year, self.url
            ),
            None => format!(
                "{} {} — {} {}",
                self.marker, self.title, self.publication, self.url
            ),
        }
    }
}

/// Conversation-scoped citation registry.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CitationLedger {
    citations: Vec<Citation>,
}

impl CitationLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number drafts and record them.
    ///
    /// A draft whose URL is already recorded reuses the existing citation
    /// instead of minting a second marker for the same source.
    pub fn admit(&mut self, drafts: Vec<CitationDraft>) -> Vec<Citation> {
        let mut admitted = Vec::with_capacity(drafts.len());
        for draft in drafts {
            if let Some(existing) = self
                .citations
                .iter()
                .find(|c| !draft.url.is_empty() && c.url == draft.url)
            {
                admitted.push(existing.clone());
                continue;
            }
            let n = self.citations.len() + 1;
            let citation = Citation {
                id: format!("cite-{n}"),
                marker: format!("[{n}]"),
                title: draft.title,
                publication: draft.publication,
                year: draft.year,
                url: draft.url,
            };
            self.citations.push(citation.clone());
            admitted.push(citation);
        }
        admitted
    }

    pub fn len(&self) -> usize {
        self.citations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.citations.is_empty()
    }

    pub fn citations(&self) -> &[Citation] {
        &self.citations
    }

    /// Whether `text` references at least one recorded marker.
    pub fn is_referenced_in(&self, text: &str) -> bool {
        self.citations.iter().any(|c| text.contains(&c.marker))
    }
}
