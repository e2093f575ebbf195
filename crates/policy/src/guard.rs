//! Answer guards.
//!
//! A guard sees a candidate final answer when the reasoning loop reaches
//! `Guarding` and either accepts it or rejects it with a corrective
//! instruction. The loop owns the rejection budget; guards are stateless.

use nexagent_core::citation::CitationLedger;
use nexagent_core::message::Message;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// What a guard knows about the request when evaluating an answer.
#[derive(Debug, Clone, Copy)]
pub struct GuardContext<'a> {
    /// Citations recorded so far in this conversation.
    pub ledger: &'a CitationLedger,
    /// Rejections already issued for this request.
    pub rejections: u32,
    /// Names of the evidence tools available to the model.
    pub evidence_tools: &'a [&'a str],
}

impl<'a> GuardContext<'a> {
    pub fn new(ledger: &'a CitationLedger) -> Self {
        Self {
            ledger,
            rejections: 0,
            evidence_tools: &[],
        }
    }
}

/// The outcome of evaluating a candidate answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "verdict", rename_all = "snake_case")]
pub enum Verdict {
    Accept,
    Reject {
        /// Short machine-oriented reason, logged and reported.
        reason: String,
        /// Instruction appended to the conversation for the next turn.
        correction: String,
    },
}

impl Verdict {
    pub fn reject(reason: impl Into<String>, correction: impl Into<String>) -> Self {
        Self::Reject {
            reason: reason.into(),
            correction: correction.into(),
        }
    }

    pub fn is_accept(&self) -> bool {
        matches!(self, Self::Accept)
    }
}

/// A predicate over candidate final answers.
pub trait AnswerGuard: Send + Sync {
    fn name(&self) -> &str;

    fn evaluate(&self, candidate: &Message, ctx: &GuardContext<'_>) -> Verdict;

    /// Whether an answer can only pass after an evidence tool has run.
    fn requires_evidence(&self) -> bool {
        false
    }
}

/// Accepts every answer.
#[derive(Debug, Clone, Copy, Default)]
pub struct AcceptAll;

impl AnswerGuard for AcceptAll {
    fn name(&self) -> &str {
        "accept_all"
    }

    fn evaluate(&self, _candidate: &Message, _ctx: &GuardContext<'_>) -> Verdict {
        Verdict::Accept
    }
}

/// Rejects answers given before any evidence has been cited.
#[derive(Debug, Clone, Copy, Default)]
pub struct EvidenceRequired {
    marker_check: bool,
}

impl EvidenceRequired {
    pub fn new() -> Self {
        Self::default()
    }

    /// Also require the answer to cite at least one recorded marker.
    pub fn with_marker_check(mut self, enabled: bool) -> Self {
        self.marker_check = enabled;
        self
    }

    /// Only tools the model was shown are ever named.
    fn tool_list(ctx: &GuardContext<'_>) -> String {
        if ctx.evidence_tools.is_empty() {
            "an evidence search tool".to_string()
        } else {
            ctx.evidence_tools
                .iter()
                .map(|t| format!("`{t}`"))
                .collect::<Vec<_>>()
                .join(" or ")
        }
    }
}

impl AnswerGuard for EvidenceRequired {
    fn name(&self) -> &str {
        if self.marker_check {
            "evidence_cited"
        } else {
            "evidence_required"
        }
    }

    fn requires_evidence(&self) -> bool {
        true
    }

    fn evaluate(&self, candidate: &Message, ctx: &GuardContext<'_>) -> Verdict {
        if ctx.ledger.is_empty() {
            debug!(rejections = ctx.rejections, "Answer rejected: no citations recorded");
            return Verdict::reject(
                "no_citations",
                format!(
                    "Your answer was not accepted because it is not backed by evidence. \
                     Call {} to retrieve sources for this question, then answer again \
                     and cite the sources by their markers (for example [1]).",
                    Self::tool_list(ctx)
                ),
            );
        }

        if self.marker_check && !ctx.ledger.is_referenced_in(&candidate.content) {
            let markers = ctx
                .ledger
                .citations()
                .iter()
                .map(|c| c.marker.as_str())
                .collect::<Vec<_>>()
                .join(", ");
            debug!(rejections = ctx.rejections, "Answer rejected: no marker referenced");
            return Verdict::reject(
                "citations_not_referenced",
                format!(
                    "Your answer does not reference any of the retrieved sources. \
                     Rewrite it and cite the supporting sources inline using their \
                     markers: {markers}."
                ),
            );
        }

        Verdict::Accept
    }
}
