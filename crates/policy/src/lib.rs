//! Answer policies for nexagent.
//!
//! Guards run at loop termination only. They never see tool calls and
//! never touch the conversation; the reasoning loop appends the corrective
//! instruction a rejection carries and enforces the rejection budget.
//!
//! ```text
//! candidate answer ──▶ AnswerGuard::evaluate ──▶ Verdict
//!                                                 │
//!                              Accept ◀───────────┴──────────▶ Reject { correction }
//!                           (Terminated)                    (back to Reasoning)
//! ```

mod guard;
mod log;

pub use guard::{AcceptAll, AnswerGuard, EvidenceRequired, GuardContext, Verdict};
pub use log::{GuardLog, GuardLogEntry};

use nexagent_config::GuardKind;
use std::sync::Arc;

/// The guard configured by `guard = "..."` on an assistant.
pub fn guard_for(kind: GuardKind) -> Arc<dyn AnswerGuard> {
    match kind {
        GuardKind::AcceptAll => Arc::new(AcceptAll),
        GuardKind::EvidenceRequired => Arc::new(EvidenceRequired::new()),
        GuardKind::EvidenceCited => Arc::new(EvidenceRequired::new().with_marker_check(true)),
    }
}
