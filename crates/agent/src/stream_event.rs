//! Agent-level streaming events.
//!
//! The reasoning loop emits these while it runs; the gateway forwards them
//! to clients over SSE.

use nexagent_core::citation::Citation;
use nexagent_core::provider::Usage;
use serde::{Deserialize, Serialize};

/// Events emitted during a run.
///
/// - `thought`: text the model produced alongside tool calls
/// - `tool_call`: a tool is about to be dispatched
/// - `tool_result`: a tool finished
/// - `citation`: evidence was recorded in the ledger
/// - `policy_rejected`: the guard sent the model back to reasoning
/// - `answer`: the accepted final answer
/// - `done`: the run finished successfully
/// - `error`: the run failed
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AgentStreamEvent {
    Thought {
        content: String,
    },

    ToolCall {
        id: String,
        name: String,
        input: serde_json::Value,
    },

    ToolResult {
        id: String,
        name: String,
        output: String,
        success: bool,
        duration_ms: u64,
    },

    Citation {
        citation: Citation,
    },

    PolicyRejected {
        guard: String,
        reason: String,
        rejections: u32,
    },

    Answer {
        content: String,
        citations: Vec<Citation>,
    },

    Done {
        conversation_id: String,
        iterations: u32,
        provider: String,
        model: String,
        usage: Option<Usage>,
    },

    Error {
        message: String,
        kind: String,
        state: String,
        iterations: u32,
    },
}

impl AgentStreamEvent {
    /// SSE event name for this event type.
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::Thought { .. } => "thought",
            Self::ToolCall { .. } => "tool_call",
            Self::ToolResult { .. } => "tool_result",
            Self::Citation { .. } => "citation",
            Self::PolicyRejected { .. } => "policy_rejected",
            Self::Answer { .. } => "answer",
            Self::Done { .. } => "done",
            Self::Error { .. } => "error",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done { .. } | Self::Error { .. })
    }
}
