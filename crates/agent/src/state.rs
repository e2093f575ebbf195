//! Reasoning loop state.

use nexagent_core::citation::CitationLedger;
use nexagent_core::message::Conversation;
use serde::{Deserialize, Serialize};
use tracing::trace;

/// Where the loop is in its think → act → observe cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoopState {
    /// Waiting for the model's next decision.
    Reasoning,
    /// The model asked for one or more tool calls.
    Dispatching,
    /// Tool adapters are executing.
    AwaitingResults,
    /// The model proposed a final answer; the guard is evaluating it.
    Guarding,
    /// Answer accepted.
    Terminated,
    Failed,
}

impl LoopState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Reasoning => "reasoning",
            Self::Dispatching => "dispatching",
            Self::AwaitingResults => "awaiting_results",
            Self::Guarding => "guarding",
            Self::Terminated => "terminated",
            Self::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Terminated | Self::Failed)
    }
}

impl std::fmt::Display for LoopState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Working state of one run. Owned by the loop and dropped at request end.
#[derive(Debug)]
pub struct AgentState {
    pub conversation: Conversation,
    pub ledger: CitationLedger,
    /// Model turns taken so far.
    pub iteration: u32,
    pub max_iterations: u32,
    /// Guard rejections issued in this run.
    pub rejections: u32,
    state: LoopState,
}

impl AgentState {
    pub fn new(conversation: Conversation, max_iterations: u32) -> Self {
        Self {
            conversation,
            ledger: CitationLedger::new(),
            iteration: 0,
            max_iterations,
            rejections: 0,
            state: LoopState::Reasoning,
        }
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    /// Move to `next`. Terminal states are final.
    pub fn transition(&mut self, next: LoopState) {
        debug_assert!(
            !self.state.is_terminal(),
            "transition out of terminal state {}",
            self.state
        );
        trace!(from = %self.state, to = %next, iteration = self.iteration, "Loop transition");
        self.state = next;
    }

    /// Whether another model turn would exceed the budget.
    pub fn budget_exhausted(&self) -> bool {
        self.iteration >= self.max_iterations
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn budget_accounting() {
        let mut state = AgentState::new(Conversation::new(), 2);
        assert_eq!(state.state(), LoopState::Reasoning);
        assert!(!state.budget_exhausted());

        state.iteration = 2;
        assert!(state.budget_exhausted());
    }

    #[test]
    fn terminal_states() {
        let mut state = AgentState::new(Conversation::new(), 1);
        state.transition(LoopState::Guarding);
        assert!(!state.state().is_terminal());
        state.transition(LoopState::Terminated);
        assert!(state.state().is_terminal());
        assert_eq!(LoopState::AwaitingResults.to_string(), "awaiting_results");
    }
}
