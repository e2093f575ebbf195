//! The reasoning loop for nexagent.
//!
//! The loop follows a **think → act → observe** cycle:
//!
//! 1. **Seed** the conversation with the assistant's system prompt and the
//!    caller's messages
//! 2. **Ask the model** for its next decision, advertising the assistant's tools
//! 3. **If tool calls**: dispatch them concurrently with the caller's
//!    credential, append one result per call in issue order, go back to 2
//! 4. **If text**: run the answer guard; accept and finish, or append the
//!    guard's correction and go back to 2
//!
//! The loop stops on an accepted answer, an exhausted iteration budget,
//! too many guard rejections, a transport error or cancellation.

pub mod assistant;
pub mod loop_runner;
pub mod prompt;
pub mod runtime;
pub mod state;
pub mod stream_event;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use assistant::{AssistantCatalog, AssistantSpec, AssistantSummary};
pub use loop_runner::{POLICY_CORRECTION, ReasoningLoop, RunFailure, RunOutcome};
pub use prompt::PromptRole;
pub use runtime::{AgentRuntime, LoopSettings};
pub use state::{AgentState, LoopState};
pub use stream_event::AgentStreamEvent;
