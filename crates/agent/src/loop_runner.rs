//! The reasoning loop.
//!
//! One [`ReasoningLoop::run`] drives one request to completion:
//!
//! ```text
//! Reasoning ──(tool calls)──▶ Dispatching ──▶ AwaitingResults ──▶ Reasoning
//!     │
//!     └──(no tool calls)──▶ Guarding ──(accept)──▶ Terminated
//!                               └──(reject)──▶ Reasoning
//! ```
//!
//! Any state can move to `Failed` on budget exhaustion, repeated guard
//! rejection, a transport error or cancellation.

use crate::state::{AgentState, LoopState};
use crate::stream_event::AgentStreamEvent;
use chrono::Utc;
use nexagent_core::auth::AuthContext;
use nexagent_core::citation::{Citation, CitationDraft};
use nexagent_core::error::Error;
use nexagent_core::event::{DomainEvent, EventBus};
use nexagent_core::message::{Conversation, Message, MessageToolCall, Role};
use nexagent_core::provider::{Provider, ProviderConfig, ProviderRequest, Usage};
use nexagent_core::tool::{FailureKind, Tool, ToolCall, ToolRegistry, ToolResult};
use nexagent_policy::{AcceptAll, AnswerGuard, GuardContext, GuardLog, Verdict};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// `kind` of the instruction appended after a guard rejection.
pub const POLICY_CORRECTION: &str = "policy_correction";

/// A successful run.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub answer: String,
    pub conversation: Conversation,
    pub citations: Vec<Citation>,
    pub iterations: u32,
    pub provider: ProviderConfig,
    pub usage: Usage,
}

/// A failed run, with enough context to debug it.
#[derive(Debug, thiserror::Error)]
#[error("run failed in state {last_state} after {iterations} iteration(s): {error}")]
pub struct RunFailure {
    #[source]
    pub error: Error,
    pub last_state: LoopState,
    pub iterations: u32,
    pub conversation: Conversation,
}

/// Drives the think → act → observe cycle for one request at a time.
///
/// The loop holds only read-only collaborators and can serve any number of
/// concurrent runs; all per-run state lives in [`AgentState`].
pub struct ReasoningLoop {
    provider: Arc<dyn Provider>,
    config: ProviderConfig,
    tools: Arc<ToolRegistry>,
    guard: Arc<dyn AnswerGuard>,
    temperature: f32,
    max_tokens: Option<u32>,
    max_iterations: u32,
    max_policy_rejections: u32,
    events: EventBus,
    guard_log: Option<Arc<GuardLog>>,
    assistant_id: String,
}

impl ReasoningLoop {
    pub fn new(provider: Arc<dyn Provider>, config: ProviderConfig, tools: Arc<ToolRegistry>) -> Self {
        Self {
            provider,
            config,
            tools,
            guard: Arc::new(AcceptAll),
            temperature: 0.7,
            max_tokens: None,
            max_iterations: 25,
            max_policy_rejections: 2,
            events: EventBus::default(),
            guard_log: None,
            assistant_id: "react".into(),
        }
    }

    pub fn with_guard(mut self, guard: Arc<dyn AnswerGuard>) -> Self {
        self.guard = guard;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max: u32) -> Self {
        self.max_tokens = Some(max);
        self
    }

    /// Maximum model turns per run.
    pub fn with_max_iterations(mut self, max: u32) -> Self {
        self.max_iterations = max;
        self
    }

    /// Corrective retries granted before a rejection fails the run.
    pub fn with_max_policy_rejections(mut self, max: u32) -> Self {
        self.max_policy_rejections = max;
        self
    }

    pub fn with_event_bus(mut self, events: EventBus) -> Self {
        self.events = events;
        self
    }

    pub fn with_guard_log(mut self, log: Arc<GuardLog>) -> Self {
        self.guard_log = Some(log);
        self
    }

    pub fn with_assistant_id(mut self, id: impl Into<String>) -> Self {
        self.assistant_id = id.into();
        self
    }

    /// Run the loop over a seeded conversation.
    ///
    /// `auth` reaches tool adapters through dispatch and nothing else.
    /// When `cancel` fires, the in-flight model call or tool batch is
    /// dropped and the run fails with [`Error::Cancelled`].
    pub async fn run(
        &self,
        conversation: Conversation,
        auth: &AuthContext,
        cancel: &CancellationToken,
        stream: Option<&mpsc::Sender<AgentStreamEvent>>,
    ) -> Result<RunOutcome, RunFailure> {
        let mut state = AgentState::new(conversation, self.max_iterations);
        let mut usage = Usage::default();
        let schemas = self.tools.list_schemas();
        let evidence_tools = self.evidence_tools();

        info!(
            conversation_id = %state.conversation.id,
            assistant = %self.assistant_id,
            provider = %self.config.provider,
            model = %self.config.model,
            caller = %auth.fingerprint(),
            tools = schemas.len(),
            "Starting run"
        );

        loop {
            if state.budget_exhausted() {
                warn!(
                    conversation_id = %state.conversation.id,
                    limit = self.max_iterations,
                    "Iteration budget exhausted"
                );
                let limit = self.max_iterations;
                return Err(self
                    .fail(state, Error::IterationBudgetExceeded { limit }, stream)
                    .await);
            }

            let request = ProviderRequest {
                model: self.config.model.clone(),
                messages: state.conversation.messages().to_vec(),
                temperature: self.temperature,
                max_tokens: self.max_tokens,
                tools: schemas.clone(),
                thinking: self.config.thinking,
            };

            let response = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    return Err(self.fail(state, Error::Cancelled, stream).await);
                }
                response = self.provider.complete(request) => response,
            };
            let response = match response {
                Ok(response) => response,
                Err(e) => return Err(self.fail(state, Error::Provider(e), stream).await),
            };

            state.iteration += 1;
            if let Some(u) = &response.usage {
                usage.add(u);
            }
            let mut message = response.message;
            message.role = Role::Assistant;

            debug!(
                conversation_id = %state.conversation.id,
                iteration = state.iteration,
                tool_calls = message.tool_calls.len(),
                "Model turn"
            );
            self.events.publish(DomainEvent::ResponseGenerated {
                conversation_id: state.conversation.id.to_string(),
                model: response.model.clone(),
                iteration: state.iteration,
                tool_calls: message.tool_calls.len(),
                tokens_used: response.usage.map(|u| u.total_tokens).unwrap_or(0),
                timestamp: Utc::now(),
            });

            if message.tool_calls.is_empty() {
                state.transition(LoopState::Guarding);
                let verdict = {
                    let names: Vec<&str> = evidence_tools.iter().map(String::as_str).collect();
                    let ctx = GuardContext {
                        ledger: &state.ledger,
                        rejections: state.rejections,
                        evidence_tools: &names,
                    };
                    self.guard.evaluate(&message, &ctx)
                };
                if let Some(log) = &self.guard_log {
                    log.record(
                        &state.conversation.id.to_string(),
                        self.guard.name(),
                        &verdict,
                        state.rejections,
                    );
                }

                match verdict {
                    Verdict::Accept => {
                        let answer = message.content.clone();
                        state.conversation.push(message);
                        state.transition(LoopState::Terminated);
                        return Ok(self.finish(state, answer, usage, stream).await);
                    }
                    Verdict::Reject { reason, correction } => {
                        state.rejections += 1;
                        let rejections = state.rejections;
                        state.conversation.push(message);

                        warn!(
                            conversation_id = %state.conversation.id,
                            guard = self.guard.name(),
                            %reason,
                            rejections,
                            "Answer rejected"
                        );
                        self.events.publish(DomainEvent::PolicyRejected {
                            conversation_id: state.conversation.id.to_string(),
                            guard: self.guard.name().to_string(),
                            rejections,
                            timestamp: Utc::now(),
                        });
                        emit(
                            stream,
                            AgentStreamEvent::PolicyRejected {
                                guard: self.guard.name().to_string(),
                                reason,
                                rejections,
                            },
                        )
                        .await;

                        if rejections > self.max_policy_rejections {
                            return Err(self
                                .fail(state, Error::PolicyUnsatisfiable { rejections }, stream)
                                .await);
                        }
                        state
                            .conversation
                            .push(Message::correction(POLICY_CORRECTION, correction));
                        state.transition(LoopState::Reasoning);
                        continue;
                    }
                }
            }

            state.transition(LoopState::Dispatching);
            rekey_call_ids(&state.conversation, &mut message.tool_calls);
            if !message.content.trim().is_empty() {
                emit(
                    stream,
                    AgentStreamEvent::Thought {
                        content: message.content.clone(),
                    },
                )
                .await;
            }
            let issued = message.tool_calls.clone();
            state.conversation.push(message);

            let decoded: Vec<Result<ToolCall, ToolResult>> = issued.iter().map(parse_call).collect();
            let runnable: Vec<ToolCall> = decoded
                .iter()
                .filter_map(|p| p.as_ref().ok().cloned())
                .collect();
            for call in &runnable {
                emit(
                    stream,
                    AgentStreamEvent::ToolCall {
                        id: call.id.clone(),
                        name: call.name.clone(),
                        input: call.arguments.clone(),
                    },
                )
                .await;
            }

            state.transition(LoopState::AwaitingResults);
            let dispatched = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    return Err(self.fail(state, Error::Cancelled, stream).await);
                }
                results = self.tools.dispatch_all(&runnable, auth) => results,
            };

            let mut dispatched = dispatched.into_iter();
            for (call, decoded) in issued.iter().zip(decoded) {
                let result = match decoded {
                    Err(failure) => failure,
                    Ok(tool_call) => match dispatched.next() {
                        Some(Ok(result)) => result,
                        Some(Err(e)) => self.corrective_result(&tool_call, &e),
                        None => ToolResult::failure(
                            FailureKind::ExecutionFailed,
                            "Error: the call was not dispatched",
                        )
                        .for_call(&tool_call.id),
                    },
                };
                self.record_result(&mut state, call, result, auth, stream)
                    .await;
            }
            state.transition(LoopState::Reasoning);
        }
    }

    fn evidence_tools(&self) -> Vec<String> {
        self.tools
            .names()
            .into_iter()
            .filter(|name| self.is_evidence(name))
            .map(str::to_string)
            .collect()
    }

    fn is_evidence(&self, name: &str) -> bool {
        self.tools.get(name).is_some_and(|t| t.is_evidence())
    }

    /// Turn a model mistake into data the model can correct.
    fn corrective_result(&self, call: &ToolCall, err: &Error) -> ToolResult {
        let result = match err {
            Error::UnknownTool(name) => {
                let available = self.tools.names();
                let available = if available.is_empty() {
                    "(none)".to_string()
                } else {
                    available.join(", ")
                };
                ToolResult::failure(
                    FailureKind::UnknownTool,
                    format!(
                        "Error: unknown tool '{name}'. Available tools: {available}. \
                         Call one of the available tools instead."
                    ),
                )
            }
            Error::InvalidToolArguments { tool, reason } => {
                let expected = self
                    .tools
                    .get(tool)
                    .map(|t| t.argument_schema().to_json_schema().to_string())
                    .unwrap_or_default();
                ToolResult::failure(
                    FailureKind::InvalidArguments,
                    format!(
                        "Error: invalid arguments for '{tool}': {reason}. \
                         Expected parameters: {expected}. Fix the arguments and call the tool again."
                    ),
                )
            }
            other => ToolResult::failure(FailureKind::ExecutionFailed, format!("Error: {other}")),
        };
        result.for_call(&call.id)
    }

    /// Append one tool result as a `tool` message.
    async fn record_result(
        &self,
        state: &mut AgentState,
        call: &MessageToolCall,
        result: ToolResult,
        auth: &AuthContext,
        stream: Option<&mpsc::Sender<AgentStreamEvent>>,
    ) {
        let success = result.is_success();
        let mut output = result.output;

        if success && !result.citations.is_empty() && self.is_evidence(&call.name) {
            let drafts = result
                .citations
                .into_iter()
                .map(|draft| CitationDraft {
                    title: auth.scrub(&draft.title),
                    publication: auth.scrub(&draft.publication),
                    url: auth.scrub(&draft.url),
                    ..draft
                })
                .collect();
            let before = state.ledger.len();
            let admitted = state.ledger.admit(drafts);
            for citation in &state.ledger.citations()[before..] {
                emit(
                    stream,
                    AgentStreamEvent::Citation {
                        citation: citation.clone(),
                    },
                )
                .await;
            }
            output = render_sources(&admitted);
            debug!(
                conversation_id = %state.conversation.id,
                admitted = admitted.len(),
                total = state.ledger.len(),
                "Citations recorded"
            );
        }

        let output = auth.scrub(&output);
        self.events.publish(DomainEvent::ToolExecuted {
            conversation_id: state.conversation.id.to_string(),
            tool_name: call.name.clone(),
            success,
            duration_ms: result.duration_ms,
            timestamp: Utc::now(),
        });
        emit(
            stream,
            AgentStreamEvent::ToolResult {
                id: call.id.clone(),
                name: call.name.clone(),
                output: output.clone(),
                success,
                duration_ms: result.duration_ms,
            },
        )
        .await;

        state.conversation.push(
            Message::tool_result(&call.id, output)
                .with_metadata("tool_name", serde_json::Value::String(call.name.clone())),
        );
    }

    async fn finish(
        &self,
        state: AgentState,
        answer: String,
        usage: Usage,
        stream: Option<&mpsc::Sender<AgentStreamEvent>>,
    ) -> RunOutcome {
        let citations = state.ledger.citations().to_vec();
        info!(
            conversation_id = %state.conversation.id,
            iterations = state.iteration,
            citations = citations.len(),
            tokens = usage.total_tokens,
            "Run finished"
        );
        self.events.publish(DomainEvent::RunFinished {
            conversation_id: state.conversation.id.to_string(),
            assistant_id: self.assistant_id.clone(),
            outcome: LoopState::Terminated.to_string(),
            iterations: state.iteration,
            timestamp: Utc::now(),
        });
        emit(
            stream,
            AgentStreamEvent::Answer {
                content: answer.clone(),
                citations: citations.clone(),
            },
        )
        .await;
        emit(
            stream,
            AgentStreamEvent::Done {
                conversation_id: state.conversation.id.to_string(),
                iterations: state.iteration,
                provider: self.config.provider.clone(),
                model: self.config.model.clone(),
                usage: Some(usage),
            },
        )
        .await;

        RunOutcome {
            answer,
            conversation: state.conversation,
            citations,
            iterations: state.iteration,
            provider: self.config.clone(),
            usage,
        }
    }

    async fn fail(
        &self,
        mut state: AgentState,
        error: Error,
        stream: Option<&mpsc::Sender<AgentStreamEvent>>,
    ) -> RunFailure {
        let last_state = state.state();
        state.transition(LoopState::Failed);
        warn!(
            conversation_id = %state.conversation.id,
            kind = error.kind(),
            state = %last_state,
            iterations = state.iteration,
            "Run failed: {error}"
        );
        self.events.publish(DomainEvent::RunFinished {
            conversation_id: state.conversation.id.to_string(),
            assistant_id: self.assistant_id.clone(),
            outcome: error.kind().to_string(),
            iterations: state.iteration,
            timestamp: Utc::now(),
        });
        emit(
            stream,
            AgentStreamEvent::Error {
                message: error.to_string(),
                kind: error.kind().to_string(),
                state: last_state.to_string(),
                iterations: state.iteration,
            },
        )
        .await;

        RunFailure {
            error,
            last_state,
            iterations: state.iteration,
            conversation: state.conversation,
        }
    }
}

async fn emit(stream: Option<&mpsc::Sender<AgentStreamEvent>>, event: AgentStreamEvent) {
    if let Some(tx) = stream {
        // A closed receiver means the client went away; cancellation handles that.
        let _ = tx.send(event).await;
    }
}

/// Give every call an id not yet used in the conversation.
fn rekey_call_ids(conversation: &Conversation, calls: &mut [MessageToolCall]) {
    let mut seen: HashSet<String> = conversation
        .issued_call_ids()
        .into_iter()
        .map(str::to_string)
        .collect();
    for call in calls.iter_mut() {
        if call.id.trim().is_empty() || !seen.insert(call.id.clone()) {
            let fresh = format!("call_{}", uuid::Uuid::new_v4().simple());
            debug!(old = %call.id, new = %fresh, "Re-keyed tool call id");
            call.id = fresh;
            seen.insert(call.id.clone());
        }
    }
}

/// Decode the model's argument string.
fn parse_call(call: &MessageToolCall) -> Result<ToolCall, ToolResult> {
    let raw = call.arguments.trim();
    let arguments = if raw.is_empty() {
        Ok(serde_json::json!({}))
    } else {
        serde_json::from_str(raw)
    };
    match arguments {
        Ok(arguments) => Ok(ToolCall::new(&call.id, &call.name, arguments)),
        Err(e) => Err(ToolResult::failure(
            FailureKind::InvalidArguments,
            format!(
                "Error: arguments for '{}' are not valid JSON ({e}). \
                 Send a JSON object and call the tool again.",
                call.name
            ),
        )
        .for_call(&call.id)),
    }
}

fn render_sources(citations: &[Citation]) -> String {
    let mut out = String::from("Sources (cite them by marker):\n");
    for c in citations {
        out.push_str(&c.render());
        out.push('\n');
    }
    out.trim_end().to_string()
}
