//! Shared test helpers: scripted providers and in-memory tools.

use async_trait::async_trait;
use nexagent_core::auth::AuthContext;
use nexagent_core::citation::CitationDraft;
use nexagent_core::error::{ProviderError, ToolError};
use nexagent_core::message::{Message, MessageToolCall};
use nexagent_core::provider::{
    ModelSource, Provider, ProviderConfig, ProviderRequest, ProviderResponse, ThinkingConfig, Tier,
    Usage,
};
use nexagent_core::schema::{ArgKind, ArgumentSchema};
use nexagent_core::tool::{Tool, ToolResult};
use std::sync::Mutex;
use std::time::Duration;

/// A mock provider that returns a sequence of scripted responses.
///
/// Each call to `complete` returns the next response in the queue and
/// records the request. With `repeat_last`, the final response is returned
/// forever; otherwise running past the script panics.
pub struct SequentialMockProvider {
    responses: Vec<ProviderResponse>,
    repeat_last: bool,
    requests: Mutex<Vec<ProviderRequest>>,
}

impl SequentialMockProvider {
    pub fn new(responses: Vec<ProviderResponse>) -> Self {
        Self {
            responses,
            repeat_last: false,
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Keep returning `response` on every call.
    pub fn always(response: ProviderResponse) -> Self {
        Self {
            repeat_last: true,
            ..Self::new(vec![response])
        }
    }

    pub fn single_text(text: &str) -> Self {
        Self::new(vec![make_text_response(text)])
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    /// Every request the loop sent, in order.
    pub fn requests(&self) -> Vec<ProviderRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Provider for SequentialMockProvider {
    fn name(&self) -> &str {
        "sequential_mock"
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        let mut requests = self.requests.lock().unwrap();
        let n = requests.len();
        requests.push(request);

        let response = match self.responses.get(n) {
            Some(r) => r.clone(),
            None if self.repeat_last && !self.responses.is_empty() => {
                self.responses[self.responses.len() - 1].clone()
            }
            None => panic!(
                "SequentialMockProvider: no more responses (call #{n}, have {})",
                self.responses.len()
            ),
        };
        Ok(response)
    }
}

/// A provider that never answers; for cancellation tests.
pub struct HangingProvider;

#[async_trait]
impl Provider for HangingProvider {
    fn name(&self) -> &str {
        "hanging"
    }

    async fn complete(&self, _request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        tokio::time::sleep(Duration::from_secs(3600)).await;
        Err(ProviderError::Timeout("unreachable".into()))
    }
}

fn mock_usage() -> Option<Usage> {
    Some(Usage {
        prompt_tokens: 10,
        completion_tokens: 5,
        total_tokens: 15,
    })
}

/// Create a simple text response (no tool calls).
pub fn make_text_response(text: &str) -> ProviderResponse {
    ProviderResponse {
        message: Message::assistant(text),
        usage: mock_usage(),
        model: "mock-model".into(),
    }
}

/// Create a response with tool calls and optional thought content.
pub fn make_tool_call_response(tool_calls: Vec<MessageToolCall>, thought: &str) -> ProviderResponse {
    let mut msg = Message::assistant(thought);
    msg.tool_calls = tool_calls;
    ProviderResponse {
        message: msg,
        usage: mock_usage(),
        model: "mock-model".into(),
    }
}

pub fn make_tool_call(id: &str, name: &str, args: serde_json::Value) -> MessageToolCall {
    MessageToolCall {
        id: id.to_string(),
        name: name.to_string(),
        arguments: args.to_string(),
    }
}

pub fn provider_config() -> ProviderConfig {
    ProviderConfig {
        provider: "mock".into(),
        model: "mock-model".into(),
        tier: Tier::Flash,
        thinking: ThinkingConfig::default(),
        source: ModelSource::Explicit,
    }
}

/// Echoes `text`, optionally after a delay.
pub struct EchoTool {
    pub name: &'static str,
    pub delay: Duration,
}

impl EchoTool {
    pub fn named(name: &'static str) -> Self {
        Self {
            name,
            delay: Duration::ZERO,
        }
    }

    pub fn delayed(name: &'static str, millis: u64) -> Self {
        Self {
            name,
            delay: Duration::from_millis(millis),
        }
    }
}

#[async_trait]
impl Tool for EchoTool {
    fn name(&self) -> &str {
        self.name
    }

    fn description(&self) -> &str {
        "Echo the text argument"
    }

    fn argument_schema(&self) -> ArgumentSchema {
        ArgumentSchema::new().required("text", ArgKind::String, "Text to echo")
    }

    async fn execute(
        &self,
        arguments: serde_json::Value,
        _auth: &AuthContext,
    ) -> Result<ToolResult, ToolError> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        let text = arguments["text"].as_str().unwrap_or_default();
        Ok(ToolResult::success(format!("{}: {text}", self.name)))
    }
}

/// Reports the caller's credential back as output.
pub struct WhoAmITool;

#[async_trait]
impl Tool for WhoAmITool {
    fn name(&self) -> &str {
        "whoami"
    }

    fn description(&self) -> &str {
        "Report the caller identity"
    }

    fn argument_schema(&self) -> ArgumentSchema {
        ArgumentSchema::new()
    }

    async fn execute(
        &self,
        _arguments: serde_json::Value,
        auth: &AuthContext,
    ) -> Result<ToolResult, ToolError> {
        Ok(ToolResult::success(format!(
            "token={} header={}",
            auth.bearer_token().unwrap_or("none"),
            auth.authorization_header().unwrap_or_default()
        )))
    }
}

/// An evidence tool returning one fixed source.
pub struct FakeLiteratureTool;

#[async_trait]
impl Tool for FakeLiteratureTool {
    fn name(&self) -> &str {
        "search_dental_literature"
    }

    fn description(&self) -> &str {
        "Search dental literature"
    }

    fn argument_schema(&self) -> ArgumentSchema {
        ArgumentSchema::new().required("query", ArgKind::String, "Topic")
    }

    fn is_evidence(&self) -> bool {
        true
    }

    async fn execute(
        &self,
        _arguments: serde_json::Value,
        _auth: &AuthContext,
    ) -> Result<ToolResult, ToolError> {
        Ok(ToolResult::success("1 source found").with_citations(vec![CitationDraft {
            title: "Antibiotic use in dental infections".into(),
            publication: "Ada".into(),
            year: Some(2023),
            url: "https://www.ada.org/antibiotics".into(),
        }]))
    }
}

/// A Nexus server that only knows how to list skills.
pub struct SkillsNexus {
    skills: Vec<nexagent_tools::Skill>,
    fail: bool,
    tokens: Mutex<Vec<Option<String>>>,
}

impl SkillsNexus {
    pub fn new(skills: Vec<nexagent_tools::Skill>) -> Self {
        Self {
            skills,
            fail: false,
            tokens: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new(Vec::new())
        }
    }

    /// Bearer tokens seen, in call order.
    pub fn seen_tokens(&self) -> Vec<Option<String>> {
        self.tokens.lock().unwrap().clone()
    }
}

#[async_trait]
impl nexagent_tools::NexusClient for SkillsNexus {
    async fn call(
        &self,
        auth: &AuthContext,
        method: &str,
        _params: serde_json::Value,
    ) -> Result<serde_json::Value, ToolError> {
        self.tokens
            .lock()
            .unwrap()
            .push(auth.bearer_token().map(String::from));
        if self.fail {
            return Err(ToolError::Remote {
                operation: method.to_string(),
                reason: "connection refused".into(),
            });
        }
        Ok(serde_json::json!({ "skills": self.skills }))
    }

    fn server_url(&self) -> &str {
        "http://nexus.test"
    }
}
