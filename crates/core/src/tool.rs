//! Tool trait, the abstraction over agent capabilities.
//!
//! Tools are what give the agent the ability to act in the world:
//! search the remote filesystem, run code in a sandbox, search the web, etc.
//!
//! The [`ToolRegistry`] is built once per process from a [`Credentials`]
//! snapshot. Optional tools whose credential is absent are never registered,
//! so the model never sees their schema and cannot dispatch them.

use crate::auth::AuthContext;
use crate::citation::CitationDraft;
use crate::error::{Error, Result, ToolError};
use crate::provider::ToolDefinition;
use crate::schema::ArgumentSchema;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// A request to execute a tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Unique call ID (matches the LLM's tool_call.id)
    pub id: String,

    /// Name of the tool to execute
    pub name: String,

    /// Arguments as a JSON value
    pub arguments: serde_json::Value,
}

impl ToolCall {
    pub fn new(id: impl Into<String>, name: impl Into<String>, arguments: serde_json::Value) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            arguments,
        }
    }
}

/// Why a tool call did not succeed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    SandboxTimeout,
    ExecutionFailed,
    PermissionDenied,
    Remote,
    UnknownTool,
    InvalidArguments,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "kind", rename_all = "snake_case")]
pub enum ToolOutcome {
    Success,
    Failure(FailureKind),
}

/// The result of a tool execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResult {
    /// The call ID this result is for
    pub call_id: String,

    pub outcome: ToolOutcome,

    /// The output content
    pub output: String,

    /// Optional structured data
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,

    /// Evidence returned by evidence tools, not yet numbered
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub citations: Vec<CitationDraft>,

    /// Wall-clock time spent in the adapter
    #[serde(default)]
    pub duration_ms: u64,
}

impl ToolResult {
    /// A successful result. The registry fills in `call_id` and `duration_ms`.
    pub fn success(output: impl Into<String>) -> Self {
        Self {
            call_id: String::new(),
            outcome: ToolOutcome::Success,
            output: output.into(),
            data: None,
            citations: Vec::new(),
            duration_ms: 0,
        }
    }

    pub fn failure(kind: FailureKind, output: impl Into<String>) -> Self {
        Self {
            outcome: ToolOutcome::Failure(kind),
            ..Self::success(output)
        }
    }

    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = Some(data);
        self
    }

    pub fn with_citations(mut self, drafts: Vec<CitationDraft>) -> Self {
        self.citations = drafts;
        self
    }

    pub fn for_call(mut self, call_id: impl Into<String>) -> Self {
        self.call_id = call_id.into();
        self
    }

    pub fn is_success(&self) -> bool {
        self.outcome == ToolOutcome::Success
    }

    /// Convert an adapter failure into data the model can read.
    pub fn from_error(err: &ToolError) -> Self {
        let kind = match err {
            ToolError::ExecutionFailed { .. } => FailureKind::ExecutionFailed,
            ToolError::Timeout { .. } => FailureKind::SandboxTimeout,
            ToolError::PermissionDenied { .. } => FailureKind::PermissionDenied,
            ToolError::Remote { .. } => FailureKind::Remote,
            ToolError::InvalidArguments(_) => FailureKind::InvalidArguments,
        };
        Self::failure(kind, format!("Error: {err}"))
    }
}

/// The core Tool trait.
///
/// Each tool (read_file, bash, web_search, etc.) implements this trait.
/// The caller's [`AuthContext`] is passed explicitly on every call; tools
/// must not stash it anywhere.
#[async_trait]
pub trait Tool: Send + Sync {
    /// The unique name of this tool (e.g., "read_file", "python").
    fn name(&self) -> &str;

    /// A description of what this tool does (sent to the LLM).
    fn description(&self) -> &str;

    /// Declared arguments, validated before `execute` is called.
    fn argument_schema(&self) -> ArgumentSchema;

    /// Credential key that must be present for this tool to be registered.
    fn required_credential(&self) -> Option<&str> {
        None
    }

    /// Whether successful results carry citation drafts.
    fn is_evidence(&self) -> bool {
        false
    }

    /// Execute the tool with validated arguments.
    async fn execute(
        &self,
        arguments: serde_json::Value,
        auth: &AuthContext,
    ) -> std::result::Result<ToolResult, ToolError>;

    /// Convert this tool into a ToolDefinition for sending to the LLM.
    fn to_definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: self.argument_schema().to_json_schema(),
        }
    }
}

/// Process-wide credential snapshot used for capability gating.
#[derive(Clone, Default)]
pub struct Credentials {
    values: HashMap<String, String>,
}

impl Credentials {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot the given environment variables. Empty values count as absent.
    pub fn from_env<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut creds = Self::new();
        for key in keys {
            if let Ok(value) = std::env::var(key.as_ref()) {
                creds = creds.with(key.as_ref(), value);
            }
        }
        creds
    }

    pub fn with(mut self, key: &str, value: impl Into<String>) -> Self {
        let value = value.into();
        if !value.trim().is_empty() {
            self.values.insert(key.to_string(), value);
        }
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut keys: Vec<&String> = self.values.keys().collect();
        keys.sort();
        f.debug_struct("Credentials").field("present", &keys).finish()
    }
}

/// Builds a [`ToolRegistry`], evaluating capability gates once.
pub struct RegistryBuilder {
    credentials: Credentials,
    tools: Vec<Arc<dyn Tool>>,
    max_parallel: Option<usize>,
}

impl RegistryBuilder {
    pub fn new(credentials: Credentials) -> Self {
        Self {
            credentials,
            tools: Vec::new(),
            max_parallel: None,
        }
    }

    /// Register a tool unconditionally.
    pub fn core(mut self, tool: impl Tool + 'static) -> Self {
        self.push(Arc::new(tool));
        self
    }

    /// Register a tool only when its required credential is present.
    pub fn optional(mut self, tool: impl Tool + 'static) -> Self {
        let missing = tool
            .required_credential()
            .filter(|key| !self.credentials.contains(key))
            .map(str::to_string);
        match missing {
            Some(key) => {
                info!(tool = tool.name(), credential = %key, "Tool disabled: credential absent");
            }
            None => self.push(Arc::new(tool)),
        }
        self
    }

    /// Cap the number of tool calls executed concurrently in one batch.
    pub fn max_parallel(mut self, limit: Option<usize>) -> Self {
        self.max_parallel = limit.filter(|n| *n > 0);
        self
    }

    fn push(&mut self, tool: Arc<dyn Tool>) {
        // Later registrations replace earlier ones but keep the original slot.
        if let Some(slot) = self.tools.iter_mut().find(|t| t.name() == tool.name()) {
            *slot = tool;
        } else {
            self.tools.push(tool);
        }
    }

    pub fn build(self) -> ToolRegistry {
        ToolRegistry::from_tools(self.tools, self.max_parallel)
    }
}

/// A registry of available tools, in registration order.
///
/// The agent loop uses this to:
/// 1. Get tool definitions to send to the LLM
/// 2. Validate and execute tools when the LLM requests them
#[derive(Clone, Default)]
pub struct ToolRegistry {
    tools: Vec<Arc<dyn Tool>>,
    index: HashMap<String, usize>,
    max_parallel: Option<usize>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn from_tools(tools: Vec<Arc<dyn Tool>>, max_parallel: Option<usize>) -> Self {
        let index = tools
            .iter()
            .enumerate()
            .map(|(i, t)| (t.name().to_string(), i))
            .collect();
        Self {
            tools,
            index,
            max_parallel,
        }
    }

    /// Get a tool by name.
    pub fn get(&self, name: &str) -> Option<&dyn Tool> {
        self.index.get(name).map(|&i| self.tools[i].as_ref())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Tool definitions in registration order (for sending to the LLM).
    pub fn list_schemas(&self) -> Vec<ToolDefinition> {
        self.tools.iter().map(|t| t.to_definition()).collect()
    }

    /// All registered tool names, in registration order.
    pub fn names(&self) -> Vec<&str> {
        self.tools.iter().map(|t| t.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// A view exposing only `names`, sharing the same adapters.
    /// Names that are not registered are ignored.
    pub fn restricted_to<S: AsRef<str>>(&self, names: &[S]) -> ToolRegistry {
        let tools = self
            .tools
            .iter()
            .filter(|t| names.iter().any(|n| n.as_ref() == t.name()))
            .cloned()
            .collect();
        Self::from_tools(tools, self.max_parallel)
    }

    /// Validate and execute a single call.
    ///
    /// Unknown names and schema mismatches are errors; adapter failures come
    /// back as a [`ToolResult`] with a failure outcome.
    pub async fn dispatch(&self, call: &ToolCall, auth: &AuthContext) -> Result<ToolResult> {
        let tool = self
            .get(&call.name)
            .ok_or_else(|| Error::UnknownTool(call.name.clone()))?;

        tool.argument_schema()
            .validate(&call.arguments)
            .map_err(|reason| Error::InvalidToolArguments {
                tool: call.name.clone(),
                reason,
            })?;

        debug!(tool = %call.name, call_id = %call.id, caller = %auth.fingerprint(), "Dispatching tool");

        let started = Instant::now();
        let mut result = match tool.execute(call.arguments.clone(), auth).await {
            Ok(result) => result,
            Err(e) => ToolResult::from_error(&e),
        };
        result.call_id = call.id.clone();
        result.duration_ms = started.elapsed().as_millis() as u64;
        result.output = auth.scrub(&result.output);

        debug!(
            tool = %call.name,
            call_id = %call.id,
            success = result.is_success(),
            duration_ms = result.duration_ms,
            "Tool finished"
        );
        Ok(result)
    }

    /// Dispatch a batch concurrently; results come back in call order.
    pub async fn dispatch_all(
        &self,
        calls: &[ToolCall],
        auth: &AuthContext,
    ) -> Vec<Result<ToolResult>> {
        let chunk = self.max_parallel.unwrap_or(calls.len()).max(1);
        let mut results = Vec::with_capacity(calls.len());
        for batch in calls.chunks(chunk) {
            let futures = batch.iter().map(|call| self.dispatch(call, auth));
            results.extend(futures::future::join_all(futures).await);
        }
        results
    }
}

impl std::fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolRegistry")
            .field("tools", &self.names())
            .field("max_parallel", &self.max_parallel)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::ArgKind;
    use std::time::Duration;

    /// A simple test tool for unit tests.
    struct EchoTool;

    #[async_trait]
    impl Tool for EchoTool {
        fn name(&self) -> &str {
            "echo"
        }
        fn description(&self) -> &str {
            "Echoes back the input"
        }
        fn argument_schema(&self) -> ArgumentSchema {
            ArgumentSchema::new().required("text", ArgKind::String, "Text to echo")
        }
        async fn execute(
            &self,
            arguments: serde_json::Value,
            _auth: &AuthContext,
        ) -> std::result::Result<ToolResult, ToolError> {
            let text = arguments["text"].as_str().unwrap_or("").to_string();
            Ok(ToolResult::success(text))
        }
    }

    struct GatedTool;

    #[async_trait]
    impl Tool for GatedTool {
        fn name(&self) -> &str {
            "web_search"
        }
        fn description(&self) -> &str {
            "Search the web"
        }
        fn argument_schema(&self) -> ArgumentSchema {
            ArgumentSchema::new().required("query", ArgKind::String, "Search query")
        }
        fn required_credential(&self) -> Option<&str> {
            Some("TAVILY_API_KEY")
        }
        async fn execute(
            &self,
            _arguments: serde_json::Value,
            _auth: &AuthContext,
        ) -> std::result::Result<ToolResult, ToolError> {
            Ok(ToolResult::success("results"))
        }
    }

    /// Sleeps for `delay_ms` then reports its label.
    struct SlowTool;

    #[async_trait]
    impl Tool for SlowTool {
        fn name(&self) -> &str {
            "slow"
        }
        fn description(&self) -> &str {
            "Sleeps then answers"
        }
        fn argument_schema(&self) -> ArgumentSchema {
            ArgumentSchema::new()
                .required("label", ArgKind::String, "Label to return")
                .required("delay_ms", ArgKind::Integer, "Delay")
        }
        async fn execute(
            &self,
            arguments: serde_json::Value,
            _auth: &AuthContext,
        ) -> std::result::Result<ToolResult, ToolError> {
            let delay = arguments["delay_ms"].as_u64().unwrap_or(0);
            tokio::time::sleep(Duration::from_millis(delay)).await;
            Ok(ToolResult::success(arguments["label"].as_str().unwrap_or("")))
        }
    }

    /// Echoes the caller's bearer token back, like a careless remote server.
    struct LeakyTool;

    #[async_trait]
    impl Tool for LeakyTool {
        fn name(&self) -> &str {
            "leaky"
        }
        fn description(&self) -> &str {
            "Returns the caller header"
        }
        fn argument_schema(&self) -> ArgumentSchema {
            ArgumentSchema::new()
        }
        async fn execute(
            &self,
            _arguments: serde_json::Value,
            auth: &AuthContext,
        ) -> std::result::Result<ToolResult, ToolError> {
            Ok(ToolResult::success(format!(
                "authorized as {}",
                auth.authorization_header().unwrap_or_default()
            )))
        }
    }

    struct FailingTool;

    #[async_trait]
    impl Tool for FailingTool {
        fn name(&self) -> &str {
            "python"
        }
        fn description(&self) -> &str {
            "Always times out"
        }
        fn argument_schema(&self) -> ArgumentSchema {
            ArgumentSchema::new().required("code", ArgKind::String, "Code")
        }
        async fn execute(
            &self,
            _arguments: serde_json::Value,
            _auth: &AuthContext,
        ) -> std::result::Result<ToolResult, ToolError> {
            Err(ToolError::Timeout {
                tool_name: "python".into(),
                timeout_secs: 30,
            })
        }
    }

    fn registry() -> ToolRegistry {
        RegistryBuilder::new(Credentials::new())
            .core(EchoTool)
            .core(SlowTool)
            .core(LeakyTool)
            .core(FailingTool)
            .build()
    }

    #[test]
    fn schemas_follow_registration_order() {
        let names: Vec<String> = registry().list_schemas().into_iter().map(|d| d.name).collect();
        assert_eq!(names, vec!["echo", "slow", "leaky", "python"]);
    }

    #[tokio::test]
    async fn gated_tool_absent_without_credential() {
        let registry = RegistryBuilder::new(Credentials::new())
            .core(EchoTool)
            .optional(GatedTool)
            .build();

        assert!(!registry.contains("web_search"));
        assert!(registry.list_schemas().iter().all(|d| d.name != "web_search"));

        let call = ToolCall::new("call_1", "web_search", serde_json::json!({"query": "x"}));
        let err = registry
            .dispatch(&call, &AuthContext::anonymous())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::UnknownTool(name) if name == "web_search"));
    }

    #[test]
    fn gated_tool_present_with_credential() {
        let creds = Credentials::new().with("TAVILY_API_KEY", "tvly-123");
        let registry = RegistryBuilder::new(creds).optional(GatedTool).build();
        assert!(registry.contains("web_search"));
    }

    #[test]
    fn blank_credential_counts_as_absent() {
        let creds = Credentials::new().with("TAVILY_API_KEY", "  ");
        assert!(!creds.contains("TAVILY_API_KEY"));
        assert!(!format!("{creds:?}").contains("tvly"));
    }

    #[tokio::test]
    async fn dispatch_executes_and_stamps_call_id() {
        let call = ToolCall::new("call_7", "echo", serde_json::json!({"text": "hello world"}));
        let result = registry()
            .dispatch(&call, &AuthContext::anonymous())
            .await
            .unwrap();
        assert!(result.is_success());
        assert_eq!(result.call_id, "call_7");
        assert_eq!(result.output, "hello world");
    }

    #[tokio::test]
    async fn dispatch_rejects_invalid_arguments() {
        let call = ToolCall::new("call_1", "echo", serde_json::json!({"text": 42}));
        let err = registry()
            .dispatch(&call, &AuthContext::anonymous())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidToolArguments { ref tool, .. } if tool == "echo"));
    }

    #[tokio::test]
    async fn adapter_errors_become_failed_results() {
        let call = ToolCall::new("call_1", "python", serde_json::json!({"code": "while True: pass"}));
        let result = registry()
            .dispatch(&call, &AuthContext::anonymous())
            .await
            .unwrap();
        assert_eq!(result.outcome, ToolOutcome::Failure(FailureKind::SandboxTimeout));
        assert!(result.output.contains("30s"));
    }

    #[tokio::test]
    async fn dispatch_all_preserves_call_order() {
        let calls = vec![
            ToolCall::new("a", "slow", serde_json::json!({"label": "A", "delay_ms": 60})),
            ToolCall::new("b", "slow", serde_json::json!({"label": "B", "delay_ms": 5})),
            ToolCall::new("c", "slow", serde_json::json!({"label": "C", "delay_ms": 30})),
        ];
        let results = registry()
            .dispatch_all(&calls, &AuthContext::anonymous())
            .await;
        let outputs: Vec<String> = results.into_iter().map(|r| r.unwrap().output).collect();
        assert_eq!(outputs, vec!["A", "B", "C"]);
    }

    #[tokio::test]
    async fn dispatch_all_runs_concurrently() {
        let calls: Vec<ToolCall> = (0..4)
            .map(|i| {
                ToolCall::new(
                    format!("call_{i}"),
                    "slow",
                    serde_json::json!({"label": i.to_string(), "delay_ms": 100}),
                )
            })
            .collect();
        let started = Instant::now();
        registry()
            .dispatch_all(&calls, &AuthContext::anonymous())
            .await;
        assert!(started.elapsed() < Duration::from_millis(350));
    }

    #[tokio::test]
    async fn output_is_scrubbed_of_credential() {
        let auth = AuthContext::from_header(Some("Bearer sk-test"));
        let call = ToolCall::new("call_1", "leaky", serde_json::json!({}));
        let result = registry().dispatch(&call, &auth).await.unwrap();
        assert!(!result.output.contains("sk-test"));
        assert!(result.output.contains("[REDACTED]"));
    }

    #[test]
    fn restricted_view_shares_subset() {
        let full = registry();
        let view = full.restricted_to(&["echo", "python", "missing"]);
        assert_eq!(view.names(), vec!["echo", "python"]);
        assert_eq!(full.len(), 4);
    }
}
