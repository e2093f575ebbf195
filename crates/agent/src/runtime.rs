//! Request entrypoint.
//!
//! [`AgentRuntime`] owns everything shared across requests (resolver,
//! transports, tool registry, assistant catalog) and turns one
//! [`RunRequest`] into one reasoning loop run.

use crate::assistant::AssistantCatalog;
use crate::loop_runner::{ReasoningLoop, RunFailure, RunOutcome};
use crate::prompt;
use crate::state::LoopState;
use crate::stream_event::AgentStreamEvent;
use nexagent_config::AppConfig;
use nexagent_core::auth::AuthContext;
use nexagent_core::error::Error;
use nexagent_core::event::EventBus;
use nexagent_core::message::{Conversation, Message};
use nexagent_core::request::RunRequest;
use nexagent_core::tool::ToolRegistry;
use nexagent_policy::{GuardLog, guard_for};
use nexagent_providers::{ProviderResolver, ProviderRouter};
use nexagent_tools::{NexusClient, Skill, ToolBackends};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Loop settings that come from configuration rather than the assistant.
#[derive(Debug, Clone, Copy)]
pub struct LoopSettings {
    pub temperature: f32,
    pub max_tokens: u32,
    pub max_iterations: u32,
    pub max_policy_rejections: u32,
}

impl LoopSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            temperature: config.default_temperature,
            max_tokens: config.default_max_tokens,
            max_iterations: config.agent.max_iterations,
            max_policy_rejections: config.agent.max_policy_rejections,
        }
    }
}

impl Default for LoopSettings {
    fn default() -> Self {
        Self::from_config(&AppConfig::default())
    }
}

pub struct AgentRuntime {
    settings: LoopSettings,
    resolver: ProviderResolver,
    router: ProviderRouter,
    tools: Arc<ToolRegistry>,
    catalog: AssistantCatalog,
    nexus: Option<Arc<dyn NexusClient>>,
    events: EventBus,
    guard_log: Arc<GuardLog>,
}

impl AgentRuntime {
    /// Wire every component from configuration.
    pub fn from_config(config: &AppConfig) -> Self {
        let credentials = config.credentials();
        let backends = ToolBackends::from_config(config, &credentials);
        let nexus = backends.nexus.clone();
        let tools = nexagent_tools::build_registry_with(backends, config, credentials);
        let router = nexagent_providers::build_from_config(config);

        info!(
            tools = ?tools.names(),
            providers = ?router.list(),
            "Runtime initialized"
        );

        Self::new(
            LoopSettings::from_config(config),
            ProviderResolver::from_config(config),
            router,
            Arc::new(tools),
            AssistantCatalog::from_overrides(&config.assistants),
        )
        .with_nexus(nexus)
    }

    pub fn new(
        settings: LoopSettings,
        resolver: ProviderResolver,
        router: ProviderRouter,
        tools: Arc<ToolRegistry>,
        catalog: AssistantCatalog,
    ) -> Self {
        Self {
            settings,
            resolver,
            router,
            tools,
            catalog,
            nexus: None,
            events: EventBus::default(),
            guard_log: Arc::new(GuardLog::default()),
        }
    }

    /// Nexus client used to list skills for the system prompt.
    pub fn with_nexus(mut self, nexus: Arc<dyn NexusClient>) -> Self {
        self.nexus = Some(nexus);
        self
    }

    pub fn with_event_bus(mut self, events: EventBus) -> Self {
        self.events = events;
        self
    }

    pub fn catalog(&self) -> &AssistantCatalog {
        &self.catalog
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    pub fn router(&self) -> &ProviderRouter {
        &self.router
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn guard_log(&self) -> &GuardLog {
        &self.guard_log
    }

    /// Serve one request to completion.
    pub async fn run(
        &self,
        request: RunRequest,
        cancel: CancellationToken,
        stream: Option<mpsc::Sender<AgentStreamEvent>>,
    ) -> Result<RunOutcome, RunFailure> {
        let stream = stream.as_ref();
        let auth = AuthContext::from_metadata(&request.metadata);

        let spec = match self.catalog.get(&request.assistant_id) {
            Ok(spec) => spec,
            Err(e) => return Err(reject(e, stream).await),
        };
        let seed = match request.input.to_messages() {
            Ok(seed) => seed,
            Err(e) => return Err(reject(e, stream).await),
        };
        let tools = match &spec.tools {
            Some(names) => Arc::new(self.tools.restricted_to(names.as_slice())),
            None => self.tools.clone(),
        };
        let guard = guard_for(spec.guard);
        if guard.requires_evidence() && !has_evidence_tool(&tools) {
            let error = Error::config(format!(
                "assistant '{}' requires cited evidence but no evidence tool is registered \
                 (check the search tool credentials)",
                spec.id
            ));
            return Err(reject(error, stream).await);
        }

        let provider_config = match self.resolver.resolve(&request.metadata, &spec.defaults) {
            Ok(config) => config,
            Err(e) => return Err(reject(e, stream).await),
        };
        let provider = match self.router.provider_for(&provider_config) {
            Ok(provider) => provider,
            Err(e) => return Err(reject(e, stream).await),
        };

        let skills = self.skills(&auth).await;
        let system = prompt::system_prompt(spec.prompt, &skills, auth.scope());
        let conversation =
            Conversation::seeded(std::iter::once(Message::system(system)).chain(seed));

        info!(
            assistant = %spec.id,
            provider = %provider_config.provider,
            model = %provider_config.model,
            tier = %provider_config.tier,
            caller = %auth.fingerprint(),
            skills = skills.len(),
            "Accepted run"
        );

        let agent = ReasoningLoop::new(provider, provider_config, tools)
            .with_guard(guard)
            .with_temperature(self.settings.temperature)
            .with_max_tokens(self.settings.max_tokens)
            .with_max_iterations(spec.max_iterations.unwrap_or(self.settings.max_iterations))
            .with_max_policy_rejections(self.settings.max_policy_rejections)
            .with_event_bus(self.events.clone())
            .with_guard_log(self.guard_log.clone())
            .with_assistant_id(&spec.id);

        agent.run(conversation, &auth, &cancel, stream).await
    }

    /// Skills visible to the caller; listing failures leave the section out.
    async fn skills(&self, auth: &AuthContext) -> Vec<Skill> {
        let Some(nexus) = &self.nexus else {
            return Vec::new();
        };
        match nexus.list_skills(auth).await {
            Ok(skills) => skills,
            Err(e) => {
                warn!(caller = %auth.fingerprint(), "Skill listing failed: {e}");
                Vec::new()
            }
        }
    }
}

fn has_evidence_tool(tools: &ToolRegistry) -> bool {
    tools
        .names()
        .into_iter()
        .any(|name| tools.get(name).is_some_and(|t| t.is_evidence()))
}

/// Fail a request before the loop starts.
async fn reject(error: Error, stream: Option<&mpsc::Sender<AgentStreamEvent>>) -> RunFailure {
    warn!(kind = error.kind(), "Run rejected: {error}");
    if let Some(tx) = stream {
        let _ = tx
            .send(AgentStreamEvent::Error {
                message: error.to_string(),
                kind: error.kind().to_string(),
                state: LoopState::Reasoning.to_string(),
                iterations: 0,
            })
            .await;
    }
    RunFailure {
        error,
        last_state: LoopState::Reasoning,
        iterations: 0,
        conversation: Conversation::new(),
    }
}
