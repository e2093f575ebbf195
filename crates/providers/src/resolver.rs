//! Provider Resolver: picks provider, tier, model and thinking settings
//! for one request from layered configuration.
//!
//! Precedence, highest first:
//! - provider: request `llm_provider` → assistant default → process default →
//!   first provider with an API key (anthropic, openai, gemini, openrouter)
//! - tier: request `llm_tier` → assistant default → process default (`flash`)
//! - model: request `llm_model` → provider/tier table → provider
//!   `default_model` → process `default_model` (default provider only)

use nexagent_config::AppConfig;
use nexagent_core::error::{Error, Result};
use nexagent_core::provider::{
    MIN_THINKING_BUDGET, ModelSource, ProviderConfig, ThinkingConfig, Tier,
};
use nexagent_core::request::RequestMetadata;
use std::collections::{HashMap, HashSet};
use tracing::{debug, warn};

/// Order in which providers are probed for an API key.
pub const PROBE_ORDER: [&str; 4] = ["anthropic", "openai", "gemini", "openrouter"];

/// The built-in provider/tier model table.
pub fn builtin_model(provider: &str, tier: Tier) -> Option<&'static str> {
    let model = match (provider, tier) {
        ("anthropic", Tier::Pro) => "claude-opus-4-5",
        ("anthropic", Tier::Flash) => "claude-sonnet-4-5-20250929",
        ("openai", Tier::Pro) => "gpt-5.2",
        ("openai", Tier::Flash) => "gpt-5-mini",
        ("gemini", Tier::Pro) => "gemini-3-pro-preview",
        ("gemini", Tier::Flash) => "gemini-2.5-flash",
        ("openrouter", Tier::Pro) => "anthropic/claude-opus-4.5",
        ("openrouter", Tier::Flash) => "anthropic/claude-3.5-sonnet",
        _ => return None,
    };
    Some(model)
}

/// Per-assistant defaults that sit between the request and the process.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssistantDefaults {
    pub provider: Option<String>,
    pub tier: Option<Tier>,
}

#[derive(Debug, Clone, Default)]
struct ProviderModels {
    tiers: HashMap<Tier, String>,
    default_model: Option<String>,
}

/// Resolves a [`ProviderConfig`] per request. Holds only read-only
/// configuration, so one instance is shared across requests.
#[derive(Debug, Clone, Default)]
pub struct ProviderResolver {
    default_provider: Option<String>,
    default_tier: Tier,
    default_model: Option<String>,
    keyed: HashSet<String>,
    models: HashMap<String, ProviderModels>,
}

impl ProviderResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: &AppConfig) -> Self {
        let mut resolver = Self {
            default_provider: config.default_provider.clone(),
            default_tier: config.default_tier,
            default_model: config.default_model.clone(),
            ..Self::default()
        };
        for (name, settings) in &config.providers {
            if settings.api_key.is_some() {
                resolver.keyed.insert(name.clone());
            }
            let entry = resolver.models.entry(name.clone()).or_default();
            for tier in [Tier::Pro, Tier::Flash] {
                if let Some(model) = settings.model_for(tier) {
                    entry.tiers.insert(tier, model.to_string());
                }
            }
            entry.default_model = settings.default_model.clone();
        }
        resolver
    }

    pub fn with_default_provider(mut self, provider: &str) -> Self {
        self.default_provider = Some(provider.to_string());
        self
    }

    pub fn with_default_tier(mut self, tier: Tier) -> Self {
        self.default_tier = tier;
        self
    }

    pub fn with_default_model(mut self, model: &str) -> Self {
        self.default_model = Some(model.to_string());
        self
    }

    /// Mark a provider as having an API key available.
    pub fn with_api_key(mut self, provider: &str) -> Self {
        self.keyed.insert(provider.to_string());
        self
    }

    pub fn with_tier_model(mut self, provider: &str, tier: Tier, model: &str) -> Self {
        self.models
            .entry(provider.to_string())
            .or_default()
            .tiers
            .insert(tier, model.to_string());
        self
    }

    pub fn with_provider_default_model(mut self, provider: &str, model: &str) -> Self {
        self.models.entry(provider.to_string()).or_default().default_model = Some(model.to_string());
        self
    }

    /// Resolve the provider configuration for one request.
    pub fn resolve(
        &self,
        metadata: &RequestMetadata,
        assistant: &AssistantDefaults,
    ) -> Result<ProviderConfig> {
        let provider = self.resolve_provider(metadata, assistant)?;
        let tier = self.resolve_tier(metadata, assistant)?;
        let (model, source) = self.resolve_model(metadata, &provider, tier)?;
        let thinking = resolve_thinking(metadata);

        debug!(%provider, %model, %tier, ?source, thinking = thinking.enabled, "Resolved provider");

        Ok(ProviderConfig {
            provider,
            model,
            tier,
            thinking,
            source,
        })
    }

    fn resolve_provider(
        &self,
        metadata: &RequestMetadata,
        assistant: &AssistantDefaults,
    ) -> Result<String> {
        let explicit = non_empty(metadata.llm_provider.as_deref())
            .or_else(|| non_empty(assistant.provider.as_deref()))
            .or_else(|| non_empty(self.default_provider.as_deref()));
        if let Some(name) = explicit {
            return Ok(name.to_ascii_lowercase());
        }

        PROBE_ORDER
            .iter()
            .find(|p| self.keyed.contains(**p))
            .map(|p| p.to_string())
            .ok_or_else(|| {
                Error::config(
                    "No LLM provider available. Set llm_provider or one of: \
                     ANTHROPIC_API_KEY, OPENAI_API_KEY, GOOGLE_API_KEY, OPENROUTER_API_KEY",
                )
            })
    }

    fn resolve_tier(&self, metadata: &RequestMetadata, assistant: &AssistantDefaults) -> Result<Tier> {
        match non_empty(metadata.llm_tier.as_deref()) {
            Some(raw) => Tier::parse(raw).ok_or_else(|| {
                Error::config(format!("Unknown tier '{raw}', expected 'pro' or 'flash'"))
            }),
            None => Ok(assistant.tier.unwrap_or(self.default_tier)),
        }
    }

    fn resolve_model(
        &self,
        metadata: &RequestMetadata,
        provider: &str,
        tier: Tier,
    ) -> Result<(String, ModelSource)> {
        if let Some(model) = non_empty(metadata.llm_model.as_deref()) {
            return Ok((model.to_string(), ModelSource::Explicit));
        }

        let configured = self.models.get(provider);
        if let Some(model) = configured
            .and_then(|m| m.tiers.get(&tier).cloned())
            .or_else(|| builtin_model(provider, tier).map(String::from))
        {
            return Ok((model, ModelSource::TierTable));
        }

        if let Some(model) = configured.and_then(|m| m.default_model.clone()) {
            return Ok((model, ModelSource::Default));
        }

        if self.default_provider.as_deref() == Some(provider) {
            if let Some(model) = self.default_model.clone() {
                return Ok((model, ModelSource::Default));
            }
        }

        Err(Error::config(format!(
            "No model configured for provider '{provider}' at tier '{tier}'"
        )))
    }
}

fn resolve_thinking(metadata: &RequestMetadata) -> ThinkingConfig {
    let defaults = ThinkingConfig::default();
    let enabled = metadata.enable_thinking.unwrap_or(defaults.enabled);
    let mut budget_tokens = metadata.thinking_budget.unwrap_or(defaults.budget_tokens);
    if budget_tokens < MIN_THINKING_BUDGET {
        warn!(
            requested = budget_tokens,
            minimum = MIN_THINKING_BUDGET,
            "Thinking budget below provider minimum, raising"
        );
        budget_tokens = MIN_THINKING_BUDGET;
    }
    ThinkingConfig {
        enabled,
        budget_tokens,
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
