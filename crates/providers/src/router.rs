//! Provider router: maps a resolved provider name to its transport.

use crate::openai_compat::{OpenAiCompatProvider, default_base_url};
use nexagent_core::error::{Error, Result};
use nexagent_core::provider::{Provider, ProviderConfig};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Routes LLM requests to the correct provider.
#[derive(Default, Clone)]
pub struct ProviderRouter {
    providers: HashMap<String, Arc<dyn Provider>>,
}

impl ProviderRouter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a provider under `name`, replacing any previous one.
    pub fn register(&mut self, name: impl Into<String>, provider: Arc<dyn Provider>) {
        self.providers.insert(name.into(), provider);
    }

    pub fn with(mut self, name: impl Into<String>, provider: Arc<dyn Provider>) -> Self {
        self.register(name, provider);
        self
    }

    /// Get a specific provider by name.
    pub fn get(&self, name: &str) -> Option<Arc<dyn Provider>> {
        self.providers.get(name).cloned()
    }

    /// The transport for a resolved configuration.
    pub fn provider_for(&self, config: &ProviderConfig) -> Result<Arc<dyn Provider>> {
        self.get(&config.provider).ok_or_else(|| {
            Error::config(format!(
                "Provider '{}' has no API key or endpoint configured",
                config.provider
            ))
        })
    }

    /// List all registered provider names, sorted.
    pub fn list(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.providers.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }
}

impl std::fmt::Debug for ProviderRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderRouter")
            .field("providers", &self.list())
            .finish()
    }
}

/// Build providers from configuration.
///
/// A provider is registered when it has an API key or an explicit `api_url`
/// (local OpenAI-compatible servers usually need no key).
pub fn build_from_config(config: &nexagent_config::AppConfig) -> ProviderRouter {
    let mut router = ProviderRouter::new();

    for (name, settings) in &config.providers {
        if settings.api_key.is_none() && settings.api_url.is_none() {
            continue;
        }
        let api_key = settings.api_key.clone().unwrap_or_default();
        let base_url = settings
            .api_url
            .clone()
            .unwrap_or_else(|| default_base_url(name));

        let provider = if name == "openrouter" && settings.api_url.is_none() {
            OpenAiCompatProvider::openrouter(api_key)
        } else {
            OpenAiCompatProvider::new(name, base_url, api_key)
        };
        debug!(provider = %name, "Registered provider");
        router.register(name.clone(), Arc::new(provider));
    }

    router
}

#[cfg(test)]
mod tests {
    use super::*;
    use nexagent_config::{AppConfig, ProviderSettings};
    use nexagent_core::provider::{ModelSource, ThinkingConfig, Tier};

    fn resolved(provider: &str) -> ProviderConfig {
        ProviderConfig {
            provider: provider.into(),
            model: "m".into(),
            tier: Tier::Flash,
            thinking: ThinkingConfig::default(),
            source: ModelSource::TierTable,
        }
    }

    #[test]
    fn router_register_and_lookup() {
        let router = ProviderRouter::new().with(
            "openrouter",
            Arc::new(OpenAiCompatProvider::openrouter("sk-test")),
        );
        assert!(router.get("openrouter").is_some());
        assert!(router.get("nonexistent").is_none());
        assert!(router.provider_for(&resolved("openrouter")).is_ok());
    }

    #[test]
    fn missing_transport_is_configuration_error() {
        let err = ProviderRouter::new()
            .provider_for(&resolved("gemini"))
            .err()
            .unwrap();
        assert!(matches!(err, Error::Configuration { .. }));
    }

    #[test]
    fn build_registers_keyed_and_custom_providers() {
        let mut config = AppConfig::default();
        config.providers.insert(
            "gemini".into(),
            ProviderSettings {
                api_key: Some("g-key".into()),
                ..Default::default()
            },
        );
        config.providers.insert(
            "ollama".into(),
            ProviderSettings {
                api_url: Some("http://localhost:11434/v1".into()),
                ..Default::default()
            },
        );
        config.providers.insert("openai".into(), ProviderSettings::default());

        let router = build_from_config(&config);
        assert_eq!(router.list(), vec!["gemini", "ollama"]);
    }

    #[test]
    fn build_from_default_config_is_empty() {
        let router = build_from_config(&AppConfig::default());
        assert!(router.list().is_empty());
    }
}
