//! Assistant catalog.
//!
//! An assistant is a named bundle of prompt, provider defaults, answer
//! guard and tool subset. Two ship built in: `react` (general purpose)
//! and `dental_agent` (clinical evidence). `[assistants.<id>]` in the
//! configuration overrides any field.

use crate::prompt::PromptRole;
use nexagent_config::{AssistantConfig, GuardKind};
use nexagent_core::error::{Error, Result};
use nexagent_core::provider::Tier;
use nexagent_providers::AssistantDefaults;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

/// Tools the dental assistant may call.
pub const DENTAL_TOOLS: &[&str] = &[
    "grep_files",
    "glob_files",
    "read_file",
    "web_search",
    "web_crawl",
    "search_dental_literature",
];

#[derive(Debug, Clone)]
pub struct AssistantSpec {
    pub id: String,
    pub description: String,
    pub prompt: PromptRole,
    pub defaults: AssistantDefaults,
    pub guard: GuardKind,
    /// `None` exposes every registered tool.
    pub tools: Option<Vec<String>>,
    /// Overrides `[agent] max_iterations`.
    pub max_iterations: Option<u32>,
}

impl AssistantSpec {
    pub fn react() -> Self {
        Self {
            id: "react".into(),
            description: "General-purpose assistant with Nexus filesystem, sandbox and memory tools"
                .into(),
            prompt: PromptRole::General,
            defaults: AssistantDefaults::default(),
            guard: GuardKind::AcceptAll,
            tools: None,
            max_iterations: None,
        }
    }

    pub fn dental() -> Self {
        Self {
            id: "dental_agent".into(),
            description: "Evidence-based clinical assistant for dentistry; answers must cite sources"
                .into(),
            prompt: PromptRole::Dental,
            defaults: AssistantDefaults {
                provider: Some("gemini".into()),
                tier: Some(Tier::Pro),
            },
            guard: GuardKind::EvidenceRequired,
            tools: Some(DENTAL_TOOLS.iter().map(|t| t.to_string()).collect()),
            max_iterations: None,
        }
    }

    /// Apply `[assistants.<id>]` overrides.
    pub fn with_overrides(mut self, overrides: &AssistantConfig) -> Self {
        if let Some(provider) = &overrides.provider {
            self.defaults.provider = Some(provider.clone());
        }
        if let Some(tier) = overrides.tier {
            self.defaults.tier = Some(tier);
        }
        if let Some(guard) = overrides.guard {
            self.guard = guard;
        }
        if let Some(tools) = &overrides.tools {
            self.tools = Some(tools.clone());
        }
        if let Some(max) = overrides.max_iterations {
            self.max_iterations = Some(max);
        }
        self
    }

    /// Summary for listings.
    pub fn summary(&self) -> AssistantSummary {
        AssistantSummary {
            id: self.id.clone(),
            description: self.description.clone(),
            guard: self.guard,
            default_provider: self.defaults.provider.clone(),
            default_tier: self.defaults.tier.map(|t| t.as_str().to_string()),
            tools: self.tools.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AssistantSummary {
    pub id: String,
    pub description: String,
    pub guard: GuardKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_provider: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_tier: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<String>>,
}

/// Assistants addressable by `assistant_id`.
#[derive(Debug, Clone, Default)]
pub struct AssistantCatalog {
    assistants: BTreeMap<String, AssistantSpec>,
}

impl AssistantCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// `react` and `dental_agent`.
    pub fn builtin() -> Self {
        Self::new()
            .with(AssistantSpec::react())
            .with(AssistantSpec::dental())
    }

    /// Built-ins with configuration overrides applied.
    ///
    /// Overrides for ids that are not built in are ignored with a warning.
    pub fn from_overrides(overrides: &HashMap<String, AssistantConfig>) -> Self {
        let mut catalog = Self::builtin();
        for (id, config) in overrides {
            match catalog.assistants.remove(id) {
                Some(spec) => {
                    catalog
                        .assistants
                        .insert(id.clone(), spec.with_overrides(config));
                }
                None => tracing::warn!(assistant = %id, "Ignoring overrides for unknown assistant"),
            }
        }
        catalog
    }

    pub fn with(mut self, spec: AssistantSpec) -> Self {
        self.assistants.insert(spec.id.clone(), spec);
        self
    }

    pub fn get(&self, id: &str) -> Result<&AssistantSpec> {
        self.assistants.get(id).ok_or_else(|| {
            Error::config(format!(
                "unknown assistant '{id}' (available: {})",
                self.ids().join(", ")
            ))
        })
    }

    pub fn ids(&self) -> Vec<&str> {
        self.assistants.keys().map(String::as_str).collect()
    }

    pub fn list(&self) -> Vec<AssistantSummary> {
        self.assistants.values().map(AssistantSpec::summary).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_assistants() {
        let catalog = AssistantCatalog::builtin();
        assert_eq!(catalog.ids(), vec!["dental_agent", "react"]);

        let dental = catalog.get("dental_agent").unwrap();
        assert_eq!(dental.guard, GuardKind::EvidenceRequired);
        assert_eq!(dental.defaults.provider.as_deref(), Some("gemini"));
        assert_eq!(dental.defaults.tier, Some(Tier::Pro));
        assert!(dental.tools.as_ref().unwrap().contains(&"search_dental_literature".to_string()));

        let react = catalog.get("react").unwrap();
        assert_eq!(react.guard, GuardKind::AcceptAll);
        assert!(react.tools.is_none());
    }

    #[test]
    fn unknown_assistant_is_configuration_error() {
        let err = AssistantCatalog::builtin().get("pirate").unwrap_err();
        assert_eq!(err.kind(), "configuration_error");
        assert!(err.to_string().contains("react"));
    }

    #[test]
    fn overrides_apply_per_field() {
        let mut overrides = HashMap::new();
        overrides.insert(
            "react".to_string(),
            AssistantConfig {
                provider: Some("anthropic".into()),
                guard: Some(GuardKind::EvidenceRequired),
                max_iterations: Some(5),
                ..Default::default()
            },
        );
        overrides.insert("ghost".to_string(), AssistantConfig::default());

        let catalog = AssistantCatalog::from_overrides(&overrides);
        let react = catalog.get("react").unwrap();
        assert_eq!(react.defaults.provider.as_deref(), Some("anthropic"));
        assert_eq!(react.defaults.tier, None);
        assert_eq!(react.guard, GuardKind::EvidenceRequired);
        assert_eq!(react.max_iterations, Some(5));
        assert!(catalog.get("ghost").is_err());
    }

    #[test]
    fn summaries_serialize() {
        let list = AssistantCatalog::builtin().list();
        let json = serde_json::to_value(&list).unwrap();
        assert_eq!(json[0]["id"], "dental_agent");
        assert_eq!(json[0]["guard"], "evidence_required");
        assert_eq!(json[0]["default_tier"], "pro");
        assert!(json[1].get("tools").is_none());
    }
}
