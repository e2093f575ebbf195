//! Configuration loading, validation, and management for nexagent.
//!
//! Loads configuration from `~/.nexagent/config.toml` with environment
//! variable overrides. Validates all settings at startup.

use nexagent_core::{Credentials, Tier};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Environment variables holding each known provider's API key, in lookup order.
pub const PROVIDER_KEY_ENV: &[(&str, &[&str])] = &[
    ("anthropic", &["ANTHROPIC_API_KEY"]),
    ("openai", &["OPENAI_API_KEY"]),
    ("gemini", &["GOOGLE_API_KEY", "GEMINI_API_KEY"]),
    ("openrouter", &["OPENROUTER_API_KEY"]),
];

/// The root configuration structure.
///
/// Maps directly to `~/.nexagent/config.toml`.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Process-wide default provider. `None` falls back to key probing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_provider: Option<String>,

    /// Process-wide default tier
    #[serde(default)]
    pub default_tier: Tier,

    /// Model used when the default provider has no tier mapping
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_model: Option<String>,

    /// Default temperature
    #[serde(default = "default_temperature")]
    pub default_temperature: f32,

    /// Default max tokens per LLM response
    #[serde(default = "default_max_tokens")]
    pub default_max_tokens: u32,

    /// Reasoning loop limits
    #[serde(default)]
    pub agent: AgentConfig,

    /// Provider-specific configurations
    #[serde(default)]
    pub providers: HashMap<String, ProviderSettings>,

    /// Tool gating and backend endpoints
    #[serde(default)]
    pub tools: ToolsConfig,

    /// Sandbox configuration
    #[serde(default)]
    pub sandbox: SandboxConfig,

    /// Nexus server connection
    #[serde(default)]
    pub nexus: NexusConfig,

    /// Gateway configuration
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Per-assistant overrides, keyed by assistant id
    #[serde(default)]
    pub assistants: HashMap<String, AssistantConfig>,
}

fn default_temperature() -> f32 {
    0.7
}
fn default_max_tokens() -> u32 {
    10_000
}

fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("default_provider", &self.default_provider)
            .field("default_tier", &self.default_tier)
            .field("default_model", &self.default_model)
            .field("default_temperature", &self.default_temperature)
            .field("default_max_tokens", &self.default_max_tokens)
            .field("agent", &self.agent)
            .field("providers", &self.providers)
            .field("tools", &self.tools)
            .field("sandbox", &self.sandbox)
            .field("nexus", &self.nexus)
            .field("gateway", &self.gateway)
            .field("assistants", &self.assistants)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Model turns allowed per request
    #[serde(default = "default_max_iterations")]
    pub max_iterations: u32,

    /// Corrective retries granted after a guard rejection
    #[serde(default = "default_max_policy_rejections")]
    pub max_policy_rejections: u32,

    /// Cap on concurrently executing tool calls within one turn
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_parallel_tools: Option<usize>,
}

fn default_max_iterations() -> u32 {
    25
}
fn default_max_policy_rejections() -> u32 {
    2
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_iterations: default_max_iterations(),
            max_policy_rejections: default_max_policy_rejections(),
            max_parallel_tools: None,
        }
    }
}

/// Settings for one provider under `[providers.<name>]`.
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct ProviderSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_model: Option<String>,

    /// Tier name → model overrides for the built-in table
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub models: HashMap<String, String>,
}

impl ProviderSettings {
    /// The configured model override for `tier`, if any.
    pub fn model_for(&self, tier: Tier) -> Option<&str> {
        self.models.get(tier.as_str()).map(String::as_str)
    }
}

impl std::fmt::Debug for ProviderSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderSettings")
            .field("api_key", &redact(&self.api_key))
            .field("api_url", &self.api_url)
            .field("default_model", &self.default_model)
            .field("models", &self.models)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolsConfig {
    /// Credential keys that gate optional tools
    #[serde(default)]
    pub gates: GateConfig,

    #[serde(default = "default_tavily_url")]
    pub tavily_url: String,

    #[serde(default = "default_firecrawl_url")]
    pub firecrawl_url: String,

    /// Default `max_results` for web_search
    #[serde(default = "default_max_search_results")]
    pub max_search_results: u32,

    /// HTTP timeout for search and crawl backends
    #[serde(default = "default_backend_timeout")]
    pub timeout_secs: u64,
}

fn default_tavily_url() -> String {
    "https://api.tavily.com".into()
}
fn default_firecrawl_url() -> String {
    "https://api.firecrawl.dev".into()
}
fn default_max_search_results() -> u32 {
    5
}
fn default_backend_timeout() -> u64 {
    30
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            gates: GateConfig::default(),
            tavily_url: default_tavily_url(),
            firecrawl_url: default_firecrawl_url(),
            max_search_results: default_max_search_results(),
            timeout_secs: default_backend_timeout(),
        }
    }
}

/// Which credential key each optional tool requires.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GateConfig {
    #[serde(default = "default_tavily_key")]
    pub web_search: String,

    #[serde(default = "default_firecrawl_key")]
    pub web_crawl: String,

    #[serde(default = "default_tavily_key")]
    pub search_dental_literature: String,
}

fn default_tavily_key() -> String {
    "TAVILY_API_KEY".into()
}
fn default_firecrawl_key() -> String {
    "FIRECRAWL_API_KEY".into()
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            web_search: default_tavily_key(),
            web_crawl: default_firecrawl_key(),
            search_dental_literature: default_tavily_key(),
        }
    }
}

impl GateConfig {
    pub fn keys(&self) -> Vec<&str> {
        let mut keys = vec![
            self.web_search.as_str(),
            self.web_crawl.as_str(),
            self.search_dental_literature.as_str(),
        ];
        keys.sort_unstable();
        keys.dedup();
        keys
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SandboxConfig {
    /// Wall-clock limit for one python/bash invocation
    #[serde(default = "default_sandbox_timeout")]
    pub timeout_secs: u64,

    #[serde(default = "default_python")]
    pub python: String,

    #[serde(default = "default_shell")]
    pub shell: String,

    /// Working directory for sandboxed processes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workdir: Option<PathBuf>,

    /// Output beyond this many bytes is truncated
    #[serde(default = "default_max_output_bytes")]
    pub max_output_bytes: usize,
}

fn default_sandbox_timeout() -> u64 {
    30
}
fn default_python() -> String {
    "python3".into()
}
fn default_shell() -> String {
    "bash".into()
}
fn default_max_output_bytes() -> usize {
    64 * 1024
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_sandbox_timeout(),
            python: default_python(),
            shell: default_shell(),
            workdir: None,
            max_output_bytes: default_max_output_bytes(),
        }
    }
}

/// Nexus server location. Calls are authorized only by the caller's
/// bearer credential; there is no service identity to fall back to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NexusConfig {
    #[serde(default = "default_nexus_url")]
    pub url: String,

    #[serde(default = "default_backend_timeout")]
    pub timeout_secs: u64,
}

fn default_nexus_url() -> String {
    "http://localhost:8080".into()
}

impl Default for NexusConfig {
    fn default() -> Self {
        Self {
            url: default_nexus_url(),
            timeout_secs: default_backend_timeout(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_host")]
    pub host: String,
}

fn default_port() -> u16 {
    2024
}
fn default_host() -> String {
    "127.0.0.1".into()
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            host: default_host(),
        }
    }
}

/// Which answer guard an assistant runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GuardKind {
    AcceptAll,
    /// At least one citation recorded.
    EvidenceRequired,
    /// Citations recorded and referenced by marker in the answer.
    EvidenceCited,
}

/// Overrides for one assistant under `[assistants.<id>]`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AssistantConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tier: Option<Tier>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guard: Option<GuardKind>,

    /// Restrict the assistant to these tools
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_iterations: Option<u32>,
}

impl AppConfig {
    /// Load configuration from the default path (~/.nexagent/config.toml),
    /// then apply environment overrides:
    /// - `NEXAGENT_PROVIDER`, `NEXAGENT_TIER`, `NEXAGENT_MODEL`
    /// - `NEXUS_SERVER_URL`
    /// - provider API keys (`ANTHROPIC_API_KEY`, `OPENAI_API_KEY`,
    ///   `GOOGLE_API_KEY`/`GEMINI_API_KEY`, `OPENROUTER_API_KEY`)
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        let mut config = Self::load_from(&config_path)?;
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Overlay environment values onto the loaded file. Empty values are ignored.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(provider) = get("NEXAGENT_PROVIDER") {
            self.default_provider = Some(provider.trim().to_ascii_lowercase());
        }
        if let Some(tier) = get("NEXAGENT_TIER") {
            self.default_tier = Tier::parse(&tier).ok_or_else(|| {
                ConfigError::ValidationError(format!(
                    "NEXAGENT_TIER must be 'pro' or 'flash', got '{tier}'"
                ))
            })?;
        }
        if let Some(model) = get("NEXAGENT_MODEL") {
            self.default_model = Some(model);
        }
        if let Some(url) = get("NEXUS_SERVER_URL") {
            self.nexus.url = url;
        }

        for (provider, vars) in PROVIDER_KEY_ENV {
            let settings = self.providers.entry(provider.to_string()).or_default();
            if settings.api_key.is_some() {
                continue;
            }
            settings.api_key = vars.iter().find_map(|v| get(v));
        }
        // Drop entries the overlay created without adding anything.
        self.providers.retain(|_, s| {
            s.api_key.is_some() || s.api_url.is_some() || s.default_model.is_some() || !s.models.is_empty()
        });

        self.validate()
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".nexagent")
    }

    /// Validate the configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.default_temperature < 0.0 || self.default_temperature > 2.0 {
            return Err(ConfigError::ValidationError(
                "default_temperature must be between 0.0 and 2.0".into(),
            ));
        }

        if self.agent.max_iterations == 0 {
            return Err(ConfigError::ValidationError(
                "agent.max_iterations must be at least 1".into(),
            ));
        }

        if self.sandbox.timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "sandbox.timeout_secs must be > 0".into(),
            ));
        }

        for (id, assistant) in &self.assistants {
            if assistant.max_iterations == Some(0) {
                return Err(ConfigError::ValidationError(format!(
                    "assistants.{id}.max_iterations must be at least 1"
                )));
            }
        }

        Ok(())
    }

    /// The configured API key for `provider`, if any.
    pub fn api_key(&self, provider: &str) -> Option<&str> {
        self.providers.get(provider)?.api_key.as_deref()
    }

    pub fn has_api_key(&self, provider: &str) -> bool {
        self.api_key(provider).is_some()
    }

    pub fn assistant(&self, id: &str) -> Option<&AssistantConfig> {
        self.assistants.get(id)
    }

    /// Snapshot the credentials that gate optional tools from the environment.
    pub fn credentials(&self) -> Credentials {
        Credentials::from_env(self.tools.gates.keys())
    }

    /// Generate a default config TOML string (for the `config` command).
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            default_provider: None,
            default_tier: Tier::default(),
            default_model: None,
            default_temperature: default_temperature(),
            default_max_tokens: default_max_tokens(),
            agent: AgentConfig::default(),
            providers: HashMap::new(),
            tools: ToolsConfig::default(),
            sandbox: SandboxConfig::default(),
            nexus: NexusConfig::default(),
            gateway: GatewayConfig::default(),
            assistants: HashMap::new(),
        }
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

impl From<ConfigError> for nexagent_core::Error {
    fn from(e: ConfigError) -> Self {
        nexagent_core::Error::config(e.to_string())
    }
}
