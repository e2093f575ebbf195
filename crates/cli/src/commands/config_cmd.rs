//! `nexagent config`: inspect and initialize configuration.

use anyhow::Context;
use nexagent_config::{AppConfig, PROVIDER_KEY_ENV};
use std::path::{Path, PathBuf};

pub fn default_path() -> PathBuf {
    AppConfig::config_dir().join("config.toml")
}

/// Warnings for a configuration that loads but will not run well.
pub fn warnings(config: &AppConfig) -> Vec<String> {
    let mut warnings = Vec::new();

    if !PROVIDER_KEY_ENV.iter().any(|(p, _)| config.has_api_key(p)) {
        warnings.push(
            "No provider API key set (ANTHROPIC_API_KEY, OPENAI_API_KEY, GOOGLE_API_KEY or OPENROUTER_API_KEY)"
                .to_string(),
        );
    }
    if let Some(provider) = &config.default_provider {
        if !config.has_api_key(provider) {
            warnings.push(format!("Default provider '{provider}' has no API key"));
        }
    }
    if config.gateway.host == "0.0.0.0" {
        warnings.push("Gateway binds to all interfaces".into());
    }
    warnings
}

/// Load and check the configuration, printing a summary.
pub fn validate(path: Option<&Path>) -> anyhow::Result<()> {
    println!("Validating configuration...");
    let config = super::load_config(path)?;
    println!("  Config parsed successfully");

    let warnings = warnings(&config);
    if warnings.is_empty() {
        println!("  All checks passed");
    } else {
        println!();
        for w in &warnings {
            println!("  warning: {w}");
        }
    }

    println!();
    println!(
        "  Provider:  {}",
        config.default_provider.as_deref().unwrap_or("(probe API keys)")
    );
    println!("  Tier:      {}", config.default_tier);
    println!("  Nexus:     {}", config.nexus.url);
    println!("  Gateway:   {}:{}", config.gateway.host, config.gateway.port);
    Ok(())
}

/// Print the effective configuration with secrets redacted.
pub fn show(config: &AppConfig) {
    println!("{config:#?}");
}

pub fn path(path: Option<&Path>) {
    let path = path.map(Path::to_path_buf).unwrap_or_else(default_path);
    println!("{}", path.display());
}

/// Write the default configuration. Refuses to overwrite unless `force`.
pub fn init(path: Option<&Path>, force: bool) -> anyhow::Result<PathBuf> {
    let path = path.map(Path::to_path_buf).unwrap_or_else(default_path);
    if path.exists() && !force {
        anyhow::bail!(
            "{} already exists (use --force to overwrite)",
            path.display()
        );
    }
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    std::fs::write(&path, AppConfig::default_toml())
        .with_context(|| format!("Failed to write {}", path.display()))?;
    println!("Wrote {}", path.display());
    Ok(path)
}
