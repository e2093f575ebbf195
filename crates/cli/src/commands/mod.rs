pub mod assistants;
pub mod config_cmd;
pub mod run;
pub mod serve;
pub mod status;
pub mod tools;

use anyhow::Context;
use nexagent_config::AppConfig;
use std::path::Path;

/// Load from `path` when given, else from the default location.
pub fn load_config(path: Option<&Path>) -> anyhow::Result<AppConfig> {
    match path {
        Some(path) => {
            let mut config = AppConfig::load_from(path)
                .with_context(|| format!("Failed to load config from {}", path.display()))?;
            config.apply_env(|key| std::env::var(key).ok())?;
            Ok(config)
        }
        None => AppConfig::load().context("Failed to load config"),
    }
}
