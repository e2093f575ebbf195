//! `nexagent status`: show what this process would run with.

use nexagent_config::{AppConfig, PROVIDER_KEY_ENV};

pub fn run(config: &AppConfig) {
    println!("nexagent status");
    println!("===============");
    println!("  Config dir:       {}", AppConfig::config_dir().display());
    println!(
        "  Default provider: {}",
        config.default_provider.as_deref().unwrap_or("(probe API keys)")
    );
    println!("  Default tier:     {}", config.default_tier);
    println!("  Max iterations:   {}", config.agent.max_iterations);
    println!("  Policy retries:   {}", config.agent.max_policy_rejections);
    println!("  Nexus:            {}", config.nexus.url);
    println!("  Gateway:          {}:{}", config.gateway.host, config.gateway.port);
    println!();
    println!("  Provider keys:");
    for (provider, vars) in PROVIDER_KEY_ENV {
        let mark = if config.has_api_key(provider) { "set" } else { "missing" };
        println!("    {provider:<12} {mark:<8} ({})", vars.join(" / "));
    }

    let config_path = AppConfig::config_dir().join("config.toml");
    if !config_path.exists() {
        println!();
        println!("  No config file; run `nexagent config init` to create one");
    }
}
