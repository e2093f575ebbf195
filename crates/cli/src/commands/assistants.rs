//! `nexagent assistants`: list addressable assistants.

use nexagent_agent::AssistantCatalog;
use nexagent_config::AppConfig;

pub fn run(config: &AppConfig, json: bool) -> anyhow::Result<()> {
    let assistants = AssistantCatalog::from_overrides(&config.assistants).list();

    if json {
        println!("{}", serde_json::to_string_pretty(&assistants)?);
        return Ok(());
    }

    for assistant in &assistants {
        println!("{}", assistant.id);
        println!("  {}", assistant.description);
        println!(
            "  provider: {}  tier: {}  guard: {:?}",
            assistant.default_provider.as_deref().unwrap_or("(default)"),
            assistant.default_tier.as_deref().unwrap_or("(default)"),
            assistant.guard,
        );
        if let Some(tools) = &assistant.tools {
            println!("  tools: {}", tools.join(", "));
        }
    }
    Ok(())
}
