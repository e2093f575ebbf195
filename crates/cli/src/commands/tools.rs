//! `nexagent tools`: list the tools this configuration registers.

use nexagent_agent::AgentRuntime;
use nexagent_config::AppConfig;

pub fn run(config: &AppConfig, json: bool) -> anyhow::Result<()> {
    let runtime = AgentRuntime::from_config(config);
    let tools = runtime.tools().list_schemas();

    if json {
        println!("{}", serde_json::to_string_pretty(&tools)?);
        return Ok(());
    }

    println!("{} tool(s) registered", tools.len());
    for tool in &tools {
        let summary = tool.description.lines().next().unwrap_or_default();
        println!("  {:<26} {summary}", tool.name);
    }

    let gates = &config.tools.gates;
    let disabled: Vec<String> = [
        ("web_search", &gates.web_search),
        ("web_crawl", &gates.web_crawl),
        ("search_dental_literature", &gates.search_dental_literature),
    ]
    .into_iter()
    .filter(|(name, _)| !tools.iter().any(|t| t.name == *name))
    .map(|(name, key)| format!("{name} (set {key})"))
    .collect();
    if !disabled.is_empty() {
        println!();
        println!("Disabled: {}", disabled.join(", "));
    }
    Ok(())
}
