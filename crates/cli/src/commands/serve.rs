//! `nexagent serve`: start the HTTP gateway.

use nexagent_config::AppConfig;

pub async fn run(
    mut config: AppConfig,
    host: Option<String>,
    port: Option<u16>,
) -> anyhow::Result<()> {
    if let Some(host) = host {
        config.gateway.host = host;
    }
    if let Some(port) = port {
        config.gateway.port = port;
    }

    println!("nexagent gateway");
    println!("   Listening: {}:{}", config.gateway.host, config.gateway.port);
    println!("   Nexus:     {}", config.nexus.url);

    nexagent_gateway::start(config)
        .await
        .map_err(|e| anyhow::anyhow!("Gateway failed: {e}"))
}
