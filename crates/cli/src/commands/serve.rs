//! `taskpilot serve` — Start the HTTP API server.

use anyhow::Context;
use taskpilot_config::AppConfig;

pub async fn run(port_override: Option<u16>) -> anyhow::Result<()> {
    let mut config = AppConfig::load().context("Failed to load config")?;

    if let Some(port) = port_override {
        config.gateway.port = port;
    }

    println!("TaskPilot Gateway");
    println!(
        "   Listening: {}:{}",
        config.gateway.host, config.gateway.port
    );
    println!("   Model:     {}", config.model);
    println!("   Database:  {}", config.database_url);

    taskpilot_gateway::serve(config)
        .await
        .map_err(|e| anyhow::anyhow!(e.to_string()))?;

    Ok(())
}
