//! `taskpilot chat` — One-shot message against the local store and provider.

use anyhow::Context;
use taskpilot_config::AppConfig;

pub async fn run(message: &str, conversation: Option<i64>, user: &str) -> anyhow::Result<()> {
    let config = AppConfig::load().context("Failed to load config")?;

    if config.api_key.is_none() {
        eprintln!();
        eprintln!("  ERROR: No API key configured!");
        eprintln!();
        eprintln!("  Set one of these environment variables:");
        eprintln!("    TASKPILOT_API_KEY = 'sk-...'");
        eprintln!("    OPENAI_API_KEY    = 'sk-...'");
        eprintln!();
        eprintln!("  Or add `api_key` to taskpilot.toml.");
        eprintln!();
        anyhow::bail!("No API key found. See above for setup instructions.");
    }

    let state = taskpilot_gateway::build_state(&config)
        .await
        .map_err(|e| anyhow::anyhow!(e.to_string()))?;

    eprint!("  Thinking...");
    let outcome = state
        .orchestrator
        .process_message(user, conversation, message)
        .await
        .map_err(|e| anyhow::anyhow!("{}", e.user_message()))?;
    eprint!("\r              \r");

    for record in &outcome.tool_calls {
        let marker = if record.outcome.success { "ok" } else { "failed" };
        eprintln!("  [{}] {}", marker, record.tool);
    }
    println!("{}", outcome.response_text);
    eprintln!();
    eprintln!("  conversation: {}", outcome.conversation_id);

    Ok(())
}
