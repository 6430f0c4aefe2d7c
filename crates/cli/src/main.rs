//! TaskPilot CLI entry point.
//!
//! Commands:
//! - `serve` — Start the HTTP gateway
//! - `chat`  — Send a single message against the local store and provider

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "taskpilot",
    about = "TaskPilot — conversational todo list assistant",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP gateway server
    Serve {
        /// Override the bind port
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Send one message and print the assistant's reply
    Chat {
        /// The message to send
        message: String,

        /// Continue an existing conversation
        #[arg(short, long)]
        conversation: Option<i64>,

        /// Act as this user
        #[arg(short, long, default_value = "local")]
        user: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .init();

    match cli.command {
        Commands::Serve { port } => commands::serve::run(port).await?,
        Commands::Chat {
            message,
            conversation,
            user,
        } => commands::chat::run(&message, conversation, &user).await?,
    }

    Ok(())
}
