//! Shellwright CLI — the main entry point.
//!
//! Commands:
//! - `agent`     — Interactive session or single-shot mode
//! - `config`    — Create, show, locate, or validate the config file
//! - `providers` — List supported LLM providers

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "shellwright",
    about = "Shellwright — an AI assistant for your terminal",
    version,
    author
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
    /// Work with the agent
    Agent {
        /// Run a single request non-interactively instead of starting a session
        #[arg(short, long)]
        message: Option<String>,

        /// Override the configured provider
        #[arg(long, env = "SHELLWRIGHT_PROVIDER")]
        provider: Option<String>,

        /// Override the provider's model
        #[arg(long)]
        model: Option<String>,

        /// Override the turn budget for each request
        #[arg(long)]
        max_turns: Option<u32>,
    },

    /// Manage the configuration file
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// List supported LLM providers
    Providers,
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Write a default config file if none exists
    Init,
    /// Print the effective configuration
    Show,
    /// Print the config file path
    Path,
    /// Check the configuration for errors
    Validate,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Agent {
            message,
            provider,
            model,
            max_turns,
        } => {
            let overrides = commands::agent::Overrides {
                provider,
                model,
                max_turns,
            };
            commands::agent::run(message, overrides).await?
        }
        Commands::Config { action } => match action {
            ConfigAction::Init => commands::config_cmd::init().await?,
            ConfigAction::Show => commands::config_cmd::show().await?,
            ConfigAction::Path => commands::config_cmd::path().await?,
            ConfigAction::Validate => commands::config_cmd::validate().await?,
        },
        Commands::Providers => commands::providers::run().await?,
    }

    Ok(())
}
