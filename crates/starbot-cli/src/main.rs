//! StarBot CLI — entry point.
//!
//! # Commands
//!
//! - `starbot agent [-m MESSAGE] [--yes] [--logs]` — chat (single-shot or REPL)
//! - `starbot onboard` — setup wizard for the model endpoint
//! - `starbot status` — show configuration and tools
//!
//! Every command accepts `--config PATH` to use a config file other than
//! `~/.starbot/config.json`.

mod helpers;
mod onboard;
mod repl;
mod status;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;

use starbot_agent::{builtin_registry, Agent, AgentOptions, PromptBuilder};
use starbot_core::config::{load_config, Config};
use starbot_providers::HttpProvider;

// ─────────────────────────────────────────────
// CLI definition
// ─────────────────────────────────────────────

/// ★ StarBot — a local AI agent that can run code, edit files and search the web
#[derive(Parser)]
#[command(name = "starbot", version, about, long_about = None)]
struct Cli {
    /// Config file (defaults to ~/.starbot/config.json)
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Chat with the agent (single-shot or interactive REPL)
    Agent {
        /// Single message (non-interactive). Omit for REPL mode.
        #[arg(short, long)]
        message: Option<String>,

        /// Approve every dangerous tool call without asking
        #[arg(short = 'y', long, default_value_t = false)]
        yes: bool,

        /// Enable debug logging (stderr)
        #[arg(long, default_value_t = false)]
        logs: bool,
    },

    /// Configure API key, base URL and model
    Onboard,

    /// Show configuration and registered tools
    Status,
}

// ─────────────────────────────────────────────
// Entrypoint
// ─────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config_path = cli.config.as_deref();

    match cli.command {
        Commands::Agent { message, yes, logs } => {
            init_logging(logs);
            run_agent(config_path, message, yes).await
        }
        Commands::Onboard => onboard::run(config_path),
        Commands::Status => status::run(config_path),
    }
}

// ─────────────────────────────────────────────
// Agent command
// ─────────────────────────────────────────────

async fn run_agent(
    config_path: Option<&Path>,
    message: Option<String>,
    auto_approve: bool,
) -> Result<()> {
    let config = load_config(config_path);

    match message {
        Some(msg) => {
            if !config.model.is_configured() {
                bail!("No API key configured. Run `starbot onboard` or set STARBOT_API_KEY.");
            }
            let agent = build_agent(&config)?;
            info!(chars = msg.len(), "processing single message");
            repl::run_once(agent, &msg, auto_approve).await
        }
        None => {
            let config = onboard::ensure_configured(config, config_path)?;
            let agent = build_agent(&config)?;
            repl::run(agent, auto_approve).await
        }
    }
}

/// Wire provider, tools and system prompt into an [`Agent`].
fn build_agent(config: &Config) -> Result<Agent> {
    let provider = HttpProvider::new(&config.model).context("failed to create model provider")?;
    let tools = builtin_registry(&config.tools);
    let system_prompt = PromptBuilder::new(config.agent.system_prompt.as_str()).build();

    Ok(Agent::new(
        Arc::new(provider),
        Arc::new(tools),
        &system_prompt,
        AgentOptions::from_config(config),
    ))
}

/// Initialize tracing on stderr so log lines never mix with streamed answers.
fn init_logging(verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if verbose {
            EnvFilter::new("starbot=debug,info")
        } else {
            EnvFilter::new("warn")
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();
}
