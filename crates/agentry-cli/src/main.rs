//! Agentry CLI — entry point.
//!
//! # Commands
//!
//! - `agentry chat [-m MESSAGE] [-c ID]` — chat (single-shot or REPL)
//! - `agentry conversations {list,show,delete}` — inspect stored conversations
//! - `agentry cache clear [--all]` — drop expired (or all) cached responses
//! - `agentry tools` — list the built-in tools
//! - `agentry status` — show configuration and provider status
//! - `agentry init` — write a default config and create data directories

mod cache_cmd;
mod conversations_cmd;
mod helpers;
mod init;
mod repl;
mod status;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;

use agentry_agent::Agent;
use agentry_core::config::{load_config, Config, LoggingConfig};
use agentry_providers::create_provider;

// ─────────────────────────────────────────────
// CLI definition
// ─────────────────────────────────────────────

/// Agentry — a small tool-calling agent for hosted LLMs
#[derive(Parser)]
#[command(name = "agentry", version, about, long_about = None)]
struct Cli {
    /// Path to config.json (default: ~/.agentry/config.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Chat with the agent (single-shot or interactive REPL)
    Chat {
        /// Single message (non-interactive). Omit for REPL mode.
        #[arg(short, long)]
        message: Option<String>,

        /// Continue a stored conversation instead of starting a new one
        #[arg(short, long)]
        conversation: Option<String>,

        /// Enable debug logging
        #[arg(long, default_value_t = false)]
        logs: bool,
    },

    /// Inspect stored conversations
    Conversations {
        #[command(subcommand)]
        action: conversations_cmd::ConversationsCommands,
    },

    /// Manage the response cache
    Cache {
        #[command(subcommand)]
        action: cache_cmd::CacheCommands,
    },

    /// List the tools available to the agent
    Tools,

    /// Show configuration and provider status
    Status,

    /// Write a default config and create data directories
    Init,
}

// ─────────────────────────────────────────────
// Entrypoint
// ─────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config_path = cli.config.as_deref();

    match cli.command {
        Commands::Chat {
            message,
            conversation,
            logs,
        } => {
            let config = load_config(config_path);
            init_logging(&config.logging, logs)?;
            run_chat(&config, message, conversation).await
        }
        Commands::Conversations { action } => {
            let config = load_config(config_path);
            init_logging(&config.logging, false)?;
            conversations_cmd::dispatch(&config, action)
        }
        Commands::Cache { action } => {
            let config = load_config(config_path);
            init_logging(&config.logging, false)?;
            cache_cmd::dispatch(&config, action)
        }
        Commands::Tools => {
            helpers::print_tools();
            Ok(())
        }
        Commands::Status => status::run(config_path),
        Commands::Init => init::run(config_path),
    }
}

// ─────────────────────────────────────────────
// Chat command
// ─────────────────────────────────────────────

async fn run_chat(
    config: &Config,
    message: Option<String>,
    conversation: Option<String>,
) -> Result<()> {
    let agent = build_agent(config)?;

    let conversation_id = match conversation {
        Some(id) => {
            agent
                .load_conversation(&id)
                .with_context(|| format!("cannot continue conversation '{id}'"))?;
            id
        }
        None => agent
            .new_conversation()
            .context("failed to start a conversation")?,
    };

    match message {
        Some(msg) => {
            info!(conversation = %conversation_id, "processing single message");
            let response = agent
                .process(&conversation_id, &msg)
                .await
                .context("agent processing failed")?;
            helpers::print_response(&config.agent.name, &response);
            helpers::print_conversation_hint(&conversation_id);
        }
        None => {
            repl::run(agent, &config.agent.name, conversation_id).await?;
        }
    }

    Ok(())
}

/// Build an `Agent` from the loaded configuration.
pub fn build_agent(config: &Config) -> Result<Agent> {
    let provider = create_provider(&config.agent.provider, &config.providers)
        .with_context(|| format!("cannot use provider '{}'", config.agent.provider))?;

    Agent::from_config(config, provider).context("failed to initialize agent")
}

// ─────────────────────────────────────────────
// Logging
// ─────────────────────────────────────────────

/// Filter used by `--logs`.
const VERBOSE_FILTER: &str = "info,agentry_core=debug,agentry_providers=debug,agentry_agent=debug";

/// Install the tracing subscriber.
///
/// `RUST_LOG` wins over `logging.level`; `--logs` wins over both.
fn init_logging(logging: &LoggingConfig, verbose: bool) -> Result<()> {
    use tracing_subscriber::EnvFilter;

    let filter = if verbose {
        EnvFilter::new(VERBOSE_FILTER)
    } else {
        EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(&logging.level))
            .unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    match logging.file.as_deref() {
        Some(file) => {
            let path = helpers::expand_tilde(file);
            let writer = open_log_file(&path)?;
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::sync::Mutex::new(writer))
                .with_ansi(false)
                .init();
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .with_target(false)
                .compact()
                .init();
        }
    }
    Ok(())
}

fn open_log_file(path: &Path) -> Result<std::fs::File> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create log directory {}", parent.display()))?;
    }
    std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("failed to open log file {}", path.display()))
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
