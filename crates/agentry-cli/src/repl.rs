//! Interactive REPL.
//!
//! Uses `rustyline` for readline-style editing with persistent history.
//! Lines starting with `/` are REPL commands; everything else is a turn.

use anyhow::Result;
use colored::Colorize;
use rustyline::config::Configurer;
use rustyline::history::DefaultHistory;
use rustyline::{DefaultEditor, Editor};
use tracing::debug;

use agentry_agent::Agent;

use crate::helpers;

/// Exit commands (case-insensitive match).
const EXIT_COMMANDS: &[&str] = &["exit", "quit", "/exit", "/quit", ":q"];

/// REPL commands other than exit.
#[derive(Debug, PartialEq, Eq)]
enum ReplCommand {
    /// Start a fresh conversation.
    New,
    /// Drop the short-term window of the current conversation.
    Clear,
    /// Print the full persisted log.
    History,
    Help,
    Unknown(String),
}

fn parse_command(input: &str) -> Option<ReplCommand> {
    let command = input.strip_prefix('/')?;
    let command = command.split_whitespace().next().unwrap_or_default();
    Some(match command.to_lowercase().as_str() {
        "new" => ReplCommand::New,
        "clear" => ReplCommand::Clear,
        "history" => ReplCommand::History,
        "help" | "?" => ReplCommand::Help,
        other => ReplCommand::Unknown(other.to_string()),
    })
}

/// Run the interactive REPL loop.
pub async fn run(agent: Agent, agent_name: &str, conversation_id: String) -> Result<()> {
    let mut conversation_id = conversation_id;
    helpers::print_banner(agent_name, &conversation_id);

    let mut editor = create_editor()?;

    loop {
        let input = match editor.readline("You: ") {
            Ok(line) => line,
            Err(rustyline::error::ReadlineError::Interrupted) => break,
            Err(rustyline::error::ReadlineError::Eof) => break,
            Err(e) => {
                eprintln!("Input error: {e}");
                break;
            }
        };

        let trimmed = input.trim();
        if trimmed.is_empty() {
            continue;
        }

        if is_exit_command(trimmed) {
            println!("\nGoodbye!");
            break;
        }

        let _ = editor.add_history_entry(&input);

        if let Some(command) = parse_command(trimmed) {
            run_command(&agent, &mut conversation_id, command);
            continue;
        }

        debug!(conversation = %conversation_id, input = trimmed, "processing input");
        helpers::print_thinking();

        match agent.process(&conversation_id, trimmed).await {
            Ok(response) => {
                helpers::clear_thinking();
                helpers::print_response(agent_name, &response);
            }
            Err(e) => {
                helpers::clear_thinking();
                eprintln!("\n{} {e}\n", "Error:".red().bold());
            }
        }
    }

    save_history(&mut editor);
    helpers::print_conversation_hint(&conversation_id);

    Ok(())
}

fn run_command(agent: &Agent, conversation_id: &mut String, command: ReplCommand) {
    match command {
        ReplCommand::New => match agent.new_conversation() {
            Ok(id) => {
                println!("{}", format!("Started conversation {id}").dimmed());
                agent.close_conversation(conversation_id);
                *conversation_id = id;
            }
            Err(e) => eprintln!("{} {e}", "Error:".red().bold()),
        },
        ReplCommand::Clear => {
            agent.clear_memory(conversation_id);
            println!("{}", "Short-term memory cleared.".dimmed());
        }
        ReplCommand::History => match agent.history(conversation_id) {
            Ok(messages) => {
                println!();
                for message in &messages {
                    println!("  {}", helpers::format_message(message));
                }
                println!();
            }
            Err(e) => eprintln!("{} {e}", "Error:".red().bold()),
        },
        ReplCommand::Help => {
            println!();
            println!("  {:<10} start a new conversation", "/new".bold());
            println!("  {:<10} forget the current context window", "/clear".bold());
            println!("  {:<10} show this conversation's full history", "/history".bold());
            println!("  {:<10} leave", "exit".bold());
            println!();
        }
        ReplCommand::Unknown(name) => {
            eprintln!("Unknown command '/{name}'. Type /help for commands.");
        }
    }
}

/// Create a rustyline editor with history.
fn create_editor() -> Result<Editor<(), DefaultHistory>> {
    let mut editor = DefaultEditor::new()?;
    editor.set_max_history_size(1000)?;

    let history_path = history_path();
    if history_path.exists() {
        let _ = editor.load_history(&history_path);
        debug!("loaded REPL history from {}", history_path.display());
    }

    Ok(editor)
}

/// Save history to disk.
fn save_history(editor: &mut Editor<(), DefaultHistory>) {
    let path = history_path();
    if let Some(parent) = path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }
    if let Err(e) = editor.save_history(&path) {
        debug!("failed to save history: {e}");
    }
}

/// Path to the history file.
fn history_path() -> std::path::PathBuf {
    agentry_core::utils::get_data_path()
        .join("history")
        .join("cli_history")
}

/// Check if input is an exit command.
fn is_exit_command(input: &str) -> bool {
    let lower = input.to_lowercase();
    EXIT_COMMANDS.contains(&lower.as_str())
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
