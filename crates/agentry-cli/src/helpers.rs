//! Shared CLI helpers — path expansion, message printing, banner.

use std::path::PathBuf;

use chrono::{DateTime, Local, Utc};
use colored::Colorize;

use agentry_agent::tools::{builtin_tools, Tool};
use agentry_core::types::Message;
use agentry_core::utils::truncate_string;

/// Expand `~` at the start of a path to the user's home directory.
pub fn expand_tilde(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs_next::home_dir() {
            return home.join(rest);
        }
    }
    if path == "~" {
        if let Some(home) = dirs_next::home_dir() {
            return home;
        }
    }
    PathBuf::from(path)
}

/// Print an agent response to stdout.
pub fn print_response(agent_name: &str, response: &str) {
    println!();
    println!("{}", agent_name.cyan().bold());
    if response.is_empty() {
        println!("{}", "(no response)".dimmed());
    } else {
        println!("{response}");
    }
    println!();
}

/// Tell the user how to continue a conversation later.
pub fn print_conversation_hint(conversation_id: &str) {
    eprintln!(
        "{}",
        format!("conversation: {conversation_id} (continue with `agentry chat -c {conversation_id}`)")
            .dimmed()
    );
}

/// Print the banner shown at REPL start.
pub fn print_banner(agent_name: &str, conversation_id: &str) {
    let version = env!("CARGO_PKG_VERSION");
    println!();
    println!("{}  v{}", agent_name.cyan().bold(), version.dimmed());
    println!("{}", format!("conversation {conversation_id}").dimmed());
    println!(
        "{}",
        "Type a message, /help for commands, or \"exit\" to quit.".dimmed()
    );
    println!();
}

/// Print a "thinking" placeholder while the model works.
pub fn print_thinking() {
    eprint!("{}", "⠿ thinking...".dimmed());
}

/// Clear the "thinking" placeholder.
pub fn clear_thinking() {
    eprint!("\r{}\r", " ".repeat(40));
}

/// One line per message, for history views.
pub fn format_message(message: &Message) -> String {
    let role = format!("{:<9}", message.role().to_string());
    let role = match message {
        Message::System { .. } => role.dimmed(),
        Message::User { .. } => role.green().bold(),
        Message::Assistant { .. } => role.cyan().bold(),
        Message::Tool { .. } => role.yellow(),
    };

    let body = match message {
        Message::Assistant {
            content,
            tool_calls,
        } if !tool_calls.is_empty() => {
            let calls: Vec<String> = tool_calls
                .iter()
                .map(|c| format!("{}({})", c.name, c.arguments))
                .collect();
            let prefix = content.as_deref().map(|t| format!("{t} ")).unwrap_or_default();
            format!("{prefix}→ {}", calls.join(", "))
        }
        Message::Tool {
            content,
            tool_call_id,
        } => format!("[{tool_call_id}] {content}"),
        other => other.text().unwrap_or_default().to_string(),
    };

    format!("{role} {}", truncate_string(&body.replace('\n', " "), 200))
}

/// Render a UTC timestamp in local time.
pub fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string()
}

/// `agentry tools`
pub fn print_tools() {
    println!();
    println!("{}", "  Tools".cyan().bold());
    println!();
    for tool in builtin_tools() {
        let params = tool.parameters();
        let names: Vec<&str> = params["properties"]
            .as_object()
            .map(|props| props.keys().map(String::as_str).collect())
            .unwrap_or_default();
        println!(
            "  {:<14} {} {}",
            tool.name().bold(),
            tool.description(),
            format!("({})", names.join(", ")).dimmed()
        );
    }
    println!();
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
