//! `agentry conversations` — inspect stored conversations.
//!
//! - `agentry conversations list` — summaries, newest first
//! - `agentry conversations show <ID>` — full message log
//! - `agentry conversations delete <ID>` — remove a conversation

use anyhow::{bail, Context, Result};
use clap::Subcommand;
use colored::Colorize;

use agentry_core::config::Config;
use agentry_core::conversation::{ConversationStore, JsonlConversationStore};

use crate::helpers;

// ─────────────────────────────────────────────
// Subcommand enum
// ─────────────────────────────────────────────

#[derive(Subcommand)]
pub enum ConversationsCommands {
    /// List stored conversations
    List,

    /// Print every message of a conversation
    Show {
        /// Conversation ID
        id: String,
    },

    /// Delete a conversation
    Delete {
        /// Conversation ID
        id: String,
    },
}

// ─────────────────────────────────────────────
// Dispatcher
// ─────────────────────────────────────────────

pub fn dispatch(config: &Config, cmd: ConversationsCommands) -> Result<()> {
    let store = open_store(config)?;
    match cmd {
        ConversationsCommands::List => list(&store),
        ConversationsCommands::Show { id } => show(&store, &id),
        ConversationsCommands::Delete { id } => delete(&store, &id),
    }
}

/// Open the on-disk store named in the config.
fn open_store(config: &Config) -> Result<JsonlConversationStore> {
    if !config.memory.long_term_enabled {
        bail!("long-term memory is disabled (memory.longTermEnabled = false); nothing is stored");
    }
    let dir = helpers::expand_tilde(&config.memory.directory);
    JsonlConversationStore::new(Some(dir.clone()))
        .with_context(|| format!("failed to open conversation store at {}", dir.display()))
}

// ─────────────────────────────────────────────
// Command implementations
// ─────────────────────────────────────────────

/// `agentry conversations list`
fn list(store: &dyn ConversationStore) -> Result<()> {
    let conversations = store.list().context("failed to list conversations")?;
    if conversations.is_empty() {
        println!("  No conversations yet. Start one with `agentry chat`.");
        return Ok(());
    }

    println!();
    println!("{}", "  Conversations".cyan().bold());
    println!();
    println!(
        "  {:<38} {:<10} {:<18} {}",
        "ID".bold(),
        "Messages".bold(),
        "Created".bold(),
        "Updated".bold(),
    );
    println!("  {}", "─".repeat(84));

    for summary in &conversations {
        println!(
            "  {:<38} {:<10} {:<18} {}",
            summary.id,
            summary.message_count,
            helpers::format_timestamp(summary.created_at),
            helpers::format_timestamp(summary.updated_at),
        );
    }

    println!();
    Ok(())
}

/// `agentry conversations show <ID>`
fn show(store: &dyn ConversationStore, id: &str) -> Result<()> {
    let conversation = store
        .load(id)
        .with_context(|| format!("cannot show conversation '{id}'"))?;

    println!();
    println!(
        "{} {}",
        "  Conversation".cyan().bold(),
        conversation.id.bold()
    );
    println!(
        "  {}",
        format!(
            "created {}, {} messages",
            helpers::format_timestamp(conversation.created_at),
            conversation.messages.len()
        )
        .dimmed()
    );
    println!();
    for message in &conversation.messages {
        println!("  {}", helpers::format_message(message));
    }
    println!();
    Ok(())
}

/// `agentry conversations delete <ID>`
fn delete(store: &dyn ConversationStore, id: &str) -> Result<()> {
    if store.delete(id).context("failed to delete conversation")? {
        println!("  {} deleted conversation {}", "✓".green(), id);
        Ok(())
    } else {
        bail!("conversation '{id}' not found")
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use agentry_core::types::Message;

    fn config_in(dir: &std::path::Path) -> Config {
        let mut config = Config::default();
        config.memory.directory = dir.to_string_lossy().into_owned();
        config
    }

    #[test]
    fn open_store_respects_disabled_memory() {
        let mut config = Config::default();
        config.memory.long_term_enabled = false;
        assert!(open_store(&config).is_err());
    }

    #[test]
    fn list_show_delete() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(&config_in(dir.path())).unwrap();
        store.append("abc", 0, &Message::user("hello")).unwrap();

        list(&store).unwrap();
        show(&store, "abc").unwrap();
        assert!(show(&store, "missing").is_err());

        delete(&store, "abc").unwrap();
        assert!(delete(&store, "abc").is_err());
        assert!(store.list().unwrap().is_empty());
    }
}
