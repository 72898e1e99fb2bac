//! System prompt construction.

use chrono::Local;

/// Default system prompt for an agent with no configured prompt.
pub fn default_system_prompt(name: &str, description: Option<&str>) -> String {
    let now = Local::now().format("%Y-%m-%d %H:%M:%S");
    let mut prompt = format!("You are an intelligent assistant named {name}.\n");
    if let Some(description) = description.filter(|d| !d.trim().is_empty()) {
        prompt.push_str(description.trim());
        prompt.push('\n');
    }
    prompt.push_str(&format!(
        "\nCurrent time: {now}\n\n\
         Give answers that are as useful, safe and honest as you can. \
         If you do not know the answer to a question, say so plainly \
         instead of making information up."
    ));
    prompt
}

/// The configured prompt if there is one, otherwise the default.
pub fn resolve_system_prompt(
    configured: Option<&str>,
    name: &str,
    description: Option<&str>,
) -> String {
    match configured {
        Some(prompt) if !prompt.trim().is_empty() => prompt.to_string(),
        _ => default_system_prompt(name, description),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_prompt_mentions_identity() {
        let prompt = default_system_prompt("Agentry", Some("Helps with arithmetic."));
        assert!(prompt.starts_with("You are an intelligent assistant named Agentry."));
        assert!(prompt.contains("Helps with arithmetic."));
        assert!(prompt.contains("Current time: "));
    }

    #[test]
    fn test_blank_description_skipped() {
        let prompt = default_system_prompt("Agentry", Some("   "));
        assert!(prompt.contains("Agentry.\n\nCurrent time"));
    }

    #[test]
    fn test_configured_prompt_wins() {
        assert_eq!(resolve_system_prompt(Some("Be brief."), "A", None), "Be brief.");
        assert!(resolve_system_prompt(Some(""), "A", None).contains("named A"));
        assert!(resolve_system_prompt(None, "A", None).contains("named A"));
    }
}
