//! Utility helpers — path resolution and string manipulation.

use std::path::PathBuf;

/// Get the Agentry data directory (e.g. `~/.agentry/`).
pub fn get_data_path() -> PathBuf {
    let home = home_dir().unwrap_or_else(|| PathBuf::from("."));
    home.join(".agentry")
}

/// Get the default conversations directory (e.g. `~/.agentry/conversations/`).
pub fn get_conversations_path() -> PathBuf {
    get_data_path().join("conversations")
}

/// Truncate a string to `max_len` characters, adding "..." if truncated.
/// Unicode-safe.
pub fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", truncated)
    }
}

/// Encode a string as a filename, reversibly.
///
/// ASCII alphanumerics, `-` and `_` are kept; every other byte becomes `%XX`,
/// so two distinct inputs never share a filename.
pub fn encode_filename(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for byte in s.bytes() {
        if byte.is_ascii_alphanumeric() || byte == b'-' || byte == b'_' {
            out.push(char::from(byte));
        } else {
            out.push_str(&format!("%{byte:02X}"));
        }
    }
    out
}

/// Expand `~` to the home directory in a path string.
pub fn expand_home(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        let home = home_dir().unwrap_or_else(|| PathBuf::from("."));
        home.join(rest)
    } else if path == "~" {
        home_dir().unwrap_or_else(|| PathBuf::from("."))
    } else {
        PathBuf::from(path)
    }
}

fn home_dir() -> Option<PathBuf> {
    std::env::var("HOME")
        .ok()
        .map(PathBuf::from)
        .or_else(|| std::env::var("USERPROFILE").ok().map(PathBuf::from))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_short_string() {
        assert_eq!(truncate_string("hello", 10), "hello");
    }

    #[test]
    fn test_truncate_long_string() {
        let result = truncate_string("hello world, this is a long string", 15);
        assert_eq!(result, "hello world,...");
    }

    #[test]
    fn test_truncate_unicode() {
        let result = truncate_string("こんにちは世界です", 5);
        assert_eq!(result, "こん...");
    }

    #[test]
    fn test_encode_filename() {
        assert_eq!(encode_filename("hello world!"), "hello%20world%21");
        assert_eq!(encode_filename("team/a"), "team%2Fa");
        assert_eq!(encode_filename("team_a"), "team_a");
        assert_eq!(encode_filename("50%"), "50%25");
        assert_eq!(encode_filename("../x"), "%2E%2E%2Fx");
        assert_eq!(encode_filename("é"), "%C3%A9");
        assert_eq!(
            encode_filename("1b4e28ba-2fa1-11d2-883f-0016d3cca427"),
            "1b4e28ba-2fa1-11d2-883f-0016d3cca427"
        );
    }

    #[test]
    fn test_expand_home_tilde() {
        let expanded = expand_home("~/test/path");
        assert!(!expanded.starts_with("~"));
        assert!(expanded.to_str().unwrap().ends_with("test/path"));
    }

    #[test]
    fn test_expand_home_absolute() {
        assert_eq!(expand_home("/absolute/path"), PathBuf::from("/absolute/path"));
        assert_eq!(expand_home("relative"), PathBuf::from("relative"));
    }

    #[test]
    fn test_conversations_path() {
        let path = get_conversations_path();
        assert!(path.ends_with("conversations"));
        assert!(path.parent().unwrap().ends_with(".agentry"));
    }
}
