//! Parsing of free-text replies.
//!
//! Every parser runs before any upstream call; a rejection is answered with a
//! format hint and nothing is sent to the provider.

use std::fmt;

use deckhand_api::{BuildFilter, EnvVar};

/// Why a reply was rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputError {
    /// `KEY=VALUE` expected
    MissingSeparator,
    /// Left side of `=` was blank
    EmptyKey,
    /// Bulk input without a single usable line
    NoValidLines,
    /// A single token was expected but the reply was blank or had spaces
    InvalidKey,
    /// Variable name outside `[A-Za-z_][A-Za-z0-9_.-]*`
    BadKeyName,
    /// Blank reply where text is required
    Empty,
    /// Build filter reply without any path
    NoPaths,
}

impl InputError {
    /// Hint shown to the user.
    pub fn hint(&self) -> &'static str {
        match self {
            Self::MissingSeparator => "Expected <code>KEY=VALUE</code>.",
            Self::EmptyKey => "The key before <code>=</code> must not be empty.",
            Self::NoValidLines => {
                "No valid <code>KEY=VALUE</code> line found. Send one variable per line."
            }
            Self::InvalidKey => "Send just the variable name, for example <code>API_URL</code>.",
            Self::BadKeyName => {
                "Variable names start with a letter or <code>_</code> and use only letters, digits, <code>_</code>, <code>.</code> and <code>-</code>."
            }
            Self::Empty => "The reply must not be empty.",
            Self::NoPaths => "Send at least one path, one per line.",
        }
    }
}

impl fmt::Display for InputError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingSeparator => write!(f, "missing '=' separator"),
            Self::EmptyKey => write!(f, "empty key"),
            Self::NoValidLines => write!(f, "no valid KEY=VALUE lines"),
            Self::InvalidKey => write!(f, "invalid variable name"),
            Self::BadKeyName => write!(f, "variable name has disallowed characters"),
            Self::Empty => write!(f, "empty reply"),
            Self::NoPaths => write!(f, "no paths"),
        }
    }
}

impl std::error::Error for InputError {}

/// `FOO=bar` into a trimmed key and value. Splits on the first `=`.
pub fn parse_env_assignment(text: &str) -> Result<EnvVar, InputError> {
    let (key, value) = text.split_once('=').ok_or(InputError::MissingSeparator)?;
    let key = key.trim();
    if key.is_empty() {
        return Err(InputError::EmptyKey);
    }
    if !EnvVar::is_valid_key(key) {
        return Err(InputError::BadKeyName);
    }
    Ok(EnvVar::new(key, value.trim()))
}

/// One assignment per line. Blank lines, `#` comments and lines that do not
/// parse are skipped; order is kept.
pub fn parse_env_lines(text: &str) -> Result<Vec<EnvVar>, InputError> {
    let vars: Vec<EnvVar> = text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| parse_env_assignment(line).ok())
        .collect();

    if vars.is_empty() {
        return Err(InputError::NoValidLines);
    }
    Ok(vars)
}

/// A bare variable name.
pub fn parse_env_key(text: &str) -> Result<String, InputError> {
    let key = text.trim();
    if key.is_empty() || key.contains(char::is_whitespace) || key.contains('=') {
        return Err(InputError::InvalidKey);
    }
    if !EnvVar::is_valid_key(key) {
        return Err(InputError::BadKeyName);
    }
    Ok(key.to_string())
}

/// Non-empty trimmed text (names, commands).
pub fn parse_required(text: &str) -> Result<String, InputError> {
    let value = text.trim();
    if value.is_empty() {
        return Err(InputError::Empty);
    }
    Ok(value.to_string())
}

/// One glob per line. `IGNORE <glob>` goes to the ignored list.
pub fn parse_build_filter(text: &str) -> Result<BuildFilter, InputError> {
    let mut filter = BuildFilter::default();
    for line in text.lines().map(str::trim).filter(|l| !l.is_empty()) {
        match line.strip_prefix("IGNORE") {
            Some(rest) if rest.starts_with(char::is_whitespace) => {
                filter.ignored_paths.push(rest.trim().to_string())
            }
            _ => filter.paths.push(line.to_string()),
        }
    }

    if filter.is_empty() {
        return Err(InputError::NoPaths);
    }
    Ok(filter)
}

/// Deletion confirmation: `CONFIRM` in any case, surrounding blanks ignored.
pub fn is_confirmation(text: &str) -> bool {
    text.trim().eq_ignore_ascii_case("CONFIRM")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_assignment() {
        assert_eq!(parse_env_assignment("FOO=bar").unwrap(), EnvVar::new("FOO", "bar"));
        assert_eq!(
            parse_env_assignment("  URL = postgres://x?a=b ").unwrap(),
            EnvVar::new("URL", "postgres://x?a=b")
        );
        assert_eq!(parse_env_assignment("EMPTY=").unwrap(), EnvVar::new("EMPTY", ""));
        assert_eq!(parse_env_assignment("FOO"), Err(InputError::MissingSeparator));
        assert_eq!(parse_env_assignment(" =bar"), Err(InputError::EmptyKey));
    }

    #[test]
    fn test_env_lines() {
        let vars = parse_env_lines("A=1\nB=2").unwrap();
        assert_eq!(vars, vec![EnvVar::new("A", "1"), EnvVar::new("B", "2")]);

        let vars = parse_env_lines("# comment\n\nB=2\nbroken\n=x\nA=1\n").unwrap();
        assert_eq!(vars, vec![EnvVar::new("B", "2"), EnvVar::new("A", "1")]);

        assert_eq!(parse_env_lines("nothing here\n# A=1"), Err(InputError::NoValidLines));
        assert_eq!(parse_env_lines(""), Err(InputError::NoValidLines));
    }

    #[test]
    fn test_env_key() {
        assert_eq!(parse_env_key(" API_URL ").unwrap(), "API_URL");
        assert_eq!(parse_env_key("A B"), Err(InputError::InvalidKey));
        assert_eq!(parse_env_key("A=1"), Err(InputError::InvalidKey));
        assert_eq!(parse_env_key("   "), Err(InputError::InvalidKey));
    }

    #[test]
    fn test_env_key_path_characters_rejected() {
        for key in ["..", ".", "A/B", "FOO#x", "FOO?y"] {
            assert_eq!(parse_env_key(key), Err(InputError::BadKeyName), "{key:?}");
            assert_eq!(
                parse_env_assignment(&format!("{key}=1")),
                Err(InputError::BadKeyName),
                "{key:?}"
            );
        }
        // Only the well-formed line survives a bulk reply.
        let vars = parse_env_lines("../x=1\nA/B=2\nOK=3").unwrap();
        assert_eq!(vars, vec![EnvVar::new("OK", "3")]);
        assert_eq!(parse_env_lines("FOO#x=1"), Err(InputError::NoValidLines));
    }

    #[test]
    fn test_build_filter() {
        let filter = parse_build_filter("src/**\nIGNORE docs/**\n\n  IGNORE   *.md ").unwrap();
        assert_eq!(filter.paths, vec!["src/**"]);
        assert_eq!(filter.ignored_paths, vec!["docs/**", "*.md"]);

        // A path that merely starts with the word stays a path.
        let filter = parse_build_filter("IGNORED/**").unwrap();
        assert_eq!(filter.paths, vec!["IGNORED/**"]);

        assert_eq!(parse_build_filter(" \n "), Err(InputError::NoPaths));
    }

    #[test]
    fn test_confirmation() {
        for text in ["CONFIRM", "confirm", "  Confirm  "] {
            assert!(is_confirmation(text), "{text:?}");
        }
        for text in ["yes", "CONFIRMED", "", "confirm please"] {
            assert!(!is_confirmation(text), "{text:?}");
        }
    }

    #[test]
    fn test_required() {
        assert_eq!(parse_required(" my-new-name ").unwrap(), "my-new-name");
        assert_eq!(parse_required("\n"), Err(InputError::Empty));
    }
}
