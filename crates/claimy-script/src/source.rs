//! Script source locators
//!
//! A locator is a glob pattern that may reference environment variables as
//! `$NAME` or `${NAME}`. Unset variables expand to the empty string.
//! Expansion follows shell rules: `$$`, `$-`, `$1` and the other special
//! parameters are one-character names, a malformed `${` or `${}` is dropped,
//! and a `$` followed by anything else is kept as is.

use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::error::{Result, ScriptError};

/// A glob pattern naming zero or more script files
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLocator(String);

impl SourceLocator {
    /// Create a locator from an unexpanded pattern
    pub fn new(pattern: impl Into<String>) -> Self {
        Self(pattern.into())
    }

    /// Get the pattern as configured
    pub fn pattern(&self) -> &str {
        &self.0
    }

    /// The pattern with environment variables expanded
    pub fn expanded(&self) -> String {
        expand_env(&self.0, |name| std::env::var(name).ok())
    }

    /// Resolve the pattern to matching files, in lexical order
    ///
    /// A pattern matching nothing is not an error; it is logged and yields
    /// an empty list. Paths that cannot be traversed are skipped.
    pub fn resolve(&self) -> Result<Vec<PathBuf>> {
        let pattern = self.expanded();

        let paths = glob::glob(&pattern).map_err(|e| ScriptError::Pattern {
            pattern: pattern.clone(),
            message: e.to_string(),
        })?;

        let mut matches = Vec::new();
        for entry in paths {
            match entry {
                Ok(path) if path.is_file() => matches.push(path),
                Ok(_) => {}
                Err(e) => {
                    warn!(path = %e.path().display(), error = %e.error(), "Skipping unreadable path")
                }
            }
        }
        matches.sort();

        if matches.is_empty() {
            warn!(pattern = %pattern, "No scripts match pattern");
        } else {
            info!(pattern = %pattern, count = matches.len(), "Resolved script pattern");
        }

        Ok(matches)
    }
}

impl From<&str> for SourceLocator {
    fn from(pattern: &str) -> Self {
        Self::new(pattern)
    }
}

impl From<String> for SourceLocator {
    fn from(pattern: String) -> Self {
        Self(pattern)
    }
}

/// Script text paired with the name used in diagnostics
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptSource {
    /// Source identifier, normally the file path
    pub name: String,
    /// Script text
    pub code: String,
}

impl ScriptSource {
    /// Create a source from a name and its text
    pub fn new(name: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            code: code.into(),
        }
    }

    /// Read a script file, naming it by its path
    pub fn read(path: &Path) -> Result<ScriptSource> {
        info!(file = %path.display(), "Loading script");
        let code = std::fs::read_to_string(path).map_err(|source| ScriptError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(ScriptSource::new(path.display().to_string(), code))
    }
}

/// Expand `$NAME` and `${NAME}` using `lookup`
fn expand_env(input: &str, lookup: impl Fn(&str) -> Option<String>) -> String {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(idx) = rest.find('$') {
        out.push_str(&rest[..idx]);
        let after = &rest[idx + 1..];

        if after.is_empty() {
            out.push('$');
            rest = after;
            break;
        }

        let (name, width) = shell_name(after);
        match name {
            Some(name) => out.push_str(&lookup(name).unwrap_or_default()),
            None if width == 0 => out.push('$'),
            None => {}
        }
        rest = &after[width..];
    }

    out.push_str(rest);
    out
}

/// Split the variable name off the text following a `$`
///
/// Returns the name, if any, and how many bytes the reference spans. A
/// `None` name with a non-zero width is malformed syntax to be dropped.
fn shell_name(s: &str) -> (Option<&str>, usize) {
    let bytes = s.as_bytes();

    if bytes[0] == b'{' {
        if bytes.len() > 2 && is_special_param(bytes[1]) && bytes[2] == b'}' {
            return (Some(&s[1..2]), 3);
        }
        return match s[1..].find('}') {
            Some(0) => (None, 2),
            Some(end) => (Some(&s[1..end + 1]), end + 2),
            None => (None, 1),
        };
    }

    if is_special_param(bytes[0]) {
        return (Some(&s[..1]), 1);
    }

    let len = bytes
        .iter()
        .take_while(|b| b.is_ascii_alphanumeric() || **b == b'_')
        .count();
    if len == 0 {
        (None, 0)
    } else {
        (Some(&s[..len]), len)
    }
}

fn is_special_param(b: u8) -> bool {
    matches!(b, b'*' | b'#' | b'$' | b'@' | b'!' | b'?' | b'-' | b'0'..=b'9')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lookup(name: &str) -> Option<String> {
        match name {
            "HOME" => Some("/home/claimy".into()),
            "DIR" => Some("scripts".into()),
            _ => None,
        }
    }

    #[test]
    fn test_expand_plain_and_braced() {
        assert_eq!(expand_env("$HOME/x/*.rhai", lookup), "/home/claimy/x/*.rhai");
        assert_eq!(expand_env("${HOME}/${DIR}/*.rhai", lookup), "/home/claimy/scripts/*.rhai");
        assert_eq!(expand_env("${DIR}_v2", lookup), "scripts_v2");
    }

    #[test]
    fn test_expand_unset_is_empty() {
        assert_eq!(expand_env("/etc/$MISSING/a", lookup), "/etc//a");
        assert_eq!(expand_env("${MISSING}a", lookup), "a");
    }

    #[test]
    fn test_expand_literal_dollars() {
        assert_eq!(expand_env("cost$", lookup), "cost$");
        assert_eq!(expand_env("a$%b", lookup), "a$%b");
        assert_eq!(expand_env("$/x", lookup), "$/x");
    }

    #[test]
    fn test_expand_special_params() {
        assert_eq!(expand_env("a$-b", lookup), "ab");
        assert_eq!(expand_env("$$x", lookup), "x");
        assert_eq!(expand_env("$1HOME", lookup), "HOME");
        assert_eq!(expand_env("${?}z", lookup), "z");
    }

    #[test]
    fn test_expand_malformed_braces_dropped() {
        assert_eq!(expand_env("${HOME", lookup), "HOME");
        assert_eq!(expand_env("a${}b", lookup), "ab");
    }

    #[test]
    fn test_invalid_pattern() {
        let result = SourceLocator::new("[").resolve();
        assert!(matches!(result, Err(ScriptError::Pattern { .. })));
    }

    #[test]
    fn test_no_match_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let pattern = format!("{}/*.rhai", dir.path().display());
        assert!(SourceLocator::new(pattern).resolve().unwrap().is_empty());
    }

    #[test]
    fn test_matches_sorted() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b.rhai", "a.rhai", "c.txt"] {
            std::fs::write(dir.path().join(name), "").unwrap();
        }

        let pattern = format!("{}/*.rhai", dir.path().display());
        let matches = SourceLocator::new(pattern).resolve().unwrap();
        let names: Vec<_> = matches
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.rhai", "b.rhai"]);
    }
}
