//! Error types for claim scripts

use std::path::PathBuf;
use thiserror::Error;

/// Result type for script operations
pub type Result<T> = std::result::Result<T, ScriptError>;

/// Errors that can occur while loading, compiling or running scripts
#[derive(Error, Debug)]
pub enum ScriptError {
    /// A source locator is not a valid glob pattern
    #[error("Invalid script pattern '{pattern}': {message}")]
    Pattern { pattern: String, message: String },

    /// A matched script file could not be read
    #[error("Unable to read script {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A script failed to parse
    #[error("Failed to compile script '{script}': {message}")]
    Compile { script: String, message: String },

    /// A script failed while running
    #[error("Script '{script}' failed: {message}")]
    Runtime { script: String, message: String },

    /// A prototype global could not be converted to a script value
    #[error("Invalid global '{name}': {message}")]
    Global { name: String, message: String },
}

impl ScriptError {
    /// The script this error refers to, if any
    pub fn script(&self) -> Option<&str> {
        match self {
            ScriptError::Compile { script, .. } | ScriptError::Runtime { script, .. } => {
                Some(script)
            }
            _ => None,
        }
    }
}
