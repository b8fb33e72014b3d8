//! Service configuration
//!
//! Loaded from an optional TOML file, then overridden by environment
//! variables:
//!
//! ```toml
//! address = "0.0.0.0:8080"
//! scripts = ["$CLAIMY_HOME/claims/*.rhai"]
//! valid_for = "15m"
//! max_operations = 100000
//! shutdown_grace = "10s"
//!
//! [claims]
//! iss = "https://issuer.example"
//!
//! [globals]
//! environment = "staging"
//! ```

use claimy_core::ClaimSet;
use claimy_script::SourceLocator;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::info;

/// Names a config file explicitly; the file must exist
pub const CONFIG_ENV: &str = "CLAIMY_CONFIG";
/// Overrides `address`
pub const ADDRESS_ENV: &str = "CLAIMY_ADDRESS";
/// Overrides `valid_for`
pub const VALID_FOR_ENV: &str = "CLAIMY_VALID_FOR";
/// Overrides `max_operations`
pub const MAX_OPERATIONS_ENV: &str = "CLAIMY_MAX_OPERATIONS";

const CONFIG_FILE: &str = "claimy.toml";

/// Errors raised while loading configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Config file {} does not exist", .0.display())]
    Missing(PathBuf),

    #[error("Unable to read config file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config file {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: Box<toml::de::Error>,
    },

    #[error("Invalid value for {name}: {message}")]
    Env { name: &'static str, message: String },
}

/// Service configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Listen address
    pub address: SocketAddr,

    /// Script glob patterns, run in this order
    pub scripts: Vec<String>,

    /// Claims added to every token, overriding anything a script sets
    pub claims: ClaimSet,

    /// Variables seeded into every script's scope
    pub globals: BTreeMap<String, serde_json::Value>,

    /// Token lifetime; zero issues tokens without `exp`
    #[serde(with = "humantime_serde")]
    pub valid_for: Duration,

    /// Operation budget per script run; zero is unlimited
    pub max_operations: u64,

    /// How long in-flight requests may drain after a shutdown signal
    #[serde(with = "humantime_serde")]
    pub shutdown_grace: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            address: SocketAddr::from(([0, 0, 0, 0], 8080)),
            scripts: Vec::new(),
            claims: ClaimSet::new(),
            globals: BTreeMap::new(),
            valid_for: Duration::ZERO,
            max_operations: 0,
            shutdown_grace: Duration::from_secs(10),
        }
    }
}

impl Config {
    /// Load configuration from the process environment
    ///
    /// Uses `CLAIMY_CONFIG` when set, otherwise the first existing file among
    /// `./claimy.toml`, `$HOME/.claimy/claimy.toml` and
    /// `/etc/claimy/claimy.toml`. With no file, defaults apply.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_with(|name| std::env::var(name).ok())
    }

    /// Load configuration, reading environment variables through `env`
    pub fn load_with(env: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let config = match env(CONFIG_ENV) {
            Some(path) => {
                let path = PathBuf::from(path);
                if !path.is_file() {
                    return Err(ConfigError::Missing(path));
                }
                Self::from_file(&path)?
            }
            None => match search_paths(env("HOME")).into_iter().find(|p| p.is_file()) {
                Some(path) => Self::from_file(&path)?,
                None => {
                    info!("No config file found, using defaults");
                    Self::default()
                }
            },
        };

        config.with_env_overrides(env)
    }

    /// Read and parse a TOML config file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let config = toml::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source: Box::new(source),
        })?;

        info!(path = %path.display(), "Loaded config file");
        Ok(config)
    }

    /// Apply `CLAIMY_*` overrides on top of file values
    pub fn with_env_overrides(
        mut self,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        if let Some(value) = env(ADDRESS_ENV) {
            self.address = value.parse().map_err(|e: std::net::AddrParseError| {
                ConfigError::Env {
                    name: ADDRESS_ENV,
                    message: e.to_string(),
                }
            })?;
        }

        if let Some(value) = env(VALID_FOR_ENV) {
            self.valid_for = humantime::parse_duration(&value).map_err(|e| ConfigError::Env {
                name: VALID_FOR_ENV,
                message: e.to_string(),
            })?;
        }

        if let Some(value) = env(MAX_OPERATIONS_ENV) {
            self.max_operations = value.parse().map_err(|e: std::num::ParseIntError| {
                ConfigError::Env {
                    name: MAX_OPERATIONS_ENV,
                    message: e.to_string(),
                }
            })?;
        }

        Ok(self)
    }

    /// Script patterns as locators
    pub fn script_locators(&self) -> Vec<SourceLocator> {
        self.scripts.iter().map(SourceLocator::new).collect()
    }
}

fn search_paths(home: Option<String>) -> Vec<PathBuf> {
    let mut paths = vec![PathBuf::from(CONFIG_FILE)];
    if let Some(home) = home {
        paths.push(Path::new(&home).join(".claimy").join(CONFIG_FILE));
    }
    paths.push(Path::new("/etc/claimy").join(CONFIG_FILE));
    paths
}

/// Serde adapter for humantime duration strings such as `"90s"` or `"1h 30m"`
mod humantime_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&humantime::format_duration(*value))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let raw = String::deserialize(deserializer)?;
        humantime::parse_duration(&raw).map_err(serde::de::Error::custom)
    }
}
