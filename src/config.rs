use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::logging::warn;

/// File name searched for by `Config::discover`
pub const CONFIG_FILE_NAME: &str = "typthon-bind.toml";

static GLOBAL: OnceCell<Config> = OnceCell::new();

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("failed to write config {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub dispatch: DispatchConfig,

    #[serde(default)]
    pub protocol: ProtocolConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Overload dispatch behavior
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DispatchConfig {
    /// Append the candidate arities to the "no matching overload" message
    #[serde(default = "default_true")]
    pub list_candidates: bool,

    #[serde(default = "default_16")]
    pub max_listed_candidates: usize,
}

/// Host protocol behavior of the trampolines
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProtocolConfig {
    /// Raise IndexError in the item trampoline when a length slot exists
    #[serde(default = "default_true")]
    pub sequence_bounds_check: bool,

    /// Add the sequence length to negative indices before calling the item slot
    #[serde(default = "default_true")]
    pub normalize_negative_indices: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_level")]
    pub level: String,

    #[serde(default)]
    pub json: bool,

    #[serde(default)]
    pub file: Option<String>,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            list_candidates: true,
            max_listed_candidates: 16,
        }
    }
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            sequence_bounds_check: true,
            normalize_negative_indices: true,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            json: false,
            file: None,
        }
    }
}

fn default_true() -> bool { true }
fn default_16() -> usize { 16 }
fn default_level() -> String { "info".to_string() }

impl Config {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        Self::parse(&content)
    }

    /// Parse configuration from TOML string
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Find and load configuration file from current directory or parents
    pub fn discover() -> Self {
        match std::env::current_dir() {
            Ok(dir) => Self::discover_from(&dir),
            Err(_) => Self::default(),
        }
    }

    /// Walk up from `start` looking for `typthon-bind.toml`
    pub fn discover_from(start: &Path) -> Self {
        let mut current = Some(start.to_path_buf());

        while let Some(dir) = current {
            let config_path = dir.join(CONFIG_FILE_NAME);
            if config_path.exists() {
                match Self::load(&config_path) {
                    Ok(config) => return config,
                    Err(err) => {
                        warn!(path = %config_path.display(), error = %err, "ignoring unreadable config");
                    }
                }
            }

            current = dir.parent().map(|p| p.to_path_buf());
        }

        Self::default()
    }

    /// Generate default configuration file content
    pub fn generate_default() -> String {
        toml::to_string_pretty(&Self::default())
            .unwrap_or_else(|_| String::from("# Failed to generate config"))
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self)?;

        fs::write(path, content).map_err(|source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Process-wide configuration (defaults unless `install` ran first)
pub fn global() -> &'static Config {
    GLOBAL.get_or_init(Config::default)
}

/// Install the process-wide configuration
///
/// Fails with the rejected config once `global` has been read or a config
/// was already installed.
pub fn install(config: Config) -> Result<(), Config> {
    GLOBAL.set(config)
}
