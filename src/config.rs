//! Configuration management for pr-changes.
//!
//! This module handles loading configuration from multiple sources:
//! - TOML configuration files following XDG Base Directory specification
//! - Environment variables (`PR_CHANGES_*`)
//!
//! CLI arguments are layered on top by [`crate::models::Args::resolve_config`].
//!
//! ## Example
//!
//! ```rust,no_run
//! use pr_changes::Config;
//!
//! // Load configuration from file, with fallback to defaults
//! let config = Config::load_from_file().unwrap();
//!
//! // Load from environment variables
//! let env_config = Config::load_from_env();
//!
//! // Merge configurations (env takes precedence)
//! let merged = config.merge(env_config);
//! println!("Output: {:?}", merged.output);
//! ```

use crate::error::ConfigError;
use crate::logging::{LogFormat, LogLevel};
use crate::models::OutputFormat;
use crate::parsed_property::ParsedProperty;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Default similarity percentage for rename detection, as used by `git diff -M`.
pub const DEFAULT_RENAME_THRESHOLD: u8 = 50;

/// Temporary struct for deserializing TOML configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    pub log_level: Option<String>,
    pub log_format: Option<String>,
    pub log_file: Option<PathBuf>,
    pub output: Option<String>,
    pub find_renames: Option<bool>,
    pub rename_threshold: Option<u8>,
}

/// Application configuration assembled from CLI arguments, environment variables, config file, and defaults.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Log level; logging is disabled when unset.
    pub log_level: Option<ParsedProperty<LogLevel>>,
    /// Log output format.
    pub log_format: Option<ParsedProperty<LogFormat>>,
    /// Log file; logs go to stderr when unset.
    pub log_file: Option<ParsedProperty<PathBuf>>,
    /// Report format written to stdout.
    pub output: Option<ParsedProperty<OutputFormat>>,
    /// Whether git should detect renames when diffing.
    pub find_renames: Option<ParsedProperty<bool>>,
    /// Similarity percentage for rename detection (1-100).
    pub rename_threshold: Option<ParsedProperty<u8>>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: None,
            log_format: Some(ParsedProperty::Default(LogFormat::Text)),
            log_file: None,
            output: Some(ParsedProperty::Default(OutputFormat::Text)),
            find_renames: Some(ParsedProperty::Default(true)),
            rename_threshold: Some(ParsedProperty::Default(DEFAULT_RENAME_THRESHOLD)),
        }
    }
}

impl Config {
    /// An empty layer with no values set.
    pub fn empty() -> Self {
        Self {
            log_level: None,
            log_format: None,
            log_file: None,
            output: None,
            find_renames: None,
            rename_threshold: None,
        }
    }

    /// Load configuration from XDG config directory
    #[must_use = "this returns the loaded configuration which should be used"]
    pub fn load_from_file() -> Result<Self> {
        let config_path = Self::get_config_path()?;

        if !config_path.exists() {
            return Ok(Self::default());
        }

        Ok(Self::default().merge(Self::load_from_path(&config_path)?))
    }

    /// Load the values set in a specific TOML file.
    pub fn load_from_path(config_path: &Path) -> Result<Self> {
        let config_content = fs::read_to_string(config_path).map_err(|e| {
            ConfigError::FileReadError {
                path: config_path.to_path_buf(),
                message: e.to_string(),
            }
        })?;

        let config_file: ConfigFile =
            toml::from_str(&config_content).map_err(|e| ConfigError::ParseError {
                path: config_path.to_path_buf(),
                message: e.to_string(),
            })?;

        let path = config_path.to_path_buf();
        Ok(Self {
            log_level: config_file
                .log_level
                .map(|v| {
                    LogLevel::parse(&v)
                        .map(|level| ParsedProperty::File(level, path.clone(), v.clone()))
                        .ok_or_else(|| invalid_value("log_level", &v))
                })
                .transpose()?,
            log_format: config_file
                .log_format
                .map(|v| {
                    LogFormat::parse(&v)
                        .map(|format| ParsedProperty::File(format, path.clone(), v.clone()))
                        .ok_or_else(|| invalid_value("log_format", &v))
                })
                .transpose()?,
            log_file: config_file
                .log_file
                .map(|v| ParsedProperty::File(v.clone(), path.clone(), v.display().to_string())),
            output: config_file
                .output
                .map(|v| {
                    OutputFormat::parse(&v)
                        .map(|format| ParsedProperty::File(format, path.clone(), v.clone()))
                        .ok_or_else(|| invalid_value("output", &v))
                })
                .transpose()?,
            find_renames: config_file
                .find_renames
                .map(|v| ParsedProperty::File(v, path.clone(), v.to_string())),
            rename_threshold: config_file
                .rename_threshold
                .map(|v| ParsedProperty::File(v, path.clone(), v.to_string())),
        })
    }

    /// Load configuration from environment variables
    ///
    /// Values that fail to parse are ignored.
    pub fn load_from_env() -> Self {
        Self {
            log_level: std::env::var("PR_CHANGES_LOG_LEVEL")
                .ok()
                .and_then(|s| LogLevel::parse(&s).map(|v| ParsedProperty::Env(v, s))),
            log_format: std::env::var("PR_CHANGES_LOG_FORMAT")
                .ok()
                .and_then(|s| LogFormat::parse(&s).map(|v| ParsedProperty::Env(v, s))),
            log_file: std::env::var("PR_CHANGES_LOG_FILE")
                .ok()
                .map(|v| ParsedProperty::Env(PathBuf::from(&v), v)),
            output: std::env::var("PR_CHANGES_OUTPUT")
                .ok()
                .and_then(|s| OutputFormat::parse(&s).map(|v| ParsedProperty::Env(v, s))),
            find_renames: std::env::var("PR_CHANGES_FIND_RENAMES").ok().and_then(|s| {
                s.parse::<bool>()
                    .ok()
                    .map(|v| ParsedProperty::Env(v, s.clone()))
            }),
            rename_threshold: std::env::var("PR_CHANGES_RENAME_THRESHOLD")
                .ok()
                .and_then(|s| s.parse().ok().map(|v| ParsedProperty::Env(v, s))),
        }
    }

    /// Get the XDG config file path for pr-changes
    pub fn get_config_path() -> Result<PathBuf> {
        // Use XDG_CONFIG_HOME if set, otherwise ~/.config
        let config_dir = match std::env::var("XDG_CONFIG_HOME") {
            Ok(dir) => PathBuf::from(dir),
            Err(_) => dirs::home_dir()
                .context("Could not determine home directory")?
                .join(".config"),
        };

        Ok(config_dir.join("pr-changes").join("config.toml"))
    }

    /// Merge this config with another, preferring values from other when they exist
    pub fn merge(self, other: Self) -> Self {
        Self {
            log_level: other.log_level.or(self.log_level),
            log_format: other.log_format.or(self.log_format),
            log_file: other.log_file.or(self.log_file),
            output: other.output.or(self.output),
            find_renames: other.find_renames.or(self.find_renames),
            rename_threshold: other.rename_threshold.or(self.rename_threshold),
        }
    }

    /// Fills remaining gaps with defaults and validates the result.
    pub fn resolve(self) -> Result<Settings, ConfigError> {
        let merged = Self::default().merge(self);

        let rename_threshold = merged
            .rename_threshold
            .unwrap_or_else(|| DEFAULT_RENAME_THRESHOLD.into());
        if !(1..=100).contains(rename_threshold.value()) {
            return Err(ConfigError::InvalidValue {
                field: "rename_threshold".to_string(),
                message: format!(
                    "must be between 1 and 100, got {} (from {})",
                    rename_threshold,
                    rename_threshold.origin()
                ),
            });
        }

        Ok(Settings {
            log_level: merged.log_level,
            log_format: merged.log_format.unwrap_or_else(|| LogFormat::Text.into()),
            log_file: merged.log_file,
            output: merged.output.unwrap_or_else(|| OutputFormat::Text.into()),
            find_renames: merged.find_renames.unwrap_or_else(|| true.into()),
            rename_threshold,
        })
    }

    /// Create a sample config file for user reference
    #[must_use = "this operation can fail and the result should be checked"]
    pub fn create_sample_config() -> Result<PathBuf> {
        let config_path = Self::get_config_path()?;

        // Don't overwrite existing config
        if config_path.exists() {
            return Ok(config_path);
        }

        if let Some(config_dir) = config_path.parent() {
            fs::create_dir_all(config_dir).map_err(|e| ConfigError::DirectoryCreationError {
                path: config_dir.to_path_buf(),
                message: e.to_string(),
            })?;
        }

        let sample_config = r#"# pr-changes Configuration File
# This file follows the XDG Base Directory specification
# Location: ~/.config/pr-changes/config.toml
#
# Every setting can also be given as a PR_CHANGES_* environment variable
# (e.g. PR_CHANGES_LOG_LEVEL=debug) or as a command line flag.

# Log level: trace, debug, info, warn, error (optional, logging is off when unset)
# log_level = "info"

# Log format: text or json (optional, defaults to "text")
log_format = "text"

# Log file (optional, logs go to stderr when unset)
# log_file = "/tmp/pr-changes.log"

# Report format: text or json (optional, defaults to "text")
output = "text"

# Detect renames when diffing commits (optional, defaults to true)
find_renames = true

# Similarity percentage for rename detection, 1-100 (optional, defaults to 50)
rename_threshold = 50
"#;

        fs::write(&config_path, sample_config).with_context(|| {
            format!(
                "Failed to write sample config to: {}",
                config_path.display()
            )
        })?;

        Ok(config_path)
    }
}

fn invalid_value(field: &str, value: &str) -> ConfigError {
    ConfigError::InvalidValue {
        field: field.to_string(),
        message: format!("unrecognized value '{}'", value),
    }
}

/// Fully resolved settings, every value tagged with its source.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub log_level: Option<ParsedProperty<LogLevel>>,
    pub log_format: ParsedProperty<LogFormat>,
    pub log_file: Option<ParsedProperty<PathBuf>>,
    pub output: ParsedProperty<OutputFormat>,
    pub find_renames: ParsedProperty<bool>,
    pub rename_threshold: ParsedProperty<u8>,
}
