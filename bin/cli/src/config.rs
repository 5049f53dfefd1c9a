//! CLI configuration.
//!
//! Loaded via the `config` crate from an optional TOML file, overridden by
//! environment variables prefixed with `TASKWEAVE__` (for example
//! `TASKWEAVE__RUNNER__BASE_URL`).

use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// Default file looked up in the working directory when no path is given.
pub const DEFAULT_CONFIG_FILE: &str = "taskweave.toml";

/// Top-level CLI configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct CliConfig {
    /// Task runner configuration.
    #[serde(default)]
    pub runner: RunnerConfig,

    /// Log filter used when `RUST_LOG` is not set.
    #[serde(default = "default_log_filter")]
    pub log_filter: String,
}

/// Remote task runner configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct RunnerConfig {
    /// Base URL of the task API; tasks are posted to `{base_url}/tasks/execute/`.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Per-request timeout, in seconds.
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
}

fn default_log_filter() -> String {
    "info".to_string()
}

fn default_base_url() -> String {
    "http://127.0.0.1:8000/api".to_string()
}

fn default_timeout_seconds() -> u64 {
    30
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_seconds: default_timeout_seconds(),
        }
    }
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            runner: RunnerConfig::default(),
            log_filter: default_log_filter(),
        }
    }
}

impl RunnerConfig {
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    /// Returns the task execution endpoint.
    #[must_use]
    pub fn execute_url(&self) -> String {
        format!("{}/tasks/execute/", self.base_url.trim_end_matches('/'))
    }
}

impl CliConfig {
    /// Loads configuration from `path` (required to exist) or from
    /// `taskweave.toml` in the working directory (optional), then the
    /// environment.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be parsed or a value has the
    /// wrong type.
    pub fn load(path: Option<&Path>) -> Result<Self, config::ConfigError> {
        let file = match path {
            Some(path) => config::File::from(path).required(true),
            None => config::File::with_name(DEFAULT_CONFIG_FILE).required(false),
        };

        config::Config::builder()
            .add_source(file)
            .add_source(
                config::Environment::with_prefix("TASKWEAVE")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }
}
