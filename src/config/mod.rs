//! Configuration module
//!
//! Handles loading run configuration from files and the environment.

mod env;

pub use env::{EnvBuilder, EnvConfig, EnvGuard};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::output::OutputFormat;
use crate::utils::LogLevel;

/// Runner configuration
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    /// Per-test timeout in milliseconds; 0 disables it
    pub timeout_ms: u64,

    /// Per-hook timeout in milliseconds; falls back to `timeout_ms`
    pub hook_timeout_ms: Option<u64>,

    /// Report format
    pub format: OutputFormat,

    /// Log level for `init_logger`
    pub log_level: LogLevel,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 0,
            hook_timeout_ms: None,
            format: OutputFormat::Dots,
            log_level: LogLevel::Info,
        }
    }
}

impl RunnerConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn hook_timeout(&self) -> Duration {
        Duration::from_millis(self.hook_timeout_ms.unwrap_or(self.timeout_ms))
    }

    /// Load configuration from file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content =
            std::fs::read_to_string(path.as_ref()).context("Failed to read config file")?;

        let config: Self = if is_yaml(path.as_ref()) {
            serde_yaml::from_str(&content).context("Failed to parse YAML config")?
        } else {
            serde_json::from_str(&content).context("Failed to parse JSON config")?
        };

        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let content = if is_yaml(path.as_ref()) {
            serde_yaml::to_string(self).context("Failed to serialize config")?
        } else {
            serde_json::to_string_pretty(self).context("Failed to serialize config")?
        };

        std::fs::write(path, content).context("Failed to write config file")?;
        Ok(())
    }

    /// Override fields with values taken from the environment
    pub fn apply_env(&mut self, env: &EnvConfig) -> Result<()> {
        if let Some(timeout) = env.timeout {
            self.timeout_ms = timeout;
        }
        if let Some(hook_timeout) = env.hook_timeout {
            self.hook_timeout_ms = Some(hook_timeout);
        }
        if let Some(format) = &env.format {
            self.format = OutputFormat::from_str(format)
                .with_context(|| format!("Unknown output format: {format}"))?;
        }
        if let Some(level) = &env.log_level {
            self.log_level =
                LogLevel::from_str(level).with_context(|| format!("Unknown log level: {level}"))?;
        }
        Ok(())
    }
}

fn is_yaml(path: &Path) -> bool {
    path.extension()
        .map(|e| e == "yaml" || e == "yml")
        .unwrap_or(false)
}
