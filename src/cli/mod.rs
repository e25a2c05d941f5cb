//! CLI argument parsing
//!
//! Defines the run options a host binary can flatten into its own clap parser.

use anyhow::{Context, Result};
use clap::Args;
use std::path::PathBuf;
use tracing::debug;

use crate::config::{EnvConfig, RunnerConfig};
use crate::output::OutputFormat;
use crate::utils::LogLevel;

/// Options controlling a test run
#[derive(Args, Clone, Debug, Default)]
pub struct RunArgs {
    /// Per-test timeout in milliseconds (0 disables)
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Per-hook timeout in milliseconds (defaults to --timeout)
    #[arg(long)]
    pub hook_timeout: Option<u64>,

    /// Output format (dots, summary, json, json-pretty)
    #[arg(short, long)]
    pub format: Option<String>,

    /// Configuration file (YAML or JSON)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    pub verbose: bool,
}

impl RunArgs {
    /// Merge config file, environment and flags, later sources winning
    pub fn into_config(self) -> Result<RunnerConfig> {
        let env = EnvConfig::load();

        let path = self
            .config
            .clone()
            .or_else(|| env.config_file.as_ref().map(PathBuf::from));

        let mut config = match path {
            Some(path) => {
                debug!("Loading config from {}", path.display());
                RunnerConfig::load(&path)
                    .with_context(|| format!("Failed to load {}", path.display()))?
            }
            None => RunnerConfig::default(),
        };

        config.apply_env(&env)?;

        if let Some(timeout) = self.timeout {
            config.timeout_ms = timeout;
        }
        if let Some(hook_timeout) = self.hook_timeout {
            config.hook_timeout_ms = Some(hook_timeout);
        }
        if let Some(format) = &self.format {
            config.format = OutputFormat::from_str(format)
                .with_context(|| format!("Unknown output format: {format}"))?;
        }
        if self.verbose {
            config.log_level = LogLevel::Debug;
        }

        Ok(config)
    }
}
