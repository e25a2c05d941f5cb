//! Test run driver
//!
//! Resolves the whole tree, drives every test through one worker and reports
//! progress and a summary.

use anyhow::{Context, Result};
use chrono::Utc;
use std::io::Write;
use tracing::{debug, info};

use super::worker::Worker;
use crate::config::RunnerConfig;
use crate::models::RunSummary;
use crate::output::ResultFormatter;
use crate::registry::Registry;
use crate::utils::Timer;

/// Runs a registry's full test list
pub struct Runner {
    config: RunnerConfig,
}

impl Runner {
    pub fn new(config: RunnerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RunnerConfig {
        &self.config
    }

    /// Run everything, reporting to stdout
    pub async fn run(&self, registry: &mut Registry) -> Result<RunSummary> {
        let mut stdout = std::io::stdout();
        self.run_with_output(registry, &mut stdout).await
    }

    /// Run everything, reporting to `out`
    ///
    /// In dots format a progress character is written per test as it
    /// finishes: `.` pass, `F` fail, `*` skip.
    pub async fn run_with_output<W: Write>(
        &self,
        registry: &mut Registry,
        out: &mut W,
    ) -> Result<RunSummary> {
        let timeout = self.config.timeout();
        let hook_timeout = self.config.hook_timeout();
        let formatter = ResultFormatter::new(self.config.format);
        let progress = self.config.format.streams_progress();

        let started_at = Utc::now();
        let timer = Timer::start("test run");

        let tests = registry
            .resolve_root(hook_timeout)
            .await
            .context("Failed to resolve test tree")?;

        info!(
            "Running {} tests (timeout {}ms, hook timeout {}ms)",
            tests.len(),
            timeout.as_millis(),
            hook_timeout.as_millis()
        );

        let mut worker = Worker::new(registry);
        let mut results = Vec::with_capacity(tests.len());

        for test in tests {
            let result = worker.run(test, timeout, hook_timeout).await;
            debug!("  {}", result);

            if progress {
                write!(out, "{}", result.status().symbol()).context("Failed to write progress")?;
                out.flush().context("Failed to write progress")?;
            }

            results.push(result);
        }

        worker.shutdown(hook_timeout).await;

        if progress {
            writeln!(out).context("Failed to write progress")?;
        }

        let summary = RunSummary::new(started_at, results);
        write!(out, "{}", formatter.format_summary(&summary)).context("Failed to write report")?;

        info!(
            "Test run completed in {}ms - Pass: {} | Fail: {} | Skip: {}",
            timer.stop().as_millis(),
            summary.passed,
            summary.failed,
            summary.skipped
        );

        Ok(summary)
    }
}

impl Default for Runner {
    fn default() -> Self {
        Self::new(RunnerConfig::default())
    }
}
