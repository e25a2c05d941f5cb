//! Output formatters for run results
//!
//! Provides the dots report, a per-test summary and JSON.

use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::Path;

use crate::models::{RunResult, RunSummary, TestStatus};

/// Output format options
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OutputFormat {
    #[default]
    Dots,
    Summary,
    Json,
    JsonPretty,
}

impl OutputFormat {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "dots" | "dot" => Some(OutputFormat::Dots),
            "summary" => Some(OutputFormat::Summary),
            "json" => Some(OutputFormat::Json),
            "json-pretty" | "jsonpretty" => Some(OutputFormat::JsonPretty),
            _ => None,
        }
    }

    /// Whether a progress character is printed as each test finishes
    pub fn streams_progress(&self) -> bool {
        matches!(self, OutputFormat::Dots)
    }
}

/// Result formatter
pub struct ResultFormatter {
    format: OutputFormat,
    colorize: bool,
}

impl ResultFormatter {
    pub fn new(format: OutputFormat) -> Self {
        Self {
            format,
            colorize: true,
        }
    }

    pub fn no_color(mut self) -> Self {
        self.colorize = false;
        self
    }

    /// Format a single test result
    pub fn format_result(&self, result: &RunResult) -> String {
        match self.format {
            OutputFormat::Dots => result.status().symbol().to_string(),
            OutputFormat::Summary => self.format_result_line(result),
            OutputFormat::Json => serde_json::to_string(result).unwrap_or_default(),
            OutputFormat::JsonPretty => serde_json::to_string_pretty(result).unwrap_or_default(),
        }
    }

    fn format_result_line(&self, result: &RunResult) -> String {
        let status = match (self.colorize, result.status()) {
            (true, TestStatus::Pass) => "\x1b[32mPASS\x1b[0m",
            (true, TestStatus::Fail) => "\x1b[31mFAIL\x1b[0m",
            (true, TestStatus::Skip) => "\x1b[33mSKIP\x1b[0m",
            (false, TestStatus::Pass) => "PASS",
            (false, TestStatus::Fail) => "FAIL",
            (false, TestStatus::Skip) => "SKIP",
        };

        let mut line = format!("{} {} ({}ms)", status, result.full_name, result.duration_ms);
        if let Some(message) = result.message().filter(|m| !m.is_empty()) {
            line.push_str(&format!(" - {message}"));
        }
        line
    }

    /// Format a whole run
    pub fn format_summary(&self, summary: &RunSummary) -> String {
        match self.format {
            OutputFormat::Dots => self.format_failures(summary),
            OutputFormat::Summary => self.format_summary_lines(summary),
            OutputFormat::Json => serde_json::to_string(summary).unwrap_or_default(),
            OutputFormat::JsonPretty => serde_json::to_string_pretty(summary).unwrap_or_default(),
        }
    }

    /// Full name and message of every failed test, each preceded by a blank line
    fn format_failures(&self, summary: &RunSummary) -> String {
        let mut output = String::new();
        for result in summary.failures() {
            output.push('\n');
            output.push_str(&result.full_name);
            output.push('\n');
            output.push_str(&result.message().unwrap_or_default());
            output.push('\n');
        }
        output
    }

    fn format_summary_lines(&self, summary: &RunSummary) -> String {
        let mut output = String::new();
        for result in &summary.results {
            output.push_str(&self.format_result_line(result));
            output.push('\n');
        }

        let failed = if self.colorize && summary.failed > 0 {
            format!("\x1b[31m{}\x1b[0m", summary.failed)
        } else {
            summary.failed.to_string()
        };

        output.push_str(&format!(
            "Total: {} | Pass: {} | Fail: {} | Skip: {} | {}ms\n",
            summary.total, summary.passed, failed, summary.skipped, summary.total_duration_ms
        ));
        output
    }
}

impl Default for ResultFormatter {
    fn default() -> Self {
        Self::new(OutputFormat::Dots)
    }
}

/// Write a run report to a file
pub fn write_summary_to_file(
    path: impl AsRef<Path>,
    summary: &RunSummary,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let formatter = ResultFormatter::new(format).no_color();
    let content = formatter.format_summary(summary);

    let mut file = std::fs::File::create(path)?;
    file.write_all(content.as_bytes())?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Failure, Phase};
    use crate::registry::TestId;
    use chrono::Utc;

    fn sample_summary() -> RunSummary {
        let passed = RunResult::new(TestId::from_raw(0), "a", "suite a", vec![]);
        let mut failed = RunResult::new(TestId::from_raw(1), "b", "suite b", vec![]);
        failed.record_failure(Failure::Raised {
            phase: Phase::Test,
            message: "boom".to_string(),
        });
        RunSummary::new(Utc::now(), vec![passed, failed])
    }

    #[test]
    fn test_output_format_from_str() {
        assert_eq!(OutputFormat::from_str("json"), Some(OutputFormat::Json));
        assert_eq!(OutputFormat::from_str("DOTS"), Some(OutputFormat::Dots));
        assert_eq!(OutputFormat::from_str("table"), None);
    }

    #[test]
    fn test_formatter_creation() {
        let formatter = ResultFormatter::new(OutputFormat::Json).no_color();
        assert_eq!(formatter.format, OutputFormat::Json);
        assert!(!formatter.colorize);
    }

    #[test]
    fn test_dots_lists_only_failures() {
        let formatter = ResultFormatter::new(OutputFormat::Dots);
        assert_eq!(formatter.format_summary(&sample_summary()), "\nsuite b\nboom\n");
    }

    #[test]
    fn test_summary_lines() {
        let formatter = ResultFormatter::new(OutputFormat::Summary).no_color();
        let output = formatter.format_summary(&sample_summary());
        assert!(output.contains("PASS suite a"));
        assert!(output.contains("FAIL suite b (0ms) - boom"));
        assert!(output.contains("Total: 2 | Pass: 1 | Fail: 1 | Skip: 0"));
    }

    #[test]
    fn test_write_summary_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.json");

        write_summary_to_file(&path, &sample_summary(), OutputFormat::Json).unwrap();

        let written: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written["total"], 2);
    }
}
