//! Run result models
//!
//! Defines hook kinds, failure taxonomy, per-test run results and the
//! summary handed to reporters.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::registry::TestId;

/// The four hook kinds a suite can carry
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HookKind {
    BeforeAll,
    AfterAll,
    BeforeEach,
    AfterEach,
}

impl HookKind {
    pub fn name(&self) -> &'static str {
        match self {
            HookKind::BeforeAll => "beforeAll",
            HookKind::AfterAll => "afterAll",
            HookKind::BeforeEach => "beforeEach",
            HookKind::AfterEach => "afterEach",
        }
    }

    /// Whether the hook runs once per suite activation rather than per test
    pub fn is_scope_hook(&self) -> bool {
        matches!(self, HookKind::BeforeAll | HookKind::AfterAll)
    }
}

impl fmt::Display for HookKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Which part of a test's lifecycle produced a failure
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Test,
    Hook(HookKind),
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Test => f.write_str("test"),
            Phase::Hook(_) => f.write_str("hook"),
        }
    }
}

/// First failure observed during a test's lifecycle
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Failure {
    /// The callback returned an error or panicked
    Raised { phase: Phase, message: String },
    TimedOut { phase: Phase },
    Terminated { phase: Phase },
}

impl Failure {
    pub fn phase(&self) -> Phase {
        match self {
            Failure::Raised { phase, .. }
            | Failure::TimedOut { phase }
            | Failure::Terminated { phase } => *phase,
        }
    }

    /// Message shown to reporters
    ///
    /// Termination of a before-all/after-all hook is reported with an empty
    /// message; it only ever happens as a side effect of aborting a run.
    pub fn message(&self) -> String {
        match self {
            Failure::Raised { message, .. } => message.clone(),
            Failure::TimedOut { phase } => format!("timed out while running {phase}"),
            Failure::Terminated {
                phase: Phase::Hook(kind),
            } if kind.is_scope_hook() => String::new(),
            Failure::Terminated { phase } => format!("terminated while running {phase}"),
        }
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message())
    }
}

/// Test execution status
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TestStatus {
    Pass,
    Fail,
    Skip,
}

impl TestStatus {
    /// Progress character
    pub fn symbol(&self) -> char {
        match self {
            TestStatus::Pass => '.',
            TestStatus::Fail => 'F',
            TestStatus::Skip => '*',
        }
    }
}

impl fmt::Display for TestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TestStatus::Pass => write!(f, "PASS"),
            TestStatus::Fail => write!(f, "FAIL"),
            TestStatus::Skip => write!(f, "SKIP"),
        }
    }
}

/// Terminal outcome of one test
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "error", rename_all = "lowercase")]
pub enum Outcome {
    Pass,
    Fail(Failure),
    Skip,
}

impl Outcome {
    pub fn status(&self) -> TestStatus {
        match self {
            Outcome::Pass => TestStatus::Pass,
            Outcome::Fail(_) => TestStatus::Fail,
            Outcome::Skip => TestStatus::Skip,
        }
    }

    pub fn failure(&self) -> Option<&Failure> {
        match self {
            Outcome::Fail(failure) => Some(failure),
            _ => None,
        }
    }
}

/// Result of a single test run
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RunResult {
    pub test: TestId,
    pub title: String,
    pub full_name: String,
    pub ancestor_titles: Vec<String>,
    pub outcome: Outcome,
    pub duration_ms: u64,
}

impl RunResult {
    /// A passing result; failures are recorded onto it as the run progresses
    pub fn new(
        test: TestId,
        title: impl Into<String>,
        full_name: impl Into<String>,
        ancestor_titles: Vec<String>,
    ) -> Self {
        Self {
            test,
            title: title.into(),
            full_name: full_name.into(),
            ancestor_titles,
            outcome: Outcome::Pass,
            duration_ms: 0,
        }
    }

    pub fn skipped(mut self) -> Self {
        self.outcome = Outcome::Skip;
        self
    }

    pub fn status(&self) -> TestStatus {
        self.outcome.status()
    }

    pub fn is_pass(&self) -> bool {
        self.outcome == Outcome::Pass
    }

    /// Record a failure unless one was already recorded; returns whether it stuck
    pub fn record_failure(&mut self, failure: Failure) -> bool {
        if !self.is_pass() {
            return false;
        }
        self.outcome = Outcome::Fail(failure);
        true
    }

    /// Failure message, if the test failed
    pub fn message(&self) -> Option<String> {
        self.outcome.failure().map(Failure::message)
    }
}

impl fmt::Display for RunResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} [{}ms]",
            self.status().symbol(),
            self.full_name,
            self.duration_ms
        )?;
        if let Some(msg) = self.message() {
            if !msg.is_empty() {
                write!(f, " - {msg}")?;
            }
        }
        Ok(())
    }
}

/// Tallies for one full run
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RunSummary {
    pub started_at: DateTime<Utc>,
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,
    pub total_duration_ms: u64,
    pub results: Vec<RunResult>,
}

impl RunSummary {
    pub fn new(started_at: DateTime<Utc>, results: Vec<RunResult>) -> Self {
        let count = |status: TestStatus| results.iter().filter(|r| r.status() == status).count();
        let passed = count(TestStatus::Pass);
        let failed = count(TestStatus::Fail);
        let skipped = count(TestStatus::Skip);
        let total_duration_ms = results.iter().map(|r| r.duration_ms).sum();

        Self {
            started_at,
            total: results.len(),
            passed,
            failed,
            skipped,
            total_duration_ms,
            results,
        }
    }

    pub fn pass_rate(&self) -> f64 {
        let ran = self.passed + self.failed;
        if ran == 0 {
            0.0
        } else {
            (self.passed as f64 / ran as f64) * 100.0
        }
    }

    /// True when nothing failed; skipped tests do not count against a run
    pub fn is_success(&self) -> bool {
        self.failed == 0
    }

    pub fn failures(&self) -> impl Iterator<Item = &RunResult> {
        self.results
            .iter()
            .filter(|r| r.status() == TestStatus::Fail)
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for result in &self.results {
            writeln!(f, "  {result}")?;
        }
        writeln!(
            f,
            "Total: {} | Pass: {} | Fail: {} | Skip: {}",
            self.total, self.passed, self.failed, self.skipped
        )?;
        writeln!(
            f,
            "Pass Rate: {:.1}% | Duration: {}ms",
            self.pass_rate(),
            self.total_duration_ms
        )
    }
}
