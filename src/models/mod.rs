//! Data models for test execution
//!
//! This module contains the result and state types shared by the registry,
//! the executor and reporters.

mod outcome;
mod state;

pub use outcome::{Failure, HookKind, Outcome, Phase, RunResult, RunSummary, TestStatus};
pub use state::State;
