//! describers - minimal test-execution engine
//!
//! Collects suites and tests declared through a [`Registry`], resolves their
//! deferred bodies into an ordered test list, and runs them on a [`Worker`]
//! with hook scoping, timeouts, termination and focus/skip filtering.
//!
//! ## Features
//!
//! - Nested suites with before-all, after-all, before-each and after-each hooks
//! - Lazy, memoized suite resolution with registration timeouts
//! - Per-test and per-hook timeouts, plus out-of-band termination
//! - `fdescribe`/`fit` focus and `xdescribe`/`xit` skip, evaluated at run time
//! - Composable fixture environments wrapping individual tests
//! - Dots, summary and JSON reports
//!
//! ## Usage
//!
//! ```no_run
//! use describers::{Registry, Runner, RunnerConfig};
//!
//! # async fn demo() -> anyhow::Result<()> {
//! let mut registry = Registry::new();
//! registry.describe("math", |r| {
//!     Box::pin(async move {
//!         r.before_each(|state| {
//!             Box::pin(async move {
//!                 state.insert("two", 2_i64);
//!                 Ok(())
//!             })
//!         });
//!         r.it("adds", |state| {
//!             Box::pin(async move {
//!                 anyhow::ensure!(state.get::<i64>("two") == Some(&2));
//!                 Ok(())
//!             })
//!         });
//!         Ok(())
//!     })
//! });
//!
//! let summary = Runner::new(RunnerConfig::default()).run(&mut registry).await?;
//! assert!(summary.is_success());
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod config;
pub mod executor;
pub mod models;
pub mod output;
pub mod registry;
pub mod utils;

pub use cli::RunArgs;
pub use config::RunnerConfig;
pub use executor::{CallbackError, Runner, Terminator, Worker, WorkerPhase};
pub use models::{Failure, HookKind, Outcome, Phase, RunResult, RunSummary, State, TestStatus};
pub use output::{OutputFormat, ResultFormatter};
pub use registry::{Environment, Registry, ResolveError, SuiteId, TestId};
pub use utils::{init_logger, LogLevel};
