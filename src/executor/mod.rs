//! Test execution engine
//!
//! Provides the scoped callback runner, the per-sequence worker and the run
//! driver built on top of them.

mod runner;
mod scoped;
mod worker;

pub use runner::Runner;
pub use scoped::{scoped, CallbackError, ScopedCall, Terminator};
pub use worker::{Worker, WorkerPhase};
