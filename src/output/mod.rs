//! Output formatting module
//!
//! Provides the report formats for run results.

mod formatter;

pub use formatter::{write_summary_to_file, OutputFormat, ResultFormatter};
