//! Event loop scenario runner
//!
//! Provides the Runtime struct and the built-in scenarios for the
//! `corten-loop` binary.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod cli;
pub mod error;
pub mod runtime;
pub mod scenarios;

pub use cli::Cli;
pub use error::{CliError, CliResult};
pub use runtime::{run_scenario, Console, Report, Runtime};
pub use scenarios::{Scenario, SCENARIOS};
