//! Runtime orchestration for scenario execution
//!
//! The Runtime couples an [`EventLoop`] with a [`Console`] that collects the
//! lines a scenario prints, so ordering can be inspected after the loop idles.

use crate::error::{CliError, CliResult};
use crate::scenarios::{self, Scenario};
use async_runtime::{EventLoop, EventLoopConfig, LoopStats, RuntimeError};
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use tracing::{info, warn};

/// Output sink shared by every continuation in a scenario.
#[derive(Debug, Clone, Default)]
pub struct Console {
    lines: Rc<RefCell<Vec<String>>>,
}

impl Console {
    /// Creates an empty console.
    pub fn new() -> Self {
        Self::default()
    }

    /// `console.log`
    pub fn log(&self, line: impl Into<String>) {
        let line = line.into();
        info!(target: "console", "{}", line);
        self.lines.borrow_mut().push(line);
    }

    /// Records an error the event loop reported.
    pub fn error(&self, error: &RuntimeError) {
        warn!(target: "console", %error, "reported");
        self.lines.borrow_mut().push(error.to_string());
    }

    /// Everything printed so far, in order.
    pub fn lines(&self) -> Vec<String> {
        self.lines.borrow().clone()
    }
}

/// Output and counters from one scenario run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    /// Scenario name
    pub scenario: &'static str,
    /// Console lines in the order they were printed
    pub output: Vec<String>,
    /// Loop counters at idle
    pub stats: LoopStats,
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "== {} ==", self.scenario)?;
        for line in &self.output {
            writeln!(f, "{}", line)?;
        }
        write!(
            f,
            "-- turns: {}, microtasks: {}, uncaught errors: {}, unhandled rejections: {}",
            self.stats.turns,
            self.stats.microtasks_run,
            self.stats.uncaught_errors,
            self.stats.unhandled_rejections
        )
    }
}

/// Main runtime that drives scenarios on a fresh event loop
pub struct Runtime {
    event_loop: EventLoop,
    console: Console,
}

impl Runtime {
    /// Create a runtime whose loop reports errors to its console
    ///
    /// # Example
    /// ```
    /// use async_runtime::EventLoopConfig;
    /// use loop_cli::Runtime;
    ///
    /// let runtime = Runtime::new(EventLoopConfig::default());
    /// assert!(runtime.event_loop().is_quiescent());
    /// ```
    pub fn new(config: EventLoopConfig) -> Self {
        let console = Console::new();
        let sink = console.clone();
        let event_loop =
            EventLoop::with_config(config).with_error_reporter(move |error| sink.error(error));
        Self {
            event_loop,
            console,
        }
    }

    /// Get access to the event loop
    pub fn event_loop(&self) -> &EventLoop {
        &self.event_loop
    }

    /// Get access to the console
    pub fn console(&self) -> &Console {
        &self.console
    }

    /// Run a scenario's script and drive the loop until it idles
    ///
    /// # Errors
    /// Returns `CliError::Runtime` if the loop stops on a configured limit
    pub fn execute(&self, scenario: &Scenario) -> CliResult<Report> {
        let main = scenario.script(&self.event_loop, &self.console);
        let stats = self.event_loop.run(main)?;
        Ok(Report {
            scenario: scenario.name,
            output: self.console.lines(),
            stats,
        })
    }
}

/// Looks up `name` and runs it on a new runtime built from `config`.
///
/// # Example
/// ```
/// use async_runtime::EventLoopConfig;
///
/// let report = loop_cli::run_scenario("zero-delay", EventLoopConfig::default()).unwrap();
/// assert_eq!(report.output, vec!["1", "3", "2"]);
/// ```
pub fn run_scenario(name: &str, config: EventLoopConfig) -> CliResult<Report> {
    let scenario =
        scenarios::find(name).ok_or_else(|| CliError::UnknownScenario(name.to_string()))?;
    Runtime::new(config).execute(scenario)
}
