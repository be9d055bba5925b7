//! Command-line arguments

use crate::error::CliResult;
use async_runtime::EventLoopConfig;
use clap::Parser;
use std::path::PathBuf;

/// Runs the event loop ordering scenarios and prints their console output.
#[derive(Debug, Parser)]
#[command(name = "corten-loop", version, about)]
pub struct Cli {
    /// Scenario to run
    #[arg(short, long)]
    pub scenario: Option<String>,

    /// Run every scenario
    #[arg(short, long)]
    pub all: bool,

    /// List the available scenarios
    #[arg(short, long)]
    pub list: bool,

    /// JSON file with event loop limits
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Override the turn limit from the config file
    #[arg(long)]
    pub max_turns: Option<u64>,

    /// Log scheduler activity at debug level
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    /// Builds the loop configuration from `--config` and the override flags.
    pub fn load_config(&self) -> CliResult<EventLoopConfig> {
        let mut config = match &self.config {
            Some(path) => {
                let text = std::fs::read_to_string(path)?;
                serde_json::from_str(&text)?
            }
            None => EventLoopConfig::default(),
        };
        if let Some(turns) = self.max_turns {
            config = config.with_max_turns(turns);
        }
        Ok(config)
    }

    /// The scenario names this invocation asks for, in run order.
    pub fn selected_scenarios(&self) -> Vec<String> {
        if self.all {
            crate::scenarios::SCENARIOS
                .iter()
                .map(|s| s.name.to_string())
                .collect()
        } else {
            self.scenario.iter().cloned().collect()
        }
    }
}
