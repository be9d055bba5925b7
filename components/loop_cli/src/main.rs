//! Corten event loop scenario runner
//!
//! Entry point for `corten-loop`. Parses CLI arguments, sets up logging and
//! delegates each requested scenario to a fresh Runtime.

use clap::Parser as ClapParser;
use loop_cli::{run_scenario, Cli, SCENARIOS};
use tracing_subscriber::EnvFilter;

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if cli.list {
        for scenario in SCENARIOS {
            println!("{:<20} {}", scenario.name, scenario.description);
        }
        return;
    }

    let names = cli.selected_scenarios();
    if names.is_empty() {
        println!("Corten Event Loop v{}", env!("CARGO_PKG_VERSION"));
        println!();
        println!("Usage:");
        println!("  corten-loop --scenario <NAME>   Run one scenario");
        println!("  corten-loop --all               Run every scenario");
        println!("  corten-loop --list              List scenarios");
        println!();
        println!("Run 'corten-loop --help' for more options.");
        return;
    }

    let config = match cli.load_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    for (i, name) in names.iter().enumerate() {
        if i > 0 {
            println!();
        }
        match run_scenario(name, config.clone()) {
            Ok(report) => println!("{}", report),
            Err(e) => {
                eprintln!("Error: {}", e);
                std::process::exit(1);
            }
        }
    }
}
