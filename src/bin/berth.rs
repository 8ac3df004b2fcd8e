//! Berth CLI Binary
//!
//! Command-line interface for the agent provisioning core.

use anyhow::Context;
use berth::logging::init_logging;
use berth::tooling::cli::{Cli, CliContext};
use clap::Parser;
use std::process;

fn run(cli: &Cli) -> anyhow::Result<String> {
    let context =
        CliContext::new(cli.config.clone()).context("Failed to load configuration")?;

    let logging = cli.logging_config(&context.config().logging);
    init_logging(Some(&logging)).context("Failed to initialize logging")?;

    Ok(context.execute(&cli.command)?)
}

fn main() {
    let cli = Cli::parse();

    match run(&cli) {
        Ok(output) => {
            println!("{}", output);
        }
        Err(e) => {
            eprintln!("Error: {:#}", e);
            process::exit(1);
        }
    }
}
