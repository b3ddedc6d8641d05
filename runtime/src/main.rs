// Copyright 2026 bonus-steward contributors
// SPDX-License-Identifier: Apache-2.0

use anyhow::Result;
use bonus_steward::cli::{logging, output, run_cmd};
use bonus_steward::config::{CliOverrides, Config};
use bonus_steward::rest;
use clap::Parser;

#[derive(Parser)]
#[command(
    name = "bonus-steward",
    about = "Keep a bonus point balance under its cap by spending the overflow",
    version,
    after_help = "Settings come from MAM_* environment variables; flags only switch modes on.\nWithout --apply nothing is submitted."
)]
struct Cli {
    /// Submit the planned actions (default is a dry run)
    #[arg(long)]
    apply: bool,

    /// Show the browser window even when MAM_HEADLESS is set
    #[arg(long)]
    headed: bool,

    /// Only read and print the account snapshot with its plan
    #[arg(long)]
    snapshot: bool,

    /// Single-line JSON output and JSON logs
    #[arg(long)]
    json: bool,

    /// Serve the read-only snapshot API on this port instead of running
    #[arg(long, value_name = "PORT")]
    serve: Option<u16>,

    /// Enable verbose/debug logging
    #[arg(long, short)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = Config::from_env().with_overrides(CliOverrides {
        apply: cli.apply,
        headed: cli.headed,
        snapshot: cli.snapshot,
        json: cli.json,
    });
    logging::init(cli.verbose, config.json_output);

    let result = match cli.serve {
        Some(port) => rest::start(port, config.clone()).await,
        None => run_cmd::run(&config).await,
    };

    // Consistent exit codes: 0=success, 1=error
    if let Err(e) = &result {
        output::print_error(e, config.json_output);
        std::process::exit(1);
    }

    result
}
