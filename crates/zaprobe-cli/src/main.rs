//! Zaprobe CLI
//!
//! Command-line interface for the concurrent evasion-strategy solver.

mod args;
mod commands;
mod logging;

use anyhow::Result;
use clap::Parser;
use tracing::error;

use args::Args;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    logging::init(&args)?;

    let result = run(args).await;
    if let Err(ref e) = result {
        error!("Fatal error: {:#}", e);
    }
    result
}

async fn run(args: Args) -> Result<()> {
    match args.command {
        commands::Command::Solve(solve_args) => commands::solve::execute(solve_args).await,
        commands::Command::Catalog(catalog_args) => commands::catalog::execute(catalog_args),
    }
}
