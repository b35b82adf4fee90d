//! CLI commands

pub mod catalog;
pub mod solve;

use clap::Subcommand;

/// CLI commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Find a working evasion strategy for one or more domains
    Solve(solve::SolveArgs),

    /// Inspect the strategy catalog
    Catalog(catalog::CatalogArgs),
}
