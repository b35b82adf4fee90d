//! Catalog command - inspect available strategies

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use colored::Colorize;
use std::path::PathBuf;

use zaprobe_core::StrategyCatalog;

/// Catalog command arguments
#[derive(Args, Debug)]
pub struct CatalogArgs {
    #[command(subcommand)]
    pub action: CatalogAction,
}

/// Catalog subcommands
#[derive(Subcommand, Debug)]
pub enum CatalogAction {
    /// List strategies in priority order
    List {
        /// Catalog file (TOML); defaults to the built-in list
        #[arg(short = 's', long, value_name = "FILE")]
        catalog: Option<PathBuf>,
    },
}

/// Execute the catalog command
pub fn execute(args: CatalogArgs) -> Result<()> {
    match args.action {
        CatalogAction::List { catalog } => {
            let catalog = match catalog {
                Some(path) => StrategyCatalog::load(&path)
                    .with_context(|| format!("Failed to load catalog: {}", path.display()))?,
                None => StrategyCatalog::builtin(),
            };

            println!();
            for (index, descriptor) in catalog.iter().enumerate() {
                println!(
                    "{:>2}. {} [{}]",
                    index + 1,
                    descriptor.key.bold(),
                    descriptor.kind().to_string().cyan()
                );
                if !descriptor.description.is_empty() {
                    println!("    {}", descriptor.description.dimmed());
                }
                println!("    {}", descriptor.engine_args);
            }
            println!();
            println!("{} strategies", catalog.len());
            Ok(())
        }
    }
}
