//! Command-line argument parsing

use crate::commands::Command;
use clap::{Parser, ValueEnum};

/// Zaprobe - concurrent DPI evasion strategy solver
///
/// Given a blocked domain, probes every known zapret/nfqws strategy in
/// parallel and reports the first one that restores connectivity.
#[derive(Parser, Debug)]
#[command(name = "zaprobe")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Run in quiet mode (errors only)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Output format for logs
    #[arg(long, value_enum, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Log file path
    #[arg(long, value_name = "FILE", global = true)]
    pub log_file: Option<String>,
}

/// Log output format
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum LogFormat {
    /// Human-readable text
    Text,
    /// JSON format
    Json,
    /// Compact format
    Compact,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_solve_args() {
        let args = Args::parse_from(["zaprobe", "solve", "twitter.com", "youtube.com"]);
        match args.command {
            Command::Solve(solve) => {
                assert_eq!(solve.domains, vec!["twitter.com", "youtube.com"]);
            }
            _ => panic!("expected solve command"),
        }
    }

    #[test]
    fn test_verbose_is_global() {
        let args = Args::parse_from(["zaprobe", "solve", "-vv", "twitter.com"]);
        assert_eq!(args.verbose, 2);
    }
}
