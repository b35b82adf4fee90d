//! Solve command - concurrent strategy probing for blocked domains

use anyhow::{bail, Context, Result};
use clap::Args;
use colored::Colorize;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{info, warn};

use zaprobe_core::{
    DohResolver, HttpsProbe, ProbeCoordinator, SolveReport, SolverConfig, StrategyCatalog,
};
use zaprobe_platform::{engine::DEFAULT_NFQWS_PATH, IptablesController, NfqwsController};

/// Solve command arguments
#[derive(Args, Debug)]
pub struct SolveArgs {
    /// Domains to find a working strategy for
    #[arg(required = true)]
    pub domains: Vec<String>,

    /// Strategy catalog file (TOML); defaults to the built-in list
    #[arg(short = 's', long, value_name = "FILE")]
    pub catalog: Option<PathBuf>,

    /// Solver configuration file (TOML)
    #[arg(short = 'c', long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Path to the nfqws binary
    #[arg(long, value_name = "PATH", default_value = DEFAULT_NFQWS_PATH)]
    pub nfqws_path: PathBuf,

    /// First NFQUEUE number of the probe range
    #[arg(long, value_name = "NUM")]
    pub queue_base: Option<u16>,

    /// Per-probe timeout in seconds
    #[arg(short = 't', long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Skip the root privilege check (probes will fail without root)
    #[arg(long)]
    pub no_root_check: bool,
}

impl SolveArgs {
    /// Merge the configuration file with command-line overrides
    fn solver_config(&self) -> Result<SolverConfig> {
        let mut config = match &self.config {
            Some(path) => SolverConfig::load(path)
                .with_context(|| format!("Failed to load config: {}", path.display()))?,
            None => SolverConfig::default(),
        };
        if let Some(queue_base) = self.queue_base {
            config.queue_base = queue_base;
        }
        if let Some(timeout) = self.timeout {
            config.probe_timeout_ms = timeout.saturating_mul(1_000);
        }
        config.validate()?;
        Ok(config)
    }

    fn catalog(&self) -> Result<StrategyCatalog> {
        match &self.catalog {
            Some(path) => StrategyCatalog::load(path)
                .with_context(|| format!("Failed to load catalog: {}", path.display())),
            None => Ok(StrategyCatalog::builtin()),
        }
    }
}

/// Execute the solve command
pub async fn execute(args: SolveArgs) -> Result<()> {
    if !args.no_root_check && !zaprobe_platform::is_root() {
        bail!("root privileges required: firewall rules and nfqws need CAP_NET_ADMIN (try sudo)");
    }

    let config = args.solver_config()?;
    let catalog = args.catalog()?;
    info!(
        strategies = catalog.len(),
        nfqws = %args.nfqws_path.display(),
        "solver ready"
    );

    let resolver = Arc::new(DohResolver::new(&config)?);
    let rules = Arc::new(IptablesController::new());
    let engines = Arc::new(NfqwsController::new(&args.nfqws_path, config.engine_grace()));
    let probe = Arc::new(HttpsProbe::new(&config));
    let coordinator = ProbeCoordinator::new(resolver, rules, engines, probe, config);

    // A mid-session Ctrl-C is honored between domains: the running session
    // is bounded and must finish so its cleanup runs.
    let interrupted = Arc::new(AtomicBool::new(false));
    {
        let interrupted = Arc::clone(&interrupted);
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("interrupt received, finishing current session");
                interrupted.store(true, Ordering::SeqCst);
            }
        });
    }

    let mut solved = 0usize;
    for domain in &args.domains {
        if interrupted.load(Ordering::SeqCst) {
            warn!("interrupted, skipping remaining domains");
            break;
        }

        let report = coordinator.solve(domain, &catalog).await;
        print_report(&report, &catalog);
        if report.winner.is_some() {
            solved += 1;
        }
    }

    if solved == 0 {
        bail!("no working strategy found for any domain");
    }
    Ok(())
}

fn print_report(report: &SolveReport, catalog: &StrategyCatalog) {
    println!();
    println!("{} {}", "Target:".bold(), report.domain);
    match report.resolved {
        Some(ip) => println!("{} {}", "Address:".bold(), ip),
        None => {
            println!("{}", "  ✗ no usable address (DNS poisoned or unreachable)".red());
            return;
        }
    }

    for outcome in &report.outcomes {
        let kind = catalog
            .get(&outcome.strategy_key)
            .map(|d| d.kind().to_string())
            .unwrap_or_default();
        let line = format!(
            "  {:<16} {:<14} {:>6} ms",
            outcome.strategy_key, kind, outcome.latency_ms
        );
        if outcome.success {
            println!("{} {}", line.green(), "✓".green().bold());
        } else {
            let reason = outcome
                .error
                .map(|k| k.to_string())
                .unwrap_or_else(|| "failed".to_string());
            println!("{} {}", line.dimmed(), reason.red());
        }
    }

    match &report.winner {
        Some(key) => println!(
            "{} {} ({:.2?})",
            "Winner:".bold().green(),
            key.green().bold(),
            report.elapsed
        ),
        None => println!(
            "{} no working strategy ({:.2?})",
            "Result:".bold().red(),
            report.elapsed
        ),
    }
}
