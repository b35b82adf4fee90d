//! Probe coordinator
//!
//! Fans out one worker per catalog entry, arbitrates the single winner,
//! bounds total session latency, and waits for every worker to finish its
//! cleanup so no rule or process outlives the call. Dependencies are
//! injected per coordinator, so sessions are independently testable and
//! share no global state.

use super::session::{SessionContext, SessionShared};
use super::worker::{ProbeOutcome, ProbeWorker};
use crate::catalog::StrategyCatalog;
use crate::config::SolverConfig;
use crate::lifecycle::{EngineController, RedirectionSlot, RuleController};
use crate::probe::ConnectivityCheck;
use crate::resolver::DomainResolver;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinSet;
use tracing::{error, info, warn};

/// Outcome of one solve call
#[derive(Debug)]
pub struct SolveReport {
    /// Domain the session targeted
    pub domain: String,
    /// Address the session probed, when resolution succeeded
    pub resolved: Option<IpAddr>,
    /// Key of the winning strategy, if any worker succeeded
    pub winner: Option<String>,
    /// Per-strategy outcomes in catalog order
    pub outcomes: Vec<ProbeOutcome>,
    /// Total session duration
    pub elapsed: Duration,
}

impl SolveReport {
    fn no_workers(domain: &str, resolved: Option<IpAddr>, started: Instant) -> Self {
        Self {
            domain: domain.to_string(),
            resolved,
            winner: None,
            outcomes: Vec::new(),
            elapsed: started.elapsed(),
        }
    }
}

/// Concurrent strategy-probing coordinator
pub struct ProbeCoordinator {
    resolver: Arc<dyn DomainResolver>,
    rules: Arc<dyn RuleController>,
    engines: Arc<dyn EngineController>,
    probe: Arc<dyn ConnectivityCheck>,
    config: SolverConfig,
}

impl ProbeCoordinator {
    /// Create a coordinator with explicit collaborators
    pub fn new(
        resolver: Arc<dyn DomainResolver>,
        rules: Arc<dyn RuleController>,
        engines: Arc<dyn EngineController>,
        probe: Arc<dyn ConnectivityCheck>,
        config: SolverConfig,
    ) -> Self {
        Self {
            resolver,
            rules,
            engines,
            probe,
            config,
        }
    }

    /// Probe every catalog strategy against `domain` concurrently and
    /// report the winner, if any.
    ///
    /// Resolution failure is fatal for this call only: no worker starts
    /// and the report carries no winner. Worker failures are local and
    /// typed; the session always returns with zero live rules/processes.
    pub async fn solve(&self, domain: &str, catalog: &StrategyCatalog) -> SolveReport {
        let started = Instant::now();

        if catalog.is_empty() {
            warn!(domain, "empty strategy catalog, nothing to probe");
            return SolveReport::no_workers(domain, None, started);
        }
        if self.config.queue_base as usize + catalog.len() > u16::MAX as usize {
            error!(
                domain,
                queue_base = self.config.queue_base,
                strategies = catalog.len(),
                "queue range overflows, refusing to start session"
            );
            return SolveReport::no_workers(domain, None, started);
        }

        let target = match self.resolver.resolve(domain).await {
            Ok(ip) => ip,
            Err(e) => {
                warn!(domain, error = %e, "no target address, session aborted");
                return SolveReport::no_workers(domain, None, started);
            }
        };

        info!(
            domain,
            %target,
            strategies = catalog.len(),
            "starting parallel probe session"
        );

        let ctx = Arc::new(SessionContext {
            domain: domain.to_string(),
            target,
            config: self.config.clone(),
            rules: Arc::clone(&self.rules),
            engines: Arc::clone(&self.engines),
            probe: Arc::clone(&self.probe),
            shared: SessionShared::new(),
        });

        let mut tasks = JoinSet::new();
        for (index, descriptor) in catalog.iter().enumerate() {
            let slot = RedirectionSlot::new(self.config.queue_base + index as u16);
            tasks.spawn(ProbeWorker::new(descriptor.clone(), slot, Arc::clone(&ctx)).run());
        }

        // All workers run in parallel, so the session bound is one probe
        // timeout plus a fixed margin, regardless of catalog size.
        let deadline = tokio::time::Instant::now() + self.config.session_bound();
        let mut outcomes: Vec<ProbeOutcome> = Vec::with_capacity(catalog.len());
        loop {
            match tokio::time::timeout_at(deadline, tasks.join_next()).await {
                Ok(Some(Ok(outcome))) => outcomes.push(outcome),
                Ok(Some(Err(join_err))) => error!(error = %join_err, "probe worker panicked"),
                Ok(None) => break,
                Err(_) => {
                    // Never abort a worker here: one caught mid-teardown
                    // would leave its rule installed. Every step a worker
                    // takes is individually bounded, so draining
                    // terminates; cancelling just stops new work.
                    warn!(
                        stragglers = tasks.len(),
                        "session bound exceeded, cancelling and draining stragglers"
                    );
                    ctx.shared.cancel();
                    while let Some(joined) = tasks.join_next().await {
                        match joined {
                            Ok(outcome) => outcomes.push(outcome),
                            Err(join_err) => error!(error = %join_err, "probe worker panicked"),
                        }
                    }
                    break;
                }
            }
        }

        outcomes.sort_by_key(|o| catalog.position(&o.strategy_key).unwrap_or(usize::MAX));
        let winner = ctx.shared.winner();
        let elapsed = started.elapsed();

        match &winner {
            Some(key) => info!(domain, strategy = %key, ?elapsed, "probe session finished with winner"),
            None => warn!(domain, ?elapsed, "probe session finished, no working strategy"),
        }

        SolveReport {
            domain: domain.to_string(),
            resolved: Some(target),
            winner,
            outcomes,
            elapsed,
        }
    }
}
