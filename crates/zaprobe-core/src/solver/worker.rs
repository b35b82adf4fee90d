//! Probe worker state machine
//!
//! One worker owns one strategy attempt: install the redirection rule,
//! start the engine bound to it, wait the settle interval, run the
//! connectivity check, and tear everything down. Every error is caught,
//! classified and turned into an outcome; nothing a worker does can abort
//! a sibling or leak a resource.

use super::session::SessionContext;
use crate::catalog::StrategyDescriptor;
use crate::error::{Error, FailureKind, Result};
use crate::lifecycle::{EngineProcess, RedirectionSlot};
use crate::probe::ProbeResponse;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Worker lifecycle phases.
///
/// `CleanedUp` is always reached; the success/failure phases are recorded
/// on the outcome before cleanup runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerPhase {
    /// Nothing installed yet
    Init,
    /// Firewall rule is in place
    RuleInstalled,
    /// Engine survived the settle interval
    EngineRunning,
    /// Connectivity check in flight
    Probing,
    /// Probe observed a completed response
    Succeeded,
    /// Probe failed at the connection or TLS layer, or timed out
    Failed,
    /// Rule install or engine start failed
    Errored,
    /// Engine stopped and rule removed
    CleanedUp,
}

impl std::fmt::Display for WorkerPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Init => "init",
            Self::RuleInstalled => "rule_installed",
            Self::EngineRunning => "engine_running",
            Self::Probing => "probing",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
            Self::Errored => "errored",
            Self::CleanedUp => "cleaned_up",
        };
        f.write_str(name)
    }
}

/// Result of one strategy attempt, consumed by the coordinator
#[derive(Debug, Clone)]
pub struct ProbeOutcome {
    /// Key of the probed strategy
    pub strategy_key: String,
    /// Whether the transport path was open through this strategy
    pub success: bool,
    /// Wall time of the whole attempt
    pub latency_ms: u64,
    /// Failure classification when `success` is false
    pub error: Option<FailureKind>,
}

/// One probe attempt for one strategy
pub(crate) struct ProbeWorker {
    descriptor: StrategyDescriptor,
    slot: RedirectionSlot,
    ctx: Arc<SessionContext>,
}

impl ProbeWorker {
    pub(crate) fn new(
        descriptor: StrategyDescriptor,
        slot: RedirectionSlot,
        ctx: Arc<SessionContext>,
    ) -> Self {
        Self {
            descriptor,
            slot,
            ctx,
        }
    }

    /// Run the attempt to completion. Never panics, never leaks: cleanup
    /// runs on every path before the outcome is produced.
    pub(crate) async fn run(self) -> ProbeOutcome {
        let start = Instant::now();
        let key = self.descriptor.key.clone();
        debug!(strategy = %key, slot = %self.slot, phase = %WorkerPhase::Init, "worker starting");

        let mut engine: Option<Box<dyn EngineProcess>> = None;
        let mut rule_attempted = false;
        let result = self.attempt(&mut engine, &mut rule_attempted).await;

        // Cleanup is unconditional: engine first so no process outlives its
        // rule, then the rule itself with the identical match specification.
        if let Some(mut process) = engine.take() {
            process.stop().await;
        }
        if rule_attempted {
            self.ctx
                .rules
                .remove(self.slot, self.ctx.target, self.ctx.config.probe_port)
                .await;
        }
        debug!(strategy = %key, slot = %self.slot, phase = %WorkerPhase::CleanedUp, "worker cleaned up");

        let latency_ms = start.elapsed().as_millis() as u64;
        match result {
            Ok(response) => {
                info!(
                    strategy = %key,
                    status = response.status,
                    latency_ms,
                    phase = %WorkerPhase::Succeeded,
                    "strategy works"
                );
                ProbeOutcome {
                    strategy_key: key,
                    success: true,
                    latency_ms,
                    error: None,
                }
            }
            Err(error) => {
                let kind = error.failure_kind();
                let phase = match kind {
                    FailureKind::RuleInstall | FailureKind::EngineStart => WorkerPhase::Errored,
                    _ => WorkerPhase::Failed,
                };
                match kind {
                    FailureKind::Cancelled => {
                        debug!(strategy = %key, "skipped: winner already selected")
                    }
                    _ => warn!(strategy = %key, %phase, error = %error, latency_ms, "strategy failed"),
                }
                ProbeOutcome {
                    strategy_key: key,
                    success: false,
                    latency_ms,
                    error: Some(kind),
                }
            }
        }
    }

    /// The fallible body: `Init -> RuleInstalled -> EngineRunning -> Probing`.
    ///
    /// The cancellation flag is checked before each expensive step; past the
    /// settle interval the probe runs to completion rather than being
    /// preempted mid-flight.
    async fn attempt(
        &self,
        engine: &mut Option<Box<dyn EngineProcess>>,
        rule_attempted: &mut bool,
    ) -> Result<ProbeResponse> {
        let ctx = &self.ctx;
        let port = ctx.config.probe_port;

        if ctx.shared.is_cancelled() {
            return Err(Error::Cancelled);
        }
        // The rule may be half-applied even when install errors, so cleanup
        // attempts removal from this point on.
        *rule_attempted = true;
        ctx.rules.install(self.slot, ctx.target, port).await?;
        debug!(strategy = %self.descriptor.key, phase = %WorkerPhase::RuleInstalled, "rule installed");

        if ctx.shared.is_cancelled() {
            return Err(Error::Cancelled);
        }
        let mut process = ctx
            .engines
            .start(self.slot, &self.descriptor.engine_args)
            .await?;
        tokio::time::sleep(ctx.config.settle_interval()).await;
        if !process.is_running() {
            *engine = Some(process);
            return Err(Error::engine_start(
                self.slot.queue_num(),
                "engine exited during settle interval",
            ));
        }
        *engine = Some(process);
        debug!(strategy = %self.descriptor.key, phase = %WorkerPhase::EngineRunning, "engine running");

        debug!(strategy = %self.descriptor.key, phase = %WorkerPhase::Probing, "probing");
        let probe_timeout = ctx.config.probe_timeout();
        let response = match tokio::time::timeout(
            probe_timeout,
            ctx.probe.check(&ctx.domain, ctx.target, port, self.slot),
        )
        .await
        {
            Ok(result) => result?,
            Err(_) => {
                return Err(Error::ProbeTimeout {
                    elapsed_ms: probe_timeout.as_millis() as u64,
                })
            }
        };

        // Claim the win before teardown starts, so siblings see the flag
        // while this worker's engine is still shutting down.
        if ctx.shared.try_win(&self.descriptor.key) {
            info!(strategy = %self.descriptor.key, domain = %ctx.domain, "session winner selected");
        }
        Ok(response)
    }
}
