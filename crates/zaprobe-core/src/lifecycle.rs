//! Resource lifecycle seams
//!
//! Traits for the two external resources a probe worker owns: one firewall
//! redirection rule and one evasion-engine process. Platform backends live
//! in `zaprobe-platform`; tests substitute fakes. The worker guarantees
//! that whatever these traits hand out is released before it reports its
//! outcome.

use crate::error::Result;
use async_trait::async_trait;
use std::net::IpAddr;

/// A kernel packet-redirection slot (NFQUEUE number).
///
/// Slots are allocated as `base + worker index` and are never reused
/// concurrently within a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RedirectionSlot {
    queue: u16,
}

impl RedirectionSlot {
    /// Create a slot for the given queue number
    pub fn new(queue: u16) -> Self {
        Self { queue }
    }

    /// The NFQUEUE number packets are redirected to
    pub fn queue_num(&self) -> u16 {
        self.queue
    }
}

impl std::fmt::Display for RedirectionSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "queue {}", self.queue)
    }
}

/// Installs and removes one traffic-redirection rule per probe.
///
/// Concurrent workers each get a disjoint match specification (distinct
/// queue number), so installs and removals never target the same rule.
#[async_trait]
pub trait RuleController: Send + Sync {
    /// Install an additive rule redirecting traffic for `dst:port` to the
    /// slot's queue, with a bypass flag so already-marked packets are
    /// unaffected.
    async fn install(&self, slot: RedirectionSlot, dst: IpAddr, port: u16) -> Result<()>;

    /// Remove the rule using the identical match specification.
    ///
    /// Best-effort: failures are logged by the implementation, never
    /// propagated. The kernel structure may already have changed under us.
    async fn remove(&self, slot: RedirectionSlot, dst: IpAddr, port: u16);
}

/// A running evasion-engine instance, owned exclusively by one worker
#[async_trait]
pub trait EngineProcess: Send {
    /// Whether the process is still alive
    fn is_running(&mut self) -> bool;

    /// Graceful termination, bounded grace wait, then force kill.
    /// After this returns no engine instance survives the worker.
    async fn stop(&mut self);
}

/// Launches evasion-engine processes bound to redirection slots
#[async_trait]
pub trait EngineController: Send + Sync {
    /// Launch the engine bound to the slot's queue with the strategy's
    /// argument string. Does not block; the caller waits a settle interval
    /// and checks [`EngineProcess::is_running`] to catch immediate exits.
    async fn start(&self, slot: RedirectionSlot, engine_args: &str)
        -> Result<Box<dyn EngineProcess>>;
}
