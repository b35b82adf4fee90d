//! nfqws process lifecycle
//!
//! Each probe gets its own nfqws instance bound to its queue number. The
//! process runs in a fresh process group so terminal signals aimed at the
//! solver never reach it; the solver alone decides when it dies. Stop is
//! SIGTERM, a bounded grace wait, then SIGKILL.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::{Child, Command};
use tracing::{debug, warn};
use zaprobe_core::error::{Error, Result};
use zaprobe_core::lifecycle::{EngineController, EngineProcess, RedirectionSlot};

/// Default location of the zapret nfqws binary
pub const DEFAULT_NFQWS_PATH: &str = "/usr/bin/nfqws";

/// Argument vector for one engine invocation: queue binding first, then
/// the strategy's opaque tokens.
fn engine_argv(slot: RedirectionSlot, engine_args: &str) -> Vec<String> {
    std::iter::once(format!("--qnum={}", slot.queue_num()))
        .chain(engine_args.split_whitespace().map(String::from))
        .collect()
}

/// A supervised nfqws instance
pub struct NfqwsProcess {
    child: Child,
    grace: Duration,
}

#[async_trait]
impl EngineProcess for NfqwsProcess {
    fn is_running(&mut self) -> bool {
        matches!(self.child.try_wait(), Ok(None))
    }

    async fn stop(&mut self) {
        let Some(pid) = self.child.id() else {
            // Already reaped
            return;
        };

        debug!(pid, "stopping nfqws");
        // SAFETY: pid comes from a child we own; worst case the process
        // already exited and kill returns ESRCH, which is fine.
        unsafe {
            libc::kill(pid as libc::pid_t, libc::SIGTERM);
        }

        match tokio::time::timeout(self.grace, self.child.wait()).await {
            Ok(Ok(status)) => debug!(pid, %status, "nfqws exited"),
            Ok(Err(e)) => warn!(pid, error = %e, "failed to reap nfqws"),
            Err(_) => {
                warn!(pid, "nfqws ignored SIGTERM, killing");
                if let Err(e) = self.child.kill().await {
                    warn!(pid, error = %e, "failed to kill nfqws");
                }
            }
        }
    }
}

/// Launches nfqws instances bound to redirection slots
pub struct NfqwsController {
    binary: PathBuf,
    grace: Duration,
}

impl NfqwsController {
    /// Create a controller for the given nfqws binary and stop grace period
    pub fn new(binary: impl Into<PathBuf>, grace: Duration) -> Self {
        Self {
            binary: binary.into(),
            grace,
        }
    }

    /// The configured binary path
    pub fn binary(&self) -> &Path {
        &self.binary
    }
}

#[async_trait]
impl EngineController for NfqwsController {
    async fn start(
        &self,
        slot: RedirectionSlot,
        engine_args: &str,
    ) -> Result<Box<dyn EngineProcess>> {
        let argv = engine_argv(slot, engine_args);
        debug!(binary = %self.binary.display(), ?argv, "starting nfqws");

        let child = Command::new(&self.binary)
            .args(&argv)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .process_group(0)
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                Error::engine_start(slot.queue_num(), format!("failed to spawn nfqws: {e}"))
            })?;

        debug!(pid = child.id(), %slot, "nfqws spawned");
        Ok(Box::new(NfqwsProcess {
            child,
            grace: self.grace,
        }))
    }
}
