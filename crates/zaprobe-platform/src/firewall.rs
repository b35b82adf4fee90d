//! iptables NFQUEUE rule lifecycle
//!
//! One additive rule per probe in the mangle table's OUTPUT chain,
//! matching the session's destination address and port and redirecting to
//! the worker's queue. The mark test excludes packets the engine already
//! processed, so its own outbound traffic does not loop back into the
//! queue. Removal replays the byte-identical match specification with
//! `-D`.

use async_trait::async_trait;
use std::net::IpAddr;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, warn};
use zaprobe_core::error::{Error, Result};
use zaprobe_core::lifecycle::{RedirectionSlot, RuleController};

/// Mark bit nfqws sets on packets it has already handled
const BYPASS_MARK: &str = "0x40000000/0x40000000";

/// Rule operation: insert or delete
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RuleOp {
    Insert,
    Delete,
}

impl RuleOp {
    fn flag(self) -> &'static str {
        match self {
            Self::Insert => "-I",
            Self::Delete => "-D",
        }
    }
}

/// Build the full iptables argument vector for one redirection rule.
///
/// Insert and delete must produce identical match specifications or the
/// delete will silently miss the rule.
fn rule_args(op: RuleOp, slot: RedirectionSlot, dst: IpAddr, port: u16) -> Vec<String> {
    vec![
        "-t".into(),
        "mangle".into(),
        op.flag().into(),
        "OUTPUT".into(),
        "-p".into(),
        "tcp".into(),
        "--dport".into(),
        port.to_string(),
        "-d".into(),
        dst.to_string(),
        "-m".into(),
        "mark".into(),
        "!".into(),
        "--mark".into(),
        BYPASS_MARK.into(),
        "-j".into(),
        "NFQUEUE".into(),
        "--queue-num".into(),
        slot.queue_num().to_string(),
        "--queue-bypass".into(),
    ]
}

/// iptables-backed rule controller
pub struct IptablesController {
    iptables: PathBuf,
}

impl IptablesController {
    /// Create a controller using `iptables` from PATH
    pub fn new() -> Self {
        Self::with_path("iptables")
    }

    /// Create a controller with an explicit iptables binary path
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self {
            iptables: path.into(),
        }
    }

    async fn run(&self, args: &[String]) -> std::result::Result<(), String> {
        debug!(iptables = %self.iptables.display(), ?args, "running iptables");
        let output = Command::new(&self.iptables)
            .args(args)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| format!("failed to execute iptables: {e}"))?;

        if output.status.success() {
            Ok(())
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr);
            Err(format!(
                "iptables exited with {}: {}",
                output.status,
                stderr.trim()
            ))
        }
    }
}

impl Default for IptablesController {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RuleController for IptablesController {
    async fn install(&self, slot: RedirectionSlot, dst: IpAddr, port: u16) -> Result<()> {
        self.run(&rule_args(RuleOp::Insert, slot, dst, port))
            .await
            .map_err(|message| Error::rule_install(slot.queue_num(), message))
    }

    async fn remove(&self, slot: RedirectionSlot, dst: IpAddr, port: u16) {
        // Best-effort: the rule may already be gone if the kernel table
        // changed under us. Log and move on.
        if let Err(message) = self.run(&rule_args(RuleOp::Delete, slot, dst, port)).await {
            warn!(%slot, %dst, message, "failed to remove redirection rule");
        }
    }
}
