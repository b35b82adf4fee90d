//! Solver configuration
//!
//! Strongly-typed configuration with TOML support. All timings carry
//! defaults tuned for aggressive probing: the whole session is bounded by
//! one probe timeout plus a fixed margin, never by catalog size.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Default NFQUEUE base number; worker *i* binds queue `base + i`.
pub const DEFAULT_QUEUE_BASE: u16 = 200;

/// Browser user agent sent with connectivity probes.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Solver configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    /// First NFQUEUE number of the session's slot range
    pub queue_base: u16,

    /// Destination port the probes and firewall rules target
    pub probe_port: u16,

    /// Per-probe timeout in milliseconds (aggressive by design)
    pub probe_timeout_ms: u64,

    /// Wait after engine start before checking it survived, in milliseconds
    pub settle_interval_ms: u64,

    /// Grace period between SIGTERM and SIGKILL when stopping an engine
    pub engine_grace_ms: u64,

    /// Extra margin the coordinator allows past the probe timeout before
    /// giving up on straggler workers
    pub session_grace_ms: u64,

    /// Per-provider timeout for DoH fallback queries
    pub doh_timeout_ms: u64,

    /// User agent for connectivity probes
    pub user_agent: String,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            queue_base: DEFAULT_QUEUE_BASE,
            probe_port: 443,
            probe_timeout_ms: 3_000,
            settle_interval_ms: 500,
            engine_grace_ms: 1_000,
            session_grace_ms: 2_000,
            doh_timeout_ms: 5_000,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl SolverConfig {
    /// Load configuration from a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml(&content)
    }

    /// Parse configuration from a TOML string
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.probe_port == 0 {
            return Err(Error::config_value("probe_port", "must be 1-65535"));
        }
        if self.probe_timeout_ms == 0 {
            return Err(Error::config_value("probe_timeout_ms", "must be non-zero"));
        }
        if self.queue_base == 0 {
            return Err(Error::config_value("queue_base", "must be non-zero"));
        }
        Ok(())
    }

    /// Per-probe timeout
    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }

    /// Post-start settle interval
    pub fn settle_interval(&self) -> Duration {
        Duration::from_millis(self.settle_interval_ms)
    }

    /// Engine stop grace period
    pub fn engine_grace(&self) -> Duration {
        Duration::from_millis(self.engine_grace_ms)
    }

    /// Upper bound on a whole session: one probe timeout plus the settle
    /// interval plus a fixed margin, independent of catalog size.
    pub fn session_bound(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms + self.settle_interval_ms + self.session_grace_ms)
    }

    /// Per-provider DoH timeout
    pub fn doh_timeout(&self) -> Duration {
        Duration::from_millis(self.doh_timeout_ms)
    }
}
