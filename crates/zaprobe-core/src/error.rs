//! Error types for zaprobe-core
//!
//! Centralized error handling using `thiserror` for ergonomic error definitions.
//! Worker-local errors are classified into a [`FailureKind`] so they can be
//! recorded on a probe outcome instead of aborting the session.

use thiserror::Error;

/// Main error type for zaprobe-core operations
#[derive(Error, Debug)]
pub enum Error {
    /// No usable address found via the primary channel or any DoH provider.
    /// Fatal for the session: there is no target to test against.
    #[error("DNS resolution failed for '{domain}': {reason}")]
    Resolution {
        /// Domain that failed to resolve
        domain: String,
        /// Failure reason
        reason: String,
    },

    /// A single DoH provider query failed (recoverable, next provider is tried)
    #[error("DoH provider '{provider}' failed: {reason}")]
    DohProvider {
        /// Provider name
        provider: String,
        /// Failure reason
        reason: String,
    },

    /// Firewall redirection rule could not be installed
    #[error("Rule install failed for queue {queue}: {message}")]
    RuleInstall {
        /// NFQUEUE number the rule was bound to
        queue: u16,
        /// Error message from the firewall backend
        message: String,
    },

    /// Evasion engine process exited before or during the settle interval,
    /// or could not be spawned at all
    #[error("Engine start failed for queue {queue}: {message}")]
    EngineStart {
        /// NFQUEUE number the engine was bound to
        queue: u16,
        /// Error message
        message: String,
    },

    /// Connectivity probe did not complete within its timeout
    #[error("Probe timed out after {elapsed_ms} ms")]
    ProbeTimeout {
        /// Elapsed time before giving up
        elapsed_ms: u64,
    },

    /// Connection-level probe failure (refused, reset, unreachable)
    #[error("Probe connection error: {0}")]
    ProbeConnection(String),

    /// TLS handshake failure, distinguished from application-layer responses
    /// which count as reachable
    #[error("Probe TLS error: {0}")]
    ProbeTls(String),

    /// Worker skipped its probe because another strategy already won
    #[error("Probe cancelled: a winner was already selected")]
    Cancelled,

    /// Strategy catalog contains duplicate keys
    #[error("Duplicate strategy key in catalog: '{key}'")]
    DuplicateStrategy {
        /// The offending key
        key: String,
    },

    /// Catalog file not found
    #[error("Catalog file not found: {path}")]
    CatalogNotFound {
        /// Path to the missing catalog file
        path: String,
    },

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    ConfigValue {
        /// Configuration key
        key: String,
        /// Error message
        message: String,
    },

    /// HTTP client construction failed
    #[error("HTTP client error: {0}")]
    HttpClient(String),

    /// I/O error wrapper
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML parsing error
    #[error("TOML parsing error: {0}")]
    TomlParse(#[from] toml::de::Error),
}

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Classification of a worker-local failure, recorded on the probe outcome.
///
/// Every variant maps to one branch of the error taxonomy; the coordinator
/// never sees worker errors in any other form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Firewall rule install rejected
    RuleInstall,
    /// Engine process died before or during the settle interval
    EngineStart,
    /// Probe timed out
    Timeout,
    /// Connection refused/reset/unreachable
    Connection,
    /// TLS handshake failure
    Tls,
    /// Worker skipped because a winner already existed
    Cancelled,
    /// Anything else (bug surface, kept local to the worker)
    Internal,
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::RuleInstall => "rule_install",
            Self::EngineStart => "engine_start",
            Self::Timeout => "timeout",
            Self::Connection => "connection",
            Self::Tls => "tls",
            Self::Cancelled => "cancelled",
            Self::Internal => "internal",
        };
        f.write_str(name)
    }
}

impl Error {
    /// Create a rule install error
    pub fn rule_install(queue: u16, message: impl Into<String>) -> Self {
        Self::RuleInstall {
            queue,
            message: message.into(),
        }
    }

    /// Create an engine start error
    pub fn engine_start(queue: u16, message: impl Into<String>) -> Self {
        Self::EngineStart {
            queue,
            message: message.into(),
        }
    }

    /// Create a resolution error
    pub fn resolution(domain: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Resolution {
            domain: domain.into(),
            reason: reason.into(),
        }
    }

    /// Create a config value error
    pub fn config_value(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigValue {
            key: key.into(),
            message: message.into(),
        }
    }

    /// Classify this error for recording on a probe outcome
    pub fn failure_kind(&self) -> FailureKind {
        match self {
            Self::RuleInstall { .. } => FailureKind::RuleInstall,
            Self::EngineStart { .. } => FailureKind::EngineStart,
            Self::ProbeTimeout { .. } => FailureKind::Timeout,
            Self::ProbeConnection(_) => FailureKind::Connection,
            Self::ProbeTls(_) => FailureKind::Tls,
            Self::Cancelled => FailureKind::Cancelled,
            _ => FailureKind::Internal,
        }
    }
}
