//! # Zaprobe Core
//!
//! Platform-independent engine that determines which DPI evasion strategy
//! restores connectivity for a blocked domain, by probing all candidates
//! concurrently.
//!
//! ## Architecture
//!
//! This crate provides:
//! - **Domain resolution** - system channel with DNS-over-HTTPS fallback
//!   around poisoned answers
//! - **Strategy catalog** - ordered descriptors for the external evasion
//!   engine (nfqws argument strings)
//! - **Probe workers** - per-strategy rule/engine lifecycles plus one real
//!   connectivity check
//! - **Coordinator** - winner-take-all arbitration with bounded latency
//!   and guaranteed cleanup
//!
//! Platform backends (iptables, nfqws) live in `zaprobe-platform`; this
//! crate only defines the lifecycle traits they implement.
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use zaprobe_core::{
//!     DohResolver, HttpsProbe, ProbeCoordinator, SolverConfig, StrategyCatalog,
//! };
//! # use zaprobe_core::lifecycle::{EngineController, RuleController};
//! # async fn demo(rules: Arc<dyn RuleController>, engines: Arc<dyn EngineController>)
//! #     -> zaprobe_core::Result<()> {
//! let config = SolverConfig::default();
//! let resolver = Arc::new(DohResolver::new(&config)?);
//! let probe = Arc::new(HttpsProbe::new(&config));
//! let coordinator = ProbeCoordinator::new(resolver, rules, engines, probe, config);
//!
//! let report = coordinator.solve("example.com", &StrategyCatalog::builtin()).await;
//! println!("winner: {:?}", report.winner);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod catalog;
pub mod config;
pub mod error;
pub mod lifecycle;
pub mod probe;
pub mod resolver;
pub mod solver;

// Re-exports for convenience
pub use catalog::{StrategyCatalog, StrategyDescriptor, StrategyKind};
pub use config::SolverConfig;
pub use error::{Error, FailureKind, Result};
pub use lifecycle::RedirectionSlot;
pub use probe::HttpsProbe;
pub use resolver::DohResolver;
pub use solver::{ProbeCoordinator, ProbeOutcome, SolveReport};
