//! Concurrent strategy-probing engine
//!
//! One worker per catalog entry, all launched together; the first worker
//! whose probe succeeds wins the session, the rest are cancelled
//! cooperatively, and every temporary resource is released before the
//! session returns.

mod coordinator;
mod session;
mod worker;

pub use coordinator::{ProbeCoordinator, SolveReport};
pub use worker::{ProbeOutcome, WorkerPhase};
