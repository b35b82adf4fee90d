//! Shared per-session state
//!
//! The only mutable state workers share is the winner/cancellation pair,
//! guarded by a single lock. Everything else a worker needs is immutable
//! session context.

use crate::config::SolverConfig;
use crate::lifecycle::{EngineController, RuleController};
use crate::probe::ConnectivityCheck;
use parking_lot::Mutex;
use std::net::IpAddr;
use std::sync::Arc;

/// Winner slot and cancellation flag, updated together under one lock
#[derive(Default)]
struct WinnerState {
    winner: Option<String>,
    cancelled: bool,
}

/// Shared arbitration state for one probe session
pub(crate) struct SessionShared {
    state: Mutex<WinnerState>,
}

impl SessionShared {
    pub(crate) fn new() -> Self {
        Self {
            state: Mutex::new(WinnerState::default()),
        }
    }

    /// Whether a winner exists and remaining workers should skip
    pub(crate) fn is_cancelled(&self) -> bool {
        self.state.lock().cancelled
    }

    /// Raise the cancellation flag without recording a winner. Used by the
    /// coordinator when the session bound expires.
    pub(crate) fn cancel(&self) {
        self.state.lock().cancelled = true;
    }

    /// Atomic check-and-set of the winner.
    ///
    /// Only the first successful worker to take the lock wins; winning also
    /// raises the cancellation flag for everyone else. Returns whether this
    /// caller won.
    pub(crate) fn try_win(&self, key: &str) -> bool {
        let mut state = self.state.lock();
        if state.winner.is_some() {
            return false;
        }
        state.winner = Some(key.to_string());
        state.cancelled = true;
        true
    }

    /// The recorded winner, if any
    pub(crate) fn winner(&self) -> Option<String> {
        self.state.lock().winner.clone()
    }
}

/// Immutable context shared by all workers of one session
pub(crate) struct SessionContext {
    pub(crate) domain: String,
    pub(crate) target: IpAddr,
    pub(crate) config: SolverConfig,
    pub(crate) rules: Arc<dyn RuleController>,
    pub(crate) engines: Arc<dyn EngineController>,
    pub(crate) probe: Arc<dyn ConnectivityCheck>,
    pub(crate) shared: SessionShared,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_winner_set_at_most_once() {
        let shared = SessionShared::new();
        assert!(!shared.is_cancelled());

        assert!(shared.try_win("split"));
        assert!(shared.is_cancelled());
        assert_eq!(shared.winner(), Some("split".to_string()));

        // A second success loses the race and must not overwrite
        assert!(!shared.try_win("fake"));
        assert_eq!(shared.winner(), Some("split".to_string()));
    }

    #[test]
    fn test_cancel_without_winner() {
        let shared = SessionShared::new();
        shared.cancel();
        assert!(shared.is_cancelled());
        assert_eq!(shared.winner(), None);
    }
}
