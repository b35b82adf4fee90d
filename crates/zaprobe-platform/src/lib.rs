//! # Zaprobe Platform
//!
//! Linux implementations of the `zaprobe-core` lifecycle traits:
//!
//! - [`IptablesController`] - one NFQUEUE redirection rule per probe in
//!   the mangle table
//! - [`NfqwsController`] - supervised nfqws processes, one per probe,
//!   each in its own process group
//!
//! Both require root. Nothing here is portable beyond Linux with
//! iptables and the zapret nfqws binary available.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod engine;
pub mod firewall;

pub use engine::NfqwsController;
pub use firewall::IptablesController;

/// Whether the current process runs as root, required for both backends
pub fn is_root() -> bool {
    // SAFETY: geteuid has no preconditions and cannot fail
    unsafe { libc::geteuid() == 0 }
}
