pub mod iptables;

use crate::session::MacAddr;
use std::fmt;
use std::net::IpAddr;
use thiserror::Error;

/// Requested packet-filter transition for one client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FirewallAccess {
    Grant,
    Revoke,
}

impl fmt::Display for FirewallAccess {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FirewallAccess::Grant => write!(f, "grant"),
            FirewallAccess::Revoke => write!(f, "revoke"),
        }
    }
}

#[derive(Debug, Error)]
pub enum FirewallError {
    #[error("failed to run {command}: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },
    #[error("{command} exited with code {code}: {stderr}")]
    CommandFailed {
        command: String,
        /// Process exit code, or -1 when killed by a signal.
        code: i32,
        stderr: String,
    },
}

/// Applies or revokes packet-filter access for one (IP, MAC) pair.
///
/// Implementations are idempotent from the caller's perspective: revoking a
/// rule that is already gone is not a failure. Calls are synchronous and
/// expected to be bounded; the admission core invokes them while holding the
/// registry lock.
pub trait FirewallController: Send + Sync {
    fn set_access(
        &self,
        access: FirewallAccess,
        address: IpAddr,
        hardware: MacAddr,
    ) -> Result<(), FirewallError>;
}
