use crate::audit::AuditLogger;
use crate::firewall::{FirewallAccess, FirewallController, FirewallError};
use crate::metrics::{reasons, MetricsRegistry};
use crate::registry::ClientRegistry;
use crate::session::{ConnectionState, MacAddr};
use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Requested access-state transition for one client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthAction {
    Authenticate,
    Deauthenticate,
}

impl FromStr for AuthAction {
    type Err = AuthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "authenticate" => Ok(AuthAction::Authenticate),
            "deauthenticate" => Ok(AuthAction::Deauthenticate),
            other => Err(AuthError::UnknownAction(other.to_string())),
        }
    }
}

impl fmt::Display for AuthAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthAction::Authenticate => write!(f, "authenticate"),
            AuthAction::Deauthenticate => write!(f, "deauthenticate"),
        }
    }
}

/// Why an action request was not applied.
///
/// All variants are recoverable: each terminates the single `apply()` call
/// early and leaves no state change behind.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("no tracked session for {0}")]
    ClientNotFound(IpAddr),
    #[error("hardware address mismatch for {address}: presented {presented}")]
    IdentityMismatch { address: IpAddr, presented: MacAddr },
    #[error("unknown auth action '{0}'")]
    UnknownAction(String),
    #[error(transparent)]
    Firewall(#[from] FirewallError),
}

impl AuthError {
    /// Stable reason label used for metrics and audit records.
    pub fn reason(&self) -> &'static str {
        match self {
            AuthError::ClientNotFound(_) => reasons::CLIENT_NOT_FOUND,
            AuthError::IdentityMismatch { .. } => reasons::IDENTITY_MISMATCH,
            AuthError::UnknownAction(_) => reasons::UNKNOWN_ACTION,
            AuthError::Firewall(_) => reasons::FIREWALL_ERROR,
        }
    }
}

/// Validates and applies access-state transitions, keeping the session
/// registry and the packet filter in lockstep.
pub struct AuthActionProcessor {
    registry: Arc<ClientRegistry>,
    firewall: Arc<dyn FirewallController>,
    metrics: Arc<MetricsRegistry>,
    audit: Arc<AuditLogger>,
    authenticated_total: AtomicU64,
}

impl AuthActionProcessor {
    pub fn new(
        registry: Arc<ClientRegistry>,
        firewall: Arc<dyn FirewallController>,
        metrics: Arc<MetricsRegistry>,
        audit: Arc<AuditLogger>,
    ) -> Self {
        Self {
            registry,
            firewall,
            metrics,
            audit,
            authenticated_total: AtomicU64::new(0),
        }
    }

    /// Lifetime count of successful authentications. Lock-free readable.
    pub fn authenticated_total(&self) -> u64 {
        self.authenticated_total.load(Ordering::Relaxed)
    }

    /// Parse and apply an action named by the request layer.
    ///
    /// Unrecognized names are rejected as `UnknownAction` without touching
    /// any state.
    pub fn apply_named(
        &self,
        address: IpAddr,
        hardware: MacAddr,
        action: &str,
    ) -> Result<(), AuthError> {
        match AuthAction::from_str(action) {
            Ok(parsed) => self.apply(address, hardware, parsed),
            Err(err) => {
                warn!(ip = %address, mac = %hardware, action = %action, "Unknown auth action rejected");
                self.metrics.record_rejection(reasons::UNKNOWN_ACTION);
                self.audit
                    .log_auth_rejected(address, hardware, reasons::UNKNOWN_ACTION);
                Err(err)
            }
        }
    }

    /// Apply one access-state transition for the client at `address`.
    ///
    /// The registry lock is held for the whole call: lookup, identity
    /// verification, firewall call, and state mutation form one critical
    /// section. The firewall call happens before the registry mutation that
    /// reflects it, so a reader observing registry state after this call
    /// returns sees a state consistent with the enforced firewall state.
    pub fn apply(
        &self,
        address: IpAddr,
        hardware: MacAddr,
        action: AuthAction,
    ) -> Result<(), AuthError> {
        let mut sessions = self.registry.lock();

        // The client must already have hit the splash flow and be tracked.
        let session = match sessions.get_mut(address) {
            Some(session) => session,
            None => {
                warn!(ip = %address, action = %action, "No tracked session for action request");
                self.metrics.record_rejection(reasons::CLIENT_NOT_FOUND);
                self.audit
                    .log_auth_rejected(address, hardware, reasons::CLIENT_NOT_FOUND);
                return Err(AuthError::ClientNotFound(address));
            }
        };

        if session.hardware_address() != hardware {
            warn!(
                ip = %address,
                stored = %session.hardware_address(),
                presented = %hardware,
                "Hardware address mismatch, possible spoofed request"
            );
            self.metrics.record_rejection(reasons::IDENTITY_MISMATCH);
            self.audit
                .log_auth_rejected(address, hardware, reasons::IDENTITY_MISMATCH);
            return Err(AuthError::IdentityMismatch {
                address,
                presented: hardware,
            });
        }

        match action {
            AuthAction::Authenticate => {
                if session.state == ConnectionState::Authenticated {
                    debug!(ip = %address, mac = %hardware, "Client already authenticated, nothing to do");
                    return Ok(());
                }
                if let Err(err) =
                    self.firewall
                        .set_access(FirewallAccess::Grant, address, hardware)
                {
                    warn!(
                        ip = %address,
                        mac = %hardware,
                        error = %err,
                        "Firewall grant failed, client stays unauthenticated"
                    );
                    self.metrics.record_rejection(reasons::FIREWALL_ERROR);
                    self.metrics.firewall_errors_total.inc();
                    self.audit
                        .log_auth_rejected(address, hardware, reasons::FIREWALL_ERROR);
                    return Err(err.into());
                }
                session.state = ConnectionState::Authenticated;
                session.touch();
                self.authenticated_total.fetch_add(1, Ordering::Relaxed);
                self.metrics.auth_success_total.inc();
                self.audit.log_auth_success(address, hardware);
                info!(ip = %address, mac = %hardware, "Client authenticated");
            }
            AuthAction::Deauthenticate => {
                // A client that never completed authentication is still
                // dropped from tracking; only authenticated sessions carry
                // firewall state to revoke.
                if session.state == ConnectionState::Authenticated {
                    if let Err(err) =
                        self.firewall
                            .set_access(FirewallAccess::Revoke, address, hardware)
                    {
                        warn!(
                            ip = %address,
                            mac = %hardware,
                            error = %err,
                            "Firewall revoke failed, session retained"
                        );
                        self.metrics.record_rejection(reasons::FIREWALL_ERROR);
                        self.metrics.firewall_errors_total.inc();
                        return Err(err.into());
                    }
                }
                sessions.remove(address);
                self.metrics.set_sessions_active(sessions.len());
                self.audit.log_deauthenticated(address, hardware);
                info!(ip = %address, mac = %hardware, "Client deauthenticated, session removed");
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_parse() {
        assert_eq!(
            "authenticate".parse::<AuthAction>().unwrap(),
            AuthAction::Authenticate
        );
        assert_eq!(
            "deauthenticate".parse::<AuthAction>().unwrap(),
            AuthAction::Deauthenticate
        );
        assert!(matches!(
            "reboot".parse::<AuthAction>(),
            Err(AuthError::UnknownAction(_))
        ));
    }

    #[test]
    fn test_error_reasons_are_stable() {
        let addr: IpAddr = "10.0.0.5".parse().unwrap();
        assert_eq!(
            AuthError::ClientNotFound(addr).reason(),
            reasons::CLIENT_NOT_FOUND
        );
        assert_eq!(
            AuthError::UnknownAction("x".into()).reason(),
            reasons::UNKNOWN_ACTION
        );
    }
}
