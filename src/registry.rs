use crate::firewall::{FirewallAccess, FirewallController};
use crate::session::{ClientSession, ConnectionState, MacAddr};
use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tracing::{info, warn};

/// Owning collection of tracked client sessions, keyed by IP address.
///
/// All access serializes through one coarse lock. Every logical operation —
/// including firewall side effects performed by a caller holding the guard —
/// runs inside a single critical section, so visible session state and
/// enforced firewall state cannot diverge between concurrent callers.
/// Entry borrows are tied to the guard's lifetime and cannot escape it.
pub struct ClientRegistry {
    inner: Mutex<HashMap<IpAddr, ClientSession>>,
}

/// Outcome of one liveness sweep.
#[derive(Debug, Default)]
pub struct SweepStats {
    /// Sessions evicted this pass (address, hardware address).
    pub expired: Vec<(IpAddr, MacAddr)>,
    /// Authenticated sessions whose firewall revoke failed; retained for the
    /// next pass.
    pub firewall_errors: usize,
}

impl ClientRegistry {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(HashMap::new()),
        }
    }

    /// Acquire the registry lock for the duration of the returned guard.
    pub fn lock(&self) -> RegistryGuard<'_> {
        RegistryGuard {
            sessions: self.inner.lock().unwrap_or_else(PoisonError::into_inner),
        }
    }

    /// Sweep entry point: evict sessions idle beyond `idle_timeout`.
    ///
    /// Authenticated sessions have their firewall access revoked before
    /// removal; if the revoke fails the session is retained so a later pass
    /// retries it. An `idle_timeout` of zero disables expiry entirely.
    pub fn refresh_all(
        &self,
        firewall: &dyn FirewallController,
        idle_timeout: Duration,
    ) -> SweepStats {
        let mut stats = SweepStats::default();
        if idle_timeout.is_zero() {
            return stats;
        }

        let mut sessions = self.lock();
        let stale: Vec<IpAddr> = sessions
            .iter()
            .filter(|s| s.idle_for() >= idle_timeout)
            .map(|s| s.address)
            .collect();

        for address in stale {
            let (state, mac) = match sessions.get(address) {
                Some(s) => (s.state, s.hardware_address()),
                None => continue,
            };
            if state == ConnectionState::Authenticated {
                if let Err(err) = firewall.set_access(FirewallAccess::Revoke, address, mac) {
                    warn!(
                        ip = %address,
                        mac = %mac,
                        error = %err,
                        "Firewall revoke failed during sweep, session retained"
                    );
                    stats.firewall_errors += 1;
                    continue;
                }
            }
            sessions.remove(address);
            info!(ip = %address, mac = %mac, state = %state, "Session expired");
            stats.expired.push((address, mac));
        }
        stats
    }
}

impl Default for ClientRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Exclusive view of the session collection while the registry lock is held.
pub struct RegistryGuard<'a> {
    sessions: MutexGuard<'a, HashMap<IpAddr, ClientSession>>,
}

impl RegistryGuard<'_> {
    pub fn get(&self, address: IpAddr) -> Option<&ClientSession> {
        self.sessions.get(&address)
    }

    pub fn get_mut(&mut self, address: IpAddr) -> Option<&mut ClientSession> {
        self.sessions.get_mut(&address)
    }

    /// Insert a session keyed by its address, returning the displaced entry
    /// if the address was already tracked.
    pub fn insert(&mut self, session: ClientSession) -> Option<ClientSession> {
        self.sessions.insert(session.address, session)
    }

    pub fn remove(&mut self, address: IpAddr) -> Option<ClientSession> {
        self.sessions.remove(&address)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ClientSession> {
        self.sessions.values()
    }
}
