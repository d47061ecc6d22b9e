#![allow(dead_code)]

use authgate::audit::AuditLogger;
use authgate::auth::AuthActionProcessor;
use authgate::firewall::{FirewallAccess, FirewallController, FirewallError};
use authgate::metrics::MetricsRegistry;
use authgate::registry::ClientRegistry;
use authgate::session::{ClientSession, MacAddr};
use std::net::IpAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

/// Firewall stub that records every call and can be told to fail.
pub struct RecordingFirewall {
    calls: Mutex<Vec<(FirewallAccess, IpAddr, MacAddr)>>,
    failing: AtomicBool,
}

impl RecordingFirewall {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            calls: Mutex::new(Vec::new()),
            failing: AtomicBool::new(false),
        })
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn calls(&self) -> Vec<(FirewallAccess, IpAddr, MacAddr)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn grants(&self) -> usize {
        self.calls()
            .iter()
            .filter(|(access, _, _)| *access == FirewallAccess::Grant)
            .count()
    }

    pub fn revokes(&self) -> usize {
        self.calls()
            .iter()
            .filter(|(access, _, _)| *access == FirewallAccess::Revoke)
            .count()
    }
}

impl FirewallController for RecordingFirewall {
    fn set_access(
        &self,
        access: FirewallAccess,
        address: IpAddr,
        hardware: MacAddr,
    ) -> Result<(), FirewallError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(FirewallError::CommandFailed {
                command: "iptables (stub)".to_string(),
                code: 1,
                stderr: "injected failure".to_string(),
            });
        }
        self.calls.lock().unwrap().push((access, address, hardware));
        Ok(())
    }
}

pub fn ip(s: &str) -> IpAddr {
    s.parse().unwrap()
}

pub fn mac(s: &str) -> MacAddr {
    s.parse().unwrap()
}

/// Registry + recording firewall + processor wired like the server does it.
pub struct TestCore {
    pub registry: Arc<ClientRegistry>,
    pub firewall: Arc<RecordingFirewall>,
    pub metrics: Arc<MetricsRegistry>,
    pub auth: Arc<AuthActionProcessor>,
}

pub fn test_core() -> TestCore {
    let registry = Arc::new(ClientRegistry::new());
    let firewall = RecordingFirewall::new();
    let metrics = Arc::new(MetricsRegistry::new());
    let auth = Arc::new(AuthActionProcessor::new(
        registry.clone(),
        firewall.clone(),
        metrics.clone(),
        Arc::new(AuditLogger::new_noop()),
    ));
    TestCore {
        registry,
        firewall,
        metrics,
        auth,
    }
}

/// Insert an unauthenticated session for (ip, mac).
pub fn track_client(core: &TestCore, address: &str, hardware: &str) {
    core.registry
        .lock()
        .insert(ClientSession::new(ip(address), mac(hardware)));
}
