use prometheus_client::encoding::EncodeLabelSet;
use prometheus_client::metrics::counter::Counter;
use prometheus_client::metrics::family::Family;
use prometheus_client::metrics::gauge::Gauge;
use prometheus_client::registry::Registry;

/// Well-known rejection reason constants for metrics and audit records.
pub mod reasons {
    pub const CLIENT_NOT_FOUND: &str = "client_not_found";
    pub const IDENTITY_MISMATCH: &str = "identity_mismatch";
    pub const UNKNOWN_ACTION: &str = "unknown_action";
    pub const FIREWALL_ERROR: &str = "firewall_error";
}

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct ReasonLabel {
    pub reason: String,
}

/// Centralized metrics registry for the admission core.
pub struct MetricsRegistry {
    pub registry: Registry,
    /// Sessions currently tracked by the registry.
    pub sessions_active: Gauge,
    /// Successful authentications since start (lifetime counter).
    pub auth_success_total: Counter,
    /// Rejected action requests by reason.
    pub auth_rejected_total: Family<ReasonLabel, Counter>,
    /// Sessions evicted by the liveness sweeper.
    pub sessions_expired_total: Counter,
    /// Completed sweep passes.
    pub sweeps_total: Counter,
    /// Failed firewall operations (grant or revoke).
    pub firewall_errors_total: Counter,
}

impl MetricsRegistry {
    pub fn new() -> Self {
        let mut registry = Registry::default();

        let sessions_active = Gauge::default();
        registry.register(
            "authgate_sessions_active",
            "Sessions currently tracked by the registry",
            sessions_active.clone(),
        );

        let auth_success_total = Counter::default();
        registry.register(
            "authgate_auth_success_total",
            "Successful authentications since start",
            auth_success_total.clone(),
        );

        let auth_rejected_total = Family::<ReasonLabel, Counter>::default();
        registry.register(
            "authgate_auth_rejected_total",
            "Rejected action requests by reason",
            auth_rejected_total.clone(),
        );

        let sessions_expired_total = Counter::default();
        registry.register(
            "authgate_sessions_expired_total",
            "Sessions evicted by the liveness sweeper",
            sessions_expired_total.clone(),
        );

        let sweeps_total = Counter::default();
        registry.register(
            "authgate_sweeps_total",
            "Completed liveness sweep passes",
            sweeps_total.clone(),
        );

        let firewall_errors_total = Counter::default();
        registry.register(
            "authgate_firewall_errors_total",
            "Failed firewall grant/revoke operations",
            firewall_errors_total.clone(),
        );

        Self {
            registry,
            sessions_active,
            auth_success_total,
            auth_rejected_total,
            sessions_expired_total,
            sweeps_total,
            firewall_errors_total,
        }
    }

    pub fn record_rejection(&self, reason: &str) {
        self.auth_rejected_total
            .get_or_create(&ReasonLabel {
                reason: reason.to_string(),
            })
            .inc();
    }

    pub fn set_sessions_active(&self, count: usize) {
        self.sessions_active.set(count as i64);
    }
}

impl Default for MetricsRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejections_counted_by_reason() {
        let metrics = MetricsRegistry::new();
        metrics.record_rejection(reasons::CLIENT_NOT_FOUND);
        metrics.record_rejection(reasons::CLIENT_NOT_FOUND);
        metrics.record_rejection(reasons::IDENTITY_MISMATCH);

        let not_found = metrics
            .auth_rejected_total
            .get_or_create(&ReasonLabel {
                reason: reasons::CLIENT_NOT_FOUND.to_string(),
            })
            .get();
        assert_eq!(not_found, 2);
    }

    #[test]
    fn test_sessions_gauge() {
        let metrics = MetricsRegistry::new();
        metrics.set_sessions_active(7);
        assert_eq!(metrics.sessions_active.get(), 7);
        metrics.set_sessions_active(0);
        assert_eq!(metrics.sessions_active.get(), 0);
    }

    #[test]
    fn test_encode_includes_metric_names() {
        let metrics = MetricsRegistry::new();
        metrics.auth_success_total.inc();
        let mut buffer = String::new();
        prometheus_client::encoding::text::encode(&mut buffer, &metrics.registry).unwrap();
        assert!(buffer.contains("authgate_auth_success_total"));
        assert!(buffer.contains("authgate_sessions_active"));
    }
}
