use crate::audit::AuditLogger;
use crate::config::types::GatewayConfig;
use crate::firewall::FirewallController;
use crate::metrics::MetricsRegistry;
use crate::registry::ClientRegistry;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Periodic session-liveness sweeper.
///
/// Each iteration sweeps the registry, then waits until an absolute deadline
/// computed after the sweep, so clock adjustments and spurious wake-ups do
/// not accumulate drift. Cancelling the shutdown token preempts the wait and
/// stops the task deterministically. A failed pass is logged and retried on
/// the next interval, never fatal.
pub struct SessionSweeper {
    registry: Arc<ClientRegistry>,
    firewall: Arc<dyn FirewallController>,
    metrics: Arc<MetricsRegistry>,
    audit: Arc<AuditLogger>,
    check_interval: Duration,
    idle_timeout: Duration,
}

impl SessionSweeper {
    pub fn new(
        registry: Arc<ClientRegistry>,
        firewall: Arc<dyn FirewallController>,
        metrics: Arc<MetricsRegistry>,
        audit: Arc<AuditLogger>,
        config: &GatewayConfig,
    ) -> Self {
        Self::with_intervals(
            registry,
            firewall,
            metrics,
            audit,
            Duration::from_secs(config.check_interval),
            Duration::from_secs(config.client_idle_timeout),
        )
    }

    pub fn with_intervals(
        registry: Arc<ClientRegistry>,
        firewall: Arc<dyn FirewallController>,
        metrics: Arc<MetricsRegistry>,
        audit: Arc<AuditLogger>,
        check_interval: Duration,
        idle_timeout: Duration,
    ) -> Self {
        Self {
            registry,
            firewall,
            metrics,
            audit,
            check_interval,
            idle_timeout,
        }
    }

    pub fn spawn(self, shutdown: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move { self.run(shutdown).await })
    }

    async fn run(self, shutdown: CancellationToken) {
        info!(
            interval_secs = self.check_interval.as_secs(),
            idle_timeout_secs = self.idle_timeout.as_secs(),
            "Session sweeper started"
        );
        loop {
            self.sweep();

            let deadline = tokio::time::Instant::now() + self.check_interval;
            tokio::select! {
                _ = shutdown.cancelled() => {
                    info!("Session sweeper stopped");
                    return;
                }
                _ = tokio::time::sleep_until(deadline) => {}
            }
        }
    }

    fn sweep(&self) {
        let stats = self
            .registry
            .refresh_all(self.firewall.as_ref(), self.idle_timeout);

        self.metrics.sweeps_total.inc();
        if !stats.expired.is_empty() {
            self.metrics
                .sessions_expired_total
                .inc_by(stats.expired.len() as u64);
            for (address, mac) in &stats.expired {
                self.audit.log_session_expired(*address, *mac);
            }
        }
        if stats.firewall_errors > 0 {
            self.metrics
                .firewall_errors_total
                .inc_by(stats.firewall_errors as u64);
        }
        self.metrics.set_sessions_active(self.registry.lock().len());

        debug!(
            expired = stats.expired.len(),
            firewall_errors = stats.firewall_errors,
            "Sweep completed"
        );
    }
}
