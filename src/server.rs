use crate::api;
use crate::audit::AuditLogger;
use crate::auth::AuthActionProcessor;
use crate::config::types::AppConfig;
use crate::context::AppContext;
use crate::firewall::iptables::IptablesFirewall;
use crate::firewall::FirewallController;
use crate::metrics::MetricsRegistry;
use crate::registry::ClientRegistry;
use crate::sweeper::SessionSweeper;

use anyhow::Result;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Main server orchestrator.
///
/// Wires the admission components together, spawns the session sweeper and
/// the configured listeners, and blocks until a shutdown signal arrives.
/// Shutdown cancels the services token, which preempts the sweeper's wait
/// and drains the listeners gracefully.
pub async fn run(config: AppConfig) -> Result<()> {
    let config = Arc::new(config);

    let metrics = Arc::new(MetricsRegistry::new());
    let audit = Arc::new(AuditLogger::new(config.logging.audit_log_path.clone()));
    let registry = Arc::new(ClientRegistry::new());
    let firewall: Arc<dyn FirewallController> = Arc::new(IptablesFirewall::new(&config.firewall));
    let auth = Arc::new(AuthActionProcessor::new(
        registry.clone(),
        firewall.clone(),
        metrics.clone(),
        audit.clone(),
    ));

    // Global shutdown token (signal-driven) and a child for the services.
    let shutdown = CancellationToken::new();
    let services_shutdown = CancellationToken::new();

    let ctx = Arc::new(AppContext {
        config: config.clone(),
        registry: registry.clone(),
        firewall: firewall.clone(),
        auth: auth.clone(),
        metrics: metrics.clone(),
        audit: audit.clone(),
        start_time: std::time::Instant::now(),
    });

    let sweeper = SessionSweeper::new(
        registry.clone(),
        firewall.clone(),
        metrics.clone(),
        audit.clone(),
        &config.gateway,
    );
    let sweeper_handle = sweeper.spawn(services_shutdown.clone());

    if config.metrics.enabled {
        let listen = config.metrics.listen.clone();
        let metrics = metrics.clone();
        let token = services_shutdown.clone();
        tokio::spawn(async move {
            if let Err(e) = api::start_metrics_server(&listen, metrics, token).await {
                error!(error = %e, "Metrics server error");
            }
        });
    }

    if config.api.enabled {
        let listen = config.api.listen.clone();
        let state = api::AppState {
            ctx: ctx.clone(),
            api_token: config.api.token.clone(),
        };
        let token = services_shutdown.clone();
        tokio::spawn(async move {
            if let Err(e) = api::start_api_server(&listen, state, token).await {
                error!(error = %e, "API server error");
            }
        });
    }

    tokio::spawn(handle_signals(shutdown.clone()));

    info!(
        check_interval = config.gateway.check_interval,
        "Admission gateway running"
    );

    shutdown.cancelled().await;

    info!("Initiating graceful shutdown");
    services_shutdown.cancel();
    if let Err(e) = sweeper_handle.await {
        warn!(error = %e, "Sweeper task join failed");
    }
    info!("Graceful shutdown complete");
    Ok(())
}

#[cfg(unix)]
async fn handle_signals(shutdown: CancellationToken) {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigterm = match signal(SignalKind::terminate()) {
        Ok(s) => s,
        Err(e) => {
            error!(error = %e, "Failed to install SIGTERM handler");
            return;
        }
    };
    let mut sigint = match signal(SignalKind::interrupt()) {
        Ok(s) => s,
        Err(e) => {
            error!(error = %e, "Failed to install SIGINT handler");
            return;
        }
    };

    tokio::select! {
        _ = sigterm.recv() => info!("SIGTERM received, initiating graceful shutdown"),
        _ = sigint.recv() => info!("SIGINT received, initiating graceful shutdown"),
    }
    shutdown.cancel();
}

#[cfg(not(unix))]
async fn handle_signals(shutdown: CancellationToken) {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("Ctrl-C received, initiating graceful shutdown");
        shutdown.cancel();
    }
}
