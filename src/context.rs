use crate::audit::AuditLogger;
use crate::auth::AuthActionProcessor;
use crate::config::types::AppConfig;
use crate::firewall::FirewallController;
use crate::metrics::MetricsRegistry;
use crate::registry::ClientRegistry;
use std::sync::Arc;
use std::time::Instant;

/// Shared application context, replacing scattered Arc parameters
pub struct AppContext {
    pub config: Arc<AppConfig>,
    pub registry: Arc<ClientRegistry>,
    pub firewall: Arc<dyn FirewallController>,
    pub auth: Arc<AuthActionProcessor>,
    pub metrics: Arc<MetricsRegistry>,
    pub audit: Arc<AuditLogger>,
    pub start_time: Instant,
}
