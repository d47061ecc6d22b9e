use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Log level enum (replaces stringly-typed field)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogLevel::Trace => write!(f, "trace"),
            LogLevel::Debug => write!(f, "debug"),
            LogLevel::Info => write!(f, "info"),
            LogLevel::Warn => write!(f, "warn"),
            LogLevel::Error => write!(f, "error"),
        }
    }
}

/// Log format enum (replaces stringly-typed field)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    Json,
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogFormat::Pretty => write!(f, "pretty"),
            LogFormat::Json => write!(f, "json"),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AppConfig {
    #[serde(default)]
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub firewall: FirewallConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
    #[serde(default)]
    pub api: ApiConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GatewayConfig {
    /// Seconds between liveness sweeps of the session registry.
    #[serde(default = "default_check_interval")]
    pub check_interval: u64,
    /// Seconds a session may stay idle before the sweeper evicts it
    /// (0 = sessions never expire).
    #[serde(default = "default_client_idle_timeout")]
    pub client_idle_timeout: u64,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            check_interval: default_check_interval(),
            client_idle_timeout: default_client_idle_timeout(),
        }
    }
}

fn default_check_interval() -> u64 {
    60
}

fn default_client_idle_timeout() -> u64 {
    300
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FirewallConfig {
    /// iptables binary used to install per-client mark rules.
    #[serde(default = "default_iptables_path")]
    pub iptables_path: PathBuf,
    /// Mangle-table chain holding the per-client rules. Must exist; the
    /// gateway's bootstrap scripts create it and jump to it from PREROUTING.
    #[serde(default = "default_chain")]
    pub chain: String,
    /// fwmark applied to authenticated clients' traffic.
    #[serde(default = "default_mark")]
    pub mark: u32,
}

impl Default for FirewallConfig {
    fn default() -> Self {
        Self {
            iptables_path: default_iptables_path(),
            chain: default_chain(),
            mark: default_mark(),
        }
    }
}

fn default_iptables_path() -> PathBuf {
    PathBuf::from("iptables")
}

fn default_chain() -> String {
    "authgate_mark".to_string()
}

fn default_mark() -> u32 {
    254
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: LogLevel,
    #[serde(default = "default_log_format")]
    pub format: LogFormat,
    /// JSONL audit trail path (optional; audit events go to the `audit`
    /// log target when unset).
    pub audit_log_path: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            audit_log_path: None,
        }
    }
}

fn default_log_level() -> LogLevel {
    LogLevel::Info
}

fn default_log_format() -> LogFormat {
    LogFormat::Pretty
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MetricsConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_metrics_listen")]
    pub listen: String,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            listen: default_metrics_listen(),
        }
    }
}

fn default_metrics_listen() -> String {
    "127.0.0.1:9090".to_string()
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApiConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_api_listen")]
    pub listen: String,
    /// Bearer token required on every API request.
    #[serde(default)]
    pub token: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            listen: default_api_listen(),
            token: String::new(),
        }
    }
}

fn default_api_listen() -> String {
    "127.0.0.1:9091".to_string()
}
