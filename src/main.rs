use anyhow::Result;
use clap::Parser;
use tracing::{error, info};

use authgate::cli::{Cli, Command};
use authgate::config;

fn main() -> Result<()> {
    let cli = Cli::parse();

    match &cli.command {
        Some(Command::CheckConfig) => {
            let cfg = config::load_config(&cli.config)?;
            println!("Configuration is valid.");
            println!("  Check interval: {}s", cfg.gateway.check_interval);
            println!(
                "  Client idle timeout: {}",
                if cfg.gateway.client_idle_timeout == 0 {
                    "disabled".to_string()
                } else {
                    format!("{}s", cfg.gateway.client_idle_timeout)
                }
            );
            println!("  Firewall chain: {}", cfg.firewall.chain);
            if cfg.api.enabled {
                println!("  API listen: {}", cfg.api.listen);
            }
            if cfg.metrics.enabled {
                println!("  Metrics listen: {}", cfg.metrics.listen);
            }
            return Ok(());
        }
        Some(Command::Init { output }) => {
            std::fs::write(output, default_config_toml())?;
            eprintln!("Configuration written to: {}", output.display());
            eprintln!();
            eprintln!("Set api.token before enabling the API, then start with:");
            eprintln!("  authgate -c {}", output.display());
            return Ok(());
        }
        Some(Command::HealthCheck { addr, timeout }) => {
            use std::net::TcpStream;
            use std::time::Duration;

            let timeout = Duration::from_secs(*timeout);
            match TcpStream::connect_timeout(
                &addr.parse().unwrap_or_else(|_| {
                    eprintln!("Invalid address: {}", addr);
                    std::process::exit(1);
                }),
                timeout,
            ) {
                Ok(_) => {
                    println!("OK: {} is reachable", addr);
                    return Ok(());
                }
                Err(e) => {
                    eprintln!("FAIL: {} is not reachable: {}", addr, e);
                    std::process::exit(1);
                }
            }
        }
        None => {}
    }

    let app_config = config::load_config(&cli.config)?;

    // Setup logging (CLI override > config)
    let log_level = cli
        .log_level
        .as_deref()
        .map(|s| s.to_string())
        .unwrap_or_else(|| app_config.logging.level.to_string());
    authgate::logging::setup_logging(&log_level, app_config.logging.format);

    info!(
        version = env!("CARGO_PKG_VERSION"),
        config = %cli.config.display(),
        "Starting authgate admission gateway"
    );

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async {
        if let Err(e) = authgate::server::run(app_config).await {
            error!(error = %e, "Server error");
            std::process::exit(1);
        }
    });

    Ok(())
}

fn default_config_toml() -> String {
    r#"[gateway]
check_interval = 60          # seconds between liveness sweeps
client_idle_timeout = 300    # idle seconds before eviction (0 = never)

[firewall]
iptables_path = "iptables"
chain = "authgate_mark"      # mangle-table chain, created by bootstrap scripts
mark = 254                   # fwmark applied to authenticated clients

[logging]
level = "info"
format = "pretty"
# audit_log_path = "/var/log/authgate/audit.jsonl"

[metrics]
enabled = false
listen = "127.0.0.1:9090"

[api]
enabled = false
listen = "127.0.0.1:9091"
token = ""                   # required when enabled, minimum 16 chars
"#
    .to_string()
}
