pub mod types;

use anyhow::{Context, Result};
use std::path::Path;
use types::AppConfig;

/// Maximum config file size (1 MB)
const MAX_CONFIG_SIZE: u64 = 1_048_576;

/// Load and validate configuration from a TOML file
pub fn load_config(path: &Path) -> Result<AppConfig> {
    let metadata = std::fs::metadata(path)
        .with_context(|| format!("reading config metadata: {}", path.display()))?;
    if metadata.len() > MAX_CONFIG_SIZE {
        anyhow::bail!(
            "config file too large: {} bytes (max {} bytes)",
            metadata.len(),
            MAX_CONFIG_SIZE
        );
    }

    check_config_file_permissions(path);

    let content = std::fs::read_to_string(path)
        .with_context(|| format!("reading config: {}", path.display()))?;
    parse_config(&content)
}

/// On Unix, warn if the config file is readable by group or others, since it
/// may contain the API token.
#[cfg(unix)]
fn check_config_file_permissions(path: &Path) {
    use std::os::unix::fs::PermissionsExt;

    match std::fs::metadata(path) {
        Ok(meta) => {
            let mode = meta.permissions().mode();
            if mode & 0o077 != 0 {
                tracing::warn!(
                    path = %path.display(),
                    mode = format!("{:04o}", mode & 0o7777),
                    "Config file is readable by group/others. \
                     Consider restricting permissions to 0600 (owner read/write only) \
                     since it may contain the API token."
                );
            }
        }
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "Could not check config file permissions"
            );
        }
    }
}

#[cfg(not(unix))]
fn check_config_file_permissions(_path: &Path) {
    // Permission checks are only available on Unix systems
}

/// Parse configuration from a TOML string
pub fn parse_config(content: &str) -> Result<AppConfig> {
    let config: AppConfig = toml::from_str(content).context("parsing TOML configuration")?;
    validate_config(&config)?;
    Ok(config)
}

/// Validate configuration values
fn validate_config(config: &AppConfig) -> Result<()> {
    validate_gateway(config)?;
    validate_firewall(config)?;
    validate_api(config)?;
    validate_metrics(config)?;
    Ok(())
}

fn validate_gateway(config: &AppConfig) -> Result<()> {
    if config.gateway.check_interval == 0 {
        anyhow::bail!("gateway.check_interval must be > 0");
    }
    if config.gateway.client_idle_timeout != 0
        && config.gateway.client_idle_timeout < config.gateway.check_interval
    {
        tracing::warn!(
            idle_timeout = config.gateway.client_idle_timeout,
            check_interval = config.gateway.check_interval,
            "client_idle_timeout is shorter than check_interval; sessions \
             expire at sweep granularity, not before"
        );
    }
    Ok(())
}

fn validate_firewall(config: &AppConfig) -> Result<()> {
    if config.firewall.chain.is_empty() {
        anyhow::bail!("firewall.chain must not be empty");
    }
    if config.firewall.chain.contains(char::is_whitespace) {
        anyhow::bail!(
            "firewall.chain must not contain whitespace (got '{}')",
            config.firewall.chain
        );
    }
    if config.firewall.mark == 0 {
        anyhow::bail!("firewall.mark must be > 0 (0 is the unmarked default)");
    }
    Ok(())
}

fn validate_api(config: &AppConfig) -> Result<()> {
    if config.api.enabled && config.api.token.is_empty() {
        anyhow::bail!("api.token must be set when api is enabled");
    }
    if config.api.enabled && config.api.token.len() < 16 {
        anyhow::bail!(
            "API token is too short ({} chars, minimum 16)",
            config.api.token.len()
        );
    }
    Ok(())
}

fn validate_metrics(config: &AppConfig) -> Result<()> {
    if config.metrics.enabled && config.metrics.listen.is_empty() {
        anyhow::bail!("metrics.listen must not be empty when metrics are enabled");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use types::{LogFormat, LogLevel};

    #[test]
    fn test_parse_empty_config_uses_defaults() {
        let config = parse_config("").unwrap();
        assert_eq!(config.gateway.check_interval, 60);
        assert_eq!(config.gateway.client_idle_timeout, 300);
        assert_eq!(config.firewall.chain, "authgate_mark");
        assert_eq!(config.firewall.mark, 254);
        assert_eq!(config.logging.level, LogLevel::Info);
        assert_eq!(config.logging.format, LogFormat::Pretty);
        assert!(!config.api.enabled);
        assert!(!config.metrics.enabled);
    }

    #[test]
    fn test_parse_full_config() {
        let toml = r##"
[gateway]
check_interval = 30
client_idle_timeout = 600

[firewall]
iptables_path = "/usr/sbin/iptables"
chain = "portal_mark"
mark = 2

[logging]
level = "debug"
format = "json"

[metrics]
enabled = true
listen = "127.0.0.1:9090"

[api]
enabled = true
listen = "127.0.0.1:9091"
token = "test-token-long-enough"
"##;
        let config = parse_config(toml).unwrap();
        assert_eq!(config.gateway.check_interval, 30);
        assert_eq!(config.firewall.chain, "portal_mark");
        assert_eq!(config.firewall.mark, 2);
        assert_eq!(config.logging.level, LogLevel::Debug);
        assert!(config.api.enabled);
    }

    #[test]
    fn test_zero_check_interval_rejected() {
        let toml = r##"
[gateway]
check_interval = 0
"##;
        assert!(parse_config(toml).is_err());
    }

    #[test]
    fn test_empty_chain_rejected() {
        let toml = r##"
[firewall]
chain = ""
"##;
        assert!(parse_config(toml).is_err());
    }

    #[test]
    fn test_chain_with_whitespace_rejected() {
        let toml = r##"
[firewall]
chain = "portal mark"
"##;
        assert!(parse_config(toml).is_err());
    }

    #[test]
    fn test_zero_mark_rejected() {
        let toml = r##"
[firewall]
mark = 0
"##;
        assert!(parse_config(toml).is_err());
    }

    #[test]
    fn test_api_enabled_without_token_rejected() {
        let toml = r##"
[api]
enabled = true
"##;
        assert!(parse_config(toml).is_err());
    }

    #[test]
    fn test_short_api_token_rejected() {
        let toml = r##"
[api]
enabled = true
token = "short"
"##;
        assert!(parse_config(toml).is_err());
    }

    #[test]
    fn test_invalid_log_level_rejected() {
        let toml = r##"
[logging]
level = "verbose"
"##;
        assert!(parse_config(toml).is_err());
    }

    #[test]
    fn test_invalid_log_format_rejected() {
        let toml = r##"
[logging]
format = "xml"
"##;
        assert!(parse_config(toml).is_err());
    }
}
