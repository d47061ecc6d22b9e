use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "authgate",
    version,
    about = "Captive portal admission gateway"
)]
pub struct Cli {
    /// Path to configuration file (also settable via AUTHGATE_CONFIG env var)
    #[arg(short, long, default_value = "authgate.toml", env = "AUTHGATE_CONFIG")]
    pub config: PathBuf,

    /// Log level override (trace, debug, info, warn, error)
    #[arg(long)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Validate configuration file
    CheckConfig,
    /// Write a commented default configuration file
    Init {
        /// Output file path
        #[arg(short, long, default_value = "authgate.toml")]
        output: PathBuf,
    },
    /// Health check: verify the API listener is reachable via TCP connect
    HealthCheck {
        /// Address to check (host:port)
        #[arg(long, default_value = "127.0.0.1:9091")]
        addr: String,
        /// Timeout in seconds
        #[arg(long, default_value = "5")]
        timeout: u64,
    },
}
