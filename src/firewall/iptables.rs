use super::{FirewallAccess, FirewallController, FirewallError};
use crate::config::types::FirewallConfig;
use crate::session::MacAddr;
use std::net::IpAddr;
use std::path::PathBuf;
use std::process::Command;
use tracing::debug;

/// Mangle-table MARK rules: an authenticated client's traffic is matched by
/// source IP and MAC and marked, and the gateway's forwarding rules admit
/// marked packets. Granting appends the rule, revoking deletes it.
pub struct IptablesFirewall {
    iptables_path: PathBuf,
    chain: String,
    mark: u32,
}

impl IptablesFirewall {
    pub fn new(config: &FirewallConfig) -> Self {
        Self {
            iptables_path: config.iptables_path.clone(),
            chain: config.chain.clone(),
            mark: config.mark,
        }
    }

    fn rule_args(&self, access: FirewallAccess, address: IpAddr, hardware: MacAddr) -> Vec<String> {
        let flag = match access {
            FirewallAccess::Grant => "-A",
            FirewallAccess::Revoke => "-D",
        };
        vec![
            "-t".to_string(),
            "mangle".to_string(),
            flag.to_string(),
            self.chain.clone(),
            "-s".to_string(),
            address.to_string(),
            "-m".to_string(),
            "mac".to_string(),
            "--mac-source".to_string(),
            hardware.to_string(),
            "-j".to_string(),
            "MARK".to_string(),
            "--set-mark".to_string(),
            self.mark.to_string(),
        ]
    }
}

impl FirewallController for IptablesFirewall {
    fn set_access(
        &self,
        access: FirewallAccess,
        address: IpAddr,
        hardware: MacAddr,
    ) -> Result<(), FirewallError> {
        let args = self.rule_args(access, address, hardware);
        let command = format!("{} {}", self.iptables_path.display(), args.join(" "));

        let output = Command::new(&self.iptables_path)
            .args(&args)
            .output()
            .map_err(|source| FirewallError::Spawn {
                command: command.clone(),
                source,
            })?;

        if output.status.success() {
            debug!(ip = %address, mac = %hardware, access = %access, "Firewall rule applied");
            return Ok(());
        }

        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();

        // Deleting a rule that is already gone satisfies the idempotence
        // contract.
        if access == FirewallAccess::Revoke
            && (stderr.contains("does not exist") || stderr.contains("No chain/target/match"))
        {
            debug!(ip = %address, mac = %hardware, "Revoke for absent rule ignored");
            return Ok(());
        }

        Err(FirewallError::CommandFailed {
            command,
            code: output.status.code().unwrap_or(-1),
            stderr,
        })
    }
}
