use crate::session::MacAddr;
use serde::Serialize;
use std::net::IpAddr;

fn unix_now() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

/// One audit record, serialized as a JSON line.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum AuditEvent {
    SessionRegistered {
        ip: IpAddr,
        mac: MacAddr,
        replaced: bool,
        ts: u64,
    },
    AuthSuccess {
        ip: IpAddr,
        mac: MacAddr,
        ts: u64,
    },
    AuthRejected {
        ip: IpAddr,
        mac: MacAddr,
        reason: String,
        ts: u64,
    },
    Deauthenticated {
        ip: IpAddr,
        mac: MacAddr,
        ts: u64,
    },
    SessionExpired {
        ip: IpAddr,
        mac: MacAddr,
        ts: u64,
    },
}

impl AuditEvent {
    pub fn session_registered(ip: IpAddr, mac: MacAddr, replaced: bool) -> Self {
        AuditEvent::SessionRegistered {
            ip,
            mac,
            replaced,
            ts: unix_now(),
        }
    }

    pub fn auth_success(ip: IpAddr, mac: MacAddr) -> Self {
        AuditEvent::AuthSuccess {
            ip,
            mac,
            ts: unix_now(),
        }
    }

    pub fn auth_rejected(ip: IpAddr, mac: MacAddr, reason: &str) -> Self {
        AuditEvent::AuthRejected {
            ip,
            mac,
            reason: reason.to_string(),
            ts: unix_now(),
        }
    }

    pub fn deauthenticated(ip: IpAddr, mac: MacAddr) -> Self {
        AuditEvent::Deauthenticated {
            ip,
            mac,
            ts: unix_now(),
        }
    }

    pub fn session_expired(ip: IpAddr, mac: MacAddr) -> Self {
        AuditEvent::SessionExpired {
            ip,
            mac,
            ts: unix_now(),
        }
    }
}
