use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;
use std::time::{Duration, Instant};
use thiserror::Error;

/// Link-layer (MAC) address, stored canonically as six octets.
///
/// Serialized as the usual colon-separated lowercase hex form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MacAddr([u8; 6]);

impl MacAddr {
    pub fn octets(&self) -> [u8; 6] {
        self.0
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid hardware address '{0}'")]
pub struct MacParseError(String);

impl FromStr for MacAddr {
    type Err = MacParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut octets = [0u8; 6];
        let mut parts = s.split(':');
        for slot in octets.iter_mut() {
            let part = parts.next().ok_or_else(|| MacParseError(s.to_string()))?;
            if part.len() != 2 {
                return Err(MacParseError(s.to_string()));
            }
            *slot = u8::from_str_radix(part, 16).map_err(|_| MacParseError(s.to_string()))?;
        }
        if parts.next().is_some() {
            return Err(MacParseError(s.to_string()));
        }
        Ok(MacAddr(octets))
    }
}

impl fmt::Display for MacAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d, e, g] = self.0;
        write!(
            f,
            "{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}",
            a, b, c, d, e, g
        )
    }
}

impl Serialize for MacAddr {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for MacAddr {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Firewall-facing connection state of a tracked client.
///
/// `Unknown` and `Allowed` precede authentication; only `Authenticated`
/// sessions own packet-filter state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    Unknown,
    Allowed,
    Authenticated,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionState::Unknown => write!(f, "unknown"),
            ConnectionState::Allowed => write!(f, "allowed"),
            ConnectionState::Authenticated => write!(f, "authenticated"),
        }
    }
}

/// One tracked client, keyed by IP address in the registry.
///
/// The hardware address is fixed at registration; any action request whose
/// MAC does not match the stored value is rejected without mutation.
#[derive(Debug, Clone)]
pub struct ClientSession {
    pub address: IpAddr,
    hardware_address: MacAddr,
    pub state: ConnectionState,
    pub registered_at: Instant,
    pub last_seen: Instant,
}

impl ClientSession {
    pub fn new(address: IpAddr, hardware_address: MacAddr) -> Self {
        let now = Instant::now();
        Self {
            address,
            hardware_address,
            state: ConnectionState::Unknown,
            registered_at: now,
            last_seen: now,
        }
    }

    pub fn hardware_address(&self) -> MacAddr {
        self.hardware_address
    }

    /// Record client activity, pushing back liveness expiry.
    pub fn touch(&mut self) {
        self.last_seen = Instant::now();
    }

    pub fn idle_for(&self) -> Duration {
        self.last_seen.elapsed()
    }

    pub fn age(&self) -> Duration {
        self.registered_at.elapsed()
    }
}
