pub mod events;

use crate::session::MacAddr;
use events::AuditEvent;
use std::net::IpAddr;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc;
use tracing::{debug, error};

const AUDIT_CHANNEL_CAPACITY: usize = 4096;

/// Asynchronous audit trail.
///
/// Events are handed off through a bounded channel to a writer task that
/// appends JSON lines to the configured file; without a file they are
/// emitted on the `audit` log target instead. A full channel drops the
/// event and bumps a counter rather than blocking the admission path.
pub struct AuditLogger {
    sender: mpsc::Sender<AuditEvent>,
    dropped_count: AtomicU64,
}

impl AuditLogger {
    pub fn new(log_path: Option<PathBuf>) -> Self {
        let (sender, receiver) = mpsc::channel(AUDIT_CHANNEL_CAPACITY);
        tokio::spawn(audit_writer_task(receiver, log_path));
        Self {
            sender,
            dropped_count: AtomicU64::new(0),
        }
    }

    /// Audit logger that discards every event (counting them as dropped).
    /// No runtime required; intended for tests.
    pub fn new_noop() -> Self {
        let (sender, _receiver) = mpsc::channel(1);
        Self {
            sender,
            dropped_count: AtomicU64::new(0),
        }
    }

    /// Number of events dropped due to channel overflow.
    pub fn dropped_count(&self) -> u64 {
        self.dropped_count.load(Ordering::Relaxed)
    }

    pub fn log_session_registered(&self, ip: IpAddr, mac: MacAddr, replaced: bool) {
        self.try_send(AuditEvent::session_registered(ip, mac, replaced));
    }

    pub fn log_auth_success(&self, ip: IpAddr, mac: MacAddr) {
        self.try_send(AuditEvent::auth_success(ip, mac));
    }

    pub fn log_auth_rejected(&self, ip: IpAddr, mac: MacAddr, reason: &str) {
        self.try_send(AuditEvent::auth_rejected(ip, mac, reason));
    }

    pub fn log_deauthenticated(&self, ip: IpAddr, mac: MacAddr) {
        self.try_send(AuditEvent::deauthenticated(ip, mac));
    }

    pub fn log_session_expired(&self, ip: IpAddr, mac: MacAddr) {
        self.try_send(AuditEvent::session_expired(ip, mac));
    }

    fn try_send(&self, event: AuditEvent) {
        if self.sender.try_send(event).is_err() {
            self.dropped_count.fetch_add(1, Ordering::Relaxed);
        }
    }
}

async fn audit_writer_task(mut receiver: mpsc::Receiver<AuditEvent>, log_path: Option<PathBuf>) {
    let mut file = match &log_path {
        Some(path) => match tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .await
        {
            Ok(f) => Some(f),
            Err(e) => {
                error!(path = %path.display(), error = %e, "Failed to open audit log, falling back to tracing output");
                None
            }
        },
        None => None,
    };

    while let Some(event) = receiver.recv().await {
        let line = match serde_json::to_string(&event) {
            Ok(l) => l,
            Err(e) => {
                error!(error = %e, "Failed to serialize audit event");
                continue;
            }
        };
        match file.as_mut() {
            Some(f) => {
                if let Err(e) = f.write_all(format!("{line}\n").as_bytes()).await {
                    error!(error = %e, "Failed to write audit event");
                }
            }
            None => debug!(target: "audit", "{line}"),
        }
    }
}
