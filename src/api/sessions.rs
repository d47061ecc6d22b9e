use super::{ApiResponse, AppState};
use crate::auth::{AuthAction, AuthError};
use crate::firewall::FirewallAccess;
use crate::session::{ClientSession, ConnectionState, MacAddr};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use tracing::{info, warn};

#[derive(Deserialize)]
pub struct RegisterRequest {
    pub ip: IpAddr,
    pub mac: MacAddr,
}

#[derive(Serialize)]
pub struct RegisterResponse {
    pub ip: IpAddr,
    pub mac: MacAddr,
    /// True when an existing session for this address was displaced.
    pub replaced: bool,
}

enum Tracked {
    SameClient,
    OtherClient(MacAddr, ConnectionState),
    Absent,
}

/// Register a client coming out of the splash flow. The session starts
/// unauthenticated; a later action request transitions it.
///
/// Re-registering the same address with the same MAC refreshes liveness.
/// A different MAC (address churn) deauthenticates and replaces the old
/// session.
pub async fn register_session(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> impl IntoResponse {
    let ctx = &state.ctx;
    let mut sessions = ctx.registry.lock();

    let tracked = match sessions.get(req.ip) {
        Some(s) if s.hardware_address() == req.mac => Tracked::SameClient,
        Some(s) => Tracked::OtherClient(s.hardware_address(), s.state),
        None => Tracked::Absent,
    };

    let replaced = match tracked {
        Tracked::SameClient => {
            if let Some(session) = sessions.get_mut(req.ip) {
                session.touch();
            }
            ctx.audit.log_session_registered(req.ip, req.mac, false);
            info!(ip = %req.ip, mac = %req.mac, "Session registered (liveness refreshed)");
            return ApiResponse::ok(RegisterResponse {
                ip: req.ip,
                mac: req.mac,
                replaced: false,
            })
            .into_response();
        }
        Tracked::OtherClient(old_mac, old_state) => {
            if old_state == ConnectionState::Authenticated {
                if let Err(err) = ctx
                    .firewall
                    .set_access(FirewallAccess::Revoke, req.ip, old_mac)
                {
                    warn!(ip = %req.ip, mac = %old_mac, error = %err, "Firewall revoke failed, session retained");
                    ctx.metrics.firewall_errors_total.inc();
                    return ApiResponse::err(StatusCode::BAD_GATEWAY, err.to_string())
                        .into_response();
                }
            }
            sessions.remove(req.ip);
            ctx.audit.log_deauthenticated(req.ip, old_mac);
            true
        }
        Tracked::Absent => false,
    };

    sessions.insert(ClientSession::new(req.ip, req.mac));
    ctx.metrics.set_sessions_active(sessions.len());
    ctx.audit.log_session_registered(req.ip, req.mac, replaced);
    info!(ip = %req.ip, mac = %req.mac, replaced, "Session registered");

    ApiResponse::ok(RegisterResponse {
        ip: req.ip,
        mac: req.mac,
        replaced,
    })
    .into_response()
}

#[derive(Serialize)]
pub struct SessionInfo {
    pub ip: IpAddr,
    pub mac: MacAddr,
    pub state: ConnectionState,
    pub idle_secs: u64,
    pub age_secs: u64,
}

pub async fn list_sessions(State(state): State<AppState>) -> impl IntoResponse {
    let sessions = state.ctx.registry.lock();
    let list: Vec<SessionInfo> = sessions
        .iter()
        .map(|s| SessionInfo {
            ip: s.address,
            mac: s.hardware_address(),
            state: s.state,
            idle_secs: s.idle_for().as_secs(),
            age_secs: s.age().as_secs(),
        })
        .collect();
    ApiResponse::ok(list)
}

#[derive(Serialize)]
pub struct EvictResponse {
    pub ip: IpAddr,
    pub evicted: bool,
}

/// Administrative deauthentication: drop the session and revoke firewall
/// access if it was authenticated.
pub async fn evict_session(
    State(state): State<AppState>,
    Path(ip): Path<IpAddr>,
) -> impl IntoResponse {
    let ctx = &state.ctx;

    let stored_mac = {
        let sessions = ctx.registry.lock();
        sessions.get(ip).map(|s| s.hardware_address())
    };

    let Some(mac) = stored_mac else {
        return ApiResponse::err(StatusCode::NOT_FOUND, format!("no tracked session for {ip}"))
            .into_response();
    };

    match ctx.auth.apply(ip, mac, AuthAction::Deauthenticate) {
        Ok(()) => ApiResponse::ok(EvictResponse { ip, evicted: true }).into_response(),
        // The session was replaced between lookup and apply; report as gone.
        Err(AuthError::ClientNotFound(_)) | Err(AuthError::IdentityMismatch { .. }) => {
            ApiResponse::err(StatusCode::NOT_FOUND, format!("no tracked session for {ip}"))
                .into_response()
        }
        Err(err) => ApiResponse::err(StatusCode::BAD_GATEWAY, err.to_string()).into_response(),
    }
}
