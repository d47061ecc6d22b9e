use super::{ApiResponse, AppState};
use crate::auth::AuthError;
use crate::session::MacAddr;
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::{Deserialize, Serialize};
use std::net::IpAddr;

#[derive(Deserialize)]
pub struct AuthRequest {
    pub ip: IpAddr,
    pub mac: MacAddr,
    /// Action name: "authenticate" or "deauthenticate".
    pub action: String,
}

#[derive(Serialize)]
pub struct AuthResponseBody {
    pub ip: IpAddr,
    pub action: String,
    pub applied: bool,
}

/// Apply an access-state transition requested by the splash flow.
pub async fn apply_action(
    State(state): State<AppState>,
    Json(req): Json<AuthRequest>,
) -> impl IntoResponse {
    match state.ctx.auth.apply_named(req.ip, req.mac, &req.action) {
        Ok(()) => ApiResponse::ok(AuthResponseBody {
            ip: req.ip,
            action: req.action,
            applied: true,
        })
        .into_response(),
        Err(err) => {
            let status = match &err {
                AuthError::ClientNotFound(_) => StatusCode::NOT_FOUND,
                AuthError::IdentityMismatch { .. } => StatusCode::FORBIDDEN,
                AuthError::UnknownAction(_) => StatusCode::BAD_REQUEST,
                AuthError::Firewall(_) => StatusCode::BAD_GATEWAY,
            };
            ApiResponse::err(status, err.to_string()).into_response()
        }
    }
}
