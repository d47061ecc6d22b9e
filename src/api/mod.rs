pub mod authorize;
pub mod sessions;

use crate::context::AppContext;
use crate::metrics::MetricsRegistry;
use axum::{
    extract::State,
    http::{header, StatusCode},
    middleware::{self, Next},
    response::IntoResponse,
    routing::{delete, get, post},
    Router,
};
use serde::Serialize;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Unified API response envelope for consistent JSON output.
#[derive(Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> (StatusCode, axum::Json<Self>) {
        (
            StatusCode::OK,
            axum::Json(Self {
                success: true,
                data: Some(data),
                error: None,
            }),
        )
    }
}

impl ApiResponse<()> {
    pub fn err(status: StatusCode, msg: impl Into<String>) -> (StatusCode, axum::Json<Self>) {
        (
            status,
            axum::Json(Self {
                success: false,
                data: None,
                error: Some(msg.into()),
            }),
        )
    }
}

#[derive(Clone)]
pub struct AppState {
    pub ctx: Arc<AppContext>,
    pub api_token: String,
}

/// Build the control API router. The splash flow and administrative tooling
/// are the intended callers; every route sits behind the bearer-token
/// middleware.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/status", get(status_handler))
        .route(
            "/api/sessions",
            get(sessions::list_sessions).post(sessions::register_session),
        )
        .route("/api/sessions/:ip", delete(sessions::evict_session))
        .route("/api/auth", post(authorize::apply_action))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ))
        .with_state(state)
}

/// Start the control API server with graceful shutdown support.
pub async fn start_api_server(
    listen_addr: &str,
    state: AppState,
    shutdown: CancellationToken,
) -> anyhow::Result<()> {
    let app = router(state);
    let listener = tokio::net::TcpListener::bind(listen_addr).await?;
    info!(addr = %listen_addr, "API server listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown.cancelled_owned())
        .await?;
    Ok(())
}

/// Start the metrics/health HTTP server with graceful shutdown support.
pub async fn start_metrics_server(
    listen_addr: &str,
    metrics: Arc<MetricsRegistry>,
    shutdown: CancellationToken,
) -> anyhow::Result<()> {
    let app = Router::new()
        .route("/metrics", get(metrics_handler))
        .route("/health", get(|| async { "ok" }))
        .route("/livez", get(|| async { "ok" }))
        .with_state(metrics);

    let listener = tokio::net::TcpListener::bind(listen_addr).await?;
    info!(addr = %listen_addr, "Metrics server listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown.cancelled_owned())
        .await?;
    Ok(())
}

async fn metrics_handler(State(metrics): State<Arc<MetricsRegistry>>) -> impl IntoResponse {
    let mut buffer = String::new();
    if prometheus_client::encoding::text::encode(&mut buffer, &metrics.registry).is_err() {
        return (StatusCode::INTERNAL_SERVER_ERROR, "encoding error").into_response();
    }
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        buffer,
    )
        .into_response()
}

/// Bearer token auth middleware (constant-time comparison).
async fn auth_middleware(
    State(state): State<AppState>,
    req: axum::http::Request<axum::body::Body>,
    next: Next,
) -> impl IntoResponse {
    // An empty token means the API was enabled without credentials; config
    // validation prevents this, but guard against misconfiguration.
    if state.api_token.is_empty() {
        return (StatusCode::SERVICE_UNAVAILABLE, "service unavailable").into_response();
    }

    use subtle::ConstantTimeEq;
    let expected = state.api_token.as_bytes();

    let auth_header = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok());

    if let Some(h) = auth_header {
        if let Some(provided) = h.strip_prefix("Bearer ") {
            let provided = provided.as_bytes();
            if provided.len() == expected.len() && bool::from(provided.ct_eq(expected)) {
                return next.run(req).await;
            }
        }
    }

    (StatusCode::UNAUTHORIZED, "unauthorized").into_response()
}

#[derive(Serialize)]
struct StatusInfo {
    status: String,
    uptime_secs: u64,
    sessions: usize,
    authenticated_total: u64,
}

async fn status_handler(State(state): State<AppState>) -> impl IntoResponse {
    let uptime = state.ctx.start_time.elapsed().as_secs();
    let sessions = state.ctx.registry.lock().len();

    ApiResponse::ok(StatusInfo {
        status: "ok".to_string(),
        uptime_secs: uptime,
        sessions,
        authenticated_total: state.ctx.auth.authenticated_total(),
    })
}
