use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Serialize;

use crate::context::AppContext;

/// Response for the /v1/ping endpoint
#[derive(Serialize)]
struct PingResponse {
    status: &'static str,
}

/// Response for the /v1/info endpoint
#[derive(Serialize)]
struct InfoResponse {
    version: &'static str,
    hostname: String,
}

/// Handler for GET /v1/ping
#[tracing::instrument]
pub async fn ping() -> impl IntoResponse {
    tracing::debug!("Handling /v1/ping request");
    (StatusCode::OK, Json(PingResponse { status: "ok" }))
}

/// Handler for GET /v1/info
#[tracing::instrument(skip(ctx))]
pub async fn info(State(ctx): State<Arc<AppContext>>) -> impl IntoResponse {
    let hostname = hostname::get()
        .ok()
        .and_then(|h| h.into_string().ok())
        .unwrap_or_else(|| "unknown".to_string());

    (
        StatusCode::OK,
        Json(InfoResponse {
            version: ctx.version,
            hostname,
        }),
    )
}
