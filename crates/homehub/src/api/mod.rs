//! HTTP gateway.
//!
//! Maps requests onto the [`AppContext`] components and translates their
//! errors into status codes through [`ApiError`]. Everything except
//! `/auth/*` and `/v1/*` requires a bearer token.

mod auth;
mod devices;
mod error;
mod settings;
mod system;

pub use auth::{CurrentUser, UserView};
pub use error::{ApiError, ApiJson};

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{HeaderValue, Method};
use axum::routing::{get, post, put};
use axum::Router;
use tokio::net::TcpListener;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::context::AppContext;

/// CORS policy for the configured browser origins. Unparseable origins are
/// skipped with a warning.
pub fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin {:?}", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::PUT])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE])
}

/// Create the API router with all endpoints
pub fn create_router(ctx: Arc<AppContext>, cors: CorsLayer) -> Router {
    Router::new()
        .route("/v1/ping", get(system::ping))
        .route("/v1/info", get(system::info))
        .route("/auth/signup", post(auth::signup))
        .route("/auth/login", post(auth::login))
        .route("/users/me", get(auth::me))
        .route("/devices", get(devices::list).post(devices::create))
        .route("/devices/:device_id", get(devices::get).put(devices::patch))
        .route("/devices/:device_id/status", put(devices::replace_status))
        .route("/devices/:device_id/brightness", put(devices::set_brightness))
        .route("/devices/:device_id/temperature", put(devices::set_temperature))
        .route("/devices/:device_id/color", put(devices::set_color))
        .route("/devices/:device_id/lock", put(devices::set_lock))
        .route("/devices/:device_id/schedule", put(devices::update_schedule))
        .route("/devices/:device_id/settings", put(devices::update_settings))
        .route("/devices/:device_id/stats", get(devices::stats))
        .route("/settings", get(settings::get).put(settings::put))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(ctx)
}

/// Start the HTTP API server
///
/// Binds to `listen:port` and serves until `shutdown_rx` fires, then drains
/// in-flight requests.
pub async fn serve(
    listen: &str,
    port: u16,
    ctx: Arc<AppContext>,
    cors: CorsLayer,
    shutdown_rx: tokio::sync::oneshot::Receiver<()>,
) -> anyhow::Result<()> {
    let app = create_router(ctx, cors);

    let addr: SocketAddr = format!("{}:{}", listen, port)
        .parse()
        .with_context(|| format!("invalid listen address {}:{}", listen, port))?;
    tracing::info!("Starting HTTP API server on {}", addr);

    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            shutdown_rx.await.ok();
            tracing::info!("HTTP API server shutting down gracefully");
        })
        .await
        .context("HTTP server failed")?;

    Ok(())
}
