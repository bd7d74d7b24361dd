use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::body::Body;
use axum::extract::ConnectInfo;
use axum::http::Request;
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::routing::{get, post};
use axum::Router;
use tower_http::services::ServeDir;
use tracing::info;

use crate::handlers::{
    all_pins_handler, health_handler, index_handler, logs_handler, options_handler, pin_handler,
    pin_value_handler,
};
use crate::state::AppState;

pub(crate) fn build_router(state: Arc<AppState>) -> Router {
    let static_dir = state.config.static_dir.clone();
    Router::new()
        .route("/", get(index_handler))
        .route("/all_pins", get(all_pins_handler).options(options_handler))
        .route("/pin/:name", get(pin_handler).options(options_handler))
        .route(
            "/pin_value",
            post(pin_value_handler).options(options_handler),
        )
        .route("/logs", get(logs_handler).options(options_handler))
        .route("/health", get(health_handler))
        .nest_service("/static", ServeDir::new(static_dir))
        .with_state(state)
        .layer(middleware::from_fn(log_request))
}

async fn log_request(req: Request<Body>, next: Next) -> Response {
    let method = req.method().clone();
    let uri = req
        .uri()
        .path_and_query()
        .map(|value| value.as_str())
        .unwrap_or_else(|| req.uri().path())
        .to_string();
    let remote_ip = req
        .headers()
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .or_else(|| {
            req.extensions()
                .get::<ConnectInfo<SocketAddr>>()
                .map(|info| info.0.ip().to_string())
        })
        .unwrap_or_else(|| "-".to_string());
    let start = Instant::now();
    let response = next.run(req).await;
    // Log polling stays out of the log it reads.
    if uri.starts_with("/logs") {
        return response;
    }
    let status = response.status().as_u16();
    info!(
        remote_ip = %remote_ip,
        method = %method,
        uri = %uri,
        status,
        elapsed_ms = start.elapsed().as_millis() as u64,
        "request served"
    );
    response
}
