use std::sync::Arc;

use axum::body::Body;
use axum::extract::{Path, Query, State};
use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use pin_scanner::models::PinValueRequest;

use crate::background::handle_demo_events;
use crate::state::AppState;
use crate::store::StoreError;

#[derive(Deserialize)]
pub(crate) struct LogsParams {
    timestamp: Option<u64>,
}

pub(crate) async fn health_handler() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

pub(crate) async fn index_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let mut response = Response::new(Body::from(state.index_html.clone()));
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/html; charset=utf-8"),
    );
    response
}

pub(crate) async fn all_pins_handler(State(state): State<Arc<AppState>>) -> Response {
    let pins = state.pins.read().await.descriptors();
    json_response(&pins)
}

pub(crate) async fn pin_handler(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> Response {
    match state.pins.read().await.descriptor(&name) {
        Ok(pin) => json_response(&pin),
        Err(err) => store_error_response(err),
    }
}

pub(crate) async fn pin_value_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<PinValueRequest>,
) -> Response {
    let result = {
        let mut pins = state.pins.write().await;
        pins.apply_writes(&request).and_then(|()| {
            if let Err(err) = handle_demo_events(&mut pins) {
                warn!(%err, "failed to handle fired events");
            }
            pins.answer_reads(&request.read_pins)
        })
    };
    match result {
        Ok(response) => {
            for (name, value) in &request.write_pins {
                info!(pin = %name, %value, "pin written");
            }
            json_response(&response)
        }
        Err(err) => {
            warn!(%err, "pin_value request rejected");
            store_error_response(err)
        }
    }
}

pub(crate) async fn logs_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<LogsParams>,
) -> Response {
    json_response(&state.logs.since(params.timestamp.unwrap_or(0)))
}

pub(crate) async fn options_handler() -> impl IntoResponse {
    (StatusCode::NO_CONTENT, cors_headers())
}

fn json_response<T: Serialize>(payload: &T) -> Response {
    let body = match serde_json::to_string(payload) {
        Ok(body) => body,
        Err(err) => return error_response(StatusCode::INTERNAL_SERVER_ERROR, err.to_string()),
    };
    let mut headers = cors_headers();
    headers.insert("Content-Type", HeaderValue::from_static("application/json"));
    headers.insert("Cache-Control", HeaderValue::from_static("no-store"));
    (StatusCode::OK, headers, body).into_response()
}

fn store_error_response(err: StoreError) -> Response {
    let status = match err {
        StoreError::UnknownPin(_) => StatusCode::NOT_FOUND,
        StoreError::Duplicate(_) => StatusCode::CONFLICT,
        StoreError::NotWritable(_)
        | StoreError::NotReadable(_)
        | StoreError::KindMismatch { .. }
        | StoreError::InvalidEvent(_) => StatusCode::BAD_REQUEST,
    };
    error_response(status, err.to_string())
}

fn error_response(status: StatusCode, message: String) -> Response {
    let headers = cors_headers();
    (status, headers, message).into_response()
}

fn cors_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert("Access-Control-Allow-Origin", HeaderValue::from_static("*"));
    headers.insert(
        "Access-Control-Allow-Methods",
        HeaderValue::from_static("GET, POST, OPTIONS"),
    );
    headers.insert(
        "Access-Control-Allow-Headers",
        HeaderValue::from_static("Content-Type"),
    );
    headers
}
