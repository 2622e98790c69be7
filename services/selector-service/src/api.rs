//! Selection endpoints used by the dispatch path
//!
//! - POST /v1/pick          — choose a credential for `{provider, model}`
//! - POST /v1/release/{id}  — return a concurrency slot after the request ends
//!
//! Selection errors are rendered exactly as the selector describes them:
//! status, JSON body, and `Retry-After` for cooldowns.

use std::time::Instant;

use auth_selector::PickOptions;
use axum::Json;
use axum::extract::{Path, State};
use axum::http::header::{CONTENT_TYPE, HeaderName, HeaderValue};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Deserialize;
use tracing::{info, warn};

use crate::AppState;
use crate::metrics;

/// Request body for the pick endpoint: `{provider, model, stream?, metadata?}`.
#[derive(Debug, Deserialize)]
pub struct PickRequest {
    pub provider: String,
    #[serde(default)]
    pub model: String,
    #[serde(flatten)]
    pub options: PickOptions,
}

/// POST /v1/pick — select one credential.
pub async fn pick_handler(
    State(state): State<AppState>,
    Json(request): Json<PickRequest>,
) -> Response {
    let started = Instant::now();
    let request_id = format!("req_{}", uuid::Uuid::new_v4().as_simple());
    let candidates = state.store.candidates(&request.provider).await;

    let response = match state.selector.pick(
        &request.provider,
        &request.model,
        &request.options,
        &candidates,
    ) {
        Ok(auth) => {
            info!(
                request_id = %request_id,
                auth_id = %auth.id,
                provider = %request.provider,
                model = %request.model,
                strategy = state.selector.name(),
                "auth selected"
            );
            (
                StatusCode::OK,
                Json(serde_json::json!({
                    "auth_id": auth.id,
                    "provider": auth.provider,
                    "label": auth.label,
                })),
            )
                .into_response()
        }
        Err(e) => {
            warn!(
                request_id = %request_id,
                provider = %request.provider,
                model = %request.model,
                candidates = candidates.len(),
                code = e.code(),
                "auth selection failed"
            );
            error_response(&e)
        }
    };

    metrics::record_request(
        "pick",
        response.status().as_u16(),
        started.elapsed().as_secs_f64(),
    );
    response
}

/// POST /v1/release/{id} — release a slot taken by a successful pick.
pub async fn release_handler(State(state): State<AppState>, Path(id): Path<String>) -> StatusCode {
    let started = Instant::now();
    state.selector.release(&id);
    metrics::record_request(
        "release",
        StatusCode::NO_CONTENT.as_u16(),
        started.elapsed().as_secs_f64(),
    );
    StatusCode::NO_CONTENT
}

/// Render a selection error as an HTTP response.
pub fn error_response(err: &auth_selector::Error) -> Response {
    let status =
        StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let mut response = (status, err.body()).into_response();
    let headers = response.headers_mut();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

    if let Some(cooldown) = err.cooldown() {
        for (name, value) in cooldown.headers() {
            match (
                HeaderName::from_bytes(name.as_bytes()),
                HeaderValue::from_str(&value),
            ) {
                (Ok(name), Ok(value)) => {
                    headers.insert(name, value);
                }
                _ => warn!(header = name, "skipping invalid cooldown header"),
            }
        }
    }
    response
}
