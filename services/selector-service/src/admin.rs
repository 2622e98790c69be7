//! Admin API for the credential snapshot
//!
//! Stands in for the credential manager: operators (or tests) push whole
//! `Auth` records here and the next pick sees them.
//!
//! Endpoints:
//! - GET    /admin/auths       — list records sorted by ID
//! - PUT    /admin/auths/{id}  — add or replace a record; the path ID wins
//! - DELETE /admin/auths/{id}  — remove a record

use std::sync::Arc;

use auth_selector::Auth;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use tracing::{info, warn};

use crate::store::AuthStore;

/// Shared state for admin API handlers.
#[derive(Clone)]
pub struct AdminState {
    store: Arc<AuthStore>,
}

impl AdminState {
    pub fn new(store: Arc<AuthStore>) -> Self {
        Self { store }
    }
}

/// Build the admin router.
pub fn build_admin_router(state: AdminState) -> Router {
    Router::new()
        .route("/admin/auths", get(list_auths))
        .route("/admin/auths/{id}", axum::routing::put(put_auth).delete(delete_auth))
        .with_state(state)
}

/// GET /admin/auths
async fn list_auths(State(state): State<AdminState>) -> impl IntoResponse {
    let auths = state.store.list().await;
    let records: Vec<&Auth> = auths.iter().map(AsRef::as_ref).collect();

    (
        StatusCode::OK,
        [(axum::http::header::CONTENT_TYPE, "application/json")],
        serde_json::json!({ "auths": records }).to_string(),
    )
}

/// PUT /admin/auths/{id} — whole-record replace.
async fn put_auth(
    State(state): State<AdminState>,
    Path(id): Path<String>,
    Json(mut auth): Json<Auth>,
) -> impl IntoResponse {
    auth.id = id;

    match state.store.upsert(auth).await {
        Ok(stored) => {
            info!(auth_id = %stored.id, provider = %stored.provider, "auth stored");
            (
                StatusCode::OK,
                [(axum::http::header::CONTENT_TYPE, "application/json")],
                serde_json::json!(stored.as_ref()).to_string(),
            )
        }
        Err(e) => {
            warn!(error = %e, "failed to store auth");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                [(axum::http::header::CONTENT_TYPE, "application/json")],
                serde_json::json!({
                    "error": { "code": "store_failed", "message": e.to_string() }
                })
                .to_string(),
            )
        }
    }
}

/// DELETE /admin/auths/{id}
async fn delete_auth(State(state): State<AdminState>, Path(id): Path<String>) -> StatusCode {
    match state.store.remove(&id).await {
        Ok(true) => {
            info!(auth_id = %id, "auth removed");
            StatusCode::NO_CONTENT
        }
        Ok(false) => StatusCode::NOT_FOUND,
        Err(e) => {
            warn!(auth_id = %id, error = %e, "failed to persist removal");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}
