//! Auth Selector Service
//!
//! HTTP front for credential selection:
//! 1. Loads the credential snapshot
//! 2. Builds the configured selection strategy
//! 3. Answers pick/release calls from the dispatch path
//! 4. Accepts snapshot updates on the admin routes

mod admin;
mod api;
mod config;
mod metrics;
mod store;

use std::sync::Arc;

use anyhow::{Context, Result};
use auth_selector::{Selector, Strategy, build_selector};
use axum::Router;
use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use metrics_exporter_prometheus::PrometheusHandle;
use tokio::net::TcpListener;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::admin::AdminState;
use crate::config::Config;
use crate::store::AuthStore;

/// Shared application state accessible from all handlers
#[derive(Clone)]
pub struct AppState {
    selector: Arc<dyn Selector>,
    strategy: Strategy,
    store: Arc<AuthStore>,
    prometheus: PrometheusHandle,
}

/// Build the axum router with all routes and shared state.
///
/// `max_connections` caps in-flight requests across every route.
fn build_router(state: AppState, max_connections: usize) -> Router {
    let admin = admin::build_admin_router(AdminState::new(Arc::clone(&state.store)));

    Router::new()
        .route("/v1/pick", post(api::pick_handler))
        .route("/v1/release/{id}", post(api::release_handler))
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .with_state(state)
        .merge(admin)
        .layer(tower::limit::ConcurrencyLimitLayer::new(max_connections))
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_env("LOG_LEVEL")
                .or_else(|_| EnvFilter::try_from_default_env())
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    info!("starting auth-selector-service");

    // Recorder first so selector metrics are never dropped
    let prometheus_handle = metrics::install_recorder()?;

    let args: Vec<String> = std::env::args().collect();
    let cli_config_path = args
        .iter()
        .position(|a| a == "--config")
        .and_then(|i| args.get(i + 1))
        .map(|s| s.as_str());

    let config_path = Config::resolve_path(cli_config_path);
    info!(path = %config_path.display(), "loading configuration");

    let config = Config::load(&config_path)
        .with_context(|| format!("failed to load config from {}", config_path.display()))?;

    info!(
        listen_addr = %config.server.listen_addr,
        strategy = %config.selector.strategy,
        max_concurrent = config.selector.max_concurrent,
        credentials = %config.credentials.path.display(),
        "configuration loaded"
    );

    let store = AuthStore::load(config.credentials.path.clone())
        .await
        .with_context(|| {
            format!(
                "failed to load credentials from {}",
                config.credentials.path.display()
            )
        })?;

    let app_state = AppState {
        selector: build_selector(config.selector.strategy, config.selector.max_concurrent),
        strategy: config.selector.strategy,
        store: Arc::new(store),
        prometheus: prometheus_handle,
    };

    let app = build_router(app_state, config.server.max_connections);

    let listen_addr = config.server.listen_addr;
    let listener = TcpListener::bind(listen_addr)
        .await
        .with_context(|| format!("failed to bind to {listen_addr}"))?;

    info!(addr = %listen_addr, "accepting requests");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("shutdown complete");
    Ok(())
}

/// Health endpoint: strategy in use and snapshot size.
///
/// Reports `degraded` while the snapshot is empty since every pick would fail.
async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    let auths_total = state.store.len().await;
    let status = if auths_total == 0 {
        "degraded"
    } else {
        "healthy"
    };

    (
        axum::http::StatusCode::OK,
        [(axum::http::header::CONTENT_TYPE, "application/json")],
        serde_json::json!({
            "status": status,
            "strategy": state.strategy.as_str(),
            "auths_total": auths_total,
        })
        .to_string(),
    )
}

/// Prometheus metrics endpoint in text exposition format.
async fn metrics_handler(State(state): State<AppState>) -> impl IntoResponse {
    (
        axum::http::StatusCode::OK,
        [(
            axum::http::header::CONTENT_TYPE,
            "text/plain; version=0.0.4; charset=utf-8",
        )],
        state.prometheus.render(),
    )
}

/// Wait for SIGTERM or SIGINT for graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("received SIGINT, shutting down"),
        _ = terminate => info!("received SIGTERM, shutting down"),
    }
}
