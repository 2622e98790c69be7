//! Prometheus metrics exposition
//!
//! - `selector_http_requests_total` (counter): labels `route`, `status`
//! - `selector_http_request_duration_seconds` (histogram): label `route`
//!
//! Selection outcomes themselves (`auth_selector_picks_total`,
//! `auth_selector_pick_errors_total`) are emitted by the `auth-selector` crate
//! and rendered through the same recorder.

use anyhow::{Context, Result};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};

const DURATION_METRIC: &str = "selector_http_request_duration_seconds";

/// Selection never waits on I/O, so buckets stop at one second.
const DURATION_BUCKETS: &[f64] = &[
    0.0001, 0.00025, 0.0005, 0.001, 0.0025, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 1.0,
];

fn builder() -> Result<PrometheusBuilder> {
    PrometheusBuilder::new()
        .set_buckets_for_metric(Matcher::Full(DURATION_METRIC.to_string()), DURATION_BUCKETS)
        .context("failed to set histogram buckets")
}

/// Install the Prometheus recorder and return a handle for rendering metrics.
pub fn install_recorder() -> Result<PrometheusHandle> {
    builder()?
        .install_recorder()
        .context("failed to install Prometheus recorder")
}

/// Record a handled request by route and response status.
pub fn record_request(route: &'static str, status: u16, duration_secs: f64) {
    metrics::counter!("selector_http_requests_total", "route" => route, "status" => status.to_string())
        .increment(1);
    metrics::histogram!(DURATION_METRIC, "route" => route).record(duration_secs);
}
