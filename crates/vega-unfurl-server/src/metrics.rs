//! Prometheus metrics for the unfurl service.
//!
//! # Metric Naming Conventions
//!
//! - Prefix: surface name (`unfurl_`, `render_`)
//! - Suffix: `_total` for counters
//! - Labels: low-cardinality outcome/format only

use axum::{Router, routing::get};
use metrics::describe_counter;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::net::SocketAddr;

/// `link_shared` events received.
pub const EVENTS_TOTAL: &str = "unfurl_events_total";

/// Links built, labelled by `outcome` (`rich`, `plain`).
pub const LINKS_TOTAL: &str = "unfurl_links_total";

/// `chat.unfurl` replies, labelled by `status` (`sent`, `build_failed`, `reply_failed`).
pub const REPLIES_TOTAL: &str = "unfurl_replies_total";

/// Render requests, labelled by `format`.
pub const RENDER_REQUESTS_TOTAL: &str = "render_requests_total";

/// Try to install the Prometheus metrics recorder.
///
/// Returns `None` if a recorder is already installed.
pub fn try_init_metrics() -> Option<PrometheusHandle> {
    let handle = PrometheusBuilder::new().install_recorder().ok()?;
    register_metrics();
    Some(handle)
}

/// Start the Prometheus metrics HTTP server.
///
/// Serves `/metrics` on `port` from a background task and returns once the
/// listener is bound.
pub async fn start_metrics_server(
    port: u16,
    handle: PrometheusHandle,
) -> Result<(), std::io::Error> {
    let app = Router::new().route(
        "/metrics",
        get(move || {
            let handle = handle.clone();
            async move { handle.render() }
        }),
    );

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Metrics server listening on http://{}/metrics", addr);

    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            tracing::error!(error = %e, "metrics server stopped");
        }
    });

    Ok(())
}

fn register_metrics() {
    describe_counter!(EVENTS_TOTAL, "Number of link_shared events received");
    describe_counter!(LINKS_TOTAL, "Number of shared links turned into previews");
    describe_counter!(REPLIES_TOTAL, "Number of chat.unfurl replies by status");
    describe_counter!(RENDER_REQUESTS_TOTAL, "Number of render requests by format");
}
