//! Route definitions for the unfurl service.
//!
//! ## Routes
//!
//! - `GET /health` - Health check (JSON)
//! - `GET /robots.txt` - Crawler instructions
//! - `POST /slack/events` - Slack Events API webhook (signature checked)
//! - `GET /vg.json/{kind}/{payload}` - Compiled Vega JSON
//! - `GET /vl.json/{kind}/{payload}` - Decoded document, verbatim
//! - `GET /svg/{kind}/{payload}` - SVG image
//! - `GET /png/{kind}/{payload}` - PNG image

mod events;
mod health;
mod render;

use axum::Router;
use axum::middleware;
use axum::response::IntoResponse;
use axum::routing::{get, post};

use crate::signature::require_slack_signature;
use crate::state::AppState;

/// Build the complete unfurl service router.
pub fn router(state: AppState) -> Router {
    let webhook = Router::new()
        .route("/slack/events", post(events::slack_events))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            require_slack_signature,
        ));

    Router::new()
        .route("/health", get(health::health_check))
        .route("/robots.txt", get(robots_txt))
        .route("/vg.json/{*reference}", get(render::vega_json))
        .route("/vl.json/{*reference}", get(render::vega_lite_json))
        .route("/svg/{*reference}", get(render::svg))
        .route("/png/{*reference}", get(render::png))
        .merge(webhook)
        .with_state(state)
}

/// Serve robots.txt allowing all crawlers.
///
/// Chat clients fetch the render routes when showing attachments.
async fn robots_txt() -> impl IntoResponse {
    (
        [("content-type", "text/plain; charset=utf-8")],
        "User-agent: *\nAllow: /\n",
    )
}
