//! Health check endpoint.
//!
//! Reports the link prefixes the service is configured for, so a probe can
//! tell which editor deployment and render host an instance serves.

use axum::Json;
use axum::extract::State;
use serde::Serialize;

use crate::state::AppState;

/// Health check response.
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    status: &'static str,
    version: &'static str,
    editor_base_url: String,
    render_base_url: String,
}

pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let settings = &state.config.unfurl;
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        editor_base_url: settings.editor_base_url.clone(),
        render_base_url: settings.render_base_url.clone(),
    })
}
