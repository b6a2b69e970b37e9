//! Error types and response formatting.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use vega_unfurl_core::{DecodeError, UnfurlError};

/// Webhook endpoint error type.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Request signature missing, stale or invalid.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Malformed request body.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

/// Render endpoint error type.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    /// The `{kind}/{payload}` suffix could not be decoded.
    #[error("invalid specification: {0}")]
    Decode(#[from] DecodeError),

    /// Vega-Lite to Vega compilation failed.
    #[error("compile failed: {0}")]
    Compile(String),

    /// The SVG renderer failed.
    #[error("render failed: {0}")]
    Render(String),

    /// SVG to PNG rasterization failed.
    #[error("rasterize failed: {0}")]
    Raster(String),

    /// An external tool did not finish in time.
    #[error("{program} timed out after {secs}s")]
    Timeout {
        /// Tool that was running.
        program: String,
        /// Configured limit.
        secs: u64,
    },

    /// Spawning or talking to an external tool failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Errors from the Slack Web API.
#[derive(Debug, thiserror::Error)]
pub enum SlackError {
    /// Transport or HTTP status failure.
    #[error("slack request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Slack answered `ok: false`.
    #[error("slack api error: {0}")]
    Api(String),
}

/// Reasons an event's reply was abandoned.
#[derive(Debug, thiserror::Error)]
pub enum FanoutError {
    /// Building one of the links failed unexpectedly.
    #[error(transparent)]
    Build(#[from] UnfurlError),

    /// The `chat.unfurl` call failed.
    #[error(transparent)]
    Reply(#[from] SlackError),
}

/// JSON error response body.
#[derive(Debug, Clone, Serialize)]
struct ErrorResponse {
    error: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
}

fn error_response(status: StatusCode, error: &'static str, message: Option<String>) -> Response {
    (status, Json(ErrorResponse { error, message })).into_response()
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            Self::Unauthorized(reason) => {
                tracing::debug!(reason = %reason, "rejected webhook request");
                error_response(StatusCode::UNAUTHORIZED, "unauthorized", None)
            }
            Self::BadRequest(msg) => error_response(StatusCode::BAD_REQUEST, "bad_request", Some(msg)),
            Self::Internal(err) => {
                tracing::error!(error = %err, "internal server error");
                error_response(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    Some("An internal error occurred".to_string()),
                )
            }
        }
    }
}

impl IntoResponse for RenderError {
    fn into_response(self) -> Response {
        let (status, error) = match &self {
            Self::Decode(_) => {
                return error_response(
                    StatusCode::BAD_REQUEST,
                    "invalid_specification",
                    Some(self.to_string()),
                );
            }
            Self::Compile(_) => (StatusCode::BAD_GATEWAY, "compile_error"),
            Self::Render(_) => (StatusCode::BAD_GATEWAY, "render_error"),
            Self::Timeout { .. } => (StatusCode::GATEWAY_TIMEOUT, "render_timeout"),
            Self::Raster(_) => (StatusCode::INTERNAL_SERVER_ERROR, "raster_error"),
            Self::Io(_) | Self::Serialization(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error")
            }
        };

        tracing::error!(error = %self, "render failed");
        error_response(status, error, None)
    }
}
