//! Render endpoints.
//!
//! Each route carries a `{kind}/{payload}` suffix exactly as it appears in an
//! editor link, so attachment links can be built without recompressing.

use axum::extract::{Path, State};
use axum::http::{HeaderMap, HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};

use crate::error::RenderError;
use crate::metrics::RENDER_REQUESTS_TOTAL;
use crate::render::{RenderFormat, Rendered};
use crate::state::AppState;

pub async fn vega_json(
    State(state): State<AppState>,
    Path(reference): Path<String>,
) -> Result<Response, RenderError> {
    serve(&state, RenderFormat::VegaJson, &reference).await
}

pub async fn vega_lite_json(
    State(state): State<AppState>,
    Path(reference): Path<String>,
) -> Result<Response, RenderError> {
    serve(&state, RenderFormat::VegaLiteJson, &reference).await
}

pub async fn svg(
    State(state): State<AppState>,
    Path(reference): Path<String>,
) -> Result<Response, RenderError> {
    serve(&state, RenderFormat::Svg, &reference).await
}

pub async fn png(
    State(state): State<AppState>,
    Path(reference): Path<String>,
) -> Result<Response, RenderError> {
    serve(&state, RenderFormat::Png, &reference).await
}

async fn serve(
    state: &AppState,
    format: RenderFormat,
    reference: &str,
) -> Result<Response, RenderError> {
    metrics::counter!(RENDER_REQUESTS_TOTAL, "format" => format.route()).increment(1);
    let rendered = state.dispatcher.render(format, reference).await?;
    Ok(build_response(rendered))
}

/// Build an HTTP response with the artifact and content headers.
fn build_response(rendered: Rendered) -> Response {
    let mut headers = HeaderMap::new();

    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static(rendered.content_type),
    );
    headers.insert(
        header::X_CONTENT_TYPE_OPTIONS,
        HeaderValue::from_static("nosniff"),
    );

    // ETag (xxHash of content)
    let hash = xxhash_rust::xxh3::xxh3_64(&rendered.body);
    let etag = format!("\"{}\"", hex_fmt::HexFmt(&hash.to_be_bytes()));
    if let Ok(val) = HeaderValue::from_str(&etag) {
        headers.insert(header::ETAG, val);
    }

    (StatusCode::OK, headers, rendered.body).into_response()
}
