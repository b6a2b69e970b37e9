//! Slack request signature verification middleware.
//!
//! Slack signs every webhook request with the app's signing secret:
//!
//! ```text
//! X-Slack-Request-Timestamp: 1531420618
//! X-Slack-Signature: v0=hex(hmac_sha256(secret, "v0:{timestamp}:{raw body}"))
//! ```
//!
//! Requests signed more than five minutes away from now are rejected.

use axum::body::{Body, Bytes};
use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::Response;
use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::error::ApiError;
use crate::state::AppState;

type HmacSha256 = Hmac<Sha256>;

/// Header carrying the request signature.
pub const SIGNATURE_HEADER: &str = "x-slack-signature";

/// Header carrying the signing timestamp (epoch seconds).
pub const TIMESTAMP_HEADER: &str = "x-slack-request-timestamp";

/// Signature scheme version prefix.
const VERSION: &str = "v0";

/// Maximum accepted distance between the signing timestamp and now.
const MAX_CLOCK_SKEW_SECS: i64 = 60 * 5;

/// Largest webhook body accepted for verification.
const MAX_BODY_BYTES: usize = 1024 * 1024;

/// Compute the `v0=` signature for a request body.
pub fn sign(secret: &str, timestamp: &str, body: &[u8]) -> Result<String, ApiError> {
    let digest = mac_for(secret, timestamp, body)?.finalize().into_bytes();
    Ok(format!("{VERSION}={}", hex::encode(digest)))
}

/// Verify a request signature against the signing secret.
///
/// `now` is the current time in epoch seconds.
pub fn verify(
    secret: &str,
    timestamp: Option<&str>,
    signature: Option<&str>,
    body: &[u8],
    now: i64,
) -> Result<(), ApiError> {
    let timestamp =
        timestamp.ok_or_else(|| ApiError::Unauthorized("missing request timestamp".into()))?;
    let signature =
        signature.ok_or_else(|| ApiError::Unauthorized("missing request signature".into()))?;

    let signed_at: i64 = timestamp
        .parse()
        .map_err(|_| ApiError::Unauthorized("malformed request timestamp".into()))?;
    if (now - signed_at).abs() > MAX_CLOCK_SKEW_SECS {
        return Err(ApiError::Unauthorized("stale request timestamp".into()));
    }

    let provided = signature
        .strip_prefix("v0=")
        .and_then(|hex_digest| hex::decode(hex_digest).ok())
        .ok_or_else(|| ApiError::Unauthorized("malformed request signature".into()))?;

    mac_for(secret, timestamp, body)?
        .verify_slice(&provided)
        .map_err(|_| ApiError::Unauthorized("signature mismatch".into()))
}

/// Middleware that rejects webhook requests without a valid Slack signature.
pub async fn require_slack_signature(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let (parts, body) = request.into_parts();

    let bytes: Bytes = axum::body::to_bytes(body, MAX_BODY_BYTES)
        .await
        .map_err(|e| ApiError::BadRequest(format!("unreadable body: {e}")))?;

    let header = |name: &str| parts.headers.get(name).and_then(|v| v.to_str().ok());

    verify(
        &state.config.slack_signing_secret,
        header(TIMESTAMP_HEADER),
        header(SIGNATURE_HEADER),
        &bytes,
        chrono::Utc::now().timestamp(),
    )?;

    Ok(next.run(Request::from_parts(parts, Body::from(bytes))).await)
}

fn mac_for(secret: &str, timestamp: &str, body: &[u8]) -> Result<HmacSha256, ApiError> {
    let mut mac = <HmacSha256 as Mac>::new_from_slice(secret.as_bytes())
        .map_err(|e| ApiError::Internal(anyhow::anyhow!("invalid signing key: {e}")))?;
    mac.update(VERSION.as_bytes());
    mac.update(b":");
    mac.update(timestamp.as_bytes());
    mac.update(b":");
    mac.update(body);
    Ok(mac)
}
