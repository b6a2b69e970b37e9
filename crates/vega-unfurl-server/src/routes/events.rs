//! Slack Events API webhook.
//!
//! The request signature is checked by middleware before this handler runs.
//! `link_shared` events are acknowledged at once and unfurled on a spawned
//! task, since Slack expects an answer within three seconds.

use axum::Json;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use serde_json::json;

use crate::error::ApiError;
use crate::metrics::EVENTS_TOTAL;
use crate::slack::{EventEnvelope, RetryInfo, SlackEvent};
use crate::state::AppState;

/// Handle one Events API delivery.
pub async fn slack_events(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, ApiError> {
    let envelope: EventEnvelope = serde_json::from_slice(&body)
        .map_err(|e| ApiError::BadRequest(format!("invalid event payload: {e}")))?;

    match envelope {
        EventEnvelope::UrlVerification { challenge } => {
            tracing::info!("answering url verification");
            Ok(Json(json!({ "challenge": challenge })).into_response())
        }
        EventEnvelope::EventCallback {
            event_id,
            event_time,
            event: SlackEvent::LinkShared(event),
        } => {
            let retry = RetryInfo::from_headers(&headers);
            let links: Vec<&str> = event.links.iter().map(|l| l.url.as_str()).collect();
            tracing::info!(
                event_id = %event_id,
                event_time,
                user = %event.user,
                channel = %event.channel,
                retry = retry.is_retry(),
                retry_num = ?retry.count,
                retry_reason = ?retry.reason,
                links = ?links,
                "link_shared received"
            );
            metrics::counter!(EVENTS_TOTAL).increment(1);

            let coordinator = state.coordinator.clone();
            tokio::spawn(async move {
                if let Err(e) = coordinator.handle(&event).await {
                    tracing::error!(
                        event_id = %event_id,
                        channel = %event.channel,
                        error = %e,
                        "unfurl failed"
                    );
                }
            });

            Ok(StatusCode::OK.into_response())
        }
        EventEnvelope::EventCallback { event_id, .. } => {
            tracing::debug!(event_id = %event_id, "ignoring unsubscribed event");
            Ok(StatusCode::OK.into_response())
        }
        EventEnvelope::Unsupported => {
            tracing::debug!("ignoring unsupported envelope");
            Ok(StatusCode::OK.into_response())
        }
    }
}
