//! Slack Events API payloads and the `chat.unfurl` client.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use axum::http::HeaderMap;
use serde::{Deserialize, Serialize};
use vega_unfurl_core::LinkIntelligence;

use crate::error::SlackError;

/// Link previews keyed by shared URL.
pub type UnfurlBatch = HashMap<String, LinkIntelligence>;

/// Outer Events API envelope.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventEnvelope {
    /// Endpoint ownership handshake sent when the request URL is configured.
    UrlVerification {
        /// Value to echo back.
        challenge: String,
    },

    /// A subscribed event.
    EventCallback {
        /// Unique event ID (stable across redeliveries).
        event_id: String,
        /// Event time in epoch seconds.
        event_time: i64,
        /// The event itself.
        event: SlackEvent,
    },

    /// Envelope types this service does not handle.
    #[serde(other)]
    Unsupported,
}

/// Inner event of an `event_callback` envelope.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SlackEvent {
    /// Links from a subscribed domain were posted in a message.
    LinkShared(LinkSharedEvent),

    /// Any other subscribed event.
    #[serde(other)]
    Other,
}

/// `link_shared` event body.
#[derive(Debug, Clone, Deserialize)]
pub struct LinkSharedEvent {
    /// User who posted the message.
    pub user: String,
    /// Channel the message was posted in.
    pub channel: String,
    /// Timestamp of the message holding the links.
    pub message_ts: String,
    /// Shared links in message order.
    pub links: Vec<SharedLink>,
}

/// One link of a `link_shared` event.
#[derive(Debug, Clone, Deserialize)]
pub struct SharedLink {
    /// The full URL as posted.
    pub url: String,
    /// Domain that matched the app's unfurl domains.
    #[serde(default)]
    pub domain: Option<String>,
}

/// Redelivery metadata Slack attaches to retried requests.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RetryInfo {
    /// `X-Slack-Retry-Num`.
    pub count: Option<u32>,
    /// `X-Slack-Retry-Reason`.
    pub reason: Option<String>,
}

impl RetryInfo {
    /// Read retry headers from a webhook request.
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let header = |name: &str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
        };
        Self {
            count: header("x-slack-retry-num").and_then(|v| v.parse().ok()),
            reason: header("x-slack-retry-reason"),
        }
    }

    /// Whether this delivery is a retry.
    pub fn is_retry(&self) -> bool {
        self.count.is_some()
    }
}

/// Body of a `chat.unfurl` call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnfurlRequest {
    /// Channel of the message to unfurl.
    pub channel: String,
    /// Timestamp of the message to unfurl.
    pub ts: String,
    /// Attachments keyed by shared URL.
    pub unfurls: UnfurlBatch,
}

/// Chat platform reply surface.
#[async_trait]
pub trait ChatClient: Send + Sync {
    /// Attach previews to a message.
    async fn unfurl(&self, request: &UnfurlRequest) -> Result<(), SlackError>;
}

/// Slack Web API response envelope.
#[derive(Debug, Deserialize)]
struct SlackResponse {
    ok: bool,
    #[serde(default)]
    error: Option<String>,
}

/// `chat.unfurl` over the Slack Web API.
#[derive(Clone)]
pub struct SlackClient {
    http: reqwest::Client,
    api_base_url: String,
    access_token: String,
}

impl SlackClient {
    /// Create a client for `api_base_url` (e.g. `https://slack.com/api`).
    pub fn new(api_base_url: &str, access_token: &str) -> Result<Self, SlackError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .connect_timeout(Duration::from_secs(5))
            .build()?;

        Ok(Self {
            http,
            api_base_url: api_base_url.trim_end_matches('/').to_string(),
            access_token: access_token.to_string(),
        })
    }
}

#[async_trait]
impl ChatClient for SlackClient {
    async fn unfurl(&self, request: &UnfurlRequest) -> Result<(), SlackError> {
        let response: SlackResponse = self
            .http
            .post(format!("{}/chat.unfurl", self.api_base_url))
            .bearer_auth(&self.access_token)
            .json(request)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        if !response.ok {
            return Err(SlackError::Api(
                response.error.unwrap_or_else(|| "unknown_error".to_string()),
            ));
        }

        tracing::debug!(
            channel = %request.channel,
            ts = %request.ts,
            unfurls = request.unfurls.len(),
            "chat.unfurl accepted"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use serde_json::json;

    #[test]
    fn test_parse_url_verification() {
        let envelope: EventEnvelope = serde_json::from_value(json!({
            "token": "legacy",
            "challenge": "3eZbrw1aBm2rZgRNFdxV2595E9CY3gmdALWMmHkvFXO7tYXAYM8P",
            "type": "url_verification"
        }))
        .unwrap();
        match envelope {
            EventEnvelope::UrlVerification { challenge } => {
                assert!(challenge.starts_with("3eZbrw"));
            }
            other => panic!("expected url_verification, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_link_shared() {
        let envelope: EventEnvelope = serde_json::from_value(json!({
            "type": "event_callback",
            "team_id": "T123",
            "event_id": "Ev08MFMKH6",
            "event_time": 1_700_000_000,
            "event": {
                "type": "link_shared",
                "channel": "C123ABC456",
                "is_bot_user_member": true,
                "user": "U123ABC456",
                "message_ts": "1700000000.000100",
                "unfurl_id": "C123ABC456.1700000000.000100.abc",
                "source": "conversations_history",
                "links": [
                    {"domain": "vega.github.io", "url": "https://vega.github.io/editor/#/url/vega/abc"},
                    {"url": "https://example.com"}
                ]
            }
        }))
        .unwrap();

        let EventEnvelope::EventCallback {
            event_id,
            event: SlackEvent::LinkShared(event),
            ..
        } = envelope
        else {
            panic!("expected link_shared callback");
        };
        assert_eq!(event_id, "Ev08MFMKH6");
        assert_eq!(event.channel, "C123ABC456");
        assert_eq!(event.message_ts, "1700000000.000100");
        assert_eq!(event.links.len(), 2);
        assert_eq!(event.links[0].domain.as_deref(), Some("vega.github.io"));
        assert!(event.links[1].domain.is_none());
    }

    #[test]
    fn test_other_event_types_tolerated() {
        let envelope: EventEnvelope = serde_json::from_value(json!({
            "type": "event_callback",
            "event_id": "Ev1",
            "event_time": 1,
            "event": {"type": "app_mention", "text": "hi"}
        }))
        .unwrap();
        assert!(matches!(
            envelope,
            EventEnvelope::EventCallback {
                event: SlackEvent::Other,
                ..
            }
        ));

        let envelope: EventEnvelope =
            serde_json::from_value(json!({"type": "app_rate_limited"})).unwrap();
        assert!(matches!(envelope, EventEnvelope::Unsupported));
    }

    #[test]
    fn test_retry_info_from_headers() {
        let mut headers = HeaderMap::new();
        assert!(!RetryInfo::from_headers(&headers).is_retry());

        headers.insert("x-slack-retry-num", HeaderValue::from_static("2"));
        headers.insert("x-slack-retry-reason", HeaderValue::from_static("http_timeout"));
        let retry = RetryInfo::from_headers(&headers);
        assert_eq!(retry.count, Some(2));
        assert_eq!(retry.reason.as_deref(), Some("http_timeout"));
        assert!(retry.is_retry());
    }

    #[test]
    fn test_unfurl_request_shape() {
        let url = "https://example.com/chart";
        let mut unfurls = UnfurlBatch::new();
        unfurls.insert(url.to_string(), LinkIntelligence::plain(url));
        let request = UnfurlRequest {
            channel: "C1".to_string(),
            ts: "1.2".to_string(),
            unfurls,
        };

        let body = serde_json::to_value(&request).unwrap();
        assert_eq!(body["channel"], "C1");
        assert_eq!(body["ts"], "1.2");
        assert_eq!(body["unfurls"][url]["title"], url);
        assert!(body["unfurls"][url].get("preview_url").is_none());
    }
}
