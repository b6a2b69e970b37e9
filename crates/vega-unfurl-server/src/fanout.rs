//! Event fan-out: one `link_shared` event in, one `chat.unfurl` reply out.

use std::sync::Arc;

use futures::future::join_all;
use vega_unfurl_core::{Builder, LinkIntelligence, UnfurlError};

use crate::error::FanoutError;
use crate::metrics::{LINKS_TOTAL, REPLIES_TOTAL};
use crate::slack::{ChatClient, LinkSharedEvent, UnfurlBatch, UnfurlRequest};

/// Builds previews for every link of an event and sends a single reply.
pub struct Coordinator {
    builder: Arc<Builder>,
    chat: Arc<dyn ChatClient>,
}

impl Coordinator {
    /// Create a coordinator over a link builder and a chat client.
    pub fn new(builder: Arc<Builder>, chat: Arc<dyn ChatClient>) -> Self {
        Self { builder, chat }
    }

    /// Build every link of `event` concurrently and merge by URL.
    ///
    /// A URL shared twice keeps the preview built last. Any unexpected build
    /// failure fails the whole batch.
    pub async fn unfurl_event(&self, event: &LinkSharedEvent) -> Result<UnfurlBatch, UnfurlError> {
        let builds = event.links.iter().map(|link| async move {
            let result = self.builder.unfurl(&link.url);
            if let Ok(intel) = &result {
                let outcome = if intel.fields().is_empty() { "plain" } else { "rich" };
                metrics::counter!(LINKS_TOTAL, "outcome" => outcome).increment(1);
            }
            result
        });

        let built = join_all(builds)
            .await
            .into_iter()
            .collect::<Result<Vec<_>, _>>()?;
        Ok(merge(built))
    }

    /// Unfurl `event` and reply with the full batch.
    ///
    /// Nothing is sent unless every link was built.
    pub async fn handle(&self, event: &LinkSharedEvent) -> Result<(), FanoutError> {
        let unfurls = match self.unfurl_event(event).await {
            Ok(batch) => batch,
            Err(e) => {
                metrics::counter!(REPLIES_TOTAL, "status" => "build_failed").increment(1);
                return Err(e.into());
            }
        };

        let request = UnfurlRequest {
            channel: event.channel.clone(),
            ts: event.message_ts.clone(),
            unfurls,
        };

        if let Err(e) = self.chat.unfurl(&request).await {
            metrics::counter!(REPLIES_TOTAL, "status" => "reply_failed").increment(1);
            return Err(e.into());
        }

        metrics::counter!(REPLIES_TOTAL, "status" => "sent").increment(1);
        tracing::info!(
            channel = %event.channel,
            ts = %event.message_ts,
            unfurls = request.unfurls.len(),
            "unfurl reply sent"
        );
        Ok(())
    }
}

/// Key previews by their URL. Later records replace earlier ones.
pub fn merge(previews: impl IntoIterator<Item = LinkIntelligence>) -> UnfurlBatch {
    let mut batch = UnfurlBatch::new();
    for intel in previews {
        batch.insert(intel.preview_url().to_string(), intel);
    }
    batch
}
