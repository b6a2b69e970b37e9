//! Vega Unfurl - Slack link previews and rendering for Vega editor links.
//!
//! When a Vega or Vega-Lite editor link is posted in Slack, the Events API
//! delivers a `link_shared` event. This crate verifies the request, decodes
//! every shared link and answers with one `chat.unfurl` call whose
//! attachments carry the chart title, schema badge, data links and render
//! links.
//!
//! # Architecture
//!
//! - **Verify**: Slack `v0` request signatures, checked as axum middleware
//! - **Fan-out**: Links of an event are built concurrently and merged by URL
//! - **Render**: `vl2vg` / `vg2svg` child processes, PNG through resvg
//!
//! # URL Pattern
//!
//! ```text
//! POST /slack/events
//! GET  /{vg.json|vl.json|svg|png}/{vega|vega-lite}/{payload}
//! ```

pub mod config;
pub mod error;
pub mod fanout;
pub mod metrics;
pub mod render;
pub mod routes;
pub mod signature;
pub mod slack;
pub mod state;

pub use config::Config;
pub use routes::router;
pub use state::AppState;
