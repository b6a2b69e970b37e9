//! Application state shared across all request handlers.

use std::sync::Arc;

use vega_unfurl_core::Builder;

use crate::config::Config;
use crate::fanout::Coordinator;
use crate::render::{CliRenderer, Dispatcher, Rasterizer, SpecCompiler, SvgRenderer};
use crate::slack::{ChatClient, SlackClient};

/// Shared application state available to all request handlers.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration.
    pub config: Arc<Config>,

    /// Turns `link_shared` events into `chat.unfurl` replies.
    pub coordinator: Arc<Coordinator>,

    /// Serves the render routes.
    pub dispatcher: Arc<Dispatcher>,
}

impl AppState {
    /// Create application state wired to Slack and the Vega command line tools.
    pub fn new(config: Config) -> anyhow::Result<Self> {
        let chat = SlackClient::new(&config.slack_api_base_url, &config.slack_access_token)?;
        let tools = Arc::new(CliRenderer::new(
            config.vl2vg_bin.clone(),
            config.vg2svg_bin.clone(),
            config.unfurl.data_base_url.clone(),
            config.render_timeout,
        ));
        let rasterizer = Rasterizer::with_system_fonts();

        tracing::info!(
            slack_api = %config.slack_api_base_url,
            vl2vg = %config.vl2vg_bin,
            vg2svg = %config.vg2svg_bin,
            render_timeout_secs = config.render_timeout.as_secs(),
            "application state initialized"
        );

        Ok(Self::with_collaborators(
            config,
            Arc::new(chat),
            tools.clone(),
            tools,
            rasterizer,
        ))
    }

    /// Create application state over explicit collaborators.
    pub fn with_collaborators(
        config: Config,
        chat: Arc<dyn ChatClient>,
        compiler: Arc<dyn SpecCompiler>,
        renderer: Arc<dyn SvgRenderer>,
        rasterizer: Rasterizer,
    ) -> Self {
        let builder = Arc::new(Builder::new(config.unfurl.clone()));

        Self {
            config: Arc::new(config),
            coordinator: Arc::new(Coordinator::new(builder, chat)),
            dispatcher: Arc::new(Dispatcher::new(compiler, renderer, rasterizer)),
        }
    }
}
