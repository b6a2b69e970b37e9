//! Application configuration loaded from environment variables.

use std::fmt;
use std::time::Duration;

use vega_unfurl_core::settings::{
    VEGA_DATA_BASE_URL, VEGA_EDITOR_BASE_URL, VEGA_SCHEMA_BASE_URL, VEGA_UNFURL_BASE_URL,
};
use vega_unfurl_core::{Settings, WalkOptions};

/// Application configuration.
#[derive(Clone)]
pub struct Config {
    /// Server bind address (e.g., "0.0.0.0:3000").
    pub bind_addr: String,

    /// Slack app signing secret used to verify webhook requests.
    pub slack_signing_secret: String,

    /// Slack bot token used for `chat.unfurl`.
    pub slack_access_token: String,

    /// Slack Web API base URL, without trailing slash.
    pub slack_api_base_url: String,

    /// Codec, walker and link builder settings.
    pub unfurl: Settings,

    /// Vega-Lite to Vega compiler executable.
    pub vl2vg_bin: String,

    /// Vega to SVG renderer executable.
    pub vg2svg_bin: String,

    /// Upper bound for one external tool run.
    pub render_timeout: Duration,

    /// Port for the Prometheus `/metrics` listener, if enabled.
    pub metrics_port: Option<u16>,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("bind_addr", &self.bind_addr)
            .field("slack_signing_secret", &"<redacted>")
            .field("slack_access_token", &"<redacted>")
            .field("slack_api_base_url", &self.slack_api_base_url)
            .field("unfurl", &self.unfurl)
            .field("vl2vg_bin", &self.vl2vg_bin)
            .field("vg2svg_bin", &self.vg2svg_bin)
            .field("render_timeout", &self.render_timeout)
            .field("metrics_port", &self.metrics_port)
            .finish()
    }
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Required:
    /// - `SLACK_SIGNING_SECRET`: Slack app signing secret
    /// - `SLACK_ACCESS_TOKEN`: Slack bot token
    ///
    /// Optional:
    /// - `UNFURL_BIND_ADDR`: Server bind address (default: "0.0.0.0:$PORT", `PORT` defaulting to 3000)
    /// - `SLACK_API_BASE_URL`: Slack Web API base (default: "https://slack.com/api")
    /// - `VEGA_EDITOR_BASE_URL`: Editor link prefix to unfurl
    /// - `VEGA_SCHEMA_BASE_URL`: Schema registry prefix for badges
    /// - `VEGA_DATA_BASE_URL`: Dataset repository for bare data names
    /// - `UNFURL_BASE_URL`: Public base URL of the render endpoints
    /// - `UNFURL_DEDUPE_DATA_LINKS`: Collapse repeated data links (default: false)
    /// - `UNFURL_REWALK_ROOT_SPEC`: Re-collect the root `spec` data (default: true)
    /// - `VL2VG_BIN` / `VG2SVG_BIN`: Vega command line tools (default: on `PATH`)
    /// - `RENDER_TIMEOUT_SECS`: Limit per tool run (default: 30)
    /// - `UNFURL_METRICS_PORT`: Enable the Prometheus listener on this port
    pub fn from_env() -> anyhow::Result<Self> {
        let bind_addr = match std::env::var("UNFURL_BIND_ADDR") {
            Ok(addr) => addr,
            Err(_) => {
                let port = std::env::var("PORT").unwrap_or_else(|_| "3000".to_string());
                format!("0.0.0.0:{port}")
            }
        };

        let slack_signing_secret = required("SLACK_SIGNING_SECRET")?;
        let slack_access_token = required("SLACK_ACCESS_TOKEN")?;

        let slack_api_base_url = std::env::var("SLACK_API_BASE_URL")
            .unwrap_or_else(|_| "https://slack.com/api".to_string())
            .trim_end_matches('/')
            .to_string();

        let unfurl = Settings {
            editor_base_url: base_url("VEGA_EDITOR_BASE_URL", VEGA_EDITOR_BASE_URL),
            schema_base_url: base_url("VEGA_SCHEMA_BASE_URL", VEGA_SCHEMA_BASE_URL),
            data_base_url: base_url("VEGA_DATA_BASE_URL", VEGA_DATA_BASE_URL),
            render_base_url: base_url("UNFURL_BASE_URL", VEGA_UNFURL_BASE_URL),
            walk: WalkOptions {
                rewalk_root_spec: flag("UNFURL_REWALK_ROOT_SPEC", true)?,
            },
            dedupe_data_links: flag("UNFURL_DEDUPE_DATA_LINKS", false)?,
        };

        let vl2vg_bin = std::env::var("VL2VG_BIN").unwrap_or_else(|_| "vl2vg".to_string());
        let vg2svg_bin = std::env::var("VG2SVG_BIN").unwrap_or_else(|_| "vg2svg".to_string());

        let render_timeout_secs: u64 = match std::env::var("RENDER_TIMEOUT_SECS") {
            Ok(v) => v
                .parse()
                .map_err(|_| anyhow::anyhow!("RENDER_TIMEOUT_SECS must be a number, got '{v}'"))?,
            Err(_) => 30,
        };

        let metrics_port = match std::env::var("UNFURL_METRICS_PORT") {
            Ok(v) if !v.trim().is_empty() => Some(
                v.trim()
                    .parse()
                    .map_err(|_| anyhow::anyhow!("UNFURL_METRICS_PORT must be a port, got '{v}'"))?,
            ),
            _ => None,
        };

        tracing::info!(
            bind_addr = %bind_addr,
            slack_api_base_url = %slack_api_base_url,
            editor_base_url = %unfurl.editor_base_url,
            render_base_url = %unfurl.render_base_url,
            rewalk_root_spec = unfurl.walk.rewalk_root_spec,
            dedupe_data_links = unfurl.dedupe_data_links,
            render_timeout_secs,
            metrics_port = ?metrics_port,
            "unfurl configuration loaded"
        );

        Ok(Self {
            bind_addr,
            slack_signing_secret,
            slack_access_token,
            slack_api_base_url,
            unfurl,
            vl2vg_bin,
            vg2svg_bin,
            render_timeout: Duration::from_secs(render_timeout_secs),
            metrics_port,
        })
    }
}

fn required(key: &str) -> anyhow::Result<String> {
    match std::env::var(key) {
        Ok(v) if !v.trim().is_empty() => Ok(v.trim().to_string()),
        _ => anyhow::bail!("{key} environment variable is required"),
    }
}

/// Read a prefix-style base URL, making sure it ends with `/`.
fn base_url(key: &str, default: &str) -> String {
    let value = std::env::var(key).unwrap_or_else(|_| default.to_string());
    if value.ends_with('/') {
        value
    } else {
        format!("{value}/")
    }
}

fn flag(key: &str, default: bool) -> anyhow::Result<bool> {
    match std::env::var(key) {
        Err(_) => Ok(default),
        Ok(v) => match v.trim().to_ascii_lowercase().as_str() {
            "" => Ok(default),
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            other => anyhow::bail!("{key} must be a boolean, got '{other}'"),
        },
    }
}
