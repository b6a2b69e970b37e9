//! Canonical base URLs and unfurl behavior switches.

use crate::walker::WalkOptions;

/// Prefix of Vega editor links that embed a compressed specification.
pub const VEGA_EDITOR_BASE_URL: &str = "https://vega.github.io/editor/#/url/";

/// Prefix of the Vega / Vega-Lite JSON schema registry.
pub const VEGA_SCHEMA_BASE_URL: &str = "https://vega.github.io/schema/";

/// Repository that bare dataset names (e.g. `data/cars.json`) resolve against.
pub const VEGA_DATA_BASE_URL: &str = "https://vega.github.io/vega-datasets/";

/// Public base URL of the render endpoints served by this service.
pub const VEGA_UNFURL_BASE_URL: &str = "https://vega-unfurl.glitch.me/";

/// Settings shared by the codec, the walker and the link builder.
///
/// Built once at startup and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Editor link prefix recognized by the codec.
    pub editor_base_url: String,

    /// Schema registry prefix stripped from `$schema` badges.
    pub schema_base_url: String,

    /// Dataset repository prefix for bare data references.
    pub data_base_url: String,

    /// Base URL used to build render/download links.
    pub render_base_url: String,

    /// Walker behavior.
    pub walk: WalkOptions,

    /// Collapse repeated data links, keeping the first occurrence.
    pub dedupe_data_links: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            editor_base_url: VEGA_EDITOR_BASE_URL.to_string(),
            schema_base_url: VEGA_SCHEMA_BASE_URL.to_string(),
            data_base_url: VEGA_DATA_BASE_URL.to_string(),
            render_base_url: VEGA_UNFURL_BASE_URL.to_string(),
            walk: WalkOptions::default(),
            dedupe_data_links: false,
        }
    }
}
