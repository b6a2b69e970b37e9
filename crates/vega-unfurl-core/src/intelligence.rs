//! Link intelligence: the Slack attachment built for one shared link.
//!
//! An editor link that decodes cleanly gets a titled attachment with the
//! document's description, a `$schema` badge, its data links and links to
//! the rendered artifacts. Anything else degrades to a plain link preview.

use serde::Serialize;
use serde_json::Value;

use crate::codec::{Codec, DecodedSpec};
use crate::error::{DecodeError, Result};
use crate::settings::Settings;
use crate::walker;

/// Attachment side bar color.
pub const ATTACHMENT_COLOR: &str = "#36a64f";

/// Attachment footer text.
pub const ATTACHMENT_FOOTER: &str = "Vega Slack";

/// Title used when a document has neither `title` nor `description`.
pub const UNTITLED: &str = "Untitled";

/// Maximum number of description characters used as a fallback title.
pub const TITLE_DESCRIPTION_LIMIT: usize = 100;

/// Bullet prefixed to every link line.
const BULLET: &str = ":small_blue_diamond:";

/// Output formats offered in the render field, in display order.
const RENDER_FORMATS: [&str; 3] = ["svg", "png", "vg.json"];

/// One titled block of an attachment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Field {
    /// Field heading.
    pub title: String,
    /// Slack mrkdwn body.
    pub value: String,
}

impl Field {
    fn new(title: &str, value: String) -> Self {
        Self {
            title: title.to_string(),
            value,
        }
    }
}

/// Preview record for a single shared URL.
///
/// Serializes to the Slack attachment shape; the preview URL itself is the
/// key of the unfurl map and is not part of the attachment body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LinkIntelligence {
    #[serde(skip)]
    preview_url: String,
    title: String,
    title_link: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    color: &'static str,
    footer: &'static str,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    fields: Vec<Field>,
}

impl LinkIntelligence {
    /// Plain preview: the URL is its own title, no fields.
    pub fn plain(url: &str) -> Self {
        Self {
            preview_url: url.to_string(),
            title: url.to_string(),
            title_link: url.to_string(),
            text: None,
            color: ATTACHMENT_COLOR,
            footer: ATTACHMENT_FOOTER,
            fields: Vec::new(),
        }
    }

    /// Build the preview for `url` from the codec's result.
    ///
    /// Decode failures degrade to [`LinkIntelligence::plain`]; only a
    /// document the walker cannot traverse is an error.
    pub fn build(
        url: &str,
        decoded: std::result::Result<Option<&DecodedSpec>, &DecodeError>,
        settings: &Settings,
    ) -> Result<Self> {
        let spec = match decoded {
            Ok(Some(spec)) => spec,
            Ok(None) => return Ok(Self::plain(url)),
            Err(err) => {
                tracing::warn!(url = %url, error = %err, "could not decode shared link");
                return Ok(Self::plain(url));
            }
        };

        let document = &spec.document;
        let description = string_field(document, "description");

        let title = title_of(document)
            .or_else(|| {
                description.map(|d| d.chars().take(TITLE_DESCRIPTION_LIMIT).collect())
            })
            .unwrap_or_else(|| UNTITLED.to_string());

        let mut fields = Vec::new();

        if let Some(schema_url) = string_field(document, "$schema") {
            let badge = schema_badge(schema_url, &settings.schema_base_url);
            fields.push(Field::new("schema", format!("{BULLET} <{schema_url}|{badge}>")));
        }

        let links = walker::data_links(document, settings)?;
        if !links.is_empty() {
            let value = links
                .iter()
                .map(|link| format!("{BULLET} <{link}|{link}>"))
                .collect::<Vec<_>>()
                .join("\n");
            fields.push(Field::new("data", value));
        }

        fields.push(Field::new("render", render_links(spec, &settings.render_base_url)));

        Ok(Self {
            preview_url: url.to_string(),
            title: format!("{title}.{}", spec.kind.extension()),
            title_link: url.to_string(),
            text: description.map(str::to_string),
            color: ATTACHMENT_COLOR,
            footer: ATTACHMENT_FOOTER,
            fields,
        })
    }

    /// The shared URL this record previews.
    pub fn preview_url(&self) -> &str {
        &self.preview_url
    }

    /// Attachment title.
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Attachment body text (the document description).
    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    /// Attachment fields in display order.
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// Look up a field by title.
    pub fn field(&self, title: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.title == title)
    }
}

/// Decodes shared links and builds their previews.
#[derive(Debug, Clone)]
pub struct Builder {
    codec: Codec,
    settings: Settings,
}

impl Builder {
    /// Create a builder from settings.
    pub fn new(settings: Settings) -> Self {
        Self {
            codec: Codec::new(settings.editor_base_url.clone()),
            settings,
        }
    }

    /// The codec used for shared links.
    pub fn codec(&self) -> &Codec {
        &self.codec
    }

    /// Decode `url` and build its preview.
    pub fn unfurl(&self, url: &str) -> Result<LinkIntelligence> {
        let decoded = self.codec.decode(url);
        LinkIntelligence::build(url, decoded.as_ref().map(Option::as_ref), &self.settings)
    }
}

/// Format a `$schema` URL as a short badge, e.g. `vega-lite | v5`.
pub fn schema_badge(schema_url: &str, schema_base_url: &str) -> String {
    let path = schema_url.strip_prefix(schema_base_url).unwrap_or(schema_url);
    let path = path.strip_suffix(".json").unwrap_or(path);
    path.split('/')
        .filter(|segment| !segment.is_empty())
        .collect::<Vec<_>>()
        .join(" | ")
}

fn render_links(spec: &DecodedSpec, render_base_url: &str) -> String {
    RENDER_FORMATS
        .iter()
        .map(|format| {
            format!(
                "<{render_base_url}{format}/{}/{}|{format}>",
                spec.kind, spec.compressed_payload
            )
        })
        .collect::<Vec<_>>()
        .join("  ")
}

/// Document title: a string or multi-line string array, either directly or
/// as the `text` of a Vega-Lite title object.
fn title_of(document: &Value) -> Option<String> {
    match document.get("title")? {
        Value::Object(params) => title_text(params.get("text")?),
        text => title_text(text),
    }
}

/// Title text; array lines are joined with a space.
fn title_text(text: &Value) -> Option<String> {
    match text {
        Value::String(line) => Some(line.clone()),
        Value::Array(lines) => {
            let lines: Vec<&str> = lines.iter().filter_map(Value::as_str).collect();
            (!lines.is_empty()).then(|| lines.join(" "))
        }
        _ => None,
    }
}

fn string_field<'a>(document: &'a Value, key: &str) -> Option<&'a str> {
    document.get(key)?.as_str()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{SpecKind, encode};
    use crate::error::UnfurlError;
    use crate::settings::{VEGA_EDITOR_BASE_URL, VEGA_UNFURL_BASE_URL};
    use serde_json::json;

    fn builder() -> Builder {
        Builder::new(Settings::default())
    }

    fn editor_url(kind: SpecKind, doc: &Value) -> String {
        builder().codec().editor_url(kind, doc)
    }

    #[test]
    fn test_unrelated_url_is_plain() {
        let url = "https://example.com/report";
        let intel = builder().unfurl(url).unwrap();
        assert_eq!(intel.title(), url);
        assert_eq!(intel.preview_url(), url);
        assert!(intel.fields().is_empty());
        assert!(intel.text().is_none());
    }

    #[test]
    fn test_undecodable_link_is_plain() {
        let url = format!("{VEGA_EDITOR_BASE_URL}vega-next/abc");
        let intel = builder().unfurl(&url).unwrap();
        assert_eq!(intel.title(), url);
        assert!(intel.fields().is_empty());

        let url = format!("{VEGA_EDITOR_BASE_URL}vega-lite/");
        let intel = builder().unfurl(&url).unwrap();
        assert_eq!(intel.title(), url);
    }

    #[test]
    fn test_title_suffixed_with_extension() {
        let url = editor_url(SpecKind::VegaLite, &json!({"title": "T"}));
        assert_eq!(builder().unfurl(&url).unwrap().title(), "T.vl.json");

        let url = editor_url(SpecKind::Vega, &json!({"title": "T"}));
        assert_eq!(builder().unfurl(&url).unwrap().title(), "T.vg.json");
    }

    #[test]
    fn test_title_object_text() {
        let url = editor_url(
            SpecKind::VegaLite,
            &json!({"title": {"text": "Stocks", "anchor": "start"}}),
        );
        assert_eq!(builder().unfurl(&url).unwrap().title(), "Stocks.vl.json");
    }

    #[test]
    fn test_multi_line_titles_joined() {
        let url = editor_url(
            SpecKind::VegaLite,
            &json!({"title": ["Seattle", "Weather"], "description": "ignored"}),
        );
        assert_eq!(builder().unfurl(&url).unwrap().title(), "Seattle Weather.vl.json");

        let url = editor_url(
            SpecKind::VegaLite,
            &json!({"title": {"text": ["Daily", "Highs"], "subtitle": "2012"}}),
        );
        assert_eq!(builder().unfurl(&url).unwrap().title(), "Daily Highs.vl.json");

        let url = editor_url(SpecKind::Vega, &json!({"title": []}));
        assert_eq!(builder().unfurl(&url).unwrap().title(), "Untitled.vg.json");
    }

    #[test]
    fn test_description_fallback_title_truncated() {
        let description = "d".repeat(150);
        let url = editor_url(SpecKind::VegaLite, &json!({"description": description}));
        let intel = builder().unfurl(&url).unwrap();
        assert_eq!(intel.title(), format!("{}.vl.json", "d".repeat(100)));
        assert_eq!(intel.text(), Some(description.as_str()));
    }

    #[test]
    fn test_untitled_placeholder() {
        let url = editor_url(SpecKind::Vega, &json!({"marks": []}));
        assert_eq!(builder().unfurl(&url).unwrap().title(), "Untitled.vg.json");
    }

    #[test]
    fn test_field_order_and_contents() {
        let doc = json!({
            "$schema": "https://vega.github.io/schema/vega-lite/v5.json",
            "description": "A scatterplot",
            "data": {"url": "data/cars.json"},
            "layer": [{"data": {"url": "https://example.com/x.csv"}}]
        });
        let url = editor_url(SpecKind::VegaLite, &doc);
        let intel = builder().unfurl(&url).unwrap();

        let titles: Vec<_> = intel.fields().iter().map(|f| f.title.as_str()).collect();
        assert_eq!(titles, vec!["schema", "data", "render"]);

        assert_eq!(
            intel.field("schema").unwrap().value,
            ":small_blue_diamond: <https://vega.github.io/schema/vega-lite/v5.json|vega-lite | v5>"
        );
        assert_eq!(
            intel.field("data").unwrap().value,
            ":small_blue_diamond: <https://vega.github.io/vega-datasets/data/cars.json|https://vega.github.io/vega-datasets/data/cars.json>\n\
             :small_blue_diamond: <https://example.com/x.csv|https://example.com/x.csv>"
        );
    }

    #[test]
    fn test_data_field_omitted_without_references() {
        let url = editor_url(SpecKind::VegaLite, &json!({"title": "Inline", "data": {"values": []}}));
        let intel = builder().unfurl(&url).unwrap();
        assert!(intel.field("data").is_none());
        assert!(intel.field("schema").is_none());
        assert!(intel.field("render").is_some());
    }

    #[test]
    fn test_render_links_reuse_payload() {
        let doc = json!({"title": "Bars"});
        let payload = encode(&doc);
        let url = editor_url(SpecKind::VegaLite, &doc);
        let render = builder().unfurl(&url).unwrap().field("render").unwrap().value.clone();

        for format in ["svg", "png", "vg.json"] {
            let link = format!("<{VEGA_UNFURL_BASE_URL}{format}/vega-lite/{payload}|{format}>");
            assert!(render.contains(&link), "missing {link} in {render}");
        }
    }

    #[test]
    fn test_walker_failure_propagates() {
        let url = editor_url(SpecKind::VegaLite, &json!({"data": {"url": ["not", "a", "string"]}}));
        let err = builder().unfurl(&url).unwrap_err();
        assert!(matches!(err, UnfurlError::Unexpected { .. }));
    }

    #[test]
    fn test_schema_badge_formats() {
        let base = "https://vega.github.io/schema/";
        assert_eq!(
            schema_badge("https://vega.github.io/schema/vega/v5.json", base),
            "vega | v5"
        );
        assert_eq!(
            schema_badge("https://vega.github.io/schema/vega-lite/v4.17.0.json", base),
            "vega-lite | v4.17.0"
        );
        assert_eq!(
            schema_badge("https://example.com/custom.json", base),
            "https: | example.com | custom"
        );
    }

    #[test]
    fn test_attachment_serialization_omits_url() {
        let url = editor_url(SpecKind::Vega, &json!({"title": "T", "description": "D"}));
        let intel = builder().unfurl(&url).unwrap();
        let json = serde_json::to_value(&intel).unwrap();

        assert!(json.get("preview_url").is_none());
        assert_eq!(json["title"], "T.vg.json");
        assert_eq!(json["title_link"], url);
        assert_eq!(json["text"], "D");
        assert_eq!(json["color"], ATTACHMENT_COLOR);
        assert_eq!(json["footer"], ATTACHMENT_FOOTER);

        let plain = serde_json::to_value(LinkIntelligence::plain("https://x")).unwrap();
        assert!(plain.get("fields").is_none());
        assert!(plain.get("text").is_none());
    }
}
