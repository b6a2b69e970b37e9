//! Editor link codec.
//!
//! The Vega editor shares specifications as
//! `{editor_base}/{kind}/{payload}` where `kind` is `vega` or `vega-lite` and
//! `payload` is the JSON text compressed with lz-string's URL-safe
//! `EncodedURIComponent` alphabet. Decoding is a pure function of the URL.

use std::fmt;
use std::str::FromStr;

use serde_json::Value;

use crate::error::DecodeError;

/// Specification dialect carried in an editor link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SpecKind {
    /// Low-level imperative Vega specification.
    Vega,
    /// High-level declarative Vega-Lite specification, compiled to Vega before rendering.
    VegaLite,
}

impl SpecKind {
    /// Path segment used in editor and render links.
    pub fn tag(self) -> &'static str {
        match self {
            Self::Vega => "vega",
            Self::VegaLite => "vega-lite",
        }
    }

    /// Canonical file extension for documents of this dialect.
    pub fn extension(self) -> &'static str {
        match self {
            Self::Vega => "vg.json",
            Self::VegaLite => "vl.json",
        }
    }

    /// Whether documents of this dialect must be compiled before rendering.
    pub fn needs_compile(self) -> bool {
        matches!(self, Self::VegaLite)
    }
}

impl fmt::Display for SpecKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for SpecKind {
    type Err = DecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "vega" => Ok(Self::Vega),
            "vega-lite" => Ok(Self::VegaLite),
            other => Err(DecodeError::UnknownKind(other.to_string())),
        }
    }
}

/// A `{kind}/{payload}` pair lifted out of a URL, not yet decompressed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedReference {
    /// Specification dialect.
    pub kind: SpecKind,
    /// lz-string compressed JSON text. Never empty.
    pub compressed_payload: String,
}

impl EncodedReference {
    /// Parse a `{kind}/{payload}` suffix.
    ///
    /// The suffix is split at the first `/`; a suffix without a separator has
    /// an empty payload, which is rejected once the kind is known.
    pub fn parse(suffix: &str) -> Result<Self, DecodeError> {
        let (tag, payload) = suffix.split_once('/').unwrap_or((suffix, ""));
        let kind = tag.parse::<SpecKind>()?;

        if payload.is_empty() {
            return Err(DecodeError::DecodeFailure {
                payload: payload.to_string(),
            });
        }

        Ok(Self {
            kind,
            compressed_payload: payload.to_string(),
        })
    }

    /// Decompress and parse the payload.
    pub fn decode(self) -> Result<DecodedSpec, DecodeError> {
        let source = decompress(&self.compressed_payload)?;
        let document = serde_json::from_str(&source)?;

        tracing::debug!(kind = %self.kind, bytes = source.len(), "decoded specification");

        Ok(DecodedSpec {
            kind: self.kind,
            document,
            source,
            compressed_payload: self.compressed_payload,
        })
    }
}

/// A successfully decoded specification.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedSpec {
    /// Specification dialect.
    pub kind: SpecKind,
    /// Parsed document tree.
    pub document: Value,
    /// Decompressed JSON text, exactly as the author wrote it.
    pub source: String,
    /// The original compressed payload, reused in render links without recompressing.
    pub compressed_payload: String,
}

/// Recognizes and decodes editor links under a configured base URL.
#[derive(Debug, Clone)]
pub struct Codec {
    editor_base_url: String,
}

impl Codec {
    /// Create a codec for links under `editor_base_url`.
    pub fn new(editor_base_url: impl Into<String>) -> Self {
        Self {
            editor_base_url: editor_base_url.into(),
        }
    }

    /// Lift the encoded reference out of an editor URL.
    ///
    /// Returns `Ok(None)` when `url` is not an editor link.
    pub fn reference(&self, url: &str) -> Result<Option<EncodedReference>, DecodeError> {
        match url.strip_prefix(self.editor_base_url.as_str()) {
            Some(suffix) => EncodedReference::parse(suffix).map(Some),
            None => Ok(None),
        }
    }

    /// Decode an editor URL into a document.
    ///
    /// Returns `Ok(None)` when `url` is not an editor link.
    pub fn decode(&self, url: &str) -> Result<Option<DecodedSpec>, DecodeError> {
        self.reference(url)?.map(EncodedReference::decode).transpose()
    }

    /// Build the editor link for a document.
    pub fn editor_url(&self, kind: SpecKind, document: &Value) -> String {
        format!("{}{}/{}", self.editor_base_url, kind, encode(document))
    }
}

/// Compress a document into an editor payload.
pub fn encode(document: &Value) -> String {
    compress_text(&document.to_string())
}

/// Compress raw JSON text into an editor payload, keeping its formatting.
pub fn compress_text(text: &str) -> String {
    lz_str::compress_to_encoded_uri_component(text)
}

/// Decompress an editor payload into JSON text.
pub fn decompress(payload: &str) -> Result<String, DecodeError> {
    let failure = || DecodeError::DecodeFailure {
        payload: payload.to_string(),
    };

    let wide = lz_str::decompress_from_encoded_uri_component(payload).ok_or_else(failure)?;
    let text = String::from_utf16(&wide).map_err(|_| failure())?;

    if text.is_empty() {
        return Err(failure());
    }

    Ok(text)
}
