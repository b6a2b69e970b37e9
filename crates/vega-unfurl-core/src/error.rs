//! Error types for decoding and unfurling Vega editor links.

use thiserror::Error;

/// Result type alias using the crate's unfurl error type.
pub type Result<T> = std::result::Result<T, UnfurlError>;

/// Errors raised while turning an editor URL suffix into a document.
///
/// A URL that is not an editor link at all is not an error; the codec
/// reports it as `Ok(None)`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// The kind segment is not one of the known specification dialects.
    #[error("unknown specification kind '{0}'")]
    UnknownKind(String),

    /// The compressed payload is empty or not valid lz-string data.
    #[error("failed to decompress specification payload '{payload}'")]
    DecodeFailure {
        /// The offending payload, kept for diagnostics.
        payload: String,
    },

    /// The decompressed text is not a JSON document.
    #[error("failed to parse specification JSON: {0}")]
    ParseFailure(String),
}

impl From<serde_json::Error> for DecodeError {
    fn from(err: serde_json::Error) -> Self {
        Self::ParseFailure(err.to_string())
    }
}

/// Errors that abort building link intelligence.
///
/// Decode failures never show up here: they degrade to a plain link preview.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UnfurlError {
    /// The document has a shape the walker cannot traverse.
    #[error("unexpected document shape at '{path}': {reason}")]
    Unexpected {
        /// Slash-separated location of the offending node.
        path: String,
        /// What was found instead of the expected shape.
        reason: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_kind_display() {
        let err = DecodeError::UnknownKind("vega-next".to_string());
        assert_eq!(err.to_string(), "unknown specification kind 'vega-next'");
    }

    #[test]
    fn test_decode_failure_keeps_payload() {
        let err = DecodeError::DecodeFailure {
            payload: "N4Ig!!".to_string(),
        };
        assert!(err.to_string().contains("N4Ig!!"));
    }

    #[test]
    fn test_from_json_error() {
        let json_err = serde_json::from_str::<serde_json::Value>("{oops").unwrap_err();
        let err: DecodeError = json_err.into();
        assert!(matches!(err, DecodeError::ParseFailure(_)));
    }

    #[test]
    fn test_unexpected_display() {
        let err = UnfurlError::Unexpected {
            path: "/layer/0/data/url".to_string(),
            reason: "expected a string, found number".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("/layer/0/data/url"));
        assert!(msg.contains("expected a string"));
    }
}
