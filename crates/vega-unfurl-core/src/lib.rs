//! Core decoding and link intelligence for Vega editor links.
//!
//! This crate provides:
//! - The editor link codec (`{kind}/{lz-string payload}` ↔ JSON document)
//! - The data-reference walker over nested view compositions
//! - The link intelligence builder producing Slack attachments
//! - Shared settings and error types
//!
//! Everything here is a pure function of its inputs; no network access and
//! no state survives a call.

pub mod codec;
mod error;
pub mod intelligence;
pub mod settings;
pub mod walker;

pub use codec::{Codec, DecodedSpec, EncodedReference, SpecKind};
pub use error::{DecodeError, Result, UnfurlError};
pub use intelligence::{Builder, Field, LinkIntelligence};
pub use settings::Settings;
pub use walker::{WalkOptions, data_links, extract_data_references, resolve_data_reference};
