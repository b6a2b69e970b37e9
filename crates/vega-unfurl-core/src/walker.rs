//! Data-source reference extraction.
//!
//! Walks a decoded Vega / Vega-Lite document depth-first and collects every
//! `data.url` it can reach through view compositions (`spec`, `layer`,
//! `concat`, `hconcat`, `vconcat`) and lookup transforms (`transform[].from`).
//!
//! Traversal order per node: the node's own data, then composition children
//! in declaration order, then transform sources. Any key may be missing; a
//! composition key may hold a single view or an array of views.

use serde_json::Value;

use crate::error::{Result, UnfurlError};
use crate::settings::Settings;

/// Composition operators holding nested views, after the facet/repeat `spec`.
const COMPOSITION_KEYS: [&str; 4] = ["layer", "concat", "hconcat", "vconcat"];

/// URL schemes that mark a data reference as absolute.
const ABSOLUTE_SCHEMES: [&str; 2] = ["http://", "https://"];

/// Walker behavior switches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WalkOptions {
    /// After the full walk, collect the root `spec` child's own data a second
    /// time. Facet and repeat roots can therefore report the same reference twice.
    pub rewalk_root_spec: bool,
}

impl Default for WalkOptions {
    fn default() -> Self {
        Self {
            rewalk_root_spec: true,
        }
    }
}

/// Collect raw data references from a document, duplicates included.
///
/// Only literal string URLs are collected. A `url` of any other shape,
/// including a Vega signal reference such as `{"signal": "..."}`, is an
/// [`UnfurlError::Unexpected`] and fails the whole event.
pub fn extract_data_references(document: &Value, options: &WalkOptions) -> Result<Vec<String>> {
    let mut refs = Vec::new();
    walk(document, "", &mut refs)?;

    if options.rewalk_root_spec
        && let Some(spec) = present(document.get("spec"))
    {
        collect_data_urls(spec, "/spec", &mut refs)?;
    }

    Ok(refs)
}

/// Resolve a raw reference: absolute URLs pass through, bare dataset names
/// are prefixed with `data_base_url`.
pub fn resolve_data_reference(raw: &str, data_base_url: &str) -> String {
    if ABSOLUTE_SCHEMES.iter().any(|scheme| raw.starts_with(scheme)) {
        raw.to_string()
    } else {
        format!("{data_base_url}{raw}")
    }
}

/// Extract and resolve every data link of a document.
pub fn data_links(document: &Value, settings: &Settings) -> Result<Vec<String>> {
    let raw = extract_data_references(document, &settings.walk)?;
    let mut links: Vec<String> = raw
        .iter()
        .map(|r| resolve_data_reference(r, &settings.data_base_url))
        .collect();

    if settings.dedupe_data_links {
        let mut seen = std::collections::HashSet::new();
        links.retain(|link| seen.insert(link.clone()));
    }

    tracing::debug!(count = links.len(), "resolved data links");
    Ok(links)
}

/// Normalize an optional composition slot to the list of views it holds.
///
/// Absent and `null` slots hold nothing; an array holds its elements; any
/// other value is a single view.
pub fn children_of<'a>(node: &'a Value, key: &str) -> Vec<&'a Value> {
    match present(node.get(key)) {
        None => Vec::new(),
        Some(Value::Array(items)) => items.iter().collect(),
        Some(single) => vec![single],
    }
}

fn walk(node: &Value, path: &str, refs: &mut Vec<String>) -> Result<()> {
    if !node.is_object() {
        return Ok(());
    }

    collect_data_urls(node, path, refs)?;

    let children = children_of(node, "spec")
        .into_iter()
        .map(|child| (child, format!("{path}/spec")))
        .chain(COMPOSITION_KEYS.iter().flat_map(|key| {
            children_of(node, key)
                .into_iter()
                .enumerate()
                .map(move |(i, child)| (child, format!("{path}/{key}/{i}")))
        }));

    for (child, child_path) in children {
        walk(child, &child_path, refs)?;
    }

    match present(node.get("transform")) {
        None => {}
        Some(Value::Array(transforms)) => {
            for (i, transform) in transforms.iter().enumerate() {
                if let Some(from) = present(transform.get("from")) {
                    walk(from, &format!("{path}/transform/{i}/from"), refs)?;
                }
            }
        }
        Some(other) => {
            return Err(unexpected(&format!("{path}/transform"), "an array", other));
        }
    }

    Ok(())
}

/// Collect the `url` of a node's `data`, whether a single source or a list.
fn collect_data_urls(node: &Value, path: &str, refs: &mut Vec<String>) -> Result<()> {
    match present(node.get("data")) {
        Some(Value::Array(sources)) => {
            for (i, source) in sources.iter().enumerate() {
                push_url(source, &format!("{path}/data/{i}"), refs)?;
            }
        }
        Some(source) => push_url(source, &format!("{path}/data"), refs)?,
        None => {}
    }
    Ok(())
}

fn push_url(source: &Value, path: &str, refs: &mut Vec<String>) -> Result<()> {
    match present(source.get("url")) {
        Some(Value::String(url)) => refs.push(url.clone()),
        Some(other) => return Err(unexpected(&format!("{path}/url"), "a string", other)),
        None => {}
    }
    Ok(())
}

fn present(value: Option<&Value>) -> Option<&Value> {
    value.filter(|v| !v.is_null())
}

fn unexpected(path: &str, expected: &str, found: &Value) -> UnfurlError {
    let found = match found {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    };
    UnfurlError::Unexpected {
        path: path.to_string(),
        reason: format!("expected {expected}, found {found}"),
    }
}
