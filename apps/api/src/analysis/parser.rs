//! Response parsing. Turns raw model text into JSON values and citations into sources.

use std::collections::HashSet;

use serde_json::Value;

use crate::analysis::models::GroundingSource;
use crate::llm_client::Citation;

const FENCE_OPEN: &str = "```json";
/// Closing fence. Only counts at the start of a line.
const FENCE_CLOSE: &str = "\n```";
const UNKNOWN_SOURCE_TITLE: &str = "Unknown Source";
/// Placeholder uri for citations without a link. Never returned to callers.
const PLACEHOLDER_URI: &str = "#";

/// Parses a schema-constrained reply. Surrounding whitespace is ignored.
pub fn parse_structured(text: &str) -> Result<Value, serde_json::Error> {
    serde_json::from_str(text.trim())
}

/// Returns the interior of the first ```` ```json ```` fenced block.
///
/// Prose before and after the block is ignored, as are later blocks. The block
/// ends at the first line that starts with ```` ``` ````.
/// `None` when the opening or closing fence is missing or the block is blank.
pub fn extract_fenced_json(text: &str) -> Option<&str> {
    let start = text.find(FENCE_OPEN)? + FENCE_OPEN.len();
    let after_open = &text[start..];
    let end = after_open.find(FENCE_CLOSE)?;
    let body = after_open[..end].trim();
    (!body.is_empty()).then_some(body)
}

/// Converts grounding citations into caller-facing sources.
///
/// Missing titles become "Unknown Source". Citations without a uri are dropped.
/// Repeated uris keep their first occurrence, in first-seen order.
pub fn collect_sources(citations: &[Citation]) -> Vec<GroundingSource> {
    let mut seen: HashSet<String> = HashSet::new();

    citations
        .iter()
        .map(|c| GroundingSource {
            title: non_blank(c.title.as_deref())
                .unwrap_or(UNKNOWN_SOURCE_TITLE)
                .to_string(),
            uri: non_blank(c.uri.as_deref())
                .unwrap_or(PLACEHOLDER_URI)
                .to_string(),
        })
        .filter(|source| source.uri != PLACEHOLDER_URI)
        .filter(|source| seen.insert(source.uri.clone()))
        .collect()
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}
