//! Tool payload recovery from free-form model output.
//!
//! Models asked for "a single JSON object" routinely wrap it in prose, code
//! fences or escaped underscores. [`extract_tool_payload`] runs an ordered
//! chain of pure stages over the text and returns the first JSON object any
//! of them recovers. It never fails: when every stage comes up empty the
//! result is an error payload carrying the original text.

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::sync::LazyLock;
use tracing::{debug, warn};

/// Error message used when no stage recovers an object.
pub const PARSE_FAILURE: &str = "Failed to parse tool payload from LLM response";

/// A single extraction strategy.
pub type Stage = fn(&str) -> Option<Value>;

/// The extraction chain, in the order stages are tried.
pub const EXTRACTION_STAGES: &[(&str, Stage)] = &[
    ("balanced_brace", balanced_brace),
    ("delimiter_split", delimiter_split),
    ("whole_string", whole_string),
    ("pattern_fallback", pattern_fallback),
];

static SPLIT_MARKERS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?i)\n\s*Note:",
        r"(?i)\n\s*Explanation:",
        r"(?i)\n\s*The above",
        r"(?i)\n\s*This response",
        r"(?i)\n\s*If not",
        r"(?i)\n\s*```",
        r"(?i)\n\s*The user query",
        r"(?i)\n\s*We determine",
    ]
    .iter()
    .filter_map(|pattern| Regex::new(pattern).ok())
    .collect()
});

static FALLBACK_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?s)```json\s*(\{.*?\})\s*```",
        r"(?s)```\s*(\{.*?\})\s*```",
        r#"(?s)(\{[^{}]*"method"[^{}]*\})"#,
        r#"(?s)(\{.*?"method".*?\})"#,
        r#"(?s)(\{[^}]*"tool"[^}]*\})"#,
    ]
    .iter()
    .filter_map(|pattern| Regex::new(pattern).ok())
    .collect()
});

/// Structured tool call consumed by the dispatcher.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolPayload {
    pub tool: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,

    #[serde(default)]
    pub data: Map<String, Value>,

    /// Any other keys the model emitted; forwarded in request bodies
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ToolPayload {
    /// Interpret an extracted object as a tool call.
    pub fn from_value(value: &Value) -> Result<Self, String> {
        match value.get("tool") {
            Some(Value::String(tool)) if !tool.trim().is_empty() => {}
            _ => return Err("Tool payload is missing the 'tool' field".to_string()),
        }
        serde_json::from_value(value.clone()).map_err(|e| format!("Malformed tool payload: {}", e))
    }

    /// Upper-cased HTTP method, `POST` when unset.
    pub fn http_method(&self) -> String {
        self.method
            .as_deref()
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .unwrap_or("POST")
            .to_uppercase()
    }
}

/// `\_` → `_`, then trim.
pub fn clean_candidate(candidate: &str) -> String {
    candidate.replace("\\_", "_").trim().to_string()
}

fn parse_object(candidate: &str) -> Option<Value> {
    serde_json::from_str::<Value>(&clean_candidate(candidate))
        .ok()
        .filter(Value::is_object)
}

/// Stage 1: first `{` up to the brace that brings the depth back to zero.
pub fn balanced_brace(text: &str) -> Option<Value> {
    let text = text.trim();
    let start = text.find('{')?;

    let mut depth = 0usize;
    for (offset, ch) in text[start..].char_indices() {
        match ch {
            '{' => depth += 1,
            '}' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    let end = start + offset + ch.len_utf8();
                    return parse_object(&text[start..end]);
                }
            }
            _ => {}
        }
    }

    None
}

/// Stage 2: cut the text at the first trailing-prose marker.
pub fn delimiter_split(text: &str) -> Option<Value> {
    let text = text.trim();
    for marker in SPLIT_MARKERS.iter() {
        let Some(found) = marker.find(text) else {
            continue;
        };
        let head = text[..found.start()].trim();
        if head.starts_with('{') && head.ends_with('}') {
            if let Some(value) = parse_object(head) {
                return Some(value);
            }
        }
    }
    None
}

/// Stage 3: the whole text is the object.
pub fn whole_string(text: &str) -> Option<Value> {
    parse_object(text.trim())
}

/// Stage 4: fenced blocks, then groups holding a `"method"` or `"tool"` key.
pub fn pattern_fallback(text: &str) -> Option<Value> {
    FALLBACK_PATTERNS.iter().find_map(|pattern| {
        pattern
            .captures(text)
            .and_then(|caps| caps.get(1))
            .and_then(|group| parse_object(group.as_str()))
    })
}

/// Run the extraction chain over raw text.
pub fn extract_from_text(text: &str) -> Value {
    for (name, stage) in EXTRACTION_STAGES {
        if let Some(value) = stage(text) {
            debug!(stage = name, "Recovered tool payload");
            return value;
        }
    }

    warn!(raw = %text, "Could not recover a tool payload");
    json!({
        "error": PARSE_FAILURE,
        "rawResponse": text,
    })
}

/// Recover a tool payload from model output.
///
/// Text runs through [`EXTRACTION_STAGES`]; an object is returned unchanged;
/// anything else yields an error payload.
pub fn extract_tool_payload(input: &Value) -> Value {
    match input {
        Value::String(text) => extract_from_text(text),
        Value::Object(_) => input.clone(),
        other => json!({
            "error": format!("Unexpected response type: {}", value_type(other)),
            "rawResponse": other,
        }),
    }
}

/// Whether a value is an error payload from extraction or dispatch.
pub fn is_error_payload(value: &Value) -> bool {
    value.get("error").is_some() && value.get("tool").is_none()
}

fn value_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
