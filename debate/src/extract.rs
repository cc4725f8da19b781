//! Answer extraction from semi-structured model responses.
//!
//! Debaters are instructed to embed their answer as a single-key JSON
//! object (`{"answer": ...}`) somewhere in their prose. Extraction is
//! best-effort: a strict decode of the whole response is attempted
//! first, then a bounded marker scan as a compatibility shim. Failure
//! at any step means "no answer signal this round", never an error.

use serde_json::Value;
use tracing::debug;

/// Literal marker opening an embedded answer object.
pub const ANSWER_MARKER: &str = "{\"answer\":";

/// Locate the embedded answer fragment in a raw response.
///
/// Returns the substring starting at the first occurrence of
/// [`ANSWER_MARKER`] up to and including the first closing brace.
/// Nested braces in the answer value are not supported — extraction
/// stops at the first `}` (known approximation).
pub fn extract_fragment(raw: &str) -> Option<&str> {
    let start = raw.find(ANSWER_MARKER)?;
    let tail = &raw[start..];
    let end = tail.find('}')?;
    Some(&tail[..=end])
}

/// Decode the answer value from a raw response, tolerantly.
///
/// Strict decoding of the whole (trimmed) response is tried first, so
/// well-formed JSON replies work regardless of key order or nesting.
/// Otherwise the marker scan above supplies a fragment to decode.
/// Returns `None` when nothing recognizable is present.
pub fn decode_answer(raw: &str) -> Option<Value> {
    if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(raw.trim()) {
        if let Some(answer) = map.get("answer") {
            return Some(answer.clone());
        }
    }

    let fragment = extract_fragment(raw)?;
    match serde_json::from_str::<Value>(fragment) {
        Ok(Value::Object(map)) => map.get("answer").cloned(),
        Ok(_) => None,
        Err(e) => {
            debug!(error = %e, fragment, "answer fragment did not decode");
            None
        }
    }
}

/// Render an answer value as plain text for containment scoring.
///
/// JSON strings lose their quotes; everything else uses the canonical
/// JSON rendering.
pub fn answer_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fragment_exact_substring() {
        let raw = "I believe the total is correct. {\"answer\": 4}";
        assert_eq!(extract_fragment(raw), Some("{\"answer\": 4}"));
    }

    #[test]
    fn test_fragment_mid_string_after_prose() {
        let raw = "Step by step: 2+2=4, so {\"answer\": 4} is my final position.";
        assert_eq!(extract_fragment(raw), Some("{\"answer\": 4}"));
    }

    #[test]
    fn test_fragment_first_occurrence_wins() {
        let raw = "{\"answer\": 1} but also {\"answer\": 2}";
        assert_eq!(extract_fragment(raw), Some("{\"answer\": 1}"));
    }

    #[test]
    fn test_fragment_no_marker_is_none() {
        assert_eq!(extract_fragment("no structured answer here"), None);
        assert_eq!(extract_fragment(""), None);
    }

    #[test]
    fn test_fragment_unterminated_is_none() {
        assert_eq!(extract_fragment("{\"answer\": 4"), None);
    }

    #[test]
    fn test_fragment_nested_braces_stop_early() {
        // Known approximation: stops at the first closing brace.
        let raw = "{\"answer\": {\"value\": 4}}";
        assert_eq!(extract_fragment(raw), Some("{\"answer\": {\"value\": 4}"));
    }

    #[test]
    fn test_decode_numeric_answer() {
        let value = decode_answer("reasoning... {\"answer\": 4}").unwrap();
        assert_eq!(value, Value::from(4));
    }

    #[test]
    fn test_decode_string_answer() {
        let value = decode_answer("{\"answer\": \"four\"}").unwrap();
        assert_eq!(value, Value::from("four"));
    }

    #[test]
    fn test_decode_strict_path_tolerates_nesting() {
        // A fully valid JSON response decodes even though the marker
        // scan would truncate it.
        let value = decode_answer("  {\"answer\": {\"value\": 4}}  ").unwrap();
        assert_eq!(value, serde_json::json!({"value": 4}));
    }

    #[test]
    fn test_decode_miss_is_none() {
        assert_eq!(decode_answer("I am not sure yet."), None);
        assert_eq!(decode_answer(""), None);
    }

    #[test]
    fn test_decode_malformed_fragment_is_none() {
        // Marker present but the fragment is truncated by the nested brace.
        assert_eq!(decode_answer("so {\"answer\": {\"v\": 1}} trailing"), None);
    }

    #[test]
    fn test_answer_text_rendering() {
        assert_eq!(answer_text(&Value::from(4)), "4");
        assert_eq!(answer_text(&Value::from("four")), "four");
        assert_eq!(answer_text(&serde_json::json!({"v": 1})), "{\"v\":1}");
    }
}
