//! Parse model output into a stored extraction

use serde_json::{json, Value};
use tracing::warn;

/// Parse the model's text as JSON, degrading to `{"_raw": text}`
///
/// A surrounding markdown code fence is tolerated. Any other non-JSON
/// output is kept verbatim under `_raw`.
pub fn parse_extraction(post_id: &str, text: &str) -> Value {
    match serde_json::from_str::<Value>(extract_json(text)) {
        Ok(value) => value,
        Err(e) => {
            warn!("Post {}: model output is not JSON ({}), storing raw text", post_id, e);
            json!({ "_raw": text })
        }
    }
}

/// Strip a markdown code fence around the payload, if present
fn extract_json(response: &str) -> &str {
    let trimmed = response.trim();
    if !trimmed.starts_with("```") {
        return trimmed;
    }

    // Skip the opening fence line (```json or ```) and the closing fence
    let body = match trimmed.find('\n') {
        Some(newline) => &trimmed[newline + 1..],
        None => return trimmed,
    };
    body.trim_end()
        .strip_suffix("```")
        .unwrap_or(body)
        .trim()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid_json() {
        let value = parse_extraction("P1", r#"{"post_id": "P1", "topic": {}}"#);
        assert_eq!(value["post_id"], "P1");
    }

    #[test]
    fn test_not_json_is_kept_raw() {
        assert_eq!(parse_extraction("P1", "not json"), json!({"_raw": "not json"}));
    }

    #[test]
    fn test_empty_output_is_raw() {
        assert_eq!(parse_extraction("P1", ""), json!({"_raw": ""}));
    }

    #[test]
    fn test_code_fence_is_stripped() {
        let value = parse_extraction("P1", "```json\n{\"post_id\": \"P1\"}\n```");
        assert_eq!(value, json!({"post_id": "P1"}));

        let value = parse_extraction("P1", "```\n[1, 2]\n```\n");
        assert_eq!(value, json!([1, 2]));
    }

    #[test]
    fn test_unclosed_fence_still_parses() {
        let value = parse_extraction("P1", "```json\n{\"a\": 1}");
        assert_eq!(value, json!({"a": 1}));
    }
}
