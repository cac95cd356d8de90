//! Pulls a JSON object out of a model's text answer.
//!
//! Models asked for JSON still wrap it in markdown fences or add a sentence
//! before it now and then.  Everything outside the outermost braces is
//! ignored.

use serde_json::{Map, Value};

/// Parse the first JSON object found in `text`.
///
/// Returns `None` when no well-formed object is present.
pub fn extract_json_object(text: &str) -> Option<Map<String, Value>> {
    let cleaned = text.trim();
    let cleaned = cleaned.strip_prefix("```json").unwrap_or(cleaned);
    let cleaned = cleaned.strip_prefix("```").unwrap_or(cleaned);
    let cleaned = cleaned.strip_suffix("```").unwrap_or(cleaned);
    let cleaned = cleaned.trim();

    if let Ok(Value::Object(map)) = serde_json::from_str(cleaned) {
        return Some(map);
    }

    let start = cleaned.find('{')?;
    let end = cleaned.rfind('}')?;
    if end <= start {
        return None;
    }
    match serde_json::from_str(&cleaned[start..=end]) {
        Ok(Value::Object(map)) => Some(map),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_object() {
        let map = extract_json_object(r#"{"category": "TASK"}"#).unwrap();
        assert_eq!(map["category"], "TASK");
    }

    #[test]
    fn fenced_object() {
        let map = extract_json_object("```json\n{\"category\": \"HELP\"}\n```").unwrap();
        assert_eq!(map["category"], "HELP");
    }

    #[test]
    fn object_with_surrounding_prose() {
        let map = extract_json_object("결과입니다: {\"keyword\": \"회의\"} 감사합니다").unwrap();
        assert_eq!(map["keyword"], "회의");
    }

    #[test]
    fn array_and_garbage_are_rejected() {
        assert!(extract_json_object("[1, 2]").is_none());
        assert!(extract_json_object("not json at all").is_none());
        assert!(extract_json_object("} backwards {").is_none());
    }
}
