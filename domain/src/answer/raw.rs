//! Untyped provider answers

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// An answer exactly as a provider returned it, before shape checking.
///
/// Providers are free to return anything; [`super::AnswerPayload::decode`]
/// turns a raw answer into a typed payload or rejects it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawAnswer(Value);

impl RawAnswer {
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    /// Build a raw answer from a model's text reply.
    ///
    /// Markdown code fences are stripped and the remainder is parsed as
    /// JSON; text that is not JSON becomes a JSON string.
    pub fn from_model_text(text: &str) -> Self {
        let body = strip_code_fence(text.trim());
        match serde_json::from_str::<Value>(body) {
            Ok(value) => Self(value),
            Err(_) => Self(Value::String(body.to_string())),
        }
    }

    pub fn value(&self) -> &Value {
        &self.0
    }

    pub fn into_value(self) -> Value {
        self.0
    }

    pub fn is_null(&self) -> bool {
        self.0.is_null()
    }
}

impl From<Value> for RawAnswer {
    fn from(value: Value) -> Self {
        Self(value)
    }
}

fn strip_code_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    // Drop the info string (e.g. "json") on the opening fence line
    let rest = match rest.find('\n') {
        Some(idx) => &rest[idx + 1..],
        None => rest,
    };
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_model_text_parses_json() {
        let raw = RawAnswer::from_model_text(r#"{"answer": 4}"#);
        assert_eq!(raw.value(), &json!({"answer": 4}));
    }

    #[test]
    fn test_from_model_text_strips_fences() {
        let raw = RawAnswer::from_model_text("```json\n[{\"row\": \"A\", \"selectedColumn\": \"B\"}]\n```");
        assert_eq!(raw.value(), &json!([{"row": "A", "selectedColumn": "B"}]));
    }

    #[test]
    fn test_from_model_text_falls_back_to_string() {
        let raw = RawAnswer::from_model_text("  The capital is Paris. ");
        assert_eq!(raw.value(), &json!("The capital is Paris."));
    }
}
