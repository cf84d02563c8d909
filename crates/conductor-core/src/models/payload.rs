use serde_json::{Map, Value};

use crate::models::{CoreError, CoreResult};

/// Open key/value payload carried as workflow input and output.
pub type Payload = Map<String, Value>;

/// Reads a string field, failing with the message surfaced on the
/// workflow record when the field is absent or has the wrong type.
pub fn required_text<'a>(payload: &'a Payload, field: &str) -> CoreResult<&'a str> {
    match payload.get(field) {
        Some(Value::String(text)) => Ok(text.as_str()),
        _ => Err(CoreError::execution(format!(
            "Missing or invalid {field} in input"
        ))),
    }
}

pub fn text_payload(field: &str, text: impl Into<String>) -> Payload {
    let mut payload = Payload::new();
    payload.insert(field.to_string(), Value::String(text.into()));
    payload
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{Payload, required_text, text_payload};
    use crate::models::CoreErrorKind;

    #[test]
    fn required_text_rejects_non_string_values() {
        let mut payload = Payload::new();
        payload.insert("prompt".to_string(), json!(42));
        let error = required_text(&payload, "prompt").unwrap_err();
        assert_eq!(error.kind, CoreErrorKind::Execution);
        assert_eq!(error.message, "Missing or invalid prompt in input");
    }

    #[test]
    fn required_text_reads_strings() {
        let payload = text_payload("prompt", "hello");
        assert_eq!(required_text(&payload, "prompt").unwrap(), "hello");
    }
}
