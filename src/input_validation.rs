//! Request gate: input validation and argument sanitization.
//!
//! Runs before any process is started. A request that fails here produces a
//! client error with no side effects.

use crate::prediction::PredictionError;

/// Extract and validate the `text` field from a request body.
///
/// Rejects a missing body, a missing or non-string `text` field, and text
/// that is empty after trimming. On success returns the trimmed text with
/// embedded quotes escaped for argument passing.
pub fn validate_text(body: Option<&serde_json::Value>) -> Result<String, PredictionError> {
    let text = body
        .and_then(|v| v.get("text"))
        .and_then(|v| v.as_str())
        .ok_or(PredictionError::InvalidInput)?;

    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(PredictionError::InvalidInput);
    }

    Ok(sanitize_argument(trimmed))
}

/// Escape embedded double quotes before the text becomes a process argument.
///
/// Arguments go through `Command::arg` and are never shell-interpreted, so
/// this is purely an escaping transform and changes no semantic content.
pub fn sanitize_argument(text: &str) -> String {
    text.replace('"', "\\\"")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn accepts_plain_text() {
        let body = json!({"text": "I am so happy today"});
        assert_eq!(
            validate_text(Some(&body)).unwrap(),
            "I am so happy today"
        );
    }

    #[test]
    fn trims_surrounding_whitespace() {
        let body = json!({"text": "  hello \n"});
        assert_eq!(validate_text(Some(&body)).unwrap(), "hello");
    }

    #[test]
    fn escapes_embedded_quotes() {
        let body = json!({"text": r#"she said "hi""#});
        assert_eq!(
            validate_text(Some(&body)).unwrap(),
            r#"she said \"hi\""#
        );
    }

    #[test]
    fn rejects_missing_body() {
        assert!(matches!(
            validate_text(None),
            Err(PredictionError::InvalidInput)
        ));
    }

    #[test]
    fn rejects_missing_field() {
        let body = json!({"message": "hello"});
        assert!(matches!(
            validate_text(Some(&body)),
            Err(PredictionError::InvalidInput)
        ));
    }

    #[test]
    fn rejects_non_string_text() {
        for body in [json!({"text": 42}), json!({"text": null}), json!({"text": ["a"]})] {
            assert!(matches!(
                validate_text(Some(&body)),
                Err(PredictionError::InvalidInput)
            ));
        }
    }

    #[test]
    fn rejects_whitespace_only_text() {
        let body = json!({"text": "   \t\n  "});
        assert!(matches!(
            validate_text(Some(&body)),
            Err(PredictionError::InvalidInput)
        ));
    }
}
