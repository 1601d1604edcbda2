//! Interpretation of individual event payloads.

use serde::Deserialize;
use serde_json::Value as JsonValue;

use crate::error::AppError;

/// Raw payload shape. Our own relay sends `{"delta": ...}` or `{"error": ...}`;
/// OpenAI-compatible servers send `{"choices": [{"delta": {"content": ...}}]}`.
#[derive(Debug, Deserialize)]
struct RawPayload {
    #[serde(default)]
    error: Option<JsonValue>,
    #[serde(default)]
    delta: Option<JsonValue>,
    #[serde(default)]
    message: Option<JsonValue>,
    #[serde(default)]
    content: Option<JsonValue>,
    #[serde(default)]
    choices: Vec<RawChoice>,
}

#[derive(Debug, Deserialize)]
struct RawChoice {
    #[serde(default)]
    delta: Option<JsonValue>,
    #[serde(default)]
    message: Option<JsonValue>,
}

/// Extracts the text carried by one payload.
///
/// Returns `Ok(None)` for malformed JSON and for payloads without text; these
/// are skipped and decoding continues. An error field is fatal.
pub fn decode_payload(raw: &str) -> Result<Option<String>, AppError> {
    let payload: RawPayload = match serde_json::from_str(raw) {
        Ok(payload) => payload,
        Err(e) => {
            tracing::debug!(error = %e, "Skipping malformed payload");
            return Ok(None);
        }
    };

    if let Some(message) = payload.error.as_ref().and_then(error_message) {
        tracing::warn!(error = %message, "Model stream reported an error");
        return Err(AppError::Protocol(message));
    }

    let first_choice = payload.choices.first();
    let text = [
        payload.delta.as_ref(),
        payload.message.as_ref(),
        payload.content.as_ref(),
        first_choice.and_then(|c| c.delta.as_ref()),
        first_choice.and_then(|c| c.message.as_ref()),
    ]
    .into_iter()
    .flatten()
    .find_map(text_of);

    if text.is_none() {
        tracing::debug!("Payload carries no text");
    }
    Ok(text)
}

/// Text of a field that is either a string or an object with `content`.
fn text_of(value: &JsonValue) -> Option<String> {
    let text = match value {
        JsonValue::String(s) => s.as_str(),
        JsonValue::Object(map) => map.get("content")?.as_str()?,
        _ => return None,
    };
    (!text.is_empty()).then(|| text.to_string())
}

/// Message of an error field; `null`, `false` and empty strings are not errors.
fn error_message(value: &JsonValue) -> Option<String> {
    match value {
        JsonValue::Null | JsonValue::Bool(false) => None,
        JsonValue::String(s) if s.is_empty() => None,
        JsonValue::String(s) => Some(s.clone()),
        JsonValue::Object(map) => Some(
            map.get("message")
                .and_then(JsonValue::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| value.to_string()),
        ),
        other => Some(other.to_string()),
    }
}
