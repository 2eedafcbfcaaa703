//! Structural decoding of model responses into raw decision shapes.
//!
//! No semantic validation happens here; the output is the all-optional
//! [`RawPlayerDecision`] that the validator consumes.

use super::types::RawPlayerDecision;
use crate::error::DecisionError;
use serde::Deserialize;

/// Extract a raw decision from a model response body.
///
/// Accepts a bare JSON object, a JSON object wrapped in markdown fences,
/// or a JSON object embedded in surrounding prose (the outermost balanced
/// `{...}` span is used).
pub fn parse_decision_payload(body: &str) -> Result<RawPlayerDecision, DecisionError> {
    let unfenced = strip_code_fences(body).trim();

    // Fast path: the body already is the object.
    if let Ok(raw) = serde_json::from_str::<RawPlayerDecision>(unfenced) {
        return Ok(raw);
    }

    let span = balanced_object_span(unfenced)
        .ok_or_else(|| DecisionError::Parsing("no JSON object found".to_string()))?;

    serde_json::from_str(span).map_err(|e| DecisionError::Parsing(format!("malformed JSON: {e}")))
}

/// Like [`parse_decision_payload`], but first unwraps a chat-completion
/// envelope (`choices[0].message.content`) when the body is one.
pub fn parse_decision_response(body: &str) -> Result<RawPlayerDecision, DecisionError> {
    if let Ok(envelope) = serde_json::from_str::<ChatEnvelope>(body) {
        if let Some(choice) = envelope.choices.first() {
            return parse_decision_payload(&choice.message.content);
        }
    }
    parse_decision_payload(body)
}

/// Minimal chat-completion envelope: an object with a `choices` sequence
/// whose messages carry the JSON-encoded decision as their content.
#[derive(Debug, Deserialize)]
struct ChatEnvelope {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: String,
}

/// Unwrap a ```json ... ``` or ``` ... ``` block if the text carries one.
fn strip_code_fences(text: &str) -> &str {
    let text = text.trim();

    if let Some(start) = text.find("```json") {
        let content_start = start + 7;
        if let Some(end) = text[content_start..].find("```") {
            return text[content_start..content_start + end].trim();
        }
    }

    if let Some(start) = text.find("```") {
        let content_start = start + 3;
        if let Some(end) = text[content_start..].find("```") {
            return text[content_start..content_start + end].trim();
        }
    }

    text
}

/// Locate the outermost balanced `{...}` span, tracking string literals
/// and escapes so braces inside values do not confuse the depth count.
fn balanced_object_span(text: &str) -> Option<&str> {
    let start = text.find('{')?;

    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, c) in text[start..].char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }

        match c {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + offset + c.len_utf8()]);
                }
            }
            _ => {}
        }
    }

    None
}
