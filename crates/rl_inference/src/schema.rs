//! Output contracts for the two prompts, and helpers for pulling JSON out of
//! model replies.

use rl_core::{Error, Result};
use serde_json::{json, Value};

pub fn metadata_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "headline": {
                "type": "string",
                "description": "The headline of the article."
            },
            "topic": {
                "type": "string",
                "description": "The topic of the article."
            },
            "estimatedReadingTime": {
                "type": "integer",
                "minimum": 1,
                "description": "The estimated reading time of the article in minutes."
            },
            "summary": {
                "type": "string",
                "description": "A one-line summary of the article."
            }
        },
        "required": ["headline", "topic", "estimatedReadingTime", "summary"],
        "additionalProperties": false
    })
}

pub fn topic_map_schema() -> Value {
    json!({
        "type": "object",
        "description": "A map of old topics to new, unified topics. The key is the old topic, and the value is the new unified topic. If a topic is not changed, the value should be the same as the key.",
        "additionalProperties": { "type": "string" }
    })
}

/// Parse a model reply as JSON, tolerating a surrounding Markdown code fence.
pub fn parse_json_content(content: &str) -> Result<Value> {
    let trimmed = content.trim();
    let body = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .and_then(|rest| rest.trim_end().strip_suffix("```"))
        .unwrap_or(trimmed)
        .trim();

    if body.is_empty() {
        return Err(Error::generation("model returned an empty reply"));
    }
    serde_json::from_str(body).map_err(|e| Error::generation(format!("model reply is not valid JSON: {}", e)))
}

/// Anything that went wrong while talking to the model is a generation failure.
pub(crate) fn generation_failure(err: Error) -> Error {
    match err {
        Error::Generation(_) => err,
        other => Error::generation(other.to_string()),
    }
}
