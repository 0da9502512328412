// src/ai/mod.rs
//! Structured generative-AI calls. Every call yields an [`AiOutcome`]; failures are data.

use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

pub mod gemini_client;
pub mod prompts;

pub use gemini_client::{decode_response, GeminiClient};

pub const INVALID_JSON_ERROR: &str = "AI response not valid JSON";

/// One piece of a multimodal prompt
#[derive(Debug, Clone, PartialEq)]
pub enum PromptPart {
    Text(String),
    Image { mime_type: String, data: Vec<u8> },
}

impl PromptPart {
    pub fn text(text: impl Into<String>) -> Self {
        PromptPart::Text(text.into())
    }
}

/// Parsed model output, or the error envelope shown to the user in its place.
///
/// Serializes to the decoded JSON on success and to
/// `{"error": ..., "raw_response": ...}` on failure.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum AiOutcome {
    Success(Value),
    Failure {
        error: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        raw_response: Option<String>,
    },
}

impl AiOutcome {
    pub fn error(message: impl Into<String>) -> Self {
        AiOutcome::Failure {
            error: message.into(),
            raw_response: None,
        }
    }

    pub fn error_with_raw(message: impl Into<String>, raw: impl Into<String>) -> Self {
        AiOutcome::Failure {
            error: message.into(),
            raw_response: Some(raw.into()),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, AiOutcome::Success(_))
    }

    pub fn as_success(&self) -> Option<&Value> {
        match self {
            AiOutcome::Success(value) => Some(value),
            AiOutcome::Failure { .. } => None,
        }
    }

    pub fn to_json(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }

    /// An empty object or null carries no information for a prompt
    pub fn is_empty(&self) -> bool {
        match self {
            AiOutcome::Success(Value::Null) => true,
            AiOutcome::Success(Value::Object(map)) => map.is_empty(),
            _ => false,
        }
    }
}

#[rocket::async_trait]
pub trait StructuredAi: Send + Sync {
    /// Never fails: transport and decoding problems come back as `AiOutcome::Failure`
    async fn generate_json(&self, parts: Vec<PromptPart>) -> AiOutcome;
}

pub type SharedAi = Arc<dyn StructuredAi>;


#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_failure_serializes_as_envelope() {
        let outcome = AiOutcome::error_with_raw(INVALID_JSON_ERROR, "not json");
        assert_eq!(
            outcome.to_json(),
            json!({"error": "AI response not valid JSON", "raw_response": "not json"})
        );
        assert_eq!(AiOutcome::error("boom").to_json(), json!({"error": "boom"}));
    }

    #[test]
    fn test_success_serializes_transparently() {
        let outcome = AiOutcome::Success(json!({"a": 1}));
        assert_eq!(outcome.to_json(), json!({"a": 1}));
        assert!(outcome.is_success());
    }

    #[test]
    fn test_is_empty() {
        assert!(AiOutcome::Success(json!({})).is_empty());
        assert!(AiOutcome::Success(Value::Null).is_empty());
        assert!(!AiOutcome::Success(json!({"k": 1})).is_empty());
        assert!(!AiOutcome::error("x").is_empty());
    }
}
