// src/ai/gemini_client.rs
//! Gemini `generateContent` client with the JSON decoding fallbacks

use super::{AiOutcome, PromptPart, StructuredAi, INVALID_JSON_ERROR};
use crate::core::config_manager::AiConfig;
use anyhow::{Context, Result};
use base64::prelude::*;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, error, info, warn};

const REQUEST_TIMEOUT_SECS: u64 = 120;
const FENCE_OPEN: &str = "```json";
const FENCE_CLOSE: &str = "```";

pub struct GeminiClient {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(rename = "promptFeedback")]
    prompt_feedback: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

impl GeminiClient {
    pub fn new(config: &AiConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            temperature: config.temperature,
        })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        )
    }

    fn build_request(&self, parts: &[PromptPart]) -> Value {
        let parts: Vec<Value> = parts
            .iter()
            .map(|part| match part {
                PromptPart::Text(text) => json!({ "text": text }),
                PromptPart::Image { mime_type, data } => json!({
                    "inlineData": {
                        "mimeType": mime_type,
                        "data": BASE64_STANDARD.encode(data),
                    }
                }),
            })
            .collect();

        json!({
            "contents": [{ "role": "user", "parts": parts }],
            "generationConfig": { "temperature": self.temperature },
        })
    }

    async fn call(&self, parts: &[PromptPart]) -> Result<String> {
        let url = self.endpoint();
        info!("Calling generative model {} with {} parts", self.model, parts.len());

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&self.build_request(parts))
            .send()
            .await
            .context("Failed to send request to generative model")?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            error!("Generative model error {}: {}", status, error_text);
            anyhow::bail!("Generative model returned error {}: {}", status, error_text);
        }

        let body: GenerateContentResponse = response
            .json()
            .await
            .context("Failed to parse generative model response")?;

        extract_text(body)
    }
}

fn extract_text(body: GenerateContentResponse) -> Result<String> {
    let text: String = body
        .candidates
        .into_iter()
        .next()
        .and_then(|candidate| candidate.content)
        .map(|content| {
            content
                .parts
                .into_iter()
                .filter_map(|part| part.text)
                .collect()
        })
        .unwrap_or_default();

    if text.is_empty() {
        match body.prompt_feedback {
            Some(feedback) => anyhow::bail!("Model returned no text: {}", feedback),
            None => anyhow::bail!("Model returned no text"),
        }
    }

    Ok(text)
}

#[rocket::async_trait]
impl StructuredAi for GeminiClient {
    async fn generate_json(&self, parts: Vec<PromptPart>) -> AiOutcome {
        if self.api_key.is_empty() {
            warn!("GEMINI_API_KEY is not configured; skipping model call");
            return AiOutcome::error("GEMINI_API_KEY not configured");
        }

        match self.call(&parts).await {
            Ok(text) => decode_response(&text),
            Err(e) => {
                error!("Error calling generative model: {:#}", e);
                AiOutcome::error(format!("{:#}", e))
            }
        }
    }
}

/// Direct JSON first, then the first ```json fenced block, else the raw-text envelope
pub fn decode_response(text: &str) -> AiOutcome {
    if let Ok(value) = serde_json::from_str::<Value>(text) {
        return AiOutcome::Success(value);
    }

    if let Some(block) = fenced_json_block(text) {
        match serde_json::from_str::<Value>(block) {
            Ok(value) => {
                debug!("Decoded JSON from fenced block");
                return AiOutcome::Success(value);
            }
            Err(e) => warn!("Fenced JSON block did not parse: {}", e),
        }
    }

    AiOutcome::error_with_raw(INVALID_JSON_ERROR, text)
}

fn fenced_json_block(text: &str) -> Option<&str> {
    let start = text.find(FENCE_OPEN)? + FENCE_OPEN.len();
    let rest = &text[start..];
    let end = rest.find(FENCE_CLOSE)?;
    Some(rest[..end].trim())
}
