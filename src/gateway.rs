//! Model gateway: the single narrow interface to the generative-AI
//! capability.
//!
//! Everything above this boundary is deterministic; the [`DealModel`] trait
//! exists so orchestrators can be tested with recorded or mocked responses.
//! The production implementation, [`GeminiGateway`], calls the Gemini
//! `generateContent` REST endpoint with a structured-output schema and
//! returns the response text plus the grounding candidate URLs the
//! underlying web search actually visited.
//!
//! # Failure taxonomy
//!
//! Exactly one condition is distinguished: **rate limiting**. HTTP 429, or
//! an error body naming quota exhaustion, maps to
//! [`GatewayError::RateLimited`] and escalates through every layer so the
//! caller can show a "wait and retry" state. Every other failure is typed
//! here but normalized to an empty result set by the orchestrator. The
//! gateway does not retry; retrying is a caller decision.

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde_json::{json, Value};
use std::time::Duration;
use thiserror::Error;

use crate::config::GatewayConfig;
use crate::query::{QueryPlan, ToolCapability};

/// A URL the grounding search surfaced as evidence for the model's answer.
/// No inherent relevance guarantee; the resolver filters these.
#[derive(Debug, Clone, PartialEq)]
pub struct GroundingCandidate {
    pub uri: String,
    pub title: Option<String>,
}

/// Parsed gateway response: the model's JSON text plus grounding candidates.
#[derive(Debug, Clone, Default)]
pub struct ModelResponse {
    pub text: String,
    pub candidates: Vec<GroundingCandidate>,
}

#[derive(Debug, Error)]
pub enum GatewayError {
    /// Quota exhaustion or throttling. The only failure that escalates.
    #[error("model provider rate limit exceeded")]
    RateLimited,
    #[error("API key environment variable {0} is not set")]
    MissingApiKey(String),
    #[error("model request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("model API error {status}: {body}")]
    Api { status: u16, body: String },
}

/// Opaque generative capability: given a plan, return JSON text plus
/// candidate source URLs.
#[async_trait]
pub trait DealModel: Send + Sync {
    async fn generate(&self, plan: &QueryPlan) -> Result<ModelResponse, GatewayError>;
}

/// Production gateway over the Gemini REST API.
pub struct GeminiGateway {
    client: reqwest::Client,
    base_url: String,
    model: String,
    api_key: String,
}

impl GeminiGateway {
    /// Build a gateway from config. The API key is read from the
    /// environment variable named in `gateway.api_key_env`.
    pub fn new(config: &GatewayConfig) -> Result<Self, GatewayError> {
        let api_key = std::env::var(&config.api_key_env)
            .map_err(|_| GatewayError::MissingApiKey(config.api_key_env.clone()))?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            api_key,
        })
    }
}

#[async_trait]
impl DealModel for GeminiGateway {
    async fn generate(&self, plan: &QueryPlan) -> Result<ModelResponse, GatewayError> {
        let url = format!(
            "{}/models/{}:generateContent",
            self.base_url, self.model
        );
        let body = build_request_body(plan);

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if status.as_u16() == 429 {
            return Err(GatewayError::RateLimited);
        }

        let body_text = response.text().await?;
        if !status.is_success() {
            if is_quota_error(&body_text) {
                return Err(GatewayError::RateLimited);
            }
            return Err(GatewayError::Api {
                status: status.as_u16(),
                body: body_text,
            });
        }

        let raw: Value = serde_json::from_str(&body_text).map_err(|_| GatewayError::Api {
            status: status.as_u16(),
            body: "response body is not JSON".to_string(),
        })?;

        Ok(ModelResponse {
            text: response_text(&raw),
            candidates: grounding_candidates(&raw),
        })
    }
}

/// Assemble the provider request: prompt (and optional inline image),
/// enabled tools, and the structured-output contract.
fn build_request_body(plan: &QueryPlan) -> Value {
    let mut parts = Vec::new();
    if let Some(image) = &plan.image {
        parts.push(json!({
            "inlineData": {
                "mimeType": image.mime_type,
                "data": BASE64.encode(&image.data),
            }
        }));
    }
    parts.push(json!({ "text": plan.prompt }));

    let tools: Vec<Value> = plan
        .tools
        .iter()
        .map(|tool| match tool {
            ToolCapability::WebSearch => json!({ "googleSearch": {} }),
            ToolCapability::UrlContext => json!({ "urlContext": {} }),
        })
        .collect();

    json!({
        "contents": [{ "parts": parts }],
        "tools": tools,
        "generationConfig": {
            "responseMimeType": "application/json",
            "responseSchema": plan.response_schema,
        }
    })
}

/// Recognize quota exhaustion in a non-429 error body.
fn is_quota_error(body: &str) -> bool {
    body.contains("RESOURCE_EXHAUSTED") || body.contains("quota") || body.contains("429")
}

/// Concatenate the text parts of the first candidate. Missing pieces yield
/// an empty string, which downstream parsing degrades to "no results".
fn response_text(raw: &Value) -> String {
    let parts = raw
        .pointer("/candidates/0/content/parts")
        .and_then(|p| p.as_array());

    match parts {
        Some(parts) => parts
            .iter()
            .filter_map(|part| part.get("text").and_then(|t| t.as_str()))
            .collect(),
        None => String::new(),
    }
}

/// Pull grounding chunk URIs out of the first candidate's metadata.
fn grounding_candidates(raw: &Value) -> Vec<GroundingCandidate> {
    let chunks = raw
        .pointer("/candidates/0/groundingMetadata/groundingChunks")
        .and_then(|c| c.as_array());

    let Some(chunks) = chunks else {
        return Vec::new();
    };

    chunks
        .iter()
        .filter_map(|chunk| {
            let web = chunk.get("web")?;
            let uri = web.get("uri")?.as_str()?;
            Some(GroundingCandidate {
                uri: uri.to_string(),
                title: web
                    .get("title")
                    .and_then(|t| t.as_str())
                    .map(|t| t.to_string()),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::text_search_plan;

    fn sample_response() -> Value {
        json!({
            "candidates": [{
                "content": {
                    "parts": [
                        { "text": "[{\"id\":" },
                        { "text": "\"1\"}]" }
                    ]
                },
                "groundingMetadata": {
                    "groundingChunks": [
                        { "web": { "uri": "https://www.amazon.in/dp/B0BRCP72X8", "title": "Sony PS5" } },
                        { "web": { "uri": "https://www.flipkart.com/search?q=ps5" } },
                        { "retrievedContext": { "uri": "ignored" } }
                    ]
                }
            }]
        })
    }

    #[test]
    fn test_response_text_concatenates_parts() {
        assert_eq!(response_text(&sample_response()), "[{\"id\":\"1\"}]");
    }

    #[test]
    fn test_response_text_missing_candidates() {
        assert_eq!(response_text(&json!({})), "");
        assert_eq!(response_text(&json!({"candidates": []})), "");
    }

    #[test]
    fn test_grounding_candidates_extracted_in_order() {
        let candidates = grounding_candidates(&sample_response());
        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[0].uri, "https://www.amazon.in/dp/B0BRCP72X8");
        assert_eq!(candidates[0].title.as_deref(), Some("Sony PS5"));
        assert_eq!(candidates[1].title, None);
    }

    #[test]
    fn test_grounding_candidates_absent_metadata() {
        assert!(grounding_candidates(&json!({})).is_empty());
        assert!(grounding_candidates(&json!({"candidates": [{"content": {}}]})).is_empty());
    }

    #[test]
    fn test_is_quota_error() {
        assert!(is_quota_error(
            r#"{"error": {"status": "RESOURCE_EXHAUSTED"}}"#
        ));
        assert!(is_quota_error("You exceeded your current quota"));
        assert!(!is_quota_error(r#"{"error": {"status": "INTERNAL"}}"#));
    }

    #[test]
    fn test_request_body_shape() {
        let plan = text_search_plan("iphone 15", "INR");
        let body = build_request_body(&plan);

        assert_eq!(
            body["contents"][0]["parts"][0]["text"],
            Value::String(plan.prompt.clone())
        );
        assert_eq!(body["tools"][0], json!({ "googleSearch": {} }));
        assert_eq!(
            body["generationConfig"]["responseMimeType"],
            "application/json"
        );
    }

    #[test]
    fn test_request_body_url_query_enables_url_context() {
        let plan = text_search_plan("https://www.amazon.in/dp/B0CHX1W1XY", "INR");
        let body = build_request_body(&plan);
        let tools = body["tools"].as_array().unwrap();
        assert_eq!(tools.len(), 2);
        assert_eq!(tools[1], json!({ "urlContext": {} }));
    }

    #[test]
    fn test_request_body_inline_image_first() {
        let plan = crate::query::vision_search_plan(&[1, 2, 3], "image/png", "INR");
        let body = build_request_body(&plan);
        let parts = body["contents"][0]["parts"].as_array().unwrap();
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[0]["inlineData"]["mimeType"], "image/png");
        assert_eq!(parts[0]["inlineData"]["data"], BASE64.encode([1, 2, 3]));
        assert!(parts[1]["text"].is_string());
    }
}
