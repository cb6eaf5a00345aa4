//! Blocking client for the Gemini `generateContent` REST endpoint.

use super::{MediaInput, TextGenerator};
use crate::config::Config;
use crate::error::AppError;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

pub const API_KEY_ENV_VAR: &str = "GEMINI_API_KEY";

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum Part<'a> {
    Text { text: &'a str },
    InlineData { inline_data: InlineData<'a> },
}

#[derive(Debug, Serialize)]
struct InlineData<'a> {
    mime_type: &'a str,
    data: String,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

#[derive(Debug, Clone)]
pub struct GeminiClient {
    api_base: String,
    api_key: String,
    model: String,
    vision_model: String,
    client: reqwest::blocking::Client,
}

impl GeminiClient {
    pub fn new(config: &Config, api_key: impl Into<String>) -> Result<Self, AppError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|err| AppError::unavailable(format!("http client: {err}")))?;
        Ok(Self {
            api_base: config.api_base.trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            model: config.model.clone(),
            vision_model: config.vision_model.clone(),
            client,
        })
    }

    /// `None` when `GEMINI_API_KEY` is unset or blank.
    pub fn from_env(config: &Config) -> Option<Result<Self, AppError>> {
        let key = std::env::var(API_KEY_ENV_VAR).ok()?;
        let key = key.trim();
        if key.is_empty() {
            return None;
        }
        Some(Self::new(config, key))
    }

    fn endpoint(&self, model: &str) -> String {
        format!("{}/v1beta/models/{}:generateContent", self.api_base, model)
    }

    fn send(&self, model: &str, parts: Vec<Part<'_>>) -> Result<String, AppError> {
        let body = GenerateRequest {
            contents: vec![Content { parts }],
        };
        debug!(model, "calling generateContent");

        let response = self
            .client
            .post(self.endpoint(model))
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .map_err(|err| AppError::unavailable(format!("gemini request failed: {err}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let detail = response.text().unwrap_or_default();
            return Err(AppError::unavailable(format!(
                "gemini returned {status}: {}",
                detail.chars().take(200).collect::<String>()
            )));
        }

        let parsed: GenerateResponse = response
            .json()
            .map_err(|err| AppError::unavailable(format!("gemini response unreadable: {err}")))?;
        response_text(parsed)
    }
}

fn response_text(response: GenerateResponse) -> Result<String, AppError> {
    let text: String = response
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

    if text.trim().is_empty() {
        return Err(AppError::unavailable("gemini returned no text"));
    }
    Ok(text)
}

impl TextGenerator for GeminiClient {
    fn model_name(&self) -> &str {
        &self.model
    }

    fn generate(&self, prompt: &str) -> Result<String, AppError> {
        self.send(&self.model, vec![Part::Text { text: prompt }])
    }

    fn generate_with_media(&self, prompt: &str, media: &MediaInput) -> Result<String, AppError> {
        let parts = vec![
            Part::Text { text: prompt },
            Part::InlineData {
                inline_data: InlineData {
                    mime_type: &media.mime_type,
                    data: STANDARD.encode(&media.data),
                },
            },
        ];
        self.send(&self.vision_model, parts)
    }
}

#[cfg(test)]
mod tests {
    use super::{Content, GenerateRequest, GenerateResponse, GeminiClient, InlineData, Part, response_text};
    use crate::config::Config;

    #[test]
    fn request_serializes_inline_media_as_base64() {
        let request = GenerateRequest {
            contents: vec![Content {
                parts: vec![
                    Part::Text { text: "check" },
                    Part::InlineData {
                        inline_data: InlineData {
                            mime_type: "image/png",
                            data: "AQID".to_string(),
                        },
                    },
                ],
            }],
        };

        let json = serde_json::to_value(&request).unwrap();

        assert_eq!(json["contents"][0]["parts"][0]["text"], "check");
        assert_eq!(json["contents"][0]["parts"][1]["inline_data"]["mime_type"], "image/png");
        assert_eq!(json["contents"][0]["parts"][1]["inline_data"]["data"], "AQID");
    }

    #[test]
    fn response_text_joins_first_candidate_parts() {
        let response: GenerateResponse = serde_json::from_value(serde_json::json!({
            "candidates": [
                {"content": {"parts": [{"text": "{\"valid\": "}, {"text": "true}"}]}},
                {"content": {"parts": [{"text": "ignored"}]}}
            ]
        }))
        .unwrap();

        assert_eq!(response_text(response).unwrap(), "{\"valid\": true}");
    }

    #[test]
    fn empty_response_is_unavailable() {
        let response: GenerateResponse = serde_json::from_value(serde_json::json!({})).unwrap();
        assert_eq!(response_text(response).unwrap_err().code(), "unavailable");
    }

    #[test]
    fn endpoint_uses_configured_base_and_model() {
        let config = Config {
            api_base: "http://localhost:8080/".to_string(),
            ..Config::default()
        };
        let client = GeminiClient::new(&config, "key").unwrap();

        assert_eq!(
            client.endpoint(&config.model),
            "http://localhost:8080/v1beta/models/gemini-2.5-flash-lite:generateContent"
        );
    }
}
