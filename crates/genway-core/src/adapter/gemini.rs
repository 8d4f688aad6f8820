//! Gemini-style `generateContent`.
//!
//! The transport has no system/user distinction, so every message is
//! folded into a single prompt. JSON output is requested through the
//! response MIME type rather than an instruction.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use url::Url;

use super::{non_empty, parse_base_url, send_json, TextBackend};
use crate::catalog::BackendKind;
use crate::config::BackendConfig;
use crate::error::BackendError;
use crate::request::{GenerationRequest, GenerationResponse, Role, TokenUsage};

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/";
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";

/// Adapter for the Gemini `models/{model}:generateContent` endpoint.
#[derive(Debug, Clone)]
pub struct GeminiBackend {
    http: Client,
    base_url: Url,
    api_key: Option<String>,
    default_model: String,
}

impl GeminiBackend {
    pub fn new(config: &BackendConfig, http: Client) -> Result<Self, url::ParseError> {
        Ok(Self {
            http,
            base_url: parse_base_url(config.base_url.as_deref().unwrap_or(DEFAULT_BASE_URL))?,
            api_key: config.usable_key().map(str::to_string),
            default_model: config
                .default_model
                .clone()
                .unwrap_or_else(|| DEFAULT_MODEL.into()),
        })
    }

    /// Fold system content and the conversation into one prompt.
    ///
    /// Single-speaker conversations are joined verbatim; once an assistant
    /// turn is present every turn is labelled so the model can follow it.
    pub(crate) fn flatten_prompt(request: &GenerationRequest) -> String {
        let labelled = request.conversation().any(|m| m.role == Role::Assistant);
        let mut sections: Vec<String> = Vec::new();
        if let Some(system) = request.system_text() {
            sections.push(system);
        }
        for msg in request.conversation() {
            if labelled {
                let label = if msg.role == Role::Assistant {
                    "Assistant"
                } else {
                    "User"
                };
                sections.push(format!("{label}: {}", msg.content));
            } else {
                sections.push(msg.content.clone());
            }
        }
        sections.join("\n\n")
    }

    pub(crate) fn request_body(request: &GenerationRequest) -> serde_json::Value {
        let mut generation_config = serde_json::Map::new();
        if let Some(t) = request.temperature {
            generation_config.insert("temperature".into(), json!(t));
        }
        if let Some(max) = request.max_output_tokens {
            generation_config.insert("maxOutputTokens".into(), json!(max));
        }
        if request.wants_json() {
            generation_config.insert("responseMimeType".into(), json!("application/json"));
        }

        let mut body = json!({
            "contents": [{
                "role": "user",
                "parts": [{ "text": Self::flatten_prompt(request) }],
            }],
        });
        if !generation_config.is_empty() {
            body["generationConfig"] = serde_json::Value::Object(generation_config);
        }
        body
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
    usage_metadata: Option<UsageMetadata>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    #[serde(default)]
    prompt_token_count: u32,
    #[serde(default)]
    candidates_token_count: u32,
}

#[async_trait]
impl TextBackend for GeminiBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Gemini
    }

    fn default_model(&self) -> &str {
        &self.default_model
    }

    fn is_usable(&self) -> bool {
        self.api_key.is_some()
    }

    async fn generate(
        &self,
        model: &str,
        request: &GenerationRequest,
    ) -> Result<GenerationResponse, BackendError> {
        let Some(key) = self.api_key.as_deref() else {
            return Err(BackendError::Unavailable {
                backend: self.kind(),
            });
        };

        let url = self
            .base_url
            .join(&format!("v1beta/models/{model}:generateContent"))?;
        let body = Self::request_body(request);

        tracing::debug!(backend = "gemini", model, "Dispatching generateContent");
        let resp: GenerateContentResponse = send_json(
            self.kind(),
            self.http.post(url).header("x-goog-api-key", key),
            &body,
        )
        .await?;

        if let Some(reason) = resp.prompt_feedback.and_then(|f| f.block_reason) {
            return Err(BackendError::Malformed {
                backend: self.kind(),
                reason: format!("prompt blocked: {reason}"),
            });
        }

        let text = resp
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|c| {
                c.parts
                    .into_iter()
                    .filter_map(|p| p.text)
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default();

        Ok(GenerationResponse {
            content: non_empty(self.kind(), text)?,
            model: model.to_string(),
            backend: self.kind(),
            usage: resp.usage_metadata.map(|u| TokenUsage {
                input_tokens: u.prompt_token_count,
                output_tokens: u.candidates_token_count,
            }),
            fell_back: false,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_and_user_are_concatenated() {
        let req = GenerationRequest::builder()
            .system("You are a quiz writer.")
            .user("Write one question about volcanoes.")
            .build();
        assert_eq!(
            GeminiBackend::flatten_prompt(&req),
            "You are a quiz writer.\n\nWrite one question about volcanoes."
        );
    }

    #[test]
    fn test_multi_turn_prompt_is_labelled() {
        let req = GenerationRequest::builder()
            .user("Outline a page.")
            .assistant("1. Hero")
            .user("Add testimonials.")
            .build();
        assert_eq!(
            GeminiBackend::flatten_prompt(&req),
            "User: Outline a page.\n\nAssistant: 1. Hero\n\nUser: Add testimonials."
        );
    }

    #[test]
    fn test_json_is_a_mime_type() {
        let req = GenerationRequest::builder()
            .user("Give me JSON")
            .max_output_tokens(64)
            .json()
            .build();
        let body = GeminiBackend::request_body(&req);
        assert_eq!(body["contents"].as_array().unwrap().len(), 1);
        assert_eq!(body["generationConfig"]["responseMimeType"], "application/json");
        assert_eq!(body["generationConfig"]["maxOutputTokens"], 64);
        assert!(body["generationConfig"].get("temperature").is_none());
    }

    #[test]
    fn test_no_generation_config_when_unset() {
        let req = GenerationRequest::builder().user("hi").build();
        assert!(GeminiBackend::request_body(&req).get("generationConfig").is_none());
    }
}
