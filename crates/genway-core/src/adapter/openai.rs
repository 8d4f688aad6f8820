//! OpenAI-style chat completions.
//!
//! Messages go over the wire as a flat role-tagged list. Reasoning models
//! (`o1`/`o3`/`o4` families) reject `temperature` and take
//! `max_completion_tokens` instead of `max_tokens`.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use url::Url;

use super::{non_empty, parse_base_url, send_json, TextBackend};
use crate::catalog::{is_reasoning_model, BackendKind};
use crate::config::BackendConfig;
use crate::error::BackendError;
use crate::request::{GenerationRequest, GenerationResponse, TokenUsage};

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/";
pub const DEFAULT_MODEL: &str = "gpt-4.1-mini";

/// Adapter for OpenAI-compatible `/v1/chat/completions` endpoints.
#[derive(Debug, Clone)]
pub struct OpenAiBackend {
    http: Client,
    base_url: Url,
    api_key: Option<String>,
    default_model: String,
}

impl OpenAiBackend {
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

    /// Build the vendor request body.
    pub(crate) fn request_body(model: &str, request: &GenerationRequest) -> serde_json::Value {
        let messages: Vec<serde_json::Value> = request
            .messages
            .iter()
            .map(|m| json!({ "role": m.role.to_string(), "content": m.content }))
            .collect();

        let mut body = json!({
            "model": model,
            "messages": messages,
        });

        let reasoning = is_reasoning_model(model);
        if let Some(t) = request.temperature {
            if !reasoning {
                body["temperature"] = json!(t);
            }
        }
        if let Some(max) = request.max_output_tokens {
            let key = if reasoning {
                "max_completion_tokens"
            } else {
                "max_tokens"
            };
            body[key] = json!(max);
        }
        if request.wants_json() {
            body["response_format"] = json!({ "type": "json_object" });
        }
        body
    }
}

#[derive(Debug, Deserialize)]
struct ChatCompletion {
    #[serde(default)]
    choices: Vec<Choice>,
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Usage {
    prompt_tokens: u32,
    completion_tokens: u32,
}

#[async_trait]
impl TextBackend for OpenAiBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::OpenAi
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

        let url = self.base_url.join("v1/chat/completions")?;
        let body = Self::request_body(model, request);

        tracing::debug!(backend = "openai", model, "Dispatching chat completion");
        let completion: ChatCompletion =
            send_json(self.kind(), self.http.post(url).bearer_auth(key), &body).await?;

        let text = completion
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default();

        Ok(GenerationResponse {
            content: non_empty(self.kind(), text)?,
            model: model.to_string(),
            backend: self.kind(),
            usage: completion.usage.map(|u| TokenUsage {
                input_tokens: u.prompt_tokens,
                output_tokens: u.completion_tokens,
            }),
            fell_back: false,
        })
    }
}
