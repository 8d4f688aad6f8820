//! Anthropic-style messages API.
//!
//! System content travels in a top-level `system` field, turns must
//! strictly alternate starting with `user`, and `max_tokens` is mandatory.

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

pub const DEFAULT_BASE_URL: &str = "https://api.anthropic.com/";
pub const DEFAULT_MODEL: &str = "claude-sonnet-4-20250514";
pub const API_VERSION: &str = "2023-06-01";

/// Used when the request carries no output budget.
pub const DEFAULT_MAX_TOKENS: u32 = 4096;

const JSON_INSTRUCTION: &str =
    "Respond with a single valid JSON value and nothing else. Do not wrap it in code fences.";

/// Placeholder user turn for conversations that open with the assistant.
const OPENING_USER_TURN: &str = "Continue.";

/// Adapter for the `/v1/messages` endpoint.
#[derive(Debug, Clone)]
pub struct AnthropicBackend {
    http: Client,
    base_url: Url,
    api_key: Option<String>,
    default_model: String,
}

impl AnthropicBackend {
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

    /// Merge consecutive same-role turns so user/assistant strictly
    /// alternate, starting with a user turn.
    pub(crate) fn alternating_turns(request: &GenerationRequest) -> Vec<(Role, String)> {
        let mut turns: Vec<(Role, String)> = Vec::new();
        for msg in request.conversation() {
            match turns.last_mut() {
                Some((role, text)) if *role == msg.role => {
                    text.push_str("\n\n");
                    text.push_str(&msg.content);
                }
                _ => turns.push((msg.role, msg.content.clone())),
            }
        }
        if matches!(turns.first(), Some((Role::Assistant, _))) {
            turns.insert(0, (Role::User, OPENING_USER_TURN.to_string()));
        }
        turns
    }

    pub(crate) fn request_body(model: &str, request: &GenerationRequest) -> serde_json::Value {
        let mut system = request.system_text();
        let mut turns = Self::alternating_turns(request);

        // A system-only request still needs one user turn.
        if turns.is_empty() {
            turns.push((Role::User, system.take().unwrap_or_default()));
        }
        if request.wants_json() {
            system = Some(match system {
                Some(s) => format!("{s}\n\n{JSON_INSTRUCTION}"),
                None => JSON_INSTRUCTION.to_string(),
            });
        }

        let messages: Vec<serde_json::Value> = turns
            .into_iter()
            .map(|(role, content)| json!({ "role": role.to_string(), "content": content }))
            .collect();

        let mut body = json!({
            "model": model,
            "max_tokens": request.max_output_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
            "messages": messages,
        });
        if let Some(system) = system {
            body["system"] = json!(system);
        }
        if let Some(t) = request.temperature {
            body["temperature"] = json!(t);
        }
        body
    }
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Usage {
    input_tokens: u32,
    output_tokens: u32,
}

#[async_trait]
impl TextBackend for AnthropicBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Anthropic
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

        let url = self.base_url.join("v1/messages")?;
        let body = Self::request_body(model, request);

        tracing::debug!(backend = "anthropic", model, "Dispatching messages request");
        let resp: MessagesResponse = send_json(
            self.kind(),
            self.http
                .post(url)
                .header("x-api-key", key)
                .header("anthropic-version", API_VERSION),
            &body,
        )
        .await?;

        let text = resp
            .content
            .into_iter()
            .filter(|b| b.kind == "text")
            .filter_map(|b| b.text)
            .collect::<Vec<_>>()
            .join("");

        Ok(GenerationResponse {
            content: non_empty(self.kind(), text)?,
            model: model.to_string(),
            backend: self.kind(),
            usage: resp.usage.map(|u| TokenUsage {
                input_tokens: u.input_tokens,
                output_tokens: u.output_tokens,
            }),
            fell_back: false,
        })
    }
}
