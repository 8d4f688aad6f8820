//! Backend adapters: one per vendor calling convention.
//!
//! Every adapter implements [`TextBackend`]; all request/response shape
//! translation stays inside the adapter so nothing above this module ever
//! branches on backend identity.

pub mod anthropic;
pub mod gemini;
pub mod openai;

use async_trait::async_trait;
use reqwest::RequestBuilder;
use serde::de::DeserializeOwned;
use url::Url;

use crate::catalog::BackendKind;
use crate::error::BackendError;
use crate::request::{GenerationRequest, GenerationResponse};

pub use anthropic::AnthropicBackend;
pub use gemini::GeminiBackend;
pub use openai::OpenAiBackend;

/// Largest vendor error body kept in a [`BackendError::Status`].
const MAX_ERROR_BODY: usize = 512;

/// A text-generation backend.
#[async_trait]
pub trait TextBackend: Send + Sync {
    /// Which vendor convention this adapter speaks.
    fn kind(&self) -> BackendKind;

    /// Model used when the caller does not name one.
    fn default_model(&self) -> &str;

    /// Whether credentials are present.
    fn is_usable(&self) -> bool;

    /// Run one generation against `model`.
    ///
    /// A blank generation is an error, not a result.
    async fn generate(
        &self,
        model: &str,
        request: &GenerationRequest,
    ) -> Result<GenerationResponse, BackendError>;
}

/// Parse a base URL, making sure relative joins keep its path.
pub(crate) fn parse_base_url(raw: &str) -> Result<Url, url::ParseError> {
    if raw.ends_with('/') {
        Url::parse(raw)
    } else {
        Url::parse(&format!("{raw}/"))
    }
}

/// Send a JSON body and decode a JSON answer, mapping failures onto
/// [`BackendError`].
pub(crate) async fn send_json<T: DeserializeOwned>(
    backend: BackendKind,
    builder: RequestBuilder,
    body: &serde_json::Value,
) -> Result<T, BackendError> {
    let resp = builder.json(body).send().await?;
    let status = resp.status();
    if !status.is_success() {
        let mut text = resp.text().await.unwrap_or_default();
        if text.len() > MAX_ERROR_BODY {
            let mut cut = MAX_ERROR_BODY;
            while !text.is_char_boundary(cut) {
                cut -= 1;
            }
            text.truncate(cut);
        }
        return Err(BackendError::Status {
            backend,
            status: status.as_u16(),
            body: text,
        });
    }

    let bytes = resp.bytes().await?;
    serde_json::from_slice(&bytes).map_err(|e| BackendError::Malformed {
        backend,
        reason: e.to_string(),
    })
}

/// Reject blank generations.
pub(crate) fn non_empty(backend: BackendKind, text: String) -> Result<String, BackendError> {
    if text.trim().is_empty() {
        Err(BackendError::EmptyResponse { backend })
    } else {
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_gets_trailing_slash() {
        let url = parse_base_url("http://localhost:9000/proxy").unwrap();
        assert_eq!(
            url.join("v1/messages").unwrap().as_str(),
            "http://localhost:9000/proxy/v1/messages"
        );
    }

    #[test]
    fn test_blank_text_is_an_error() {
        assert!(matches!(
            non_empty(BackendKind::Gemini, "  \n".into()),
            Err(BackendError::EmptyResponse {
                backend: BackendKind::Gemini
            })
        ));
        assert_eq!(non_empty(BackendKind::Gemini, "ok".into()).unwrap(), "ok");
    }
}
