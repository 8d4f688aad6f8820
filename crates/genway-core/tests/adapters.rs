//! Vendor wire formats, checked against a mock HTTP server.

use genway_core::adapter::{AnthropicBackend, GeminiBackend, OpenAiBackend};
use genway_core::{
    BackendConfig, BackendError, BackendKind, GenerationRequest, TextBackend, TokenUsage,
};
use pretty_assertions::assert_eq;
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn config(server: &MockServer) -> BackendConfig {
    BackendConfig::with_api_key("sk-test").base_url(server.uri())
}

fn request() -> GenerationRequest {
    GenerationRequest::builder()
        .system("You write product copy.")
        .user("Describe a sourdough loaf.")
        .temperature(0.5)
        .max_output_tokens(200)
        .build()
}

#[tokio::test]
async fn test_openai_chat_completion() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("authorization", "Bearer sk-test"))
        .and(body_partial_json(json!({
            "model": "gpt-4.1-mini",
            "temperature": 0.5,
            "max_tokens": 200,
            "messages": [
                { "role": "system", "content": "You write product copy." },
                { "role": "user", "content": "Describe a sourdough loaf." },
            ],
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "chatcmpl-1",
            "model": "gpt-4.1-mini-2025-04-14",
            "choices": [{ "index": 0, "message": { "role": "assistant", "content": "Crackling crust." } }],
            "usage": { "prompt_tokens": 21, "completion_tokens": 4, "total_tokens": 25 },
        })))
        .expect(1)
        .mount(&server)
        .await;

    let backend = OpenAiBackend::new(&config(&server), reqwest::Client::new()).unwrap();
    let resp = backend.generate("gpt-4.1-mini", &request()).await.unwrap();

    assert_eq!(resp.content, "Crackling crust.");
    assert_eq!(resp.model, "gpt-4.1-mini");
    assert_eq!(resp.backend, BackendKind::OpenAi);
    assert_eq!(
        resp.usage,
        Some(TokenUsage {
            input_tokens: 21,
            output_tokens: 4
        })
    );
}

#[tokio::test]
async fn test_openai_server_error_is_status() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
        .mount(&server)
        .await;

    let backend = OpenAiBackend::new(&config(&server), reqwest::Client::new()).unwrap();
    let err = backend.generate("gpt-4o-mini", &request()).await.unwrap_err();
    match err {
        BackendError::Status { status, body, .. } => {
            assert_eq!(status, 503);
            assert_eq!(body, "overloaded");
        }
        other => panic!("expected Status, got {other:?}"),
    }
}

#[tokio::test]
async fn test_openai_blank_content_is_empty_response() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{ "message": { "role": "assistant", "content": "   " } }],
        })))
        .mount(&server)
        .await;

    let backend = OpenAiBackend::new(&config(&server), reqwest::Client::new()).unwrap();
    let err = backend.generate("gpt-4o-mini", &request()).await.unwrap_err();
    assert!(matches!(err, BackendError::EmptyResponse { .. }));
}

#[tokio::test]
async fn test_gemini_generate_content() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1beta/models/gemini-2.5-flash:generateContent"))
        .and(header("x-goog-api-key", "sk-test"))
        .and(body_partial_json(json!({
            "contents": [{
                "role": "user",
                "parts": [{ "text": "You write product copy.\n\nDescribe a sourdough loaf." }],
            }],
            "generationConfig": { "temperature": 0.5, "maxOutputTokens": 200 },
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "candidates": [{
                "content": { "role": "model", "parts": [{ "text": "Tangy " }, { "text": "and open-crumbed." }] },
                "finishReason": "STOP",
            }],
            "usageMetadata": { "promptTokenCount": 12, "candidatesTokenCount": 6, "totalTokenCount": 18 },
        })))
        .expect(1)
        .mount(&server)
        .await;

    let backend = GeminiBackend::new(&config(&server), reqwest::Client::new()).unwrap();
    let resp = backend
        .generate("gemini-2.5-flash", &request())
        .await
        .unwrap();

    assert_eq!(resp.content, "Tangy and open-crumbed.");
    assert_eq!(resp.backend, BackendKind::Gemini);
    assert_eq!(
        resp.usage,
        Some(TokenUsage {
            input_tokens: 12,
            output_tokens: 6
        })
    );
}

#[tokio::test]
async fn test_gemini_no_candidates_is_empty_response() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1beta/models/gemini-2.0-flash:generateContent"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "candidates": [] })))
        .mount(&server)
        .await;

    let backend = GeminiBackend::new(&config(&server), reqwest::Client::new()).unwrap();
    let err = backend
        .generate("gemini-2.0-flash", &request())
        .await
        .unwrap_err();
    assert!(matches!(err, BackendError::EmptyResponse { .. }));
}

#[tokio::test]
async fn test_anthropic_messages() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .and(header("x-api-key", "sk-test"))
        .and(header("anthropic-version", "2023-06-01"))
        .and(body_partial_json(json!({
            "model": "claude-sonnet-4-20250514",
            "max_tokens": 200,
            "system": "You write product copy.",
            "messages": [{ "role": "user", "content": "Describe a sourdough loaf." }],
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "msg_01",
            "type": "message",
            "role": "assistant",
            "content": [{ "type": "text", "text": "Blistered and golden." }],
            "stop_reason": "end_turn",
            "usage": { "input_tokens": 18, "output_tokens": 5 },
        })))
        .expect(1)
        .mount(&server)
        .await;

    let backend = AnthropicBackend::new(&config(&server), reqwest::Client::new()).unwrap();
    let resp = backend
        .generate("claude-sonnet-4-20250514", &request())
        .await
        .unwrap();

    assert_eq!(resp.content, "Blistered and golden.");
    assert_eq!(resp.backend, BackendKind::Anthropic);
    assert_eq!(resp.usage.map(|u| u.total()), Some(23));
}

#[tokio::test]
async fn test_anthropic_bad_json_is_malformed() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>gateway</html>"))
        .mount(&server)
        .await;

    let backend = AnthropicBackend::new(&config(&server), reqwest::Client::new()).unwrap();
    let err = backend
        .generate("claude-3-5-haiku-latest", &request())
        .await
        .unwrap_err();
    assert!(matches!(err, BackendError::Malformed { .. }));
}

#[tokio::test]
async fn test_missing_key_never_hits_the_network() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let config = BackendConfig::default().base_url(server.uri());
    let backend = AnthropicBackend::new(&config, reqwest::Client::new()).unwrap();
    assert!(!backend.is_usable());
    let err = backend
        .generate("claude-3-5-haiku-latest", &request())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        BackendError::Unavailable {
            backend: BackendKind::Anthropic
        }
    ));
}
