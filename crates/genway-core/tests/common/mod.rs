//! Shared fixtures for gateway integration tests.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use genway_core::{
    AdapterRegistry, BackendError, BackendKind, GenerationRequest, GenerationResponse, Outcome,
    Phase, PlanTier, StoreError, TextBackend, TokenUsage, UsageAction, UsageLogEntry, UsageStore,
};

/// What a scripted backend does when called.
#[derive(Debug, Clone, Copy)]
pub enum Behavior {
    Reply(&'static str),
    Status(u16),
    Empty,
    /// Sleep far longer than any test timeout.
    Hang,
}

/// A backend that follows a script and records every model it was asked for.
pub struct ScriptedBackend {
    kind: BackendKind,
    usable: bool,
    behavior: Mutex<Behavior>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedBackend {
    pub fn new(kind: BackendKind, behavior: Behavior) -> Arc<Self> {
        Arc::new(Self {
            kind,
            usable: true,
            behavior: Mutex::new(behavior),
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn unconfigured(kind: BackendKind) -> Arc<Self> {
        Arc::new(Self {
            kind,
            usable: false,
            behavior: Mutex::new(Behavior::Reply("unused")),
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn set_behavior(&self, behavior: Behavior) {
        *self.behavior.lock().unwrap() = behavior;
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl TextBackend for ScriptedBackend {
    fn kind(&self) -> BackendKind {
        self.kind
    }

    fn default_model(&self) -> &str {
        "scripted"
    }

    fn is_usable(&self) -> bool {
        self.usable
    }

    async fn generate(
        &self,
        model: &str,
        _request: &GenerationRequest,
    ) -> Result<GenerationResponse, BackendError> {
        self.calls.lock().unwrap().push(model.to_string());
        let behavior = *self.behavior.lock().unwrap();
        match behavior {
            Behavior::Reply(text) => Ok(GenerationResponse {
                content: text.to_string(),
                model: model.to_string(),
                backend: self.kind,
                usage: Some(TokenUsage {
                    input_tokens: 100,
                    output_tokens: 250,
                }),
                fell_back: false,
            }),
            Behavior::Status(status) => Err(BackendError::Status {
                backend: self.kind,
                status,
                body: "upstream exploded".into(),
            }),
            Behavior::Empty => Err(BackendError::EmptyResponse { backend: self.kind }),
            Behavior::Hang => {
                tokio::time::sleep(Duration::from_secs(24 * 3600)).await;
                Err(BackendError::Timeout(Duration::from_secs(24 * 3600)))
            }
        }
    }
}

/// The three scripted vendors plus a registry over them.
pub struct Backends {
    pub openai: Arc<ScriptedBackend>,
    pub gemini: Arc<ScriptedBackend>,
    pub anthropic: Arc<ScriptedBackend>,
}

impl Backends {
    pub fn all_replying() -> Self {
        Self {
            openai: ScriptedBackend::new(BackendKind::OpenAi, Behavior::Reply("from openai")),
            gemini: ScriptedBackend::new(BackendKind::Gemini, Behavior::Reply("from gemini")),
            anthropic: ScriptedBackend::new(
                BackendKind::Anthropic,
                Behavior::Reply("from anthropic"),
            ),
        }
    }

    pub fn registry(&self) -> AdapterRegistry {
        let backends: Vec<Arc<dyn TextBackend>> = vec![
            self.openai.clone(),
            self.gemini.clone(),
            self.anthropic.clone(),
        ];
        AdapterRegistry::new(backends, BackendKind::OpenAi).unwrap()
    }

    pub fn total_calls(&self) -> usize {
        self.openai.call_count() + self.gemini.call_count() + self.anthropic.call_count()
    }
}

/// A store whose every operation fails.
pub struct BrokenStore;

#[async_trait]
impl UsageStore for BrokenStore {
    async fn append(&self, _entry: &UsageLogEntry) -> Result<(), StoreError> {
        Err(StoreError::Unavailable("connection refused".into()))
    }

    async fn count(
        &self,
        _user_id: &str,
        _action: UsageAction,
        _since: DateTime<Utc>,
        _until: DateTime<Utc>,
    ) -> Result<u64, StoreError> {
        Err(StoreError::Unavailable("connection refused".into()))
    }
}

/// Mid-month, mid-morning: far from both window boundaries.
pub fn mid_april() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 4, 15, 10, 0, 0).unwrap()
}

/// Append `n` past generations for `user_id` at `at`.
pub async fn seed_usage(store: &dyn UsageStore, user_id: &str, at: DateTime<Utc>, n: usize) {
    for _ in 0..n {
        let entry = UsageLogEntry {
            id: uuid::Uuid::new_v4(),
            user_id: user_id.to_string(),
            action: UsageAction::Generation,
            service: "landing-page".into(),
            tier: PlanTier::Lite,
            phase: Phase::Writing,
            model: "gpt-4o-mini".into(),
            backend: BackendKind::OpenAi,
            outcome: Outcome::Succeeded,
            input_tokens: None,
            output_tokens: None,
            timestamp: at,
            metadata: serde_json::json!({}),
        };
        store.append(&entry).await.unwrap();
    }
}

pub fn writing_request() -> GenerationRequest {
    GenerationRequest::builder()
        .system("You write landing pages for small businesses.")
        .user("Write the hero section for a bakery that opens at 5am.")
        .temperature(0.7)
        .build()
}
