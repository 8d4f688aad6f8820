//! Configuration for the genway gateway and CLI.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::catalog::BackendKind;

/// Gateway configuration, typically stored at `~/.genway/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenwayConfig {
    /// OpenAI-style chat completions backend.
    #[serde(default)]
    pub openai: BackendConfig,

    /// Gemini-style generateContent backend.
    #[serde(default)]
    pub gemini: BackendConfig,

    /// Anthropic-style messages backend.
    #[serde(default)]
    pub anthropic: BackendConfig,

    /// Backend that serves model ids with an unrecognized prefix.
    #[serde(default = "default_backend")]
    pub default_backend: BackendKind,

    /// Upper bound for a single backend attempt, in seconds.
    #[serde(default = "default_attempt_timeout_secs")]
    pub attempt_timeout_secs: u64,

    /// Upper bound for the whole generate-with-fallback sequence.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_timeout_secs: Option<u64>,

    /// Append-only usage log (JSON lines).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ledger_path: Option<PathBuf>,

    /// Admin model overrides (TOML).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub overrides_path: Option<PathBuf>,

    /// Telemetry configuration.
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

impl Default for GenwayConfig {
    fn default() -> Self {
        Self {
            openai: BackendConfig::default(),
            gemini: BackendConfig::default(),
            anthropic: BackendConfig::default(),
            default_backend: default_backend(),
            attempt_timeout_secs: default_attempt_timeout_secs(),
            request_timeout_secs: None,
            ledger_path: None,
            overrides_path: None,
            telemetry: TelemetryConfig::default(),
        }
    }
}

impl GenwayConfig {
    /// Load `~/.genway/config.toml` (if present) and overlay environment
    /// variables.
    pub fn load() -> anyhow::Result<Self> {
        let mut config = match config_dir() {
            Some(dir) if dir.join("config.toml").exists() => {
                Self::from_file(&dir.join("config.toml"))?
            }
            _ => Self::default(),
        };
        config.apply_env();
        Ok(config)
    }

    /// Parse a config file without touching the environment.
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&raw)?)
    }

    /// Overlay `OPENAI_API_KEY`, `GEMINI_API_KEY`, `ANTHROPIC_API_KEY` and
    /// `GENWAY_DEFAULT_BACKEND`.
    pub fn apply_env(&mut self) {
        if let Ok(key) = std::env::var("OPENAI_API_KEY") {
            self.openai.api_key = Some(key);
        }
        if let Ok(key) = std::env::var("GEMINI_API_KEY") {
            self.gemini.api_key = Some(key);
        }
        if let Ok(key) = std::env::var("ANTHROPIC_API_KEY") {
            self.anthropic.api_key = Some(key);
        }
        if let Some(backend) = std::env::var("GENWAY_DEFAULT_BACKEND")
            .ok()
            .and_then(|v| v.parse().ok())
        {
            self.default_backend = backend;
        }
    }

    pub fn backend(&self, kind: BackendKind) -> &BackendConfig {
        match kind {
            BackendKind::OpenAi => &self.openai,
            BackendKind::Gemini => &self.gemini,
            BackendKind::Anthropic => &self.anthropic,
        }
    }

    pub fn attempt_timeout(&self) -> Duration {
        Duration::from_secs(self.attempt_timeout_secs)
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }

    pub fn ledger_path(&self) -> Option<PathBuf> {
        self.ledger_path
            .clone()
            .or_else(|| config_dir().map(|d| d.join("usage.jsonl")))
    }

    pub fn overrides_path(&self) -> Option<PathBuf> {
        self.overrides_path
            .clone()
            .or_else(|| config_dir().map(|d| d.join("overrides.toml")))
    }
}

/// Credentials and endpoint for one backend.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BackendConfig {
    /// API key; the backend is unusable without one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Endpoint override (defaults to the vendor's public API).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    /// Model used when none is requested.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_model: Option<String>,
}

impl BackendConfig {
    pub fn with_api_key(key: impl Into<String>) -> Self {
        Self {
            api_key: Some(key.into()),
            ..Self::default()
        }
    }

    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// A key that is present and not blank.
    pub fn usable_key(&self) -> Option<&str> {
        self.api_key.as_deref().filter(|k| !k.trim().is_empty())
    }
}

/// Telemetry/observability configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryConfig {
    /// Whether to export traces over OTLP.
    #[serde(default)]
    pub enabled: bool,

    /// OTLP exporter endpoint.
    #[serde(default = "default_otlp_endpoint")]
    pub otlp_endpoint: String,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            otlp_endpoint: default_otlp_endpoint(),
        }
    }
}

/// `~/.genway`
pub fn config_dir() -> Option<PathBuf> {
    dirs_next::home_dir().map(|h| h.join(".genway"))
}

fn default_backend() -> BackendKind {
    BackendKind::OpenAi
}

fn default_attempt_timeout_secs() -> u64 {
    60
}

fn default_otlp_endpoint() -> String {
    "http://localhost:4317".into()
}
