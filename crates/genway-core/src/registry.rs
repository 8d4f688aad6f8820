//! Adapter registry: resolves a model id to the adapter that serves it.

use std::collections::HashMap;
use std::sync::Arc;

use reqwest::Client;

use crate::adapter::{AnthropicBackend, GeminiBackend, OpenAiBackend, TextBackend};
use crate::catalog::{self, BackendKind};
use crate::config::GenwayConfig;
use crate::error::{BackendError, GatewayError, GatewayResult};
use crate::request::{GenerationRequest, GenerationResponse};

/// All adapters known to the gateway, keyed by backend.
#[derive(Clone)]
pub struct AdapterRegistry {
    backends: HashMap<BackendKind, Arc<dyn TextBackend>>,
    default_backend: BackendKind,
}

impl std::fmt::Debug for AdapterRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdapterRegistry")
            .field("usable", &self.usable_backends())
            .field("default_backend", &self.default_backend)
            .finish()
    }
}

impl AdapterRegistry {
    /// Build one adapter per backend from configuration.
    ///
    /// Fails with [`GatewayError::Configuration`] when no backend has
    /// credentials.
    pub fn from_config(config: &GenwayConfig) -> GatewayResult<Self> {
        let http = Client::builder()
            .user_agent(concat!("genway/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| GatewayError::Configuration(format!("HTTP client: {e}")))?;

        let invalid_url = |kind: BackendKind| {
            move |e: url::ParseError| {
                GatewayError::Configuration(format!("{kind} base_url is invalid: {e}"))
            }
        };

        let backends: Vec<Arc<dyn TextBackend>> = vec![
            Arc::new(
                OpenAiBackend::new(&config.openai, http.clone())
                    .map_err(invalid_url(BackendKind::OpenAi))?,
            ),
            Arc::new(
                GeminiBackend::new(&config.gemini, http.clone())
                    .map_err(invalid_url(BackendKind::Gemini))?,
            ),
            Arc::new(
                AnthropicBackend::new(&config.anthropic, http)
                    .map_err(invalid_url(BackendKind::Anthropic))?,
            ),
        ];
        Self::new(backends, config.default_backend)
    }

    /// Build from ready adapters. At least one must be usable.
    pub fn new(
        backends: Vec<Arc<dyn TextBackend>>,
        default_backend: BackendKind,
    ) -> GatewayResult<Self> {
        let backends: HashMap<_, _> = backends.into_iter().map(|b| (b.kind(), b)).collect();
        if !backends.values().any(|b| b.is_usable()) {
            return Err(GatewayError::Configuration(
                "no text-generation backend has usable credentials".into(),
            ));
        }
        Ok(Self {
            backends,
            default_backend,
        })
    }

    /// Backend that owns a model id: catalog entry first, then id prefix,
    /// then the designated default.
    pub fn backend_for(&self, model_id: &str) -> BackendKind {
        catalog::lookup(model_id)
            .map(|m| m.backend)
            .or_else(|| catalog::backend_for_prefix(model_id))
            .unwrap_or(self.default_backend)
    }

    /// Bind a model id to its adapter. A blank id binds to the default
    /// backend's own default model.
    pub fn resolve(&self, model_id: &str) -> Result<ModelHandle, BackendError> {
        let model_id = model_id.trim();
        let kind = if model_id.is_empty() {
            self.default_backend
        } else {
            self.backend_for(model_id)
        };
        match self.backends.get(&kind) {
            Some(backend) if backend.is_usable() => {
                let model = if model_id.is_empty() {
                    backend.default_model()
                } else {
                    model_id
                };
                Ok(ModelHandle {
                    model: model.to_string(),
                    backend: Arc::clone(backend),
                })
            }
            _ => Err(BackendError::Unavailable { backend: kind }),
        }
    }

    pub fn get(&self, kind: BackendKind) -> Option<&Arc<dyn TextBackend>> {
        self.backends.get(&kind)
    }

    /// Backends with credentials, in a stable order.
    pub fn usable_backends(&self) -> Vec<BackendKind> {
        BackendKind::all()
            .iter()
            .copied()
            .filter(|k| self.backends.get(k).is_some_and(|b| b.is_usable()))
            .collect()
    }

    pub fn default_backend(&self) -> BackendKind {
        self.default_backend
    }
}

/// A model id bound to the adapter that serves it.
#[derive(Clone)]
pub struct ModelHandle {
    model: String,
    backend: Arc<dyn TextBackend>,
}

impl ModelHandle {
    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn backend(&self) -> BackendKind {
        self.backend.kind()
    }

    pub async fn generate(
        &self,
        request: &GenerationRequest,
    ) -> Result<GenerationResponse, BackendError> {
        self.backend.generate(&self.model, request).await
    }
}

impl std::fmt::Debug for ModelHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelHandle")
            .field("model", &self.model)
            .field("backend", &self.backend.kind())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BackendConfig;

    fn config_with(kinds: &[BackendKind]) -> GenwayConfig {
        let mut config = GenwayConfig::default();
        for kind in kinds {
            let backend = BackendConfig::with_api_key("test-key");
            match kind {
                BackendKind::OpenAi => config.openai = backend,
                BackendKind::Gemini => config.gemini = backend,
                BackendKind::Anthropic => config.anthropic = backend,
            }
        }
        config
    }

    #[test]
    fn test_no_credentials_is_a_configuration_error() {
        let err = AdapterRegistry::from_config(&GenwayConfig::default()).unwrap_err();
        assert!(matches!(err, GatewayError::Configuration(_)));
    }

    #[test]
    fn test_resolve_by_catalog_and_prefix() {
        let registry =
            AdapterRegistry::from_config(&config_with(&[BackendKind::OpenAi, BackendKind::Gemini]))
                .unwrap();

        let handle = registry.resolve("gemini-2.5-pro").unwrap();
        assert_eq!(handle.backend(), BackendKind::Gemini);
        assert_eq!(handle.model(), "gemini-2.5-pro");

        // Not in the catalog, but the prefix is recognized.
        assert_eq!(registry.backend_for("gpt-5-turbo"), BackendKind::OpenAi);
        assert_eq!(
            registry.usable_backends(),
            vec![BackendKind::OpenAi, BackendKind::Gemini]
        );
    }

    #[test]
    fn test_unknown_prefix_goes_to_default_backend() {
        let mut config = config_with(&[BackendKind::Anthropic]);
        config.default_backend = BackendKind::Anthropic;
        let registry = AdapterRegistry::from_config(&config).unwrap();
        let handle = registry.resolve("house-model-v2").unwrap();
        assert_eq!(handle.backend(), BackendKind::Anthropic);
    }

    #[test]
    fn test_blank_model_uses_default_backend_model() {
        let mut config = config_with(&[BackendKind::Anthropic]);
        config.default_backend = BackendKind::Anthropic;
        config.anthropic.default_model = Some("claude-3-5-haiku-latest".into());
        let registry = AdapterRegistry::from_config(&config).unwrap();

        let handle = registry.resolve("  ").unwrap();
        assert_eq!(handle.backend(), BackendKind::Anthropic);
        assert_eq!(handle.model(), "claude-3-5-haiku-latest");
    }

    #[test]
    fn test_backend_without_credentials_is_unavailable() {
        let registry = AdapterRegistry::from_config(&config_with(&[BackendKind::OpenAi])).unwrap();
        let err = registry.resolve("claude-sonnet-4-20250514").unwrap_err();
        assert!(matches!(
            err,
            BackendError::Unavailable {
                backend: BackendKind::Anthropic
            }
        ));
    }

    #[test]
    fn test_invalid_base_url() {
        let mut config = config_with(&[BackendKind::OpenAi]);
        config.gemini.base_url = Some("not a url".into());
        assert!(matches!(
            AdapterRegistry::from_config(&config),
            Err(GatewayError::Configuration(_))
        ));
    }
}
