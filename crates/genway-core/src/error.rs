//! Error types for the generation gateway.

use std::time::Duration;

use thiserror::Error;

use crate::catalog::BackendKind;

/// A single adapter call failed.
///
/// Never surfaced to callers directly: the orchestrator recovers from it by
/// switching to the backup model, and only reports it inside
/// [`GatewayError::GenerationFailed`].
#[derive(Debug, Error)]
pub enum BackendError {
    /// The backend owning the model has no usable credentials.
    #[error("{backend} backend is not configured")]
    Unavailable { backend: BackendKind },

    /// HTTP transport error.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The vendor rejected the request.
    #[error("{backend} returned HTTP {status}: {body}")]
    Status {
        backend: BackendKind,
        status: u16,
        body: String,
    },

    /// The vendor answered with a body we could not interpret.
    #[error("malformed response from {backend}: {reason}")]
    Malformed { backend: BackendKind, reason: String },

    /// The vendor answered successfully but produced no text.
    #[error("{backend} returned an empty generation")]
    EmptyResponse { backend: BackendKind },

    /// The attempt did not finish within its time budget.
    #[error("attempt timed out after {0:?}")]
    Timeout(Duration),

    /// The overall deadline was already spent before the attempt could start.
    #[error("no time left for attempt")]
    DeadlineExceeded,

    /// The configured endpoint is not a valid URL.
    #[error("invalid endpoint: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

impl BackendError {
    /// Whether the attempt got as far as sending a request to the vendor.
    ///
    /// Attempts that stop at credential, deadline or endpoint checks never
    /// leave the process.
    pub fn reached_backend(&self) -> bool {
        !matches!(
            self,
            BackendError::Unavailable { .. }
                | BackendError::DeadlineExceeded
                | BackendError::InvalidUrl(_)
        )
    }
}

/// Errors from the usage store or the override source.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The store could not be reached.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("invalid override file: {0}")]
    TomlRead(#[from] toml::de::Error),

    #[error("could not encode overrides: {0}")]
    TomlWrite(#[from] toml::ser::Error),
}

/// Errors from the override-authoring flow.
///
/// Dispatch never sees these: an invalid stored override silently reverts
/// to the default instead.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PolicyError {
    #[error("model {0:?} is not in the catalog")]
    UnknownModel(String),

    #[error("primary and backup are both {0:?}")]
    SameModel(String),

    #[error("tier {tier} has no preset named {name:?}")]
    UnknownPreset { tier: String, name: String },
}

/// Which quota window denied a call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuotaScope {
    Daily,
    Monthly,
}

impl std::fmt::Display for QuotaScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            QuotaScope::Daily => write!(f, "daily"),
            QuotaScope::Monthly => write!(f, "monthly"),
        }
    }
}

/// Errors returned to callers of the gateway.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// No backend has usable credentials. Fatal at startup.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The user has used up the quota of their plan tier.
    #[error("{scope} quota exceeded ({used}/{limit})")]
    QuotaExceeded {
        scope: QuotaScope,
        used: u64,
        limit: u64,
    },

    /// Both the primary and the backup model failed.
    #[error("generation failed: primary {primary_model}: {primary}; backup {backup_model}: {backup}")]
    GenerationFailed {
        primary_model: String,
        primary: BackendError,
        backup_model: String,
        backup: BackendError,
    },
}

impl GatewayError {
    /// Text suitable for showing to the end user.
    ///
    /// Quota messages tell the user when to come back; backend causes are
    /// never exposed.
    pub fn user_message(&self) -> &'static str {
        match self {
            GatewayError::Configuration(_) => {
                "AI generation is not available right now. Please contact support."
            }
            GatewayError::QuotaExceeded {
                scope: QuotaScope::Daily,
                ..
            } => "You have reached your daily AI generation limit. Please try again tomorrow.",
            GatewayError::QuotaExceeded {
                scope: QuotaScope::Monthly,
                ..
            } => {
                "You have reached your monthly AI generation limit. Please try again next month or upgrade your plan."
            }
            GatewayError::GenerationFailed { .. } => "Generation failed. Please try again.",
        }
    }

    /// The quota window that denied the call, if this is a quota error.
    pub fn quota_scope(&self) -> Option<QuotaScope> {
        match self {
            GatewayError::QuotaExceeded { scope, .. } => Some(*scope),
            _ => None,
        }
    }
}

/// Gateway result type alias.
pub type GatewayResult<T> = Result<T, GatewayError>;
