//! # genway-core
//!
//! A tier-aware gateway in front of several text-generation vendors.
//!
//! This crate provides the building blocks for:
//! - Calling OpenAI, Gemini and Anthropic through one request shape
//! - Picking a primary and backup model per service, plan tier and phase
//! - Enforcing daily and monthly generation quotas
//! - Falling back to the backup model when the primary fails
//! - Recording every generation in an append-only usage ledger
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use genway_core::{
//!     Gateway, GenerationContext, GenerationRequest, GenwayConfig, Phase, PlanTier,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = GenwayConfig::load()?;
//!     let gateway = Gateway::from_config(&config)?;
//!
//!     let ctx = GenerationContext::new("user-42", "landing-page", PlanTier::Pro, Phase::Writing);
//!     let request = GenerationRequest::builder()
//!         .system("You write concise marketing copy.")
//!         .user("Write a headline for a bakery that opens at 5am.")
//!         .temperature(0.7)
//!         .build();
//!
//!     let response = gateway.generate(&ctx, &request).await?;
//!     println!("{} ({})", response.content, response.model);
//!
//!     gateway.flush().await;
//!     Ok(())
//! }
//! ```

pub mod adapter;
pub mod catalog;
pub mod clock;
pub mod config;
pub mod error;
pub mod gateway;
pub mod ledger;
pub mod policy;
pub mod quota;
pub mod registry;
pub mod request;
pub mod telemetry;
pub mod tier;

// Re-exports
pub use adapter::TextBackend;
pub use catalog::{BackendKind, ModelInfo, CATALOG};
pub use clock::{Clock, FixedClock, SystemClock};
pub use config::{BackendConfig, GenwayConfig, TelemetryConfig};
pub use error::{BackendError, GatewayError, GatewayResult, PolicyError, QuotaScope, StoreError};
pub use gateway::{Gateway, GatewayBuilder, GenerateOptions, GenerationContext};
pub use ledger::{
    JsonlUsageStore, MemoryUsageStore, Outcome, UsageAction, UsageLedger, UsageLogEntry,
    UsageStore,
};
pub use policy::{ModelPolicy, ModelSelection, OverrideSource, Source};
pub use quota::{QuotaEnforcer, QuotaSnapshot, WindowUsage};
pub use registry::{AdapterRegistry, ModelHandle};
pub use request::{
    ChatMessage, GenerationRequest, GenerationResponse, OutputShape, Role, TokenUsage,
};
pub use tier::{Limit, Phase, PlanTier, TierLimits};
