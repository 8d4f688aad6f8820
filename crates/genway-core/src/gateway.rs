//! The generation gateway: quota gate, model selection, fallback and
//! usage logging around a single logical generation.
//!
//! At most two physical backend calls happen per generation, strictly in
//! sequence: the backup only runs after the primary has definitively
//! failed. The same adapter is never retried.

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use tokio::time::Instant;
use uuid::Uuid;

use crate::catalog;
use crate::clock::{Clock, SystemClock};
use crate::config::GenwayConfig;
use crate::error::{BackendError, GatewayError, GatewayResult, StoreError};
use crate::ledger::{
    JsonlUsageStore, MemoryUsageStore, Outcome, UsageAction, UsageLedger, UsageLogEntry,
    UsageStore,
};
use crate::policy::{MemoryOverrides, ModelPolicy, ModelSelection, OverrideSource, TomlOverrideFile};
use crate::quota::{QuotaEnforcer, QuotaSnapshot};
use crate::registry::AdapterRegistry;
use crate::request::{GenerationRequest, GenerationResponse};
use crate::tier::{Phase, PlanTier};

/// Default upper bound for one backend attempt.
pub const DEFAULT_ATTEMPT_TIMEOUT: Duration = Duration::from_secs(60);

/// Who is asking, and for what part of which workflow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationContext {
    pub user_id: String,
    pub service: String,
    pub tier: PlanTier,
    pub phase: Phase,
}

impl GenerationContext {
    pub fn new(
        user_id: impl Into<String>,
        service: impl Into<String>,
        tier: PlanTier,
        phase: Phase,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            service: service.into(),
            tier,
            phase,
        }
    }
}

/// Per-call options.
#[derive(Debug, Clone, Copy, Default)]
pub struct GenerateOptions {
    /// Bound on the whole generate-with-fallback sequence. A primary that
    /// times out still leaves the backup whatever time remains.
    pub timeout: Option<Duration>,
}

impl GenerateOptions {
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            timeout: Some(timeout),
        }
    }
}

/// The AI generation gateway.
pub struct Gateway {
    registry: AdapterRegistry,
    policy: ModelPolicy,
    quota: QuotaEnforcer,
    ledger: UsageLedger,
    clock: Arc<dyn Clock>,
    attempt_timeout: Duration,
    request_timeout: Option<Duration>,
}

impl std::fmt::Debug for Gateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Gateway")
            .field("registry", &self.registry)
            .field("attempt_timeout", &self.attempt_timeout)
            .field("request_timeout", &self.request_timeout)
            .finish_non_exhaustive()
    }
}

impl Gateway {
    pub fn builder(registry: AdapterRegistry) -> GatewayBuilder {
        GatewayBuilder {
            registry,
            overrides: None,
            store: None,
            clock: None,
            attempt_timeout: DEFAULT_ATTEMPT_TIMEOUT,
            request_timeout: None,
        }
    }

    /// Wire a gateway from configuration: vendor adapters, the TOML
    /// override file and the JSON-lines ledger.
    pub fn from_config(config: &GenwayConfig) -> GatewayResult<Self> {
        let registry = AdapterRegistry::from_config(config)?;
        let mut builder = Gateway::builder(registry)
            .attempt_timeout(config.attempt_timeout())
            .request_timeout(config.request_timeout());
        if let Some(path) = config.overrides_path() {
            builder = builder.overrides(Arc::new(TomlOverrideFile::new(path)));
        }
        if let Some(path) = config.ledger_path() {
            builder = builder.usage_store(Arc::new(JsonlUsageStore::new(path)));
        }
        Ok(builder.build())
    }

    /// Generate text for a caller.
    pub async fn generate(
        &self,
        ctx: &GenerationContext,
        request: &GenerationRequest,
    ) -> GatewayResult<GenerationResponse> {
        self.generate_with(ctx, request, GenerateOptions::default())
            .await
    }

    /// Generate text with per-call options.
    ///
    /// Dropping the returned future cancels in-flight backend calls and
    /// records nothing.
    #[tracing::instrument(
        name = "generate",
        skip_all,
        fields(
            user_id = %ctx.user_id,
            service = %ctx.service,
            tier = %ctx.tier,
            phase = %ctx.phase,
        )
    )]
    pub async fn generate_with(
        &self,
        ctx: &GenerationContext,
        request: &GenerationRequest,
        options: GenerateOptions,
    ) -> GatewayResult<GenerationResponse> {
        self.quota.check(&ctx.user_id, ctx.tier).await?;

        let selection = self
            .policy
            .resolve(&ctx.service, ctx.tier, ctx.phase)
            .await;
        let started = Instant::now();
        let deadline = options
            .timeout
            .or(self.request_timeout)
            .map(|t| started + t);

        let result = match self.attempt(&selection.primary, request, deadline).await {
            Ok(resp) => Ok(resp),
            Err(primary_err) => {
                tracing::warn!(
                    primary = %selection.primary,
                    backup = %selection.backup,
                    error = %primary_err,
                    "Primary model failed; falling back"
                );
                match self.attempt(&selection.backup, request, deadline).await {
                    Ok(mut resp) => {
                        resp.fell_back = true;
                        Ok(resp)
                    }
                    Err(backup_err) => {
                        tracing::error!(
                            primary = %selection.primary,
                            primary_error = %primary_err,
                            backup = %selection.backup,
                            backup_error = %backup_err,
                            "Both models failed"
                        );
                        Err((primary_err, backup_err))
                    }
                }
            }
        };

        // A failure where neither attempt left the process is not charged.
        let dispatched = match &result {
            Ok(_) => true,
            Err((primary, backup)) => primary.reached_backend() || backup.reached_backend(),
        };
        let entry = self.ledger_entry(ctx, &selection, &result, started.elapsed());
        let result = result.map_err(|(primary, backup)| GatewayError::GenerationFailed {
            primary_model: selection.primary.clone(),
            primary,
            backup_model: selection.backup.clone(),
            backup,
        });
        if dispatched {
            self.ledger.record(entry);
        } else {
            tracing::warn!(
                primary = %selection.primary,
                backup = %selection.backup,
                "No backend was reached; nothing recorded"
            );
        }
        result
    }

    /// One physical attempt, bounded by the attempt timeout and whatever
    /// remains of the overall deadline.
    async fn attempt(
        &self,
        model: &str,
        request: &GenerationRequest,
        deadline: Option<Instant>,
    ) -> Result<GenerationResponse, BackendError> {
        let handle = self.registry.resolve(model)?;
        let budget = match deadline {
            Some(deadline) => {
                let remaining = deadline.saturating_duration_since(Instant::now());
                if remaining.is_zero() {
                    return Err(BackendError::DeadlineExceeded);
                }
                remaining.min(self.attempt_timeout)
            }
            None => self.attempt_timeout,
        };

        tracing::debug!(model, backend = %handle.backend(), ?budget, "Attempting generation");
        match tokio::time::timeout(budget, handle.generate(request)).await {
            Ok(result) => result,
            Err(_) => Err(BackendError::Timeout(budget)),
        }
    }

    fn ledger_entry(
        &self,
        ctx: &GenerationContext,
        selection: &ModelSelection,
        result: &Result<GenerationResponse, (BackendError, BackendError)>,
        elapsed: Duration,
    ) -> UsageLogEntry {
        let mut metadata = json!({
            "primary_model": selection.primary,
            "backup_model": selection.backup,
            "primary_source": selection.primary_source,
            "backup_source": selection.backup_source,
            "latency_ms": elapsed.as_millis() as u64,
        });

        let (model, backend, outcome, usage) = match result {
            Ok(resp) => {
                if let Some(cost) = resp
                    .usage
                    .as_ref()
                    .zip(catalog::lookup(&resp.model))
                    .map(|(usage, info)| info.estimate_cost_usd(usage))
                {
                    metadata["estimated_cost_usd"] = json!(cost);
                }
                let outcome = if resp.fell_back {
                    Outcome::FellBack
                } else {
                    Outcome::Succeeded
                };
                (resp.model.clone(), resp.backend, outcome, resp.usage)
            }
            Err((primary, backup)) => {
                metadata["primary_error"] = json!(primary.to_string());
                metadata["backup_error"] = json!(backup.to_string());
                (
                    selection.backup.clone(),
                    self.registry.backend_for(&selection.backup),
                    Outcome::Failed,
                    None,
                )
            }
        };
        metadata["attempts"] = json!(if outcome == Outcome::Succeeded { 1 } else { 2 });

        UsageLogEntry {
            id: Uuid::new_v4(),
            user_id: ctx.user_id.clone(),
            action: UsageAction::Generation,
            service: ctx.service.clone(),
            tier: ctx.tier,
            phase: ctx.phase,
            model,
            backend,
            outcome,
            input_tokens: usage.map(|u| u.input_tokens),
            output_tokens: usage.map(|u| u.output_tokens),
            timestamp: self.clock.now(),
            metadata,
        }
    }

    /// Current quota position of a user, for display.
    pub async fn quota_status(
        &self,
        user_id: &str,
        tier: PlanTier,
    ) -> Result<QuotaSnapshot, StoreError> {
        self.quota.snapshot(user_id, tier).await
    }

    /// Which models a call would use right now.
    pub async fn preview_selection(&self, service: &str, tier: PlanTier, phase: Phase) -> ModelSelection {
        self.policy.resolve(service, tier, phase).await
    }

    /// Wait for pending ledger writes, e.g. before shutdown.
    pub async fn flush(&self) {
        self.ledger.drain().await;
    }

    pub fn registry(&self) -> &AdapterRegistry {
        &self.registry
    }

    pub fn ledger(&self) -> &UsageLedger {
        &self.ledger
    }
}

/// Builder for [`Gateway`]. Unset collaborators default to in-memory
/// implementations and the system clock.
pub struct GatewayBuilder {
    registry: AdapterRegistry,
    overrides: Option<Arc<dyn OverrideSource>>,
    store: Option<Arc<dyn UsageStore>>,
    clock: Option<Arc<dyn Clock>>,
    attempt_timeout: Duration,
    request_timeout: Option<Duration>,
}

impl GatewayBuilder {
    pub fn overrides(mut self, overrides: Arc<dyn OverrideSource>) -> Self {
        self.overrides = Some(overrides);
        self
    }

    pub fn usage_store(mut self, store: Arc<dyn UsageStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn attempt_timeout(mut self, timeout: Duration) -> Self {
        self.attempt_timeout = timeout;
        self
    }

    pub fn request_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn build(self) -> Gateway {
        let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock));
        let store = self
            .store
            .unwrap_or_else(|| Arc::new(MemoryUsageStore::new()));
        let overrides = self
            .overrides
            .unwrap_or_else(|| Arc::new(MemoryOverrides::new()));

        Gateway {
            registry: self.registry,
            policy: ModelPolicy::new(overrides),
            quota: QuotaEnforcer::new(Arc::clone(&store), Arc::clone(&clock)),
            ledger: UsageLedger::new(store),
            clock,
            attempt_timeout: self.attempt_timeout,
            request_timeout: self.request_timeout,
        }
    }
}
