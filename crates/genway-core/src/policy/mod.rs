//! Model selection policy.
//!
//! Maps (service, plan tier, phase) to a primary and a backup model. Admin
//! overrides are consulted first and validated against the catalog; any
//! missing or invalid slot falls back to the built-in `tier × phase`
//! table, which is complete by construction. A bad override therefore only
//! ever degrades to the shipped default, never to an error.

pub mod overrides;
pub mod presets;

use std::sync::Arc;

use serde::Serialize;

use crate::catalog;
use crate::tier::{Phase, PlanTier};

pub use overrides::{MemoryOverrides, OverrideEntry, OverrideSource, PhaseConfig, TomlOverrideFile};
pub use presets::{find_preset, presets, OverrideDraft, Preset};

/// A primary/backup pair of catalog model ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ModelPair {
    pub primary: &'static str,
    pub backup: &'static str,
}

/// Built-in default pair for a tier and phase.
///
/// Backups live on a different backend than their primary so that a
/// vendor outage is survivable.
pub fn default_pair(tier: PlanTier, phase: Phase) -> ModelPair {
    use Phase as P;
    use PlanTier as T;
    let (primary, backup) = match (tier, phase) {
        (T::None | T::Lite, P::Outline | P::Writing) => ("gpt-4o-mini", "gemini-2.0-flash"),
        (T::None | T::Lite, P::Review) => ("gemini-2.0-flash", "gpt-4o-mini"),
        (T::Standard, P::Outline | P::Writing) => ("gpt-4.1-mini", "gemini-2.5-flash"),
        (T::Standard, P::Review) => ("gemini-2.5-flash", "gpt-4o-mini"),
        (T::Pro, P::Outline) => ("gemini-2.5-flash", "gpt-4.1-mini"),
        (T::Pro, P::Writing) => ("claude-sonnet-4-20250514", "gpt-4.1"),
        (T::Pro, P::Review) => ("gpt-4.1-mini", "claude-3-5-haiku-latest"),
        (T::Business | T::Enterprise, P::Outline) => ("gpt-4.1", "gemini-2.5-pro"),
        (T::Business | T::Enterprise, P::Writing) => ("claude-sonnet-4-20250514", "gemini-2.5-pro"),
        (T::Business | T::Enterprise, P::Review) => ("gpt-4.1", "claude-sonnet-4-20250514"),
    };
    ModelPair { primary, backup }
}

/// Where a selected model id came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    Override,
    Default,
}

/// The outcome of policy resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModelSelection {
    pub primary: String,
    pub backup: String,
    pub primary_source: Source,
    pub backup_source: Source,
}

/// Resolves model pairs, reading overrides fresh on every call.
#[derive(Clone)]
pub struct ModelPolicy {
    overrides: Arc<dyn OverrideSource>,
}

impl std::fmt::Debug for ModelPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelPolicy").finish_non_exhaustive()
    }
}

impl ModelPolicy {
    pub fn new(overrides: Arc<dyn OverrideSource>) -> Self {
        Self { overrides }
    }

    /// A policy with no overrides at all.
    pub fn defaults_only() -> Self {
        Self::new(Arc::new(MemoryOverrides::new()))
    }

    /// Resolve the primary and backup model for a call.
    ///
    /// Never fails: an unreadable override source is treated as empty.
    pub async fn resolve(&self, service: &str, tier: PlanTier, phase: Phase) -> ModelSelection {
        let configured = match self.overrides.phase_config(service, tier, phase).await {
            Ok(config) => config.unwrap_or_default(),
            Err(e) => {
                tracing::warn!(
                    service,
                    %tier,
                    %phase,
                    error = %e,
                    "Override source unreadable; using default models"
                );
                PhaseConfig::default()
            }
        };

        let defaults = default_pair(tier, phase);
        let (primary, primary_source) =
            pick(configured.primary.as_deref(), defaults.primary, "primary", service, tier, phase);
        let (mut backup, mut backup_source) =
            pick(configured.backup.as_deref(), defaults.backup, "backup", service, tier, phase);

        if backup == primary {
            tracing::warn!(
                service,
                %tier,
                %phase,
                model = %primary,
                "Backup model equals primary; substituting default backup"
            );
            backup_source = Source::Default;
            backup = if defaults.backup != primary {
                defaults.backup.to_string()
            } else {
                defaults.primary.to_string()
            };
        }

        ModelSelection {
            primary,
            backup,
            primary_source,
            backup_source,
        }
    }
}

/// Use the configured id if it names a catalog model, else the default.
fn pick(
    configured: Option<&str>,
    default: &'static str,
    slot: &'static str,
    service: &str,
    tier: PlanTier,
    phase: Phase,
) -> (String, Source) {
    match configured.map(str::trim).filter(|id| !id.is_empty()) {
        Some(id) if catalog::is_known(id) => (id.to_string(), Source::Override),
        Some(id) => {
            tracing::warn!(
                service,
                %tier,
                %phase,
                slot,
                model = id,
                fallback = default,
                "Configured model is not in the catalog; using default"
            );
            (default.to_string(), Source::Default)
        }
        None => (default.to_string(), Source::Default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_table_is_catalog_valid_and_cross_backend() {
        for tier in PlanTier::all() {
            for phase in Phase::all() {
                let pair = default_pair(*tier, *phase);
                let primary = catalog::lookup(pair.primary).expect(pair.primary);
                let backup = catalog::lookup(pair.backup).expect(pair.backup);
                assert_ne!(primary.backend, backup.backend, "{tier}/{phase}");
            }
        }
    }

    #[test]
    fn test_pro_writing_default() {
        let pair = default_pair(PlanTier::Pro, Phase::Writing);
        assert_eq!(pair.primary, "claude-sonnet-4-20250514");
        assert_eq!(pair.backup, "gpt-4.1");
    }

    #[tokio::test]
    async fn test_unknown_override_reverts_per_slot() {
        let overrides = Arc::new(MemoryOverrides::new());
        overrides.set(
            "landing-page",
            PlanTier::Standard,
            Phase::Outline,
            PhaseConfig::new("gpt-9-ultra", "claude-3-5-haiku-latest"),
        );
        let policy = ModelPolicy::new(overrides);

        let sel = policy
            .resolve("landing-page", PlanTier::Standard, Phase::Outline)
            .await;
        assert_eq!(sel.primary, "gpt-4.1-mini");
        assert_eq!(sel.primary_source, Source::Default);
        assert_eq!(sel.backup, "claude-3-5-haiku-latest");
        assert_eq!(sel.backup_source, Source::Override);
    }

    #[tokio::test]
    async fn test_override_for_other_service_does_not_leak() {
        let overrides = Arc::new(MemoryOverrides::new());
        overrides.set(
            "quiz",
            PlanTier::Pro,
            Phase::Writing,
            PhaseConfig::new("gpt-4.1", "gemini-2.5-pro"),
        );
        let policy = ModelPolicy::new(overrides);
        let sel = policy.resolve("booking", PlanTier::Pro, Phase::Writing).await;
        assert_eq!(sel.primary, "claude-sonnet-4-20250514");
    }

    #[tokio::test]
    async fn test_backup_equal_to_primary_is_replaced() {
        let overrides = Arc::new(MemoryOverrides::new());
        // Primary override equals the default backup.
        overrides.set(
            "quiz",
            PlanTier::Pro,
            Phase::Writing,
            PhaseConfig::new("gpt-4.1", "gpt-4.1"),
        );
        let policy = ModelPolicy::new(overrides);
        let sel = policy.resolve("quiz", PlanTier::Pro, Phase::Writing).await;
        assert_eq!(sel.primary, "gpt-4.1");
        assert_eq!(sel.backup, "claude-sonnet-4-20250514");
        assert_eq!(sel.backup_source, Source::Default);
    }

    #[tokio::test]
    async fn test_blank_override_counts_as_unset() {
        let overrides = Arc::new(MemoryOverrides::new());
        overrides.set(
            "quiz",
            PlanTier::Lite,
            Phase::Review,
            PhaseConfig::new("  ", ""),
        );
        let sel = ModelPolicy::new(overrides)
            .resolve("quiz", PlanTier::Lite, Phase::Review)
            .await;
        assert_eq!(sel.primary, "gemini-2.0-flash");
        assert_eq!(sel.backup, "gpt-4o-mini");
    }
}
