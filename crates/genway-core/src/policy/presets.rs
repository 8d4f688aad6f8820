//! Named model pairings per tier, for override authoring.
//!
//! Presets are a convenience for whoever edits overrides. Dispatch never
//! reads them.

use serde::Serialize;

use super::overrides::{OverrideEntry, PhaseConfig};
use crate::catalog;
use crate::error::PolicyError;
use crate::tier::{Phase, PlanTier};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Preset {
    pub name: &'static str,
    pub description: &'static str,
    pub primary: &'static str,
    pub backup: &'static str,
}

const fn preset(
    name: &'static str,
    description: &'static str,
    primary: &'static str,
    backup: &'static str,
) -> Preset {
    Preset {
        name,
        description,
        primary,
        backup,
    }
}

const COST: &str = "cost-optimized";
const QUALITY: &str = "quality-optimized";

static ENTRY_PRESETS: &[Preset] = &[
    preset(COST, "Cheapest fast models", "gemini-2.0-flash", "gpt-4o-mini"),
    preset(QUALITY, "Best models allowed on this plan", "gpt-4o-mini", "gemini-2.5-flash"),
];

static STANDARD_PRESETS: &[Preset] = &[
    preset(COST, "Cheapest fast models", "gpt-4o-mini", "gemini-2.0-flash"),
    preset(QUALITY, "Balanced quality", "gpt-4.1-mini", "gemini-2.5-flash"),
];

static PRO_PRESETS: &[Preset] = &[
    preset(COST, "Balanced models at low cost", "gemini-2.5-flash", "gpt-4.1-mini"),
    preset(QUALITY, "Strong long-form writing", "claude-sonnet-4-20250514", "gpt-4.1"),
];

static TOP_PRESETS: &[Preset] = &[
    preset(COST, "Strong models at moderate cost", "gpt-4.1", "gemini-2.5-flash"),
    preset(QUALITY, "Flagship models", "claude-opus-4-20250514", "gemini-2.5-pro"),
];

/// Presets offered for a tier.
pub fn presets(tier: PlanTier) -> &'static [Preset] {
    match tier {
        PlanTier::None | PlanTier::Lite => ENTRY_PRESETS,
        PlanTier::Standard => STANDARD_PRESETS,
        PlanTier::Pro => PRO_PRESETS,
        PlanTier::Business | PlanTier::Enterprise => TOP_PRESETS,
    }
}

/// Find a preset by name for a tier.
pub fn find_preset(tier: PlanTier, name: &str) -> Result<&'static Preset, PolicyError> {
    presets(tier)
        .iter()
        .find(|p| p.name.eq_ignore_ascii_case(name))
        .ok_or_else(|| PolicyError::UnknownPreset {
            tier: tier.to_string(),
            name: name.to_string(),
        })
}

/// An override being authored, validated before it is stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverrideDraft {
    pub service: String,
    pub tier: PlanTier,
    pub phase: Phase,
    pub primary: String,
    pub backup: String,
}

impl OverrideDraft {
    pub fn new(
        service: impl Into<String>,
        tier: PlanTier,
        phase: Phase,
        primary: impl Into<String>,
        backup: impl Into<String>,
    ) -> Self {
        Self {
            service: service.into(),
            tier,
            phase,
            primary: primary.into(),
            backup: backup.into(),
        }
    }

    /// Start from a named preset of the tier.
    pub fn from_preset(
        service: impl Into<String>,
        tier: PlanTier,
        phase: Phase,
        preset_name: &str,
    ) -> Result<Self, PolicyError> {
        let preset = find_preset(tier, preset_name)?;
        Ok(Self::new(service, tier, phase, preset.primary, preset.backup))
    }

    /// Check both ids against the catalog and against each other.
    pub fn validate(self) -> Result<OverrideEntry, PolicyError> {
        let primary = self.primary.trim().to_string();
        let backup = self.backup.trim().to_string();
        for id in [&primary, &backup] {
            if !catalog::is_known(id) {
                return Err(PolicyError::UnknownModel(id.clone()));
            }
        }
        if primary == backup {
            return Err(PolicyError::SameModel(primary));
        }
        Ok(OverrideEntry {
            service: self.service,
            tier: self.tier,
            phase: self.phase,
            models: PhaseConfig::new(primary, backup),
        })
    }
}
