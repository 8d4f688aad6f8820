//! Plan tiers, workflow phases and quota limits.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Subscription level of a user. Assigned by billing; read-only here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlanTier {
    None,
    Lite,
    Standard,
    Pro,
    Business,
    Enterprise,
}

impl PlanTier {
    /// All tiers, lowest first.
    pub fn all() -> &'static [PlanTier] {
        &[
            PlanTier::None,
            PlanTier::Lite,
            PlanTier::Standard,
            PlanTier::Pro,
            PlanTier::Business,
            PlanTier::Enterprise,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PlanTier::None => "none",
            PlanTier::Lite => "lite",
            PlanTier::Standard => "standard",
            PlanTier::Pro => "pro",
            PlanTier::Business => "business",
            PlanTier::Enterprise => "enterprise",
        }
    }

    /// Daily and monthly call ceilings for this tier.
    pub fn limits(&self) -> TierLimits {
        use Limit::{Capped, Unlimited};
        let (daily, monthly) = match self {
            PlanTier::None => (Capped(3), Capped(10)),
            PlanTier::Lite => (Capped(20), Capped(300)),
            PlanTier::Standard => (Capped(50), Capped(1_000)),
            PlanTier::Pro => (Capped(150), Capped(3_000)),
            PlanTier::Business => (Capped(500), Unlimited),
            PlanTier::Enterprise => (Unlimited, Unlimited),
        };
        TierLimits { daily, monthly }
    }
}

impl std::fmt::Display for PlanTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PlanTier {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PlanTier::all()
            .iter()
            .copied()
            .find(|t| t.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| UnknownVariant {
                kind: "plan tier",
                value: s.to_string(),
            })
    }
}

/// A stage of the calling application's workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    /// Structure and headings.
    Outline,
    /// Long-form body copy.
    Writing,
    /// Proofreading, tone fixes, short rewrites.
    Review,
}

impl Phase {
    pub fn all() -> &'static [Phase] {
        &[Phase::Outline, Phase::Writing, Phase::Review]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Outline => "outline",
            Phase::Writing => "writing",
            Phase::Review => "review",
        }
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Phase {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Phase::all()
            .iter()
            .copied()
            .find(|p| p.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| UnknownVariant {
                kind: "phase",
                value: s.to_string(),
            })
    }
}

/// Returned when parsing a tier or phase name fails.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind}: {value:?}")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

/// A quota ceiling. `Unlimited` is its own value, not a large number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Limit {
    Capped(u64),
    Unlimited,
}

impl Limit {
    /// Whether one more call fits under this limit given `used` calls so far.
    pub fn permits(&self, used: u64) -> bool {
        match self {
            Limit::Capped(max) => used < *max,
            Limit::Unlimited => true,
        }
    }

    /// Calls left, or `None` when unlimited.
    pub fn remaining(&self, used: u64) -> Option<u64> {
        match self {
            Limit::Capped(max) => Some(max.saturating_sub(used)),
            Limit::Unlimited => None,
        }
    }
}

impl std::fmt::Display for Limit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Limit::Capped(n) => write!(f, "{n}"),
            Limit::Unlimited => write!(f, "unlimited"),
        }
    }
}

/// Daily and monthly ceilings for one tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierLimits {
    pub daily: Limit,
    pub monthly: Limit,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tier_round_trips_through_str() {
        for tier in PlanTier::all() {
            assert_eq!(tier.as_str().parse::<PlanTier>().unwrap(), *tier);
        }
        assert_eq!("PRO".parse::<PlanTier>().unwrap(), PlanTier::Pro);
        assert!("platinum".parse::<PlanTier>().is_err());
    }

    #[test]
    fn test_phase_parse_error_names_the_kind() {
        let err = "drafting".parse::<Phase>().unwrap_err();
        assert_eq!(err.to_string(), "unknown phase: \"drafting\"");
    }

    #[test]
    fn test_limits() {
        assert_eq!(PlanTier::Lite.limits().daily, Limit::Capped(20));
        assert!(Limit::Capped(20).permits(19));
        assert!(!Limit::Capped(20).permits(20));
        assert!(Limit::Unlimited.permits(u64::MAX));
        assert_eq!(Limit::Capped(5).remaining(9), Some(0));
        assert_eq!(Limit::Unlimited.remaining(9), None);
        assert_eq!(PlanTier::Enterprise.limits().daily, Limit::Unlimited);
    }
}
