//! Static model catalog.
//!
//! The catalog is immutable and shared without locking. It is used to
//! validate configured model ids and for display; dispatch only needs the
//! owning backend, which is derived from the id prefix.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::request::TokenUsage;
use crate::tier::UnknownVariant;

/// A text-generation vendor and its calling convention.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    OpenAi,
    Gemini,
    Anthropic,
}

impl BackendKind {
    pub fn all() -> &'static [BackendKind] {
        &[BackendKind::OpenAi, BackendKind::Gemini, BackendKind::Anthropic]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BackendKind::OpenAi => "openai",
            BackendKind::Gemini => "gemini",
            BackendKind::Anthropic => "anthropic",
        }
    }
}

impl std::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BackendKind {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        BackendKind::all()
            .iter()
            .copied()
            .find(|b| b.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| UnknownVariant {
                kind: "backend",
                value: s.to_string(),
            })
    }
}

/// Lifecycle status of a catalog entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelStatus {
    Recommended,
    Available,
    Preview,
}

/// Coarse quality/speed bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PerformanceTier {
    Fast,
    Balanced,
    Advanced,
    Premium,
}

/// One catalog entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelInfo {
    pub id: &'static str,
    pub display_name: &'static str,
    pub backend: BackendKind,
    /// USD per million input tokens.
    pub input_cost_per_mtok: f64,
    /// USD per million output tokens.
    pub output_cost_per_mtok: f64,
    pub context_length: u32,
    pub performance: PerformanceTier,
    pub status: ModelStatus,
}

impl ModelInfo {
    /// Estimated cost of a call in USD.
    pub fn estimate_cost_usd(&self, usage: &TokenUsage) -> f64 {
        (usage.input_tokens as f64 * self.input_cost_per_mtok
            + usage.output_tokens as f64 * self.output_cost_per_mtok)
            / 1_000_000.0
    }
}

const fn entry(
    id: &'static str,
    display_name: &'static str,
    backend: BackendKind,
    costs: (f64, f64),
    context_length: u32,
    performance: PerformanceTier,
    status: ModelStatus,
) -> ModelInfo {
    ModelInfo {
        id,
        display_name,
        backend,
        input_cost_per_mtok: costs.0,
        output_cost_per_mtok: costs.1,
        context_length,
        performance,
        status,
    }
}

use BackendKind::{Anthropic, Gemini, OpenAi};
use ModelStatus::{Available, Preview, Recommended};
use PerformanceTier::{Advanced, Balanced, Fast, Premium};

/// Every model the gateway knows about.
pub static CATALOG: &[ModelInfo] = &[
    entry("gpt-4o-mini", "GPT-4o mini", OpenAi, (0.15, 0.60), 128_000, Fast, Available),
    entry("gpt-4o", "GPT-4o", OpenAi, (2.50, 10.00), 128_000, Balanced, Available),
    entry("gpt-4.1-mini", "GPT-4.1 mini", OpenAi, (0.40, 1.60), 1_047_576, Balanced, Recommended),
    entry("gpt-4.1", "GPT-4.1", OpenAi, (2.00, 8.00), 1_047_576, Advanced, Recommended),
    entry("o4-mini", "o4-mini", OpenAi, (1.10, 4.40), 200_000, Advanced, Available),
    entry("o3", "o3", OpenAi, (2.00, 8.00), 200_000, Premium, Preview),
    entry("gemini-2.0-flash", "Gemini 2.0 Flash", Gemini, (0.10, 0.40), 1_048_576, Fast, Available),
    entry("gemini-2.5-flash", "Gemini 2.5 Flash", Gemini, (0.30, 2.50), 1_048_576, Balanced, Recommended),
    entry("gemini-2.5-pro", "Gemini 2.5 Pro", Gemini, (1.25, 10.00), 1_048_576, Advanced, Recommended),
    entry("claude-3-5-haiku-latest", "Claude 3.5 Haiku", Anthropic, (0.80, 4.00), 200_000, Fast, Available),
    entry("claude-sonnet-4-20250514", "Claude Sonnet 4", Anthropic, (3.00, 15.00), 200_000, Advanced, Recommended),
    entry("claude-opus-4-20250514", "Claude Opus 4", Anthropic, (15.00, 75.00), 200_000, Premium, Preview),
];

/// Look up a catalog entry by exact model id.
pub fn lookup(model_id: &str) -> Option<&'static ModelInfo> {
    CATALOG.iter().find(|m| m.id == model_id)
}

/// Whether the id names a catalog model.
pub fn is_known(model_id: &str) -> bool {
    lookup(model_id).is_some()
}

/// Backend family implied by the id prefix, if recognized.
///
/// Works for ids not (yet) in the catalog so that catalog drift does not
/// break dispatch.
pub fn backend_for_prefix(model_id: &str) -> Option<BackendKind> {
    const OPENAI_PREFIXES: &[&str] = &["gpt-", "chatgpt-", "o1", "o3", "o4"];
    let id = model_id.trim().to_ascii_lowercase();
    if OPENAI_PREFIXES.iter().any(|p| id.starts_with(p)) {
        Some(BackendKind::OpenAi)
    } else if id.starts_with("gemini-") {
        Some(BackendKind::Gemini)
    } else if id.starts_with("claude-") {
        Some(BackendKind::Anthropic)
    } else {
        None
    }
}

/// OpenAI reasoning models reject `temperature` and use
/// `max_completion_tokens`.
pub fn is_reasoning_model(model_id: &str) -> bool {
    let id = model_id.trim().to_ascii_lowercase();
    ["o1", "o3", "o4"].iter().any(|p| id.starts_with(p))
}
