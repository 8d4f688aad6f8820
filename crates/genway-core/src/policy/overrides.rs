//! Admin-configured model overrides.
//!
//! Overrides are external, mutable state. Every lookup reads the source
//! fresh so that a correction applies to the very next call.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::StoreError;
use crate::tier::{Phase, PlanTier};

/// Models configured for one (service, tier, phase) triple.
///
/// Either slot may be unset; unset and blank slots fall back to the
/// built-in default.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backup: Option<String>,
}

impl PhaseConfig {
    pub fn new(primary: impl Into<String>, backup: impl Into<String>) -> Self {
        Self {
            primary: Some(primary.into()),
            backup: Some(backup.into()),
        }
    }
}

/// Read path for admin overrides.
#[async_trait]
pub trait OverrideSource: Send + Sync {
    async fn phase_config(
        &self,
        service: &str,
        tier: PlanTier,
        phase: Phase,
    ) -> Result<Option<PhaseConfig>, StoreError>;
}

type Key = (String, PlanTier, Phase);

/// In-process override table.
#[derive(Debug, Default)]
pub struct MemoryOverrides {
    entries: RwLock<HashMap<Key, PhaseConfig>>,
}

impl MemoryOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, service: &str, tier: PlanTier, phase: Phase, config: PhaseConfig) {
        self.entries
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert((service.to_string(), tier, phase), config);
    }

    pub fn remove(&self, service: &str, tier: PlanTier, phase: Phase) -> Option<PhaseConfig> {
        self.entries
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&(service.to_string(), tier, phase))
    }
}

#[async_trait]
impl OverrideSource for MemoryOverrides {
    async fn phase_config(
        &self,
        service: &str,
        tier: PlanTier,
        phase: Phase,
    ) -> Result<Option<PhaseConfig>, StoreError> {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        Ok(entries.get(&(service.to_string(), tier, phase)).cloned())
    }
}

/// One `[[override]]` table in the overrides file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverrideEntry {
    pub service: String,
    pub tier: PlanTier,
    pub phase: Phase,
    #[serde(flatten)]
    pub models: PhaseConfig,
}

impl OverrideEntry {
    fn matches(&self, service: &str, tier: PlanTier, phase: Phase) -> bool {
        self.service == service && self.tier == tier && self.phase == phase
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct OverrideFile {
    #[serde(default, rename = "override")]
    overrides: Vec<OverrideEntry>,
}

/// Overrides stored in a TOML file, re-read on every lookup.
///
/// ```toml
/// [[override]]
/// service = "landing-page"
/// tier = "pro"
/// phase = "writing"
/// primary = "gpt-4.1"
/// backup = "gemini-2.5-pro"
/// ```
#[derive(Debug, Clone)]
pub struct TomlOverrideFile {
    path: PathBuf,
}

impl TomlOverrideFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// All entries. A missing file is an empty list.
    pub async fn entries(&self) -> Result<Vec<OverrideEntry>, StoreError> {
        Ok(self.read().await?.overrides)
    }

    /// Insert or replace the entry for its triple.
    pub async fn upsert(&self, entry: OverrideEntry) -> Result<(), StoreError> {
        let mut file = self.read().await?;
        file.overrides
            .retain(|e| !e.matches(&entry.service, entry.tier, entry.phase));
        file.overrides.push(entry);
        self.write(&file).await
    }

    /// Remove the entry for a triple. Returns whether one existed.
    pub async fn remove(
        &self,
        service: &str,
        tier: PlanTier,
        phase: Phase,
    ) -> Result<bool, StoreError> {
        let mut file = self.read().await?;
        let before = file.overrides.len();
        file.overrides.retain(|e| !e.matches(service, tier, phase));
        let removed = file.overrides.len() != before;
        if removed {
            self.write(&file).await?;
        }
        Ok(removed)
    }

    async fn read(&self) -> Result<OverrideFile, StoreError> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => Ok(toml::from_str(&raw)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(OverrideFile::default()),
            Err(e) => Err(e.into()),
        }
    }

    async fn write(&self, file: &OverrideFile) -> Result<(), StoreError> {
        if let Some(dir) = self.path.parent() {
            tokio::fs::create_dir_all(dir).await?;
        }
        tokio::fs::write(&self.path, toml::to_string_pretty(file)?).await?;
        Ok(())
    }
}

#[async_trait]
impl OverrideSource for TomlOverrideFile {
    async fn phase_config(
        &self,
        service: &str,
        tier: PlanTier,
        phase: Phase,
    ) -> Result<Option<PhaseConfig>, StoreError> {
        Ok(self
            .read()
            .await?
            .overrides
            .into_iter()
            .find(|e| e.matches(service, tier, phase))
            .map(|e| e.models))
    }
}
