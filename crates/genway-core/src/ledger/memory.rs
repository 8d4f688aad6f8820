//! In-process usage store.

use std::sync::RwLock;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::{UsageAction, UsageLogEntry, UsageStore};
use crate::error::StoreError;

#[derive(Debug, Default)]
pub struct MemoryUsageStore {
    entries: RwLock<Vec<UsageLogEntry>>,
}

impl MemoryUsageStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every row, in append order.
    pub fn entries(&self) -> Vec<UsageLogEntry> {
        self.entries
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl UsageStore for MemoryUsageStore {
    async fn append(&self, entry: &UsageLogEntry) -> Result<(), StoreError> {
        self.entries
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .push(entry.clone());
        Ok(())
    }

    async fn count(
        &self,
        user_id: &str,
        action: UsageAction,
        since: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> Result<u64, StoreError> {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        Ok(entries
            .iter()
            .filter(|e| {
                e.user_id == user_id
                    && e.action == action
                    && e.timestamp >= since
                    && e.timestamp <= until
            })
            .count() as u64)
    }
}
