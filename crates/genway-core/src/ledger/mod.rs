//! Usage ledger: append-only record of every dispatched generation.
//!
//! The ledger write happens after the response is finalized and never
//! blocks or fails the caller; write errors are logged and dropped. The
//! same rows feed quota counting, so the store must be append-only and
//! honestly timestamped.

pub mod jsonl;
pub mod memory;

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::catalog::BackendKind;
use crate::error::StoreError;
use crate::tier::{Phase, PlanTier};

pub use jsonl::JsonlUsageStore;
pub use memory::MemoryUsageStore;

/// Kind of action a ledger row records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UsageAction {
    Generation,
}

/// How a logical generation ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// The primary model answered.
    Succeeded,
    /// The primary failed and the backup answered.
    FellBack,
    /// Both models failed.
    Failed,
}

/// One immutable ledger row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsageLogEntry {
    pub id: Uuid,
    pub user_id: String,
    pub action: UsageAction,
    pub service: String,
    pub tier: PlanTier,
    pub phase: Phase,
    /// Model that produced the result, or the last model tried on failure.
    pub model: String,
    pub backend: BackendKind,
    pub outcome: Outcome,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_tokens: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_tokens: Option<u32>,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub metadata: serde_json::Value,
}

/// Append and windowed-count access to the usage log.
#[async_trait]
pub trait UsageStore: Send + Sync {
    /// Append one row. Rows are never updated or deleted.
    async fn append(&self, entry: &UsageLogEntry) -> Result<(), StoreError>;

    /// Count a user's rows of `action` with `since <= timestamp <= until`.
    async fn count(
        &self,
        user_id: &str,
        action: UsageAction,
        since: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> Result<u64, StoreError>;
}

/// Best-effort, non-blocking writer in front of a [`UsageStore`].
///
/// Writes run as detached tasks: dropping the ledger leaves them running
/// to completion on the runtime.
pub struct UsageLedger {
    store: Arc<dyn UsageStore>,
    pending: Mutex<Vec<JoinHandle<()>>>,
}

impl std::fmt::Debug for UsageLedger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UsageLedger").finish_non_exhaustive()
    }
}

impl UsageLedger {
    pub fn new(store: Arc<dyn UsageStore>) -> Self {
        Self {
            store,
            pending: Mutex::new(Vec::new()),
        }
    }

    pub fn store(&self) -> &Arc<dyn UsageStore> {
        &self.store
    }

    /// Queue a row for writing and return immediately.
    ///
    /// Must be called from within a tokio runtime.
    pub fn record(&self, entry: UsageLogEntry) {
        let store = Arc::clone(&self.store);
        let handle = tokio::spawn(async move {
            if let Err(e) = store.append(&entry).await {
                tracing::warn!(
                    entry_id = %entry.id,
                    user_id = %entry.user_id,
                    model = %entry.model,
                    error = %e,
                    "Failed to write usage log entry"
                );
            }
        });
        let mut pending = self.pending.lock().unwrap_or_else(|e| e.into_inner());
        pending.retain(|h| !h.is_finished());
        pending.push(handle);
    }

    /// Wait for every queued write to finish.
    pub async fn drain(&self) {
        let pending = {
            let mut guard = self.pending.lock().unwrap_or_else(|e| e.into_inner());
            std::mem::take(&mut *guard)
        };
        for handle in pending {
            if let Err(e) = handle.await {
                tracing::warn!(error = %e, "Usage log write task failed");
            }
        }
    }
}

impl Drop for UsageLedger {
    fn drop(&mut self) {
        let pending = self.pending.get_mut().unwrap_or_else(|e| e.into_inner());
        let unfinished = pending.iter().filter(|h| !h.is_finished()).count();
        if unfinished > 0 {
            tracing::debug!(unfinished, "Ledger dropped with writes still in flight");
        }
    }
}
