//! Append-only JSON-lines usage store.

use std::io::SeekFrom;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::io::{AsyncReadExt, AsyncSeekExt, AsyncWriteExt};
use tokio::sync::Mutex;

use super::{UsageAction, UsageLogEntry, UsageStore};
use crate::error::StoreError;

/// One JSON object per line. Lines that fail to parse are skipped when
/// counting.
#[derive(Debug)]
pub struct JsonlUsageStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonlUsageStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Every readable row, in file order.
    pub async fn entries(&self) -> Result<Vec<UsageLogEntry>, StoreError> {
        let raw = match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut entries = Vec::new();
        for (n, line) in raw.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<UsageLogEntry>(line) {
                Ok(entry) => entries.push(entry),
                Err(e) => {
                    tracing::warn!(
                        path = %self.path.display(),
                        line = n + 1,
                        error = %e,
                        "Skipping unreadable usage log line"
                    );
                }
            }
        }
        Ok(entries)
    }
}

#[async_trait]
impl UsageStore for JsonlUsageStore {
    async fn append(&self, entry: &UsageLogEntry) -> Result<(), StoreError> {
        let mut line = serde_json::to_vec(entry)?;
        line.push(b'\n');

        let _guard = self.write_lock.lock().await;
        if let Some(dir) = self.path.parent() {
            tokio::fs::create_dir_all(dir).await?;
        }
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(&self.path)
            .await?;

        // Close off a line torn by an interrupted write.
        if file.metadata().await?.len() > 0 {
            let mut last = [0u8; 1];
            file.seek(SeekFrom::End(-1)).await?;
            file.read_exact(&mut last).await?;
            if last[0] != b'\n' {
                tracing::warn!(
                    path = %self.path.display(),
                    "Usage log ends mid-line; starting a new one"
                );
                line.insert(0, b'\n');
            }
        }
        file.write_all(&line).await?;
        file.flush().await?;
        Ok(())
    }

    async fn count(
        &self,
        user_id: &str,
        action: UsageAction,
        since: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> Result<u64, StoreError> {
        Ok(self
            .entries()
            .await?
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::tests::sample_entry;
    use chrono::Duration;

    #[tokio::test]
    async fn test_append_and_count() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonlUsageStore::new(dir.path().join("logs/usage.jsonl"));
        let now = Utc::now();

        store.append(&sample_entry("carol", now)).await.unwrap();
        store.append(&sample_entry("carol", now)).await.unwrap();
        store.append(&sample_entry("dave", now)).await.unwrap();

        let count = store
            .count("carol", UsageAction::Generation, now - Duration::minutes(1), now)
            .await
            .unwrap();
        assert_eq!(count, 2);
        assert_eq!(store.entries().await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_missing_file_counts_zero_and_bad_lines_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("usage.jsonl");
        let store = JsonlUsageStore::new(&path);
        let now = Utc::now();

        assert_eq!(
            store
                .count("erin", UsageAction::Generation, now - Duration::days(1), now)
                .await
                .unwrap(),
            0
        );

        store.append(&sample_entry("erin", now)).await.unwrap();
        let mut raw = std::fs::read_to_string(&path).unwrap();
        raw.push_str("{not json\n");
        std::fs::write(&path, raw).unwrap();

        assert_eq!(store.entries().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_append_after_torn_line_starts_fresh() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("usage.jsonl");
        let store = JsonlUsageStore::new(&path);
        let now = Utc::now();

        store.append(&sample_entry("frank", now)).await.unwrap();
        let mut raw = std::fs::read_to_string(&path).unwrap();
        raw.push_str(r#"{"id":"6f1c"#);
        std::fs::write(&path, raw).unwrap();

        store.append(&sample_entry("frank", now)).await.unwrap();

        assert_eq!(store.entries().await.unwrap().len(), 2);
        assert_eq!(
            store
                .count("frank", UsageAction::Generation, now - Duration::minutes(1), now)
                .await
                .unwrap(),
            2
        );
        assert!(std::fs::read_to_string(&path).unwrap().ends_with('\n'));
    }
}
