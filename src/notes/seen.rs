//! Seen-state tracking
//!
//! Records which notes have already been surfaced to which session, so a
//! relevance query never shows the same note twice to one session. Kept
//! separate from the note store so either side can be swapped.

use super::jsonl::{append_line, ensure_log_file};
use crate::error::{Result, StickyNoteError};
use crate::lines::log_lines;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::io::SeekFrom;
use std::path::{Path, PathBuf};
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tokio::sync::{Mutex, RwLock};

/// Relation store of `(session_id, note_id)` pairs.
#[async_trait]
pub trait SeenStore: Send + Sync {
    /// Whether `note_id` was already surfaced to `session_id`.
    async fn has_seen(&self, session_id: &str, note_id: &str) -> Result<bool>;

    /// Record that `note_id` was surfaced to `session_id`. Idempotent.
    async fn mark_seen(&self, session_id: &str, note_id: &str) -> Result<()>;

    /// The ids from `note_ids` not yet seen by `session_id`, order preserved.
    async fn unseen(&self, session_id: &str, note_ids: &[String]) -> Result<Vec<String>> {
        let mut result = Vec::with_capacity(note_ids.len());
        for id in note_ids {
            if !self.has_seen(session_id, id).await? {
                result.push(id.clone());
            }
        }
        Ok(result)
    }
}

type SeenMap = HashMap<String, HashSet<String>>;

fn contains(map: &SeenMap, session_id: &str, note_id: &str) -> bool {
    map.get(session_id).is_some_and(|ids| ids.contains(note_id))
}

// ============================================================================
// In-memory
// ============================================================================

/// Seen-state kept for the lifetime of the process
#[derive(Default)]
pub struct InMemorySeenStore {
    shown: RwLock<SeenMap>,
}

impl InMemorySeenStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Forget everything surfaced to one session.
    pub async fn reset(&self, session_id: &str) {
        self.shown.write().await.remove(session_id);
    }
}

#[async_trait]
impl SeenStore for InMemorySeenStore {
    async fn has_seen(&self, session_id: &str, note_id: &str) -> Result<bool> {
        Ok(contains(&*self.shown.read().await, session_id, note_id))
    }

    async fn mark_seen(&self, session_id: &str, note_id: &str) -> Result<()> {
        self.shown
            .write()
            .await
            .entry(session_id.to_string())
            .or_default()
            .insert(note_id.to_string());
        Ok(())
    }
}

// ============================================================================
// JSONL
// ============================================================================

/// One line of the seen-state log
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeenRecord {
    pub session_id: String,
    pub note_id: String,
    pub seen_at: DateTime<Utc>,
}

#[derive(Default)]
struct SeenLog {
    shown: SeenMap,
    /// Bytes of the log already folded into `shown`
    offset: u64,
}

/// Seen-state persisted as an append-only JSONL log.
///
/// Several server processes may share one log. Every query first folds in
/// whatever was appended since the last read, so a note shown by another
/// process is never shown again to the same session.
pub struct JsonlSeenStore {
    path: PathBuf,
    log: Mutex<SeenLog>,
}

impl JsonlSeenStore {
    /// Open (creating if needed) the log at `path` and load its records.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        ensure_log_file(&path).await?;

        let store = Self {
            path,
            log: Mutex::new(SeenLog::default()),
        };
        {
            let mut log = store.log.lock().await;
            store.catch_up(&mut log).await?;
            tracing::debug!(
                path = %store.path.display(),
                sessions = log.shown.len(),
                "Loaded seen-state log"
            );
        }
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Fold in the records appended since the last read. A trailing line
    /// without its newline is still being written and is left for later.
    async fn catch_up(&self, log: &mut SeenLog) -> Result<()> {
        let access = |e: std::io::Error| StickyNoteError::access(&self.path, e);

        let mut file = tokio::fs::File::open(&self.path).await.map_err(access)?;
        let len = file.metadata().await.map_err(access)?.len();
        if len < log.offset {
            tracing::warn!(path = %self.path.display(), "Seen-state log shrank; reloading");
            *log = SeenLog::default();
        }

        file.seek(SeekFrom::Start(log.offset)).await.map_err(access)?;
        let mut tail = Vec::new();
        file.read_to_end(&mut tail).await.map_err(access)?;

        let Some(complete) = tail.iter().rposition(|b| *b == b'\n').map(|i| i + 1) else {
            return Ok(());
        };

        for (_, line) in log_lines(&tail[..complete]) {
            let parsed = line
                .map_err(|e| e.to_string())
                .and_then(|l| serde_json::from_str::<SeenRecord>(l).map_err(|e| e.to_string()));
            match parsed {
                Ok(record) => {
                    log.shown
                        .entry(record.session_id)
                        .or_default()
                        .insert(record.note_id);
                }
                Err(e) => {
                    tracing::warn!(
                        path = %self.path.display(),
                        error = %e,
                        "Skipping malformed seen record"
                    );
                }
            }
        }
        log.offset += complete as u64;
        Ok(())
    }
}

#[async_trait]
impl SeenStore for JsonlSeenStore {
    async fn has_seen(&self, session_id: &str, note_id: &str) -> Result<bool> {
        let mut log = self.log.lock().await;
        self.catch_up(&mut log).await?;
        Ok(contains(&log.shown, session_id, note_id))
    }

    async fn mark_seen(&self, session_id: &str, note_id: &str) -> Result<()> {
        // Holding the lock across the append serializes writers in this process.
        let mut log = self.log.lock().await;
        self.catch_up(&mut log).await?;
        if contains(&log.shown, session_id, note_id) {
            return Ok(());
        }

        let record = SeenRecord {
            session_id: session_id.to_string(),
            note_id: note_id.to_string(),
            seen_at: Utc::now(),
        };
        append_line(&self.path, &serde_json::to_string(&record)?).await?;

        // Our own line is read back on the next catch-up; inserting it is idempotent.
        log.shown
            .entry(session_id.to_string())
            .or_default()
            .insert(note_id.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_in_memory_filters_seen() {
        let tracker = InMemorySeenStore::new();
        tracker.mark_seen("session-123", "note-a").await.unwrap();

        assert!(tracker.has_seen("session-123", "note-a").await.unwrap());
        assert!(!tracker.has_seen("other-session", "note-a").await.unwrap());
        let ids = vec!["note-a".to_string(), "note-b".to_string()];
        assert_eq!(
            tracker.unseen("session-123", &ids).await.unwrap(),
            vec!["note-b".to_string()]
        );
    }

    #[tokio::test]
    async fn test_in_memory_mark_is_idempotent() {
        let tracker = InMemorySeenStore::new();
        tracker.mark_seen("s", "n").await.unwrap();
        tracker.mark_seen("s", "n").await.unwrap();
        assert!(tracker.has_seen("s", "n").await.unwrap());
        assert_eq!(tracker.shown.read().await["s"].len(), 1);
    }

    #[tokio::test]
    async fn test_in_memory_reset() {
        let tracker = InMemorySeenStore::new();
        tracker.mark_seen("s", "n").await.unwrap();
        tracker.reset("s").await;
        assert!(!tracker.has_seen("s", "n").await.unwrap());
    }

    #[tokio::test]
    async fn test_jsonl_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("seen_notes.jsonl");

        let store = JsonlSeenStore::open(&path).await.unwrap();
        store.mark_seen("s1", "n1").await.unwrap();
        drop(store);

        let reopened = JsonlSeenStore::open(&path).await.unwrap();
        assert!(reopened.has_seen("s1", "n1").await.unwrap());
        assert!(!reopened.has_seen("s2", "n1").await.unwrap());
    }

    #[tokio::test]
    async fn test_jsonl_mark_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("seen_notes.jsonl");
        let store = JsonlSeenStore::open(&path).await.unwrap();

        store.mark_seen("s1", "n1").await.unwrap();
        store.mark_seen("s1", "n1").await.unwrap();

        let raw = tokio::fs::read_to_string(&path).await.unwrap();
        assert_eq!(raw.lines().count(), 1);
        let record: SeenRecord = serde_json::from_str(raw.lines().next().unwrap()).unwrap();
        assert_eq!(record.session_id, "s1");
        assert_eq!(record.note_id, "n1");
    }

    #[tokio::test]
    async fn test_jsonl_sees_records_from_other_handles() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("seen_notes.jsonl");
        let first = JsonlSeenStore::open(&path).await.unwrap();
        let second = JsonlSeenStore::open(&path).await.unwrap();

        first.mark_seen("s", "n").await.unwrap();
        assert!(second.has_seen("s", "n").await.unwrap());

        second.mark_seen("s", "n").await.unwrap();
        let raw = tokio::fs::read_to_string(&path).await.unwrap();
        assert_eq!(raw.lines().count(), 1);
    }

    #[tokio::test]
    async fn test_jsonl_waits_for_complete_line() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("seen_notes.jsonl");
        let store = JsonlSeenStore::open(&path).await.unwrap();

        let line = serde_json::to_string(&SeenRecord {
            session_id: "s".into(),
            note_id: "n".into(),
            seen_at: Utc::now(),
        })
        .unwrap();
        let (head, rest) = line.split_at(10);

        std::fs::write(&path, head).unwrap();
        assert!(!store.has_seen("s", "n").await.unwrap());

        std::fs::write(&path, format!("{}{}\n", head, rest)).unwrap();
        assert!(store.has_seen("s", "n").await.unwrap());
    }
}
