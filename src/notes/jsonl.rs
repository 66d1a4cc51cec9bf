//! JSONL-backed note store
//!
//! Each note is one self-contained JSON object per line, so the log can be
//! tailed or replayed by external tools. Records are only ever appended.

use super::models::StickyNote;
use super::store::NoteStore;
use crate::error::{Result, StickyNoteError};
use crate::lines::log_lines;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

/// Sticky note store persisted as an append-only JSONL file
pub struct JsonlNoteStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonlNoteStore {
    /// Open (creating if needed) the store at `path`.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        ensure_log_file(&path).await?;
        Ok(Self {
            path,
            write_lock: Mutex::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl NoteStore for JsonlNoteStore {
    async fn append(&self, note: &StickyNote) -> Result<()> {
        note.regex()?;
        let line = serde_json::to_string(note)?;

        let _guard = self.write_lock.lock().await;
        // Re-read under the lock: another process may have appended since we last looked.
        let existing: Vec<StickyNote> = read_records(&self.path).await?;
        if existing.iter().any(|n| n.id == note.id) {
            return Err(StickyNoteError::DuplicateId(note.id.clone()));
        }

        append_line(&self.path, &line).await?;
        tracing::debug!(note_id = %note.id, path = %self.path.display(), "Appended sticky note");
        Ok(())
    }

    async fn list_all(&self) -> Result<Vec<StickyNote>> {
        read_records(&self.path).await
    }
}

// ============================================================================
// Shared JSONL helpers (also used by the seen-state log)
// ============================================================================

/// Create the parent directory and an empty log file if missing.
pub(crate) async fn ensure_log_file(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| StickyNoteError::access(parent, e))?;
    }
    tokio::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .await
        .map_err(|e| StickyNoteError::access(path, e))?;
    Ok(())
}

/// Read every well-formed record; blank, undecodable and malformed lines are skipped.
pub(crate) async fn read_records<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    let raw = match tokio::fs::read(path).await {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(StickyNoteError::access(path, e)),
    };

    let mut records = Vec::new();
    for (lineno, line) in log_lines(&raw) {
        let parsed = line
            .map_err(|e| e.to_string())
            .and_then(|l| serde_json::from_str::<T>(l).map_err(|e| e.to_string()));
        match parsed {
            Ok(record) => records.push(record),
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    line = lineno,
                    error = %e,
                    "Skipping malformed record"
                );
            }
        }
    }
    Ok(records)
}

/// Append one record as a single write so readers never see half a line.
pub(crate) async fn append_line(path: &Path, line: &str) -> Result<()> {
    let mut file = tokio::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .await
        .map_err(|e| StickyNoteError::access(path, e))?;

    let mut buf = String::with_capacity(line.len() + 1);
    buf.push_str(line);
    buf.push('\n');

    file.write_all(buf.as_bytes())
        .await
        .map_err(|e| StickyNoteError::access(path, e))?;
    file.flush()
        .await
        .map_err(|e| StickyNoteError::access(path, e))?;
    Ok(())
}
