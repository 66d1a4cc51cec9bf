//! In-memory mock implementation of NoteStore for testing without touching disk.

use super::models::StickyNote;
use super::store::NoteStore;
use crate::error::{Result, StickyNoteError};
use async_trait::async_trait;
use tokio::sync::RwLock;

/// In-memory note store with the same validation rules as the JSONL store.
pub struct MockNoteStore {
    notes: RwLock<Vec<StickyNote>>,
}

impl MockNoteStore {
    pub fn new() -> Self {
        Self {
            notes: RwLock::new(Vec::new()),
        }
    }

    /// Pre-seed the store, bypassing validation.
    pub fn with_notes(notes: Vec<StickyNote>) -> Self {
        Self {
            notes: RwLock::new(notes),
        }
    }
}

impl Default for MockNoteStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl NoteStore for MockNoteStore {
    async fn append(&self, note: &StickyNote) -> Result<()> {
        note.regex()?;
        let mut notes = self.notes.write().await;
        if notes.iter().any(|n| n.id == note.id) {
            return Err(StickyNoteError::DuplicateId(note.id.clone()));
        }
        notes.push(note.clone());
        Ok(())
    }

    async fn list_all(&self) -> Result<Vec<StickyNote>> {
        Ok(self.notes.read().await.clone())
    }
}
