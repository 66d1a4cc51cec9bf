//! NoteStore trait definition
//!
//! Append-only persistence for sticky notes. Follows the same pattern as
//! `SessionHistoryProvider`: async trait + Send + Sync for
//! `Arc<dyn NoteStore>` usage.

use super::models::StickyNote;
use crate::error::Result;
use async_trait::async_trait;

/// Append-only record of sticky notes.
///
/// # Implementations
///
/// - [`JsonlNoteStore`](super::JsonlNoteStore): one JSON record per line on disk
/// - [`MockNoteStore`](super::MockNoteStore): in-memory store for tests
#[async_trait]
pub trait NoteStore: Send + Sync {
    /// Persist a note.
    ///
    /// Validation happens before anything is written; a failed append leaves
    /// the store unchanged.
    ///
    /// # Errors
    ///
    /// - `InvalidPattern` if the note's pattern does not compile
    /// - `DuplicateId` if a note with the same id already exists
    /// - `Access` / `Serialization` if the record cannot be written
    async fn append(&self, note: &StickyNote) -> Result<()>;

    /// All notes in insertion order.
    async fn list_all(&self) -> Result<Vec<StickyNote>>;

    /// Look up a single note by id.
    async fn get(&self, id: &str) -> Result<Option<StickyNote>> {
        Ok(self.list_all().await?.into_iter().find(|n| n.id == id))
    }
}
