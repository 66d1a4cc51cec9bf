//! Sticky Note Manager
//!
//! Orchestrates the two agent-facing operations: creating a note (with
//! immediate feedback from the current session) and reading the notes that
//! are relevant to the current session right now.

use super::models::*;
use super::relevance;
use super::seen::SeenStore;
use super::store::NoteStore;
use crate::error::{Result, StickyNoteError};
use crate::history::{SessionContext, SessionHistoryProvider};
use std::sync::Arc;

/// Manager for sticky note operations.
///
/// Holds already-resolved collaborators; it never reads configuration.
pub struct StickyNoteManager {
    notes: Arc<dyn NoteStore>,
    seen: Arc<dyn SeenStore>,
    history: Arc<dyn SessionHistoryProvider>,
    session_hint: Option<String>,
}

impl StickyNoteManager {
    pub fn new(
        notes: Arc<dyn NoteStore>,
        seen: Arc<dyn SeenStore>,
        history: Arc<dyn SessionHistoryProvider>,
    ) -> Self {
        Self {
            notes,
            seen,
            history,
            session_hint: None,
        }
    }

    /// Prefer the session with this id when resolving the current session (builder pattern).
    pub fn with_session_hint(mut self, hint: Option<String>) -> Self {
        self.session_hint = hint.filter(|h| !h.is_empty());
        self
    }

    pub fn provider_name(&self) -> &str {
        self.history.name()
    }

    pub fn note_store(&self) -> &Arc<dyn NoteStore> {
        &self.notes
    }

    /// The current session and its snippet stream, read fresh.
    pub async fn current_session(&self) -> Result<SessionContext> {
        self.history
            .current_session(self.session_hint.as_deref())
            .await
    }

    /// Persist a sticky note and return the snippets of the current session
    /// it already matches.
    ///
    /// Creation-time matches ignore seen-state. When no session is active
    /// the note is still stored, with no matches.
    pub async fn create_note(&self, request: CreateStickyNoteRequest) -> Result<CreatedStickyNote> {
        if request.message.trim().is_empty() {
            return Err(StickyNoteError::EmptyMessage);
        }
        compile_pattern(&request.context_regex)?;

        let id = request
            .note_id
            .filter(|id| !id.trim().is_empty())
            .unwrap_or_else(generate_note_id);

        let mut note = StickyNote::new(id, request.message, request.context_regex);
        note.creator = request.creator;

        let snippets = match self.current_session().await {
            Ok(context) => {
                tracing::info!(
                    note_id = %note.id,
                    session_id = %context.session_id,
                    "create_sticky_note invoked"
                );
                context.snippets
            }
            Err(StickyNoteError::NoActiveSession(reason)) => {
                tracing::warn!(
                    note_id = %note.id,
                    reason = %reason,
                    "No active session; storing note without creation-time matches"
                );
                Vec::new()
            }
            Err(e) => return Err(e),
        };

        let trigger_snippets = relevance::match_on_create(&note, &snippets)?;
        note.trigger_snippets = trigger_snippets.clone();

        self.notes.append(&note).await?;

        tracing::debug!(
            note_id = %note.id,
            snippets = trigger_snippets.len(),
            "Created sticky note"
        );

        Ok(CreatedStickyNote {
            id: note.id,
            trigger_snippets,
        })
    }

    /// Notes relevant to the current session that it has not seen yet.
    /// Every returned note is marked seen for the session.
    pub async fn read_relevant(&self) -> Result<Vec<RelevantNote>> {
        let context = self.current_session().await?;
        tracing::info!(
            session_id = %context.session_id,
            snippets = context.snippets.len(),
            "read_relevant_sticky_notes invoked"
        );

        let notes = self.notes.list_all().await?;
        let results =
            relevance::relevant_unseen(&context.session_id, &context.snippets, &notes, &*self.seen)
                .await?;

        tracing::debug!(
            session_id = %context.session_id,
            surfaced = results.len(),
            "Relevant notes computed"
        );
        Ok(results)
    }

    /// What [`read_relevant`](Self::read_relevant) would return, without marking anything seen.
    pub async fn preview_relevant(&self) -> Result<Vec<RelevantNote>> {
        let context = self.current_session().await?;
        let notes = self.notes.list_all().await?;
        relevance::unseen_matches(&context.session_id, &context.snippets, &notes, &*self.seen).await
    }

    /// Every stored note, in insertion order.
    pub async fn list_notes(&self) -> Result<Vec<StickyNote>> {
        self.notes.list_all().await
    }
}
