//! Mock history provider for tests
//!
//! Serves a fixed, mutable snippet stream so tests can grow the "session"
//! between queries without touching the filesystem.

use super::models::{SessionContext, Snippet};
use super::traits::SessionHistoryProvider;
use crate::error::{Result, StickyNoteError};
use async_trait::async_trait;
use tokio::sync::RwLock;

/// In-memory provider returning whatever stream it currently holds.
///
/// # Example
///
/// ```rust
/// use sticky_notes::history::{MockHistoryProvider, SessionHistoryProvider, Snippet};
///
/// # tokio_test::block_on(async {
/// let provider = MockHistoryProvider::new("session-1", vec![Snippet::content("hello")]);
/// let ctx = provider.current_session(None).await.unwrap();
/// assert_eq!(ctx.session_id, "session-1");
///
/// provider.push(Snippet::content("world")).await;
/// assert_eq!(provider.current_session(None).await.unwrap().snippets.len(), 2);
/// # });
/// ```
pub struct MockHistoryProvider {
    session: RwLock<Option<SessionContext>>,
}

impl MockHistoryProvider {
    pub fn new(session_id: impl Into<String>, snippets: Vec<Snippet>) -> Self {
        Self {
            session: RwLock::new(Some(SessionContext::new(session_id, snippets))),
        }
    }

    /// A session with no snippets yet.
    pub fn empty(session_id: impl Into<String>) -> Self {
        Self::new(session_id, Vec::new())
    }

    /// A provider that never finds an active session.
    pub fn without_session() -> Self {
        Self {
            session: RwLock::new(None),
        }
    }

    /// Append a snippet to the current session.
    pub async fn push(&self, snippet: Snippet) {
        if let Some(session) = self.session.write().await.as_mut() {
            session.snippets.push(snippet);
        }
    }

    /// Switch to a different session.
    pub async fn set_session(&self, context: SessionContext) {
        *self.session.write().await = Some(context);
    }
}

#[async_trait]
impl SessionHistoryProvider for MockHistoryProvider {
    fn name(&self) -> &str {
        "mock"
    }

    async fn current_session(&self, _hint: Option<&str>) -> Result<SessionContext> {
        self.session
            .read()
            .await
            .clone()
            .ok_or_else(|| StickyNoteError::NoActiveSession("mock provider has no session".into()))
    }
}
