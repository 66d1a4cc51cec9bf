//! Shared fixtures for unit tests.

use crate::history::{MockHistoryProvider, Snippet};
use crate::notes::{CreateStickyNoteRequest, InMemorySeenStore, MockNoteStore, StickyNoteManager};
use std::sync::Arc;

pub const TEST_SESSION_ID: &str = "test-session";

/// Manager over mock stores with a session made of `texts` as content snippets.
/// The provider is returned so tests can grow the session.
pub fn mock_manager(texts: &[&str]) -> (StickyNoteManager, Arc<MockHistoryProvider>) {
    let snippets = texts.iter().map(|t| Snippet::content(*t)).collect();
    let provider = Arc::new(MockHistoryProvider::new(TEST_SESSION_ID, snippets));
    let manager = StickyNoteManager::new(
        Arc::new(MockNoteStore::new()),
        Arc::new(InMemorySeenStore::new()),
        provider.clone(),
    );
    (manager, provider)
}

pub fn create_request(message: &str, context_regex: &str) -> CreateStickyNoteRequest {
    CreateStickyNoteRequest {
        message: message.to_string(),
        context_regex: context_regex.to_string(),
        ..Default::default()
    }
}
