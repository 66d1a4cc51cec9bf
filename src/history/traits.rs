//! SessionHistoryProvider trait definition
//!
//! Same pattern as `NoteStore` and `SeenStore`: async trait + Send + Sync
//! for `Arc<dyn SessionHistoryProvider>` usage.

use super::models::SessionContext;
use crate::error::Result;
use async_trait::async_trait;

/// Abstract interface over an agent framework's session logs.
///
/// # Implementations
///
/// - [`CodexHistoryProvider`](super::CodexHistoryProvider): Codex rollout JSONL files
/// - [`CopilotHistoryProvider`](super::CopilotHistoryProvider): VS Code Copilot Chat sessions
/// - [`MockHistoryProvider`](super::MockHistoryProvider): fixed in-memory stream for tests
#[async_trait]
pub trait SessionHistoryProvider: Send + Sync {
    /// Registry name of this provider (`codex`, `copilot`, ...).
    fn name(&self) -> &str;

    /// Resolve the current session and normalize its log into snippets.
    ///
    /// `hint` is an externally known session id. Providers prefer the log
    /// belonging to it and fall back to their own notion of "most recent
    /// session" when it is absent or unmatched.
    ///
    /// # Errors
    ///
    /// - `NoActiveSession` when no session log can be found
    /// - `Access` when a session log exists but cannot be read
    async fn current_session(&self, hint: Option<&str>) -> Result<SessionContext>;
}
