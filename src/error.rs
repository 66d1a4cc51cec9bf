//! Error taxonomy for the sticky-note core
//!
//! Every failure the core can report is a variant of [`StickyNoteError`].
//! Outer layers (MCP handlers, binaries) wrap it in `anyhow` like the rest
//! of the stack; tests match on the variants directly.

use std::path::PathBuf;

/// Errors surfaced by the note store, seen-state tracker, history providers
/// and relevance engine.
#[derive(Debug, thiserror::Error)]
pub enum StickyNoteError {
    /// The supplied context regex does not compile.
    #[error("Invalid regular expression '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },

    /// A note with this id already exists in the store.
    #[error("Sticky note '{0}' already exists")]
    DuplicateId(String),

    /// Sticky notes need a message to show when they trigger.
    #[error("Sticky note message cannot be empty")]
    EmptyMessage,

    /// No history provider is registered under this name.
    #[error("Unsupported framework '{name}'. Known: {known}")]
    UnknownProvider { name: String, known: String },

    /// The provider could not determine a current session.
    #[error("No active session: {0}")]
    NoActiveSession(String),

    /// A log or store file exists but cannot be read or written.
    #[error("Cannot access {}: {source}", .path.display())]
    Access {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A record could not be encoded for persistence.
    #[error("Failed to serialize record: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StickyNoteError {
    pub(crate) fn access(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Access {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T, E = StickyNoteError> = std::result::Result<T, E>;
