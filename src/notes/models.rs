//! Sticky note models and DTOs
//!
//! A sticky note is a message an agent leaves for its future self, together
//! with the regular expression that decides when it resurfaces.

use crate::error::{Result, StickyNoteError};
use chrono::{DateTime, Utc};
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ============================================================================
// Sticky note
// ============================================================================

/// A persisted sticky note. Immutable once appended to the store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StickyNote {
    pub id: String,
    pub message: String,
    /// Regular expression matched against session snippets
    #[serde(rename = "context_regex")]
    pub pattern: String,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creator: Option<String>,
    /// Snippets that matched in the creating session, kept for auditing
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub trigger_snippets: Vec<String>,
}

impl StickyNote {
    /// Create a note stamped with the current time.
    pub fn new(id: impl Into<String>, message: impl Into<String>, pattern: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            message: message.into(),
            pattern: pattern.into(),
            created_at: Utc::now(),
            creator: None,
            trigger_snippets: Vec::new(),
        }
    }

    /// Compile this note's pattern.
    pub fn regex(&self) -> Result<Regex> {
        compile_pattern(&self.pattern)
    }
}

/// Generate a fresh note id (UUID v4, simple hex form).
pub fn generate_note_id() -> String {
    Uuid::new_v4().simple().to_string()
}

/// Compile a context regex. `^` and `$` match at line boundaries.
pub fn compile_pattern(pattern: &str) -> Result<Regex> {
    RegexBuilder::new(pattern)
        .multi_line(true)
        .build()
        .map_err(|e| StickyNoteError::InvalidPattern {
            pattern: pattern.to_string(),
            reason: e.to_string(),
        })
}

// ============================================================================
// Requests / responses
// ============================================================================

/// Request to create a sticky note
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateStickyNoteRequest {
    pub message: String,
    pub context_regex: String,
    /// Caller-supplied id; generated when absent
    #[serde(default)]
    pub note_id: Option<String>,
    #[serde(default)]
    pub creator: Option<String>,
}

/// Result of creating a sticky note: its id and the creation-time matches
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CreatedStickyNote {
    pub id: String,
    pub trigger_snippets: Vec<String>,
}

/// A note surfaced by a relevance query, with the snippets that triggered it
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RelevantNote {
    #[serde(skip)]
    pub note_id: String,
    pub message: String,
    pub trigger_snippets: Vec<String>,
}
