//! Session history models
//!
//! Every provider normalizes its raw log into the same shape: an ordered
//! list of [`Snippet`]s wrapped in a [`SessionContext`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ============================================================================
// Snippet
// ============================================================================

/// What a snippet was extracted from
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum SnippetKind {
    /// Visible user / assistant / system text
    Content,
    /// Internal reasoning traces
    Reasoning,
    /// Tool calls and other notable events, rendered as short text
    Event,
}

impl fmt::Display for SnippetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Content => write!(f, "content"),
            Self::Reasoning => write!(f, "reasoning"),
            Self::Event => write!(f, "event"),
        }
    }
}

impl FromStr for SnippetKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "content" => Ok(Self::Content),
            "reasoning" => Ok(Self::Reasoning),
            "event" => Ok(Self::Event),
            _ => Err(format!("Unknown snippet kind: {}", s)),
        }
    }
}

/// A single normalized unit of session text.
///
/// Only `text` takes part in matching; the other fields are carried along
/// for display and debugging.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Snippet {
    pub kind: SnippetKind,
    pub text: String,
    /// Provider-specific origin label (`message`, `function_call`, `event:agent_reasoning`, ...)
    pub source: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

impl Snippet {
    pub fn new(kind: SnippetKind, source: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            kind,
            text: text.into(),
            source: source.into(),
            role: None,
            timestamp: None,
        }
    }

    /// Shorthand for a content snippet, mostly used by tests and mocks.
    pub fn content(text: impl Into<String>) -> Self {
        Self::new(SnippetKind::Content, "message", text)
    }

    pub fn with_role(mut self, role: Option<String>) -> Self {
        self.role = role;
        self
    }

    pub fn with_timestamp(mut self, timestamp: Option<DateTime<Utc>>) -> Self {
        self.timestamp = timestamp;
        self
    }
}

// ============================================================================
// Session context
// ============================================================================

/// The snippet stream of one session, recomputed on every request
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionContext {
    pub session_id: String,
    pub snippets: Vec<Snippet>,
}

impl SessionContext {
    pub fn new(session_id: impl Into<String>, snippets: Vec<Snippet>) -> Self {
        Self {
            session_id: session_id.into(),
            snippets,
        }
    }

    /// All snippet texts joined by newlines.
    pub fn full_text(&self) -> String {
        self.snippets
            .iter()
            .filter(|s| !s.text.is_empty())
            .map(|s| s.text.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn is_empty(&self) -> bool {
        self.snippets.is_empty()
    }
}
