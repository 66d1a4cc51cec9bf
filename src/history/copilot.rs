//! GitHub Copilot session history provider
//!
//! Reads Copilot Chat sessions from VS Code workspace storage
//! (`<workspaceStorage>/<hash>/chatSessions/<session-id>.json`) or from an
//! explicit history root.

use super::models::{SessionContext, Snippet, SnippetKind};
use super::traits::SessionHistoryProvider;
use crate::error::{Result, StickyNoteError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use walkdir::WalkDir;

/// Reads Copilot Chat session JSON documents
#[derive(Debug, Clone)]
pub struct CopilotHistoryProvider {
    history_root: PathBuf,
    workspace_storage: Vec<PathBuf>,
}

// ============================================================================
// Chat session document
// ============================================================================

#[derive(Debug, Deserialize)]
struct ChatSession {
    #[serde(default)]
    requests: Vec<ChatRequest>,
}

#[derive(Debug, Deserialize)]
struct ChatRequest {
    #[serde(default)]
    timestamp: Option<i64>,
    #[serde(default)]
    message: Option<ChatMessage>,
    #[serde(default)]
    response: Vec<ResponseItem>,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResponseItem {
    #[serde(default)]
    value: Option<Value>,
    #[serde(default)]
    kind: Option<String>,
    #[serde(default)]
    tool_id: Option<String>,
    #[serde(default)]
    result_details: Option<ResultDetails>,
}

#[derive(Debug, Deserialize)]
struct ResultDetails {
    #[serde(default)]
    input: Option<Value>,
}

impl CopilotHistoryProvider {
    pub const NAME: &'static str = "copilot";

    /// Provider reading `history_root` plus the default VS Code workspace storage locations.
    pub fn new(history_root: impl Into<PathBuf>) -> Self {
        Self {
            history_root: history_root.into(),
            workspace_storage: default_workspace_storage(),
        }
    }

    /// Replace the VS Code workspace storage directories scanned for chat sessions.
    pub fn with_workspace_storage(mut self, dirs: Vec<PathBuf>) -> Self {
        self.workspace_storage = dirs;
        self
    }

    fn find_session_files(&self) -> Vec<PathBuf> {
        let root = &self.history_root;
        if root.is_file() {
            return vec![root.clone()];
        }

        let mut candidates = BTreeSet::new();

        if root.is_dir() {
            for entry in WalkDir::new(root).into_iter().filter_map(|e| e.ok()) {
                let path = entry.path();
                if !entry.file_type().is_file() || !is_json(path) {
                    continue;
                }
                let in_chat_sessions = path
                    .parent()
                    .and_then(Path::file_name)
                    .is_some_and(|n| n == "chatSessions");
                let direct_child = path.parent() == Some(root.as_path());
                if in_chat_sessions || direct_child {
                    candidates.insert(path.to_path_buf());
                }
            }
        }

        for base in &self.workspace_storage {
            let Ok(workspaces) = std::fs::read_dir(base) else {
                continue;
            };
            tracing::debug!(base = %base.display(), "Scanning for chat sessions");
            for workspace in workspaces.filter_map(|e| e.ok()) {
                let chat_dir = workspace.path().join("chatSessions");
                let Ok(files) = std::fs::read_dir(&chat_dir) else {
                    continue;
                };
                for file in files.filter_map(|e| e.ok()) {
                    let path = file.path();
                    if path.is_file() && is_json(&path) {
                        candidates.insert(path);
                    }
                }
            }
        }

        tracing::debug!(count = candidates.len(), "Found chat session files");
        candidates.into_iter().collect()
    }

    async fn load_file(&self, path: &Path, session_id: String) -> Result<Option<SessionContext>> {
        let raw = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| StickyNoteError::access(path, e))?;

        let session: ChatSession = match serde_json::from_str(&raw) {
            Ok(s) => s,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Failed to parse chat session file");
                return Ok(None);
            }
        };

        let snippets = normalize_session(session);
        if snippets.is_empty() {
            return Ok(None);
        }
        Ok(Some(SessionContext::new(session_id, snippets)))
    }
}

#[async_trait]
impl SessionHistoryProvider for CopilotHistoryProvider {
    fn name(&self) -> &str {
        Self::NAME
    }

    async fn current_session(&self, hint: Option<&str>) -> Result<SessionContext> {
        let mut candidates = self.find_session_files();
        if candidates.is_empty() {
            return Err(StickyNoteError::NoActiveSession(
                "no Copilot chat history found; checked VS Code workspace storage".to_string(),
            ));
        }

        if let Some(id) = hint.filter(|h| !h.is_empty()) {
            let wanted = format!("{}.json", id);
            let exact = candidates
                .iter()
                .find(|p| p.file_name().is_some_and(|n| n.to_string_lossy() == wanted))
                .cloned();
            if let Some(path) = exact {
                if let Some(context) = self.load_file(&path, id.to_string()).await? {
                    return Ok(context);
                }
            }
        }

        candidates.sort_by_key(|p| std::cmp::Reverse(modified(p)));
        tracing::info!(
            count = candidates.len(),
            "Checking candidate chat sessions for the most recent valid one"
        );

        let total = candidates.len();
        for path in candidates {
            let session_id = path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default();
            match self.load_file(&path, session_id).await {
                Ok(Some(context)) => {
                    tracing::info!(
                        session_id = %context.session_id,
                        path = %path.display(),
                        "Loaded chat session"
                    );
                    return Ok(context);
                }
                Ok(None) => continue,
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "Skipping unreadable chat session");
                    continue;
                }
            }
        }

        Err(StickyNoteError::NoActiveSession(format!(
            "could not parse any valid history from {} candidates",
            total
        )))
    }
}

// ============================================================================
// Normalization
// ============================================================================

fn normalize_session(session: ChatSession) -> Vec<Snippet> {
    let mut snippets = Vec::new();

    for request in session.requests {
        let timestamp = request
            .timestamp
            .and_then(DateTime::<Utc>::from_timestamp_millis);

        if let Some(text) = request.message.and_then(|m| m.text).filter(|t| !t.is_empty()) {
            snippets.push(
                Snippet::new(SnippetKind::Content, "message", text)
                    .with_role(Some("user".to_string()))
                    .with_timestamp(timestamp),
            );
        }

        for item in request.response {
            let value = item.value.as_ref().map(value_text).unwrap_or_default();
            if !value.is_empty() {
                snippets.push(
                    Snippet::new(SnippetKind::Content, "message", value)
                        .with_role(Some("assistant".to_string()))
                        .with_timestamp(timestamp),
                );
            } else if item.kind.as_deref() == Some("toolInvocationSerialized") {
                let tool_id = item.tool_id.unwrap_or_default();
                let input = item
                    .result_details
                    .and_then(|d| d.input)
                    .map(|v| value_text(&v))
                    .unwrap_or_else(|| "None".to_string());
                snippets.push(
                    Snippet::new(
                        SnippetKind::Event,
                        "tool_call",
                        format!("Tool Call: {}\nArguments: {}", tool_id, input),
                    )
                    .with_role(Some("assistant".to_string()))
                    .with_timestamp(timestamp),
                );
            }
        }
    }

    snippets
}

// ============================================================================
// Helpers
// ============================================================================

/// VS Code and VS Code Insiders workspace storage for the current platform.
fn default_workspace_storage() -> Vec<PathBuf> {
    let Some(config) = dirs::config_dir() else {
        return Vec::new();
    };
    ["Code", "Code - Insiders"]
        .iter()
        .map(|app| config.join(app).join("User").join("workspaceStorage"))
        .collect()
}

fn is_json(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == "json")
}

fn modified(path: &Path) -> SystemTime {
    std::fs::metadata(path)
        .and_then(|m| m.modified())
        .unwrap_or(SystemTime::UNIX_EPOCH)
}

fn value_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
