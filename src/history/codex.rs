//! Codex session history provider
//!
//! Reads Codex rollout files: JSONL logs where every line is a
//! `{timestamp, type, payload}` entry. Lines that fail to parse are skipped
//! so one corrupt record never blocks relevance matching.

use super::models::{SessionContext, Snippet, SnippetKind};
use super::traits::SessionHistoryProvider;
use crate::error::{Result, StickyNoteError};
use crate::lines::log_lines;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use walkdir::WalkDir;

/// `event_msg` variants that duplicate response items or carry no text
const SKIPPED_EVENTS: &[&str] = &["token_count", "agent_message", "user_message"];

/// `response_item` variants rendered as event snippets
const CALL_VARIANTS: &[&str] = &["function_call", "custom_tool_call", "local_shell_call"];

/// Reads Codex rollout JSONL files below a history root
#[derive(Debug, Clone)]
pub struct CodexHistoryProvider {
    history_root: PathBuf,
}

/// Snippets extracted from one rollout file
struct ParsedRollout {
    session_id: Option<String>,
    snippets: Vec<Snippet>,
}

impl CodexHistoryProvider {
    pub const NAME: &'static str = "codex";

    pub fn new(history_root: impl Into<PathBuf>) -> Self {
        Self {
            history_root: history_root.into(),
        }
    }

    pub fn history_root(&self) -> &Path {
        &self.history_root
    }

    /// All rollout files, those whose name contains the hint first, each
    /// group newest first.
    fn candidate_paths(&self, hint: Option<&str>) -> Result<Vec<PathBuf>> {
        let root = &self.history_root;
        if root.is_file() {
            return Ok(vec![root.clone()]);
        }
        if !root.exists() {
            return Err(StickyNoteError::NoActiveSession(format!(
                "history directory '{}' does not exist",
                root.display()
            )));
        }

        let mut candidates: Vec<(PathBuf, SystemTime)> = WalkDir::new(root)
            .into_iter()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().is_file())
            .filter(|entry| entry.path().extension().is_some_and(|ext| ext == "jsonl"))
            .map(|entry| {
                let modified = entry
                    .metadata()
                    .ok()
                    .and_then(|m| m.modified().ok())
                    .unwrap_or(SystemTime::UNIX_EPOCH);
                (entry.into_path(), modified)
            })
            .collect();

        if candidates.is_empty() {
            return Err(StickyNoteError::NoActiveSession(format!(
                "no history files found under '{}'",
                root.display()
            )));
        }

        let name_matches = |path: &Path| match hint {
            Some(id) if !id.is_empty() => path
                .file_name()
                .map(|n| n.to_string_lossy().contains(id))
                .unwrap_or(false),
            _ => false,
        };

        // Hint matches sort before everything else, then newest first.
        candidates.sort_by(|(a_path, a_time), (b_path, b_time)| {
            name_matches(b_path)
                .cmp(&name_matches(a_path))
                .then_with(|| b_time.cmp(a_time))
        });

        Ok(candidates.into_iter().map(|(path, _)| path).collect())
    }

    async fn parse_file(&self, path: &Path) -> Result<ParsedRollout> {
        let raw = tokio::fs::read(path)
            .await
            .map_err(|e| StickyNoteError::access(path, e))?;
        Ok(normalize_rollout(&raw))
    }
}

#[async_trait]
impl SessionHistoryProvider for CodexHistoryProvider {
    fn name(&self) -> &str {
        Self::NAME
    }

    async fn current_session(&self, hint: Option<&str>) -> Result<SessionContext> {
        let hint = hint.filter(|h| !h.is_empty());
        let candidates = self.candidate_paths(hint)?;

        let mut fallback: Option<(PathBuf, SessionContext)> = None;

        for path in candidates {
            let parsed = self.parse_file(&path).await?;
            if parsed.snippets.is_empty() {
                continue;
            }

            if hint.is_some() && parsed.session_id.as_deref() == hint {
                return Ok(SessionContext::new(hint.unwrap_or_default(), parsed.snippets));
            }

            if hint.is_none() {
                let session_id = parsed
                    .session_id
                    .unwrap_or_else(|| file_stem(&path));
                return Ok(SessionContext::new(session_id, parsed.snippets));
            }

            if fallback.is_none() {
                let session_id = parsed
                    .session_id
                    .or_else(|| hint.map(str::to_string))
                    .unwrap_or_else(|| file_stem(&path));
                fallback = Some((path, SessionContext::new(session_id, parsed.snippets)));
            }
        }

        match fallback {
            Some((path, context)) => {
                tracing::warn!(
                    hint = hint.unwrap_or_default(),
                    session_id = %context.session_id,
                    path = %path.display(),
                    "Session id not found; using most recent session log"
                );
                Ok(context)
            }
            None => Err(StickyNoteError::NoActiveSession(format!(
                "no session history with content under '{}'",
                self.history_root.display()
            ))),
        }
    }
}

// ============================================================================
// Normalization
// ============================================================================

/// Normalize the raw content of one rollout file.
fn normalize_rollout(raw: &[u8]) -> ParsedRollout {
    let mut session_id = None;
    let mut snippets = Vec::new();

    for (lineno, line) in log_lines(raw) {
        let item: Value = match line
            .map_err(|e| e.to_string())
            .and_then(|l| serde_json::from_str::<Value>(l).map_err(|e| e.to_string()))
        {
            Ok(v) => v,
            Err(e) => {
                tracing::debug!(line = lineno, error = %e, "Skipping malformed rollout line");
                continue;
            }
        };

        let timestamp = parse_timestamp(item.get("timestamp"));
        let payload = item.get("payload").and_then(Value::as_object);

        let snippet = match item.get("type").and_then(Value::as_str) {
            Some("session_meta") => {
                if let Some(id) = payload.and_then(|p| str_field(p, "id")) {
                    session_id.get_or_insert_with(|| id.to_string());
                }
                payload.and_then(from_session_meta)
            }
            Some("response_item") => payload.and_then(from_response_item),
            Some("event_msg") => payload.and_then(from_event_msg),
            Some("compacted") => payload.and_then(from_compacted),
            _ => None,
        };

        if let Some(snippet) = snippet {
            snippets.push(snippet.with_timestamp(timestamp));
        }
    }

    ParsedRollout {
        session_id,
        snippets,
    }
}

fn from_session_meta(payload: &Map<String, Value>) -> Option<Snippet> {
    let instructions = non_empty(str_field(payload, "instructions"))?;
    Some(
        Snippet::new(SnippetKind::Content, "session_meta", instructions)
            .with_role(Some("system".to_string())),
    )
}

fn from_response_item(payload: &Map<String, Value>) -> Option<Snippet> {
    let variant = str_field(payload, "type")?;
    let view = view_of(payload);
    let role = str_field(view, "role").map(str::to_string);

    match variant {
        "message" => {
            let text = view
                .get("content")
                .and_then(Value::as_array)
                .map(|parts| {
                    parts
                        .iter()
                        .filter_map(|part| part.get("text"))
                        .map(value_text)
                        .filter(|t| !t.is_empty())
                        .collect::<Vec<_>>()
                        .join("\n")
                })
                .unwrap_or_default();
            let text = non_empty(Some(text.as_str()))?;
            Some(Snippet::new(SnippetKind::Content, "message", text).with_role(role))
        }
        "reasoning" => {
            let text = str_field(view, "text").map(str::trim).unwrap_or_default();
            let text = if text.is_empty() {
                summary_text(payload)
            } else {
                text.to_string()
            };
            let text = non_empty(Some(text.as_str()))?;
            Some(Snippet::new(SnippetKind::Reasoning, "reasoning", text).with_role(role))
        }
        v if CALL_VARIANTS.contains(&v) => {
            let name = ["name", "tool_name", "command"]
                .iter()
                .find_map(|key| view.get(*key).filter(|v| truthy(v)));
            let arguments = ["arguments", "input"]
                .iter()
                .find_map(|key| view.get(*key).filter(|v| truthy(v)));
            let text = format_call_text(name, arguments);
            let text = non_empty(Some(text.as_str()))?;
            Some(
                Snippet::new(SnippetKind::Event, v, text)
                    .with_role(role.or_else(|| Some("assistant".to_string()))),
            )
        }
        _ => None,
    }
}

fn from_event_msg(payload: &Map<String, Value>) -> Option<Snippet> {
    let variant = str_field(payload, "type").unwrap_or_default();
    if SKIPPED_EVENTS.contains(&variant) {
        return None;
    }
    let view = view_of(payload);
    let message = view
        .get("message")
        .filter(|v| truthy(v))
        .or_else(|| view.get("text"))
        .filter(|v| !v.is_null())?;

    let text = value_text(message);
    if text.is_empty() {
        return None;
    }

    let kind = if variant == "agent_reasoning" {
        SnippetKind::Reasoning
    } else {
        SnippetKind::Event
    };
    let role = str_field(view, "role").map(str::to_string);
    Some(Snippet::new(kind, format!("event:{}", variant), text).with_role(role))
}

fn from_compacted(payload: &Map<String, Value>) -> Option<Snippet> {
    let message = non_empty(str_field(payload, "message"))?;
    Some(
        Snippet::new(SnippetKind::Content, "compacted", message)
            .with_role(Some("assistant".to_string())),
    )
}

// ============================================================================
// Helpers
// ============================================================================

/// The nested `payload.payload` object when present and non-empty, else the payload itself.
fn view_of(payload: &Map<String, Value>) -> &Map<String, Value> {
    payload
        .get("payload")
        .and_then(Value::as_object)
        .filter(|inner| !inner.is_empty())
        .unwrap_or(payload)
}

fn summary_text(payload: &Map<String, Value>) -> String {
    payload
        .get("summary")
        .and_then(Value::as_array)
        .map(|parts| {
            parts
                .iter()
                .filter_map(|p| p.get("text").and_then(Value::as_str))
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .collect::<Vec<_>>()
                .join("\n")
        })
        .unwrap_or_default()
}

fn format_call_text(name: Option<&Value>, arguments: Option<&Value>) -> String {
    let mut parts = Vec::new();
    if let Some(name) = name {
        parts.push(format!("call:{}", value_text(name)));
    }
    if let Some(arguments) = arguments {
        parts.push(value_text(arguments));
    }
    parts.join(" ").trim().to_string()
}

fn str_field<'a>(map: &'a Map<String, Value>, key: &str) -> Option<&'a str> {
    map.get(key).and_then(Value::as_str)
}

fn non_empty(text: Option<&str>) -> Option<String> {
    text.filter(|t| !t.is_empty()).map(str::to_string)
}

/// Strings verbatim, everything else as compact JSON.
fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
        Value::Number(_) => true,
    }
}

fn parse_timestamp(raw: Option<&Value>) -> Option<DateTime<Utc>> {
    raw.and_then(Value::as_str)
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.with_timezone(&Utc))
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}
