//! MCP Tool handlers
//!
//! Maps tool calls onto the sticky note manager.

use super::tools::{CREATE_STICKY_NOTE, READ_RELEVANT_STICKY_NOTES};
use crate::notes::{CreateStickyNoteRequest, StickyNoteManager};
use anyhow::{anyhow, Result};
use serde_json::{json, Value};
use std::sync::Arc;

/// Creator recorded on notes left through the MCP tools.
const MCP_CREATOR: &str = "mcp";

/// Handles MCP tool calls
pub struct ToolHandler {
    manager: Arc<StickyNoteManager>,
}

impl ToolHandler {
    pub fn new(manager: Arc<StickyNoteManager>) -> Self {
        Self { manager }
    }

    /// Handle a tool call and return the result as JSON
    pub async fn handle(&self, name: &str, args: Option<Value>) -> Result<Value> {
        let args = args.unwrap_or(json!({}));

        match name {
            CREATE_STICKY_NOTE => self.create_sticky_note(args).await,
            READ_RELEVANT_STICKY_NOTES => self.read_relevant_sticky_notes().await,
            _ => Err(anyhow!("Unknown tool: {}", name)),
        }
    }

    async fn create_sticky_note(&self, args: Value) -> Result<Value> {
        let message = required_str(&args, "message")?;
        let context_regex = required_str(&args, "context_regex")?;
        let note_id = args
            .get("note_id")
            .and_then(|v| v.as_str())
            .map(|s| s.to_string());

        let request = CreateStickyNoteRequest {
            message,
            context_regex,
            note_id,
            creator: Some(MCP_CREATOR.to_string()),
        };

        let created = self.manager.create_note(request).await?;
        Ok(serde_json::to_value(created)?)
    }

    async fn read_relevant_sticky_notes(&self) -> Result<Value> {
        let notes = self.manager.read_relevant().await?;
        Ok(serde_json::to_value(notes)?)
    }
}

fn required_str(args: &Value, key: &str) -> Result<String> {
    args.get(key)
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
        .ok_or_else(|| anyhow!("{} is required", key))
}
