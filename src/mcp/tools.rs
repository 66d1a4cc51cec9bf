//! MCP Tool definitions
//!
//! The two tools exposed to agents: leaving a note and reading the notes
//! relevant right now.

use super::protocol::{InputSchema, ToolDefinition};
use serde_json::json;

pub const CREATE_STICKY_NOTE: &str = "create_sticky_note";
pub const READ_RELEVANT_STICKY_NOTES: &str = "read_relevant_sticky_notes";

/// Generate all tool definitions
pub fn all_tools() -> Vec<ToolDefinition> {
    vec![create_sticky_note_tool(), read_relevant_tool()]
}

fn create_sticky_note_tool() -> ToolDefinition {
    ToolDefinition {
        name: CREATE_STICKY_NOTE.to_string(),
        description: "Persist a sticky note on a future context. The purpose is to inform \
            future agents in situations you define. The context_regex is evaluated against \
            the entire future session context, so craft it carefully. Typical use case: you \
            made a mistake performing a task; add a sticky note that helps a future agent \
            avoid the mistake. The response will include context snippets from your own \
            context. Make sure it would have been shown at a stage where it brings value."
            .to_string(),
        input_schema: InputSchema {
            schema_type: "object".to_string(),
            properties: Some(json!({
                "message": {
                    "type": "string",
                    "description": "The text that should appear in the sticky note when it triggers. Keep it concise and actionable."
                },
                "context_regex": {
                    "type": "string",
                    "description": "Regular expression that determines when the note should display. It is matched against the entire future session context."
                },
                "note_id": {
                    "type": "string",
                    "description": "Optional stable identifier for the note; omit to let the server generate one."
                }
            })),
            required: Some(vec!["message".to_string(), "context_regex".to_string()]),
        },
    }
}

fn read_relevant_tool() -> ToolDefinition {
    ToolDefinition {
        name: READ_RELEVANT_STICKY_NOTES.to_string(),
        description: "Retrieve sticky notes that agents from the past have shared with you. \
            It will return notes that are relevant to the current situation. Call often (a \
            note will only be returned once) to benefit and avoid making the same mistakes again."
            .to_string(),
        input_schema: InputSchema {
            schema_type: "object".to_string(),
            properties: Some(json!({})),
            required: None,
        },
    }
}
