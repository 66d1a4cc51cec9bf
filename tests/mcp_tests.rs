//! End-to-end tests: the MCP server over real JSONL stores and session logs
//!
//! Every test works inside its own temporary directory; no external
//! services are needed.
//! Run with: cargo test --test mcp_tests

use serde_json::{json, Value};
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use sticky_notes::history::{CopilotHistoryProvider, ProviderRegistry, SessionHistoryProvider};
use sticky_notes::mcp::{McpServer, ToolCallResult};
use sticky_notes::{AppState, Config};
use tempfile::TempDir;

// ============================================================================
// Fixtures
// ============================================================================

fn test_config(dir: &TempDir, framework: &str) -> Config {
    Config {
        framework: framework.to_string(),
        notes_dir: dir.path().join("notes"),
        history_dir: dir.path().join("history"),
        session_id: None,
        persist_seen_state: true,
    }
}

fn write_rollout(path: &Path, session_id: &str, messages: &[&str]) {
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    let mut file = File::create(path).unwrap();
    let meta = json!({
        "timestamp": "2025-05-07T17:24:21.123Z",
        "type": "session_meta",
        "payload": {"id": session_id, "instructions": "Stay focused"}
    });
    writeln!(file, "{}", meta).unwrap();
    for text in messages {
        let line = json!({
            "timestamp": "2025-05-07T17:25:00Z",
            "type": "response_item",
            "payload": {
                "type": "message",
                "payload": {"role": "user", "content": [{"type": "input_text", "text": text}]}
            }
        });
        writeln!(file, "{}", line).unwrap();
    }
}

fn rollout_path(dir: &TempDir) -> PathBuf {
    dir.path()
        .join("history")
        .join("2025")
        .join("05")
        .join("07")
        .join("rollout-2025-05-07T17-24-21-session.jsonl")
}

fn init_line() -> String {
    json!({
        "jsonrpc": "2.0",
        "method": "initialize",
        "params": {"protocolVersion": "2024-11-05", "capabilities": {}, "clientInfo": {"name": "codex"}},
        "id": 0
    })
    .to_string()
}

fn call_line(id: u64, name: &str, arguments: Value) -> String {
    json!({
        "jsonrpc": "2.0",
        "method": "tools/call",
        "params": {"name": name, "arguments": arguments},
        "id": id
    })
    .to_string()
}

/// Feed `lines` to a fresh server and return the parsed tool results, skipping
/// the initialize response.
async fn run_session(state: &AppState, lines: &[String]) -> Vec<ToolCallResult> {
    let mut server = McpServer::new(state.manager.clone());
    let mut input = init_line();
    for line in lines {
        input.push('\n');
        input.push_str(line);
    }
    input.push('\n');

    let mut output = Vec::new();
    server.serve(input.as_bytes(), &mut output).await.unwrap();

    String::from_utf8(output)
        .unwrap()
        .lines()
        .skip(1)
        .map(|line| {
            let resp: Value = serde_json::from_str(line).unwrap();
            serde_json::from_value(resp["result"].clone()).unwrap()
        })
        .collect()
}

fn payload(result: &ToolCallResult) -> Value {
    assert!(!result.is_error, "tool failed: {:?}", result.text());
    serde_json::from_str(result.text().unwrap()).unwrap()
}

// ============================================================================
// Codex
// ============================================================================

#[tokio::test]
async fn test_create_then_read_across_sessions() {
    let dir = tempfile::tempdir().unwrap();
    let path = rollout_path(&dir);
    write_rollout(&path, "session-a", &["deploying now", "unrelated"]);

    let state = AppState::new(test_config(&dir, "codex")).await.unwrap();

    let results = run_session(
        &state,
        &[
            call_line(
                1,
                "create_sticky_note",
                json!({"message": "Run migrations first", "context_regex": "deploy", "note_id": "n1"}),
            ),
            call_line(2, "read_relevant_sticky_notes", json!({})),
            call_line(3, "read_relevant_sticky_notes", json!({})),
        ],
    )
    .await;

    assert_eq!(
        payload(&results[0]),
        json!({"id": "n1", "trigger_snippets": ["deploying now"]})
    );
    assert_eq!(
        payload(&results[1]),
        json!([{"message": "Run migrations first", "trigger_snippets": ["deploying now"]}])
    );
    assert_eq!(payload(&results[2]), json!([]));

    // A new session sees the note again.
    write_rollout(&path, "session-b", &["time to deploy"]);
    let results = run_session(&state, &[call_line(4, "read_relevant_sticky_notes", json!({}))]).await;
    assert_eq!(
        payload(&results[0]),
        json!([{"message": "Run migrations first", "trigger_snippets": ["time to deploy"]}])
    );
}

#[tokio::test]
async fn test_notes_file_format() {
    let dir = tempfile::tempdir().unwrap();
    write_rollout(&rollout_path(&dir), "session-a", &["deploy"]);
    let state = AppState::new(test_config(&dir, "codex")).await.unwrap();

    run_session(
        &state,
        &[call_line(
            1,
            "create_sticky_note",
            json!({"message": "careful", "context_regex": "^deploy$", "note_id": "n1"}),
        )],
    )
    .await;

    let raw = std::fs::read_to_string(state.config.notes_file()).unwrap();
    let record: Value = serde_json::from_str(raw.lines().next().unwrap()).unwrap();
    assert_eq!(record["id"], "n1");
    assert_eq!(record["message"], "careful");
    assert_eq!(record["context_regex"], "^deploy$");
    assert_eq!(record["creator"], "mcp");
    assert_eq!(record["trigger_snippets"], json!(["deploy"]));
    assert!(record["created_at"].is_string());
}

#[tokio::test]
async fn test_seen_state_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    write_rollout(&rollout_path(&dir), "session-a", &["deploy"]);

    {
        let state = AppState::new(test_config(&dir, "codex")).await.unwrap();
        let results = run_session(
            &state,
            &[
                call_line(1, "create_sticky_note", json!({"message": "m", "context_regex": "deploy"})),
                call_line(2, "read_relevant_sticky_notes", json!({})),
            ],
        )
        .await;
        assert_eq!(payload(&results[1]).as_array().unwrap().len(), 1);
    }

    let state = AppState::new(test_config(&dir, "codex")).await.unwrap();
    let results = run_session(&state, &[call_line(3, "read_relevant_sticky_notes", json!({}))]).await;
    assert_eq!(payload(&results[0]), json!([]));
}

#[tokio::test]
async fn test_in_memory_seen_state_resets_on_restart() {
    let dir = tempfile::tempdir().unwrap();
    write_rollout(&rollout_path(&dir), "session-a", &["deploy"]);
    let mut config = test_config(&dir, "codex");
    config.persist_seen_state = false;

    let state = AppState::new(config.clone()).await.unwrap();
    run_session(
        &state,
        &[
            call_line(1, "create_sticky_note", json!({"message": "m", "context_regex": "deploy"})),
            call_line(2, "read_relevant_sticky_notes", json!({})),
        ],
    )
    .await;
    assert!(!state.config.seen_file().exists());

    let state = AppState::new(config).await.unwrap();
    let results = run_session(&state, &[call_line(3, "read_relevant_sticky_notes", json!({}))]).await;
    assert_eq!(payload(&results[0]).as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_tool_errors_are_reported() {
    let dir = tempfile::tempdir().unwrap();
    let state = AppState::new(test_config(&dir, "codex")).await.unwrap();

    let results = run_session(
        &state,
        &[
            // No rollout files yet: reading has no session to work with.
            call_line(1, "read_relevant_sticky_notes", json!({})),
            call_line(2, "create_sticky_note", json!({"message": "m", "context_regex": "("})),
            call_line(3, "create_sticky_note", json!({"message": "m", "context_regex": "x", "note_id": "dup"})),
            call_line(4, "create_sticky_note", json!({"message": "m", "context_regex": "x", "note_id": "dup"})),
        ],
    )
    .await;

    assert!(results[0].is_error);
    assert!(results[1].is_error);
    // Creation without a session still persists the note.
    assert_eq!(payload(&results[2]), json!({"id": "dup", "trigger_snippets": []}));
    assert!(results[3].is_error);
    assert!(results[3].text().unwrap().contains("already exists"));

    let notes = state.manager.list_notes().await.unwrap();
    assert_eq!(notes.len(), 1);
}

// ============================================================================
// Copilot
// ============================================================================

fn isolated_copilot(root: &Path) -> Arc<dyn SessionHistoryProvider> {
    Arc::new(CopilotHistoryProvider::new(root).with_workspace_storage(Vec::new()))
}

#[tokio::test]
async fn test_copilot_chat_session() {
    let dir = tempfile::tempdir().unwrap();
    let sessions = dir.path().join("history").join("ws1").join("chatSessions");
    std::fs::create_dir_all(&sessions).unwrap();
    let chat = json!({
        "requests": [{
            "timestamp": 1746638661000i64,
            "message": {"text": "please deploy the service"},
            "response": [
                {"value": "Deploying with the release script"},
                {
                    "kind": "toolInvocationSerialized",
                    "toolId": "run_in_terminal",
                    "resultDetails": {"input": "make deploy"}
                }
            ]
        }]
    });
    std::fs::write(sessions.join("chat-1.json"), chat.to_string()).unwrap();

    let mut registry = ProviderRegistry::with_defaults();
    registry.register("copilot", isolated_copilot);
    let state = AppState::with_registry(test_config(&dir, "copilot"), &registry)
        .await
        .unwrap();

    let results = run_session(
        &state,
        &[call_line(
            1,
            "create_sticky_note",
            json!({"message": "use the staging target", "context_regex": "make deploy"}),
        )],
    )
    .await;

    assert_eq!(
        payload(&results[0])["trigger_snippets"],
        json!(["Tool Call: run_in_terminal\nArguments: make deploy"])
    );
    let context = state.manager.current_session().await.unwrap();
    assert_eq!(context.session_id, "chat-1");
    assert_eq!(context.snippets.len(), 3);
}
