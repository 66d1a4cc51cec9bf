//! Stdio transport for the sticky-notes MCP tools
//!
//! One JSON-RPC 2.0 message per line in, one response per line out.
//! Notifications get no reply. Tool failures come back as `isError`
//! results, not JSON-RPC errors.

use super::handlers::ToolHandler;
use super::protocol::*;
use super::tools::all_tools;
use crate::notes::StickyNoteManager;
use anyhow::Result;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};
use std::io::{BufRead, BufReader, Write};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

const PROTOCOL_VERSION: &str = "2024-11-05";
const SERVER_NAME: &str = "sticky-notes";
const SERVER_VERSION: &str = env!("CARGO_PKG_VERSION");

pub struct McpServer {
    tool_handler: ToolHandler,
    initialized: bool,
}

impl McpServer {
    pub fn new(manager: Arc<StickyNoteManager>) -> Self {
        Self {
            tool_handler: ToolHandler::new(manager),
            initialized: false,
        }
    }

    /// Serve stdin/stdout until the client closes its end.
    pub async fn run(&mut self) -> Result<()> {
        let stdin = std::io::stdin();
        let stdout = std::io::stdout();
        info!(protocol = PROTOCOL_VERSION, "MCP server listening on stdio");
        self.serve(BufReader::new(stdin.lock()), stdout.lock()).await?;
        info!("Client disconnected");
        Ok(())
    }

    /// Serve line-delimited JSON-RPC from `reader` until EOF.
    pub async fn serve<R: BufRead, W: Write>(&mut self, reader: R, mut writer: W) -> Result<()> {
        for line in reader.lines() {
            let line = match line {
                Ok(l) => l,
                Err(e) => {
                    error!(error = %e, "Stopped reading stdin");
                    break;
                }
            };
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            debug!(message = line, "Received");
            let Some(response) = self.handle_message(line).await else {
                continue;
            };
            let encoded = serde_json::to_string(&response)?;
            debug!(message = %encoded, "Sending");
            writeln!(writer, "{}", encoded)?;
            writer.flush()?;
        }
        Ok(())
    }

    /// Answer one JSON-RPC message. Notifications produce no response.
    pub async fn handle_message(&mut self, message: &str) -> Option<JsonRpcResponse> {
        let request: JsonRpcRequest = match serde_json::from_str(message) {
            Ok(r) => r,
            Err(e) => {
                warn!(error = %e, "Unparsable JSON-RPC message");
                return Some(JsonRpcResponse::error(
                    Value::Null,
                    JsonRpcError::parse_error(e.to_string()),
                ));
            }
        };

        let Some(id) = request.id.clone() else {
            log_notification(&request.method);
            return None;
        };

        Some(match self.dispatch(&request).await {
            Ok(value) => JsonRpcResponse::success(id, value),
            Err(error) => JsonRpcResponse::error(id, error),
        })
    }

    async fn dispatch(&mut self, request: &JsonRpcRequest) -> Result<Value, JsonRpcError> {
        let method = request.method.as_str();
        if !self.initialized && matches!(method, "tools/list" | "tools/call") {
            return Err(JsonRpcError::invalid_request("Server not initialized"));
        }

        match method {
            "initialize" => {
                let params = parse_params::<InitializeParams>(&request.params)?;
                self.initialize(params)
            }
            "ping" => Ok(json!({})),
            "tools/list" => to_result(ToolsListResult { tools: all_tools() }),
            "tools/call" => {
                let params = parse_params::<ToolCallParams>(&request.params)?
                    .ok_or_else(|| JsonRpcError::invalid_params("params required"))?;
                self.call_tool(params).await
            }
            other => Err(JsonRpcError::method_not_found(other)),
        }
    }

    fn initialize(&mut self, params: Option<InitializeParams>) -> Result<Value, JsonRpcError> {
        if let Some(params) = &params {
            let client = params.client_info.as_ref();
            info!(
                client_protocol = %params.protocol_version,
                client = client.map(|c| c.name.as_str()).unwrap_or("unknown"),
                client_version = client.and_then(|c| c.version.as_deref()).unwrap_or("unknown"),
                "Initializing"
            );
        }
        self.initialized = true;

        to_result(InitializeResult {
            protocol_version: PROTOCOL_VERSION.to_string(),
            capabilities: ServerCapabilities {
                tools: ToolsCapability {
                    list_changed: false,
                },
            },
            server_info: ServerInfo {
                name: SERVER_NAME.to_string(),
                version: SERVER_VERSION.to_string(),
            },
        })
    }

    async fn call_tool(&self, params: ToolCallParams) -> Result<Value, JsonRpcError> {
        info!(tool = %params.name, "Tool call");
        debug!(arguments = ?params.arguments, "Tool arguments");

        let outcome = self
            .tool_handler
            .handle(&params.name, params.arguments)
            .await
            .and_then(|value| Ok(serde_json::to_string_pretty(&value)?));

        to_result(match outcome {
            Ok(text) => ToolCallResult::success(text),
            Err(e) => {
                error!(tool = %params.name, error = %e, "Tool failed");
                ToolCallResult::error(e.to_string())
            }
        })
    }
}

fn log_notification(method: &str) {
    match method {
        "notifications/initialized" => info!("Client ready"),
        "notifications/cancelled" => warn!("Client cancelled a request"),
        other => debug!(method = other, "Ignoring notification"),
    }
}

/// Decode optional request params; present but malformed params are an error.
fn parse_params<T: DeserializeOwned>(params: &Option<Value>) -> Result<Option<T>, JsonRpcError> {
    params
        .as_ref()
        .map(|p| T::deserialize(p))
        .transpose()
        .map_err(|e| JsonRpcError::invalid_params(e.to_string()))
}

fn to_result(value: impl Serialize) -> Result<Value, JsonRpcError> {
    serde_json::to_value(value).map_err(|e| JsonRpcError::internal_error(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::mock_manager;

    const INIT: &str = r#"{"jsonrpc":"2.0","method":"initialize","params":{"protocolVersion":"2024-11-05","capabilities":{},"clientInfo":{"name":"codex","version":"1.0"}},"id":1}"#;

    fn server(texts: &[&str]) -> McpServer {
        let (manager, _) = mock_manager(texts);
        McpServer::new(Arc::new(manager))
    }

    async fn initialized(texts: &[&str]) -> McpServer {
        let mut server = server(texts);
        server.handle_message(INIT).await.unwrap();
        server
    }

    fn call(id: u64, name: &str, arguments: Value) -> String {
        json!({
            "jsonrpc": "2.0",
            "method": "tools/call",
            "params": {"name": name, "arguments": arguments},
            "id": id
        })
        .to_string()
    }

    #[test]
    fn test_parse_tools_call_request() {
        let request = r#"{"jsonrpc":"2.0","method":"tools/call","params":{"name":"read_relevant_sticky_notes","arguments":{}},"id":3}"#;
        let req: JsonRpcRequest = serde_json::from_str(request).unwrap();
        assert_eq!(req.method, "tools/call");

        let params: ToolCallParams = serde_json::from_value(req.params.unwrap()).unwrap();
        assert_eq!(params.name, "read_relevant_sticky_notes");
    }

    #[test]
    fn test_error_response() {
        let resp = JsonRpcResponse::error(
            Value::Number(1.into()),
            JsonRpcError::method_not_found("unknown"),
        );
        let json = serde_json::to_string(&resp).unwrap();
        assert!(json.contains("\"error\""));
        assert!(json.contains("-32601"));
    }

    #[tokio::test]
    async fn test_initialize() {
        let mut server = server(&[]);
        let resp = server.handle_message(INIT).await.unwrap();
        let result = resp.result.unwrap();
        assert_eq!(result["serverInfo"]["name"], "sticky-notes");
        assert_eq!(result["protocolVersion"], PROTOCOL_VERSION);
        assert_eq!(result["capabilities"]["tools"]["listChanged"], false);
    }

    #[tokio::test]
    async fn test_tools_list_requires_initialize() {
        let mut server = server(&[]);
        let resp = server
            .handle_message(r#"{"jsonrpc":"2.0","method":"tools/list","id":2}"#)
            .await
            .unwrap();
        assert_eq!(resp.error.unwrap().code, JsonRpcError::INVALID_REQUEST);
    }

    #[tokio::test]
    async fn test_tools_list() {
        let mut server = initialized(&[]).await;
        let resp = server
            .handle_message(r#"{"jsonrpc":"2.0","method":"tools/list","id":2}"#)
            .await
            .unwrap();
        let tools = resp.result.unwrap()["tools"].as_array().unwrap().clone();
        assert_eq!(tools.len(), 2);
    }

    #[tokio::test]
    async fn test_notification_has_no_response() {
        let mut server = server(&[]);
        let resp = server
            .handle_message(r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#)
            .await;
        assert!(resp.is_none());
    }

    #[tokio::test]
    async fn test_parse_error() {
        let mut server = server(&[]);
        let resp = server.handle_message("{not json").await.unwrap();
        assert_eq!(resp.id, Value::Null);
        assert_eq!(resp.error.unwrap().code, JsonRpcError::PARSE_ERROR);
    }

    #[tokio::test]
    async fn test_unknown_method() {
        let mut server = initialized(&[]).await;
        let resp = server
            .handle_message(r#"{"jsonrpc":"2.0","method":"resources/list","id":"a"}"#)
            .await
            .unwrap();
        assert_eq!(resp.id, json!("a"));
        assert_eq!(resp.error.unwrap().code, JsonRpcError::METHOD_NOT_FOUND);
    }

    #[tokio::test]
    async fn test_tools_call_missing_params() {
        let mut server = initialized(&[]).await;
        let resp = server
            .handle_message(r#"{"jsonrpc":"2.0","method":"tools/call","id":4}"#)
            .await
            .unwrap();
        assert_eq!(resp.error.unwrap().code, JsonRpcError::INVALID_PARAMS);
    }

    #[tokio::test]
    async fn test_tools_call_requires_initialize() {
        let mut server = server(&["deploy"]);
        let msg = call(3, "read_relevant_sticky_notes", json!({}));
        let resp = server.handle_message(&msg).await.unwrap();
        assert_eq!(resp.error.unwrap().code, JsonRpcError::INVALID_REQUEST);
    }

    #[tokio::test]
    async fn test_initialize_without_params() {
        let mut server = server(&[]);
        let resp = server
            .handle_message(r#"{"jsonrpc":"2.0","method":"initialize","id":1}"#)
            .await
            .unwrap();
        assert_eq!(resp.result.unwrap()["serverInfo"]["name"], SERVER_NAME);

        let resp = server
            .handle_message(r#"{"jsonrpc":"2.0","method":"tools/list","id":2}"#)
            .await
            .unwrap();
        assert!(resp.error.is_none());
    }

    #[tokio::test]
    async fn test_initialize_rejects_malformed_params() {
        let mut server = server(&[]);
        let resp = server
            .handle_message(r#"{"jsonrpc":"2.0","method":"initialize","params":{"protocolVersion":7},"id":1}"#)
            .await
            .unwrap();
        assert_eq!(resp.error.unwrap().code, JsonRpcError::INVALID_PARAMS);
    }

    #[tokio::test]
    async fn test_tools_call_create() {
        let mut server = initialized(&["deploying now"]).await;
        let msg = call(
            5,
            "create_sticky_note",
            json!({"message": "check staging", "context_regex": "deploy", "note_id": "n1"}),
        );
        let resp = server.handle_message(&msg).await.unwrap();
        let result: ToolCallResult = serde_json::from_value(resp.result.unwrap()).unwrap();
        assert!(!result.is_error);

        let payload: Value = serde_json::from_str(result.text().unwrap()).unwrap();
        assert_eq!(payload["id"], "n1");
        assert_eq!(payload["trigger_snippets"], json!(["deploying now"]));
    }

    #[tokio::test]
    async fn test_tool_failure_is_error_result() {
        let mut server = initialized(&[]).await;
        let msg = call(
            6,
            "create_sticky_note",
            json!({"message": "m", "context_regex": "("}),
        );
        let resp = server.handle_message(&msg).await.unwrap();
        assert!(resp.error.is_none());
        let result: ToolCallResult = serde_json::from_value(resp.result.unwrap()).unwrap();
        assert!(result.is_error);
        assert!(result.text().unwrap().contains("Invalid regular expression"));
    }

    #[tokio::test]
    async fn test_serve_writes_one_line_per_response() {
        let mut server = server(&[]);
        let input = format!(
            "{}\n{}\n\n{}\n",
            INIT,
            r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#,
            r#"{"jsonrpc":"2.0","method":"ping","id":9}"#
        );
        let mut output = Vec::new();
        server.serve(input.as_bytes(), &mut output).await.unwrap();

        let text = String::from_utf8(output).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        let ping: JsonRpcResponse = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(ping.id, json!(9));
        assert_eq!(ping.result.unwrap(), json!({}));
    }
}
