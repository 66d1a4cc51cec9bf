//! MCP (Model Context Protocol) server implementation
//!
//! Exposes the sticky note manager as two tools for Codex, Copilot and
//! other MCP clients.

pub mod handlers;
pub mod protocol;
pub mod server;
pub mod tools;

pub use handlers::ToolHandler;
pub use protocol::*;
pub use server::McpServer;
