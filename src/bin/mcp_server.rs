//! MCP Server Binary
//!
//! Runs the sticky notes server over stdio for integration with Codex,
//! Copilot and other MCP clients.
//!
//! # Usage
//!
//! ```bash
//! # Run directly (Codex rollouts under ./data/history)
//! ./mcp_server
//!
//! # Point at a real Codex home
//! SESSION_HISTORY_DIR=~/.codex/sessions ./mcp_server
//!
//! # With debug logging
//! RUST_LOG=debug ./mcp_server
//! ```
//!
//! # Codex Integration
//!
//! Add to `~/.codex/config.toml`:
//!
//! ```toml
//! [mcp_servers.sticky-notes]
//! command = "/path/to/mcp_server"
//! env = { MCP_AGENT_FRAMEWORK = "codex", SESSION_HISTORY_DIR = "/home/me/.codex/sessions" }
//! ```

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use sticky_notes::mcp::McpServer;
use sticky_notes::{
    expand_path, AppState, Config, ENV_FRAMEWORK, ENV_HISTORY_DIR, ENV_NOTES_DIR,
    ENV_PERSIST_SEEN, ENV_SESSION_ID,
};
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// MCP Server for sticky notes
#[derive(Parser, Debug)]
#[command(name = "mcp_server")]
#[command(about = "MCP server exposing sticky note tools to coding agents")]
#[command(version)]
struct Args {
    /// YAML config file (defaults to ./sticky-notes.yaml when present)
    #[arg(long, short)]
    config: Option<PathBuf>,

    /// Agent framework whose session history is read (codex, copilot)
    #[arg(long, env = ENV_FRAMEWORK)]
    framework: Option<String>,

    /// Directory holding the sticky note logs
    #[arg(long, env = ENV_NOTES_DIR)]
    notes_dir: Option<String>,

    /// Root directory of the framework's session history
    #[arg(long, env = ENV_HISTORY_DIR)]
    history_dir: Option<String>,

    /// Preferred session id when several sessions are present
    #[arg(long, env = ENV_SESSION_ID)]
    session_id: Option<String>,

    /// Persist which notes each session has seen
    #[arg(long, env = ENV_PERSIST_SEEN, value_parser = clap::builder::BoolishValueParser::new())]
    persist_seen_state: Option<bool>,
}

impl Args {
    fn into_config(self) -> Result<Config> {
        let mut config = Config::from_yaml_and_env(self.config.as_deref())?;
        if let Some(framework) = self.framework {
            config.framework = framework.trim().to_lowercase();
        }
        if let Some(dir) = self.notes_dir {
            config.notes_dir = expand_path(&dir);
        }
        if let Some(dir) = self.history_dir {
            config.history_dir = expand_path(&dir);
        }
        if let Some(session_id) = self.session_id {
            config.session_id = Some(session_id);
        }
        if let Some(persist) = self.persist_seen_state {
            config.persist_seen_state = persist;
        }
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Initialize logging (to stderr to keep stdout clean for MCP)
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::from_default_env().add_directive("sticky_notes=info".parse()?))
        .init();

    let config = Args::parse().into_config()?;

    info!("Starting sticky notes MCP server");
    info!("Framework: {}", config.framework);
    info!("History: {}", config.history_dir.display());

    let state = match AppState::new(config).await {
        Ok(s) => s,
        Err(e) => {
            error!("Failed to create app state: {}", e);
            return Err(e);
        }
    };

    let mut server = McpServer::new(state.manager.clone());

    if let Err(e) = server.run().await {
        error!("MCP server error: {}", e);
        return Err(e);
    }

    Ok(())
}
