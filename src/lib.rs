//! Sticky Notes
//!
//! An MCP server that lets an agent leave notes for its future self:
//! - Notes carry a context regex and are stored in an append-only JSONL log
//! - Session history providers normalize agent framework logs into snippets
//! - A relevance engine surfaces matching notes, once per session
//! - MCP server for Codex, Copilot and other MCP clients

pub mod error;
pub mod history;
mod lines;
pub mod mcp;
pub mod notes;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use error::StickyNoteError;

use anyhow::{Context, Result};
use history::ProviderRegistry;
use notes::{InMemorySeenStore, JsonlNoteStore, JsonlSeenStore, SeenStore, StickyNoteManager};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub const ENV_FRAMEWORK: &str = "MCP_AGENT_FRAMEWORK";
pub const ENV_NOTES_DIR: &str = "STICKY_NOTES_DIR";
pub const ENV_HISTORY_DIR: &str = "SESSION_HISTORY_DIR";
pub const ENV_SESSION_ID: &str = "STICKY_NOTES_SESSION_ID";
pub const ENV_PERSIST_SEEN: &str = "STICKY_NOTES_PERSIST_SEEN";

pub const DEFAULT_FRAMEWORK: &str = "codex";
const DEFAULT_CONFIG_FILE: &str = "sticky-notes.yaml";
const NOTES_FILE: &str = "sticky_notes.jsonl";
const SEEN_FILE: &str = "seen_notes.jsonl";

// ============================================================================
// YAML config structs (deserialization targets)
// ============================================================================

/// Top-level YAML configuration file structure
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct YamlConfig {
    pub framework: Option<String>,
    pub notes_dir: Option<String>,
    pub history_dir: Option<String>,
    pub session_id: Option<String>,
    pub persist_seen_state: Option<bool>,
}

// ============================================================================
// Runtime config (what the application actually uses)
// ============================================================================

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// History provider name (`codex`, `copilot`, ...)
    pub framework: String,
    pub notes_dir: PathBuf,
    pub history_dir: PathBuf,
    /// Preferred session id when resolving the current session
    pub session_id: Option<String>,
    /// Persist seen-state to disk instead of keeping it in memory
    pub persist_seen_state: bool,
}

impl Config {
    /// Load configuration from environment variables only.
    /// Equivalent to from_yaml_and_env(None).
    pub fn from_env() -> Result<Self> {
        Self::from_yaml_and_env(None)
    }

    /// Load configuration from an optional YAML file, then override with env vars.
    ///
    /// Priority: env var > YAML > default
    ///
    /// If `yaml_path` is None, tries "sticky-notes.yaml" in CWD. If the file
    /// doesn't exist, falls back to pure env var / defaults.
    pub fn from_yaml_and_env(yaml_path: Option<&Path>) -> Result<Self> {
        let yaml = Self::load_yaml(yaml_path);
        let cwd = std::env::current_dir().context("Failed to read current directory")?;

        let framework = env_var(ENV_FRAMEWORK)
            .or(yaml.framework)
            .unwrap_or_else(|| DEFAULT_FRAMEWORK.to_string())
            .trim()
            .to_lowercase();

        let notes_dir = env_var(ENV_NOTES_DIR)
            .or(yaml.notes_dir)
            .map(|p| expand_path(&p))
            .unwrap_or_else(|| cwd.join("data").join("sticky_notes"));

        let history_dir = env_var(ENV_HISTORY_DIR)
            .or(yaml.history_dir)
            .map(|p| expand_path(&p))
            .unwrap_or_else(|| cwd.join("data").join("history"));

        let persist_seen_state = env_var(ENV_PERSIST_SEEN)
            .and_then(|v| parse_bool(&v))
            .or(yaml.persist_seen_state)
            .unwrap_or(true);

        Ok(Self {
            framework,
            notes_dir,
            history_dir,
            session_id: env_var(ENV_SESSION_ID).or(yaml.session_id),
            persist_seen_state,
        })
    }

    /// Path to the JSONL file that stores sticky notes.
    pub fn notes_file(&self) -> PathBuf {
        self.notes_dir.join(NOTES_FILE)
    }

    /// Path to the JSONL file that stores seen-state.
    pub fn seen_file(&self) -> PathBuf {
        self.notes_dir.join(SEEN_FILE)
    }

    /// Try to load and parse a YAML config file. Returns defaults on any failure.
    fn load_yaml(yaml_path: Option<&Path>) -> YamlConfig {
        let default_path = Path::new(DEFAULT_CONFIG_FILE);
        let path = yaml_path.unwrap_or(default_path);

        match std::fs::read_to_string(path) {
            Ok(contents) => match serde_yaml::from_str(&contents) {
                Ok(config) => {
                    tracing::info!("Loaded config from {}", path.display());
                    config
                }
                Err(e) => {
                    tracing::warn!("Failed to parse {}: {}. Using defaults.", path.display(), e);
                    YamlConfig::default()
                }
            },
            Err(_) => {
                tracing::debug!(
                    "No config file at {}, using env vars / defaults",
                    path.display()
                );
                YamlConfig::default()
            }
        }
    }
}

fn env_var(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Expand a leading `~` to the home directory.
pub fn expand_path(raw: &str) -> PathBuf {
    let raw = raw.trim();
    if raw == "~" {
        return dirs::home_dir().unwrap_or_else(|| PathBuf::from(raw));
    }
    if let Some(rest) = raw.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(raw)
}

// ============================================================================
// Application state
// ============================================================================

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub manager: Arc<StickyNoteManager>,
    pub config: Arc<Config>,
}

impl AppState {
    /// Build the state with the built-in history providers.
    pub async fn new(config: Config) -> Result<Self> {
        Self::with_registry(config, &ProviderRegistry::with_defaults()).await
    }

    /// Resolve the configured provider from `registry` and open the stores.
    pub async fn with_registry(config: Config, registry: &ProviderRegistry) -> Result<Self> {
        let history = registry.resolve(&config.framework, &config.history_dir)?;

        let notes = Arc::new(
            JsonlNoteStore::open(config.notes_file())
                .await
                .context("Failed to open sticky note store")?,
        );

        let seen: Arc<dyn SeenStore> = if config.persist_seen_state {
            Arc::new(
                JsonlSeenStore::open(config.seen_file())
                    .await
                    .context("Failed to open seen-state log")?,
            )
        } else {
            Arc::new(InMemorySeenStore::new())
        };

        tracing::info!(
            framework = %config.framework,
            notes = %config.notes_file().display(),
            history = %config.history_dir.display(),
            persist_seen_state = config.persist_seen_state,
            "Sticky notes initialized"
        );

        let manager =
            StickyNoteManager::new(notes, seen, history).with_session_hint(config.session_id.clone());

        Ok(Self {
            manager: Arc::new(manager),
            config: Arc::new(config),
        })
    }
}

// ============================================================================
// Tests
// ============================================================================
