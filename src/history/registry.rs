//! Provider registry
//!
//! Maps a configured framework name to a factory building the matching
//! [`SessionHistoryProvider`]. New frameworks are added with
//! [`ProviderRegistry::register`]; nothing downstream changes.

use super::codex::CodexHistoryProvider;
use super::copilot::CopilotHistoryProvider;
use super::traits::SessionHistoryProvider;
use crate::error::{Result, StickyNoteError};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

/// Builds a provider reading history below the given root.
pub type ProviderFactory = fn(&Path) -> Arc<dyn SessionHistoryProvider>;

fn codex_provider(root: &Path) -> Arc<dyn SessionHistoryProvider> {
    Arc::new(CodexHistoryProvider::new(root))
}

fn copilot_provider(root: &Path) -> Arc<dyn SessionHistoryProvider> {
    Arc::new(CopilotHistoryProvider::new(root))
}

/// Name → factory table for session history providers
#[derive(Clone)]
pub struct ProviderRegistry {
    factories: BTreeMap<String, ProviderFactory>,
}

impl ProviderRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self {
            factories: BTreeMap::new(),
        }
    }

    /// Registry with the built-in `codex` and `copilot` providers.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(CodexHistoryProvider::NAME, codex_provider);
        registry.register(CopilotHistoryProvider::NAME, copilot_provider);
        registry
    }

    /// Register (or replace) a provider factory.
    pub fn register(&mut self, name: &str, factory: ProviderFactory) {
        self.factories.insert(normalize(name), factory);
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<&str> {
        self.factories.keys().map(String::as_str).collect()
    }

    /// Instantiate the provider registered under `name`.
    pub fn resolve(&self, name: &str, history_root: &Path) -> Result<Arc<dyn SessionHistoryProvider>> {
        let key = normalize(name);
        match self.factories.get(&key) {
            Some(factory) => {
                tracing::debug!(provider = %key, root = %history_root.display(), "Resolved history provider");
                Ok(factory(history_root))
            }
            None => {
                let known = if self.factories.is_empty() {
                    "<none>".to_string()
                } else {
                    self.names().join(", ")
                };
                Err(StickyNoteError::UnknownProvider {
                    name: name.to_string(),
                    known,
                })
            }
        }
    }
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

fn normalize(name: &str) -> String {
    name.trim().to_lowercase()
}
