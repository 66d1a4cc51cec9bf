//! Session history module
//!
//! Normalizes agent framework session logs into a flat, ordered stream of
//! text snippets that sticky-note patterns are matched against.
//!
//! Architecture follows the project pattern (trait + impl + mock):
//! - `SessionHistoryProvider` trait: resolves the current session and its snippets
//! - `CodexHistoryProvider`, `CopilotHistoryProvider`: real log readers
//! - `MockHistoryProvider`: in-memory stream for tests
//! - `ProviderRegistry`: framework name → provider factory

pub mod codex;
pub mod copilot;
pub mod mock;
pub mod models;
pub mod registry;
pub mod traits;

pub use codex::CodexHistoryProvider;
pub use copilot::CopilotHistoryProvider;
pub use mock::MockHistoryProvider;
pub use models::*;
pub use registry::{ProviderFactory, ProviderRegistry};
pub use traits::SessionHistoryProvider;
