//! Sticky Notes module
//!
//! Notes an agent leaves for its future self. Each note carries a context
//! regex; a relevance query surfaces the notes whose regex matches the
//! current session, at most once per session.

pub mod jsonl;
pub mod manager;
pub mod mock;
pub mod models;
pub mod relevance;
pub mod seen;
pub mod store;

pub use jsonl::JsonlNoteStore;
pub use manager::StickyNoteManager;
pub use mock::MockNoteStore;
pub use models::*;
pub use seen::{InMemorySeenStore, JsonlSeenStore, SeenRecord, SeenStore};
pub use store::NoteStore;
