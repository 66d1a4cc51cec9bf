//! Relevance engine
//!
//! Decides which notes apply to a session. Matching is existence-based: a
//! snippet matches when the note's pattern is found anywhere in its text.

use super::models::{RelevantNote, StickyNote};
use super::seen::SeenStore;
use crate::error::Result;
use crate::history::Snippet;
use regex::Regex;

/// Texts of the snippets matching `pattern`, in stream order.
pub fn matching_snippets(pattern: &Regex, snippets: &[Snippet]) -> Vec<String> {
    snippets
        .iter()
        .filter(|s| !s.text.is_empty() && pattern.is_match(&s.text))
        .map(|s| s.text.clone())
        .collect()
}

/// Creation-time matches for a note. Ignores seen-state entirely.
pub fn match_on_create(note: &StickyNote, snippets: &[Snippet]) -> Result<Vec<String>> {
    Ok(matching_snippets(&note.regex()?, snippets))
}

/// Notes not yet seen by `session_id` that match the current stream.
///
/// Every returned note is marked seen, and only returned notes are. Notes
/// without matches are left unmarked so they stay eligible once the
/// session grows. Output follows the order of `notes`.
///
/// Marking stops at the first failure: the notes marked so far are
/// returned, the rest stay unseen. The error propagates only when nothing
/// could be marked.
pub async fn relevant_unseen(
    session_id: &str,
    snippets: &[Snippet],
    notes: &[StickyNote],
    seen: &dyn SeenStore,
) -> Result<Vec<RelevantNote>> {
    let mut candidates = unseen_matches(session_id, snippets, notes, seen).await?;

    let mut delivered = candidates.len();
    for (marked, note) in candidates.iter().enumerate() {
        if let Err(e) = seen.mark_seen(session_id, &note.note_id).await {
            if marked == 0 {
                return Err(e);
            }
            tracing::warn!(
                session_id,
                note_id = %note.note_id,
                delivered = marked,
                error = %e,
                "Failed to record seen-state; deferring remaining notes"
            );
            delivered = marked;
            break;
        }
    }
    candidates.truncate(delivered);
    Ok(candidates)
}

/// Same selection as [`relevant_unseen`] without recording anything.
pub async fn unseen_matches(
    session_id: &str,
    snippets: &[Snippet],
    notes: &[StickyNote],
    seen: &dyn SeenStore,
) -> Result<Vec<RelevantNote>> {
    let mut results = Vec::new();

    for note in notes {
        if seen.has_seen(session_id, &note.id).await? {
            continue;
        }

        let pattern = match note.regex() {
            Ok(p) => p,
            Err(e) => {
                tracing::warn!(note_id = %note.id, error = %e, "Skipping note with invalid regex");
                continue;
            }
        };

        let matches = matching_snippets(&pattern, snippets);
        if matches.is_empty() {
            continue;
        }

        results.push(RelevantNote {
            note_id: note.id.clone(),
            message: note.message.clone(),
            trigger_snippets: matches,
        });
    }

    Ok(results)
}
