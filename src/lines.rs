//! Line splitting for append-only logs
//!
//! Logs are read while other processes append to them, so a read can end
//! in the middle of a record or a multi-byte character. Each line is
//! decoded on its own; a bad byte costs its line, never the file.

use std::str::Utf8Error;

/// Non-blank lines of `raw`, trimmed, with their 1-based line numbers.
pub(crate) fn log_lines(
    raw: &[u8],
) -> impl Iterator<Item = (usize, Result<&str, Utf8Error>)> + '_ {
    raw.split(|b| *b == b'\n')
        .enumerate()
        .map(|(i, line)| (i + 1, std::str::from_utf8(line).map(str::trim)))
        .filter(|(_, line)| !matches!(line, Ok("")))
}
