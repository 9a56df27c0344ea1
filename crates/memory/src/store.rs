//! The note store — an append-only text file of things the agent was
//! told to remember.
//!
//! `remember` appends one entry; `forget` rewrites the file without the
//! matching lines. Entries over the cap are flattened to a single line
//! and truncated with a `[truncated]` prefix so one giant paste can never
//! swamp the system prompt.

use std::path::{Path, PathBuf};

use gloop_core::MemoryError;
use tracing::{debug, warn};

/// Maximum stored length of a single entry, in characters.
pub const MEMORY_ENTRY_CAP: usize = 500;

const TRUNCATED_PREFIX: &str = "[truncated] ";

/// Compact an entry to fit the cap. Entries at or under the cap pass
/// through untouched; longer ones are single-lined, truncated, and
/// prefixed.
pub fn compact_entry(content: &str) -> String {
    let trimmed = content.trim();
    if trimmed.chars().count() <= MEMORY_ENTRY_CAP {
        return trimmed.to_string();
    }
    let flat = trimmed.split_whitespace().collect::<Vec<_>>().join(" ");
    let budget = MEMORY_ENTRY_CAP - TRUNCATED_PREFIX.chars().count();
    let body: String = flat.chars().take(budget).collect();
    format!("{TRUNCATED_PREFIX}{body}")
}

/// File-backed note store.
pub struct NoteStore {
    path: PathBuf,
}

impl NoteStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one entry.
    pub fn remember(&self, content: &str) -> Result<(), MemoryError> {
        let entry = compact_entry(content);
        if entry.is_empty() {
            return Ok(());
        }
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                MemoryError::Storage(format!("Failed to create memory directory: {e}"))
            })?;
        }
        let mut notes = self.load();
        if !notes.is_empty() && !notes.ends_with('\n') {
            notes.push('\n');
        }
        notes.push_str(&entry);
        notes.push('\n');
        std::fs::write(&self.path, notes)
            .map_err(|e| MemoryError::Storage(format!("Failed to write memory file: {e}")))?;
        debug!(path = %self.path.display(), "memory entry appended");
        Ok(())
    }

    /// Rewrite the file without the lines matching `content`.
    pub fn forget(&self, content: &str) -> Result<(), MemoryError> {
        let needle = content.trim();
        if needle.is_empty() {
            return Ok(());
        }
        let notes = self.load();
        if notes.is_empty() {
            return Ok(());
        }
        let kept: Vec<&str> = notes
            .lines()
            .filter(|line| !line.contains(needle))
            .collect();
        let removed = notes.lines().count() - kept.len();
        if removed == 0 {
            warn!(needle, "forget matched no memory entries");
            return Ok(());
        }
        let mut rewritten = kept.join("\n");
        if !rewritten.is_empty() {
            rewritten.push('\n');
        }
        std::fs::write(&self.path, rewritten)
            .map_err(|e| MemoryError::Storage(format!("Failed to rewrite memory file: {e}")))?;
        debug!(removed, "memory entries forgotten");
        Ok(())
    }

    /// The full note text, or empty if the file does not exist yet.
    pub fn notes(&self) -> String {
        self.load()
    }

    fn load(&self) -> String {
        std::fs::read_to_string(&self.path).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn store() -> (tempfile::TempDir, NoteStore) {
        let dir = tempdir().unwrap();
        let store = NoteStore::new(dir.path().join("memory.md"));
        (dir, store)
    }

    #[test]
    fn compact_keeps_short_entries_verbatim() {
        assert_eq!(compact_entry("likes rust"), "likes rust");
        assert_eq!(compact_entry("  padded  "), "padded");
        // Short multi-line entries keep their newlines
        assert_eq!(compact_entry("a\nb"), "a\nb");
    }

    #[test]
    fn compact_caps_length_for_all_inputs() {
        for len in [0, 1, 499, 500, 501, 2000, 10_000] {
            let input = "x".repeat(len);
            assert!(compact_entry(&input).chars().count() <= MEMORY_ENTRY_CAP);
        }
    }

    #[test]
    fn compact_single_lines_oversized_entries() {
        let input = format!("line one\nline two\n{}", "z".repeat(600));
        let out = compact_entry(&input);
        assert!(out.starts_with("[truncated] line one line two"));
        assert!(!out.contains('\n'));
        assert_eq!(out.chars().count(), MEMORY_ENTRY_CAP);
    }

    #[test]
    fn remember_appends_in_order() {
        let (_dir, store) = store();
        store.remember("first").unwrap();
        store.remember("second").unwrap();
        assert_eq!(store.notes(), "first\nsecond\n");
    }

    #[test]
    fn forget_rewrites_without_matches() {
        let (_dir, store) = store();
        store.remember("keep me").unwrap();
        store.remember("drop me please").unwrap();
        store.remember("also keep").unwrap();
        store.forget("drop me").unwrap();
        assert_eq!(store.notes(), "keep me\nalso keep\n");
    }

    #[test]
    fn forget_with_no_match_is_noop() {
        let (_dir, store) = store();
        store.remember("only entry").unwrap();
        store.forget("absent").unwrap();
        assert_eq!(store.notes(), "only entry\n");
    }

    #[test]
    fn forget_everything_leaves_empty_file() {
        let (_dir, store) = store();
        store.remember("a thing").unwrap();
        store.forget("a thing").unwrap();
        assert_eq!(store.notes(), "");
    }

    #[test]
    fn missing_file_reads_empty() {
        let (_dir, store) = store();
        assert_eq!(store.notes(), "");
    }

    #[test]
    fn empty_remember_is_skipped() {
        let (_dir, store) = store();
        store.remember("   ").unwrap();
        assert_eq!(store.notes(), "");
    }
}
