// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Journal of copied files for undo support

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::Result;

/// A single copy into a category folder
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub id: String,
    pub run_id: String,
    pub timestamp: DateTime<Utc>,
    pub source_path: PathBuf,
    pub dest_path: PathBuf,
    pub category: String,
    pub file_hash: String,
    pub undone: bool,
}

impl HistoryEntry {
    pub fn new(
        run_id: &str,
        source_path: PathBuf,
        dest_path: PathBuf,
        category: String,
        file_hash: String,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            run_id: run_id.to_string(),
            timestamp: Utc::now(),
            source_path,
            dest_path,
            category,
            file_hash,
            undone: false,
        }
    }
}

/// What happened to one entry during undo
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UndoOutcome {
    Removed(PathBuf),
    WouldRemove(PathBuf),
    Missing(PathBuf),
    Modified(PathBuf),
    Failed(PathBuf, String),
}

/// History manager backed by a JSONL file
pub struct History {
    path: PathBuf,
}

impl History {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Append an entry to the history
    pub fn append(&self, entry: &HistoryEntry) -> Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;

        let json = serde_json::to_string(entry)?;
        writeln!(file, "{}", json)?;

        Ok(())
    }

    /// Read all history entries
    pub fn read_all(&self) -> Result<Vec<HistoryEntry>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let file = File::open(&self.path)?;
        let reader = BufReader::new(file);

        let mut entries = Vec::new();
        for line in reader.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str(&line) {
                Ok(entry) => entries.push(entry),
                Err(e) => {
                    warn!("Failed to parse history entry: {}", e);
                }
            }
        }

        Ok(entries)
    }

    /// Get the most recent N entries (newest first)
    pub fn get_recent(&self, count: usize) -> Result<Vec<HistoryEntry>> {
        let mut entries = self.read_all()?;
        entries.reverse();
        entries.truncate(count);
        Ok(entries)
    }

    fn rewrite(&self, entries: &[HistoryEntry]) -> Result<()> {
        let file = File::create(&self.path)?;
        let mut writer = std::io::BufWriter::new(file);

        for entry in entries {
            let json = serde_json::to_string(entry)?;
            writeln!(writer, "{}", json)?;
        }
        writer.flush()?;

        Ok(())
    }

    /// Remove the copies made by the newest `count` live entries
    ///
    /// A copy is only deleted while its content still matches the recorded
    /// hash. Missing or modified copies are retired without deleting
    /// anything, so later calls move on to older entries. Source files are
    /// never touched.
    pub fn undo(&self, count: usize, dry_run: bool) -> Result<Vec<UndoOutcome>> {
        let mut entries = self.read_all()?;
        let mut outcomes = Vec::new();

        for entry in entries.iter_mut().rev().filter(|e| !e.undone).take(count) {
            let outcome = undo_entry(entry, dry_run);
            match &outcome {
                UndoOutcome::Removed(_) | UndoOutcome::Missing(_) | UndoOutcome::Modified(_) => {
                    entry.undone = !dry_run;
                }
                UndoOutcome::WouldRemove(_) | UndoOutcome::Failed(..) => {}
            }
            outcomes.push(outcome);
        }

        if !dry_run {
            self.rewrite(&entries)?;
        }

        Ok(outcomes)
    }

    /// Clear all history
    pub fn clear(&self) -> Result<()> {
        if self.path.exists() {
            fs::remove_file(&self.path)?;
        }
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn undo_entry(entry: &HistoryEntry, dry_run: bool) -> UndoOutcome {
    let dest = entry.dest_path.clone();

    if !dest.exists() {
        warn!("Copy not found (may have been moved/deleted): {:?}", dest);
        return UndoOutcome::Missing(dest);
    }

    match hash_file(&dest) {
        Ok(hash) if hash == entry.file_hash => {}
        Ok(_) => {
            warn!("Copy changed since it was written, leaving it: {:?}", dest);
            return UndoOutcome::Modified(dest);
        }
        Err(e) => {
            warn!("Cannot read copy {:?}: {}", dest, e);
            return UndoOutcome::Failed(dest, e.to_string());
        }
    }

    if dry_run {
        return UndoOutcome::WouldRemove(dest);
    }

    match fs::remove_file(&dest) {
        Ok(()) => {
            info!("Removed copy: {:?}", dest);
            UndoOutcome::Removed(dest)
        }
        Err(e) => {
            warn!("Failed to remove copy {:?}: {}", dest, e);
            UndoOutcome::Failed(dest, e.to_string())
        }
    }
}

/// blake3 hex digest of a file's content
pub fn hash_file(path: &Path) -> Result<String> {
    let data = fs::read(path)?;
    Ok(blake3::hash(&data).to_hex().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(history: &History, dir: &Path, name: &str, content: &[u8]) -> PathBuf {
        let source = dir.join(format!("src_{}", name));
        let dest = dir.join(name);
        fs::write(&source, content).unwrap();
        fs::write(&dest, content).unwrap();
        let entry = HistoryEntry::new(
            "run",
            source,
            dest.clone(),
            "Cats".to_string(),
            hash_file(&dest).unwrap(),
        );
        history.append(&entry).unwrap();
        dest
    }

    #[test]
    fn test_recent_is_newest_first() {
        let dir = tempfile::tempdir().unwrap();
        let history = History::new(dir.path().join("h.jsonl"));
        record(&history, dir.path(), "0.png", b"a");
        record(&history, dir.path(), "1.png", b"b");

        let recent = history.get_recent(1).unwrap();
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].dest_path, dir.path().join("1.png"));
    }

    #[test]
    fn test_undo_removes_copy_and_keeps_source() {
        let dir = tempfile::tempdir().unwrap();
        let history = History::new(dir.path().join("h.jsonl"));
        let dest = record(&history, dir.path(), "0.png", b"a");

        let outcomes = history.undo(1, false).unwrap();
        assert_eq!(outcomes, vec![UndoOutcome::Removed(dest.clone())]);
        assert!(!dest.exists());
        assert!(dir.path().join("src_0.png").exists());
        assert!(history.read_all().unwrap()[0].undone);

        // Nothing left to undo
        assert!(history.undo(1, false).unwrap().is_empty());
    }

    #[test]
    fn test_undo_skips_modified_copy() {
        let dir = tempfile::tempdir().unwrap();
        let history = History::new(dir.path().join("h.jsonl"));
        let dest = record(&history, dir.path(), "0.png", b"a");
        fs::write(&dest, b"overwritten by a later run").unwrap();

        let outcomes = history.undo(1, false).unwrap();
        assert_eq!(outcomes, vec![UndoOutcome::Modified(dest.clone())]);
        assert!(dest.exists());
    }

    #[test]
    fn test_undo_moves_past_missing_copy() {
        let dir = tempfile::tempdir().unwrap();
        let history = History::new(dir.path().join("h.jsonl"));
        let older = record(&history, dir.path(), "0.png", b"a");
        let newer = record(&history, dir.path(), "1.png", b"b");
        fs::remove_file(&newer).unwrap();

        assert_eq!(history.undo(1, false).unwrap(), vec![UndoOutcome::Missing(newer)]);
        assert_eq!(history.undo(1, false).unwrap(), vec![UndoOutcome::Removed(older.clone())]);
        assert!(!older.exists());
        assert!(history.read_all().unwrap().iter().all(|e| e.undone));
    }

    #[test]
    fn test_undo_failure_still_saves_earlier_removals() {
        let dir = tempfile::tempdir().unwrap();
        let history = History::new(dir.path().join("h.jsonl"));
        let older = record(&history, dir.path(), "0.png", b"a");
        let newer = record(&history, dir.path(), "1.png", b"b");

        // A directory where the older copy was makes reading it fail
        fs::remove_file(&older).unwrap();
        fs::create_dir(&older).unwrap();

        let outcomes = history.undo(2, false).unwrap();
        assert_eq!(outcomes[0], UndoOutcome::Removed(newer));
        assert!(matches!(&outcomes[1], UndoOutcome::Failed(p, _) if *p == older));

        let entries = history.read_all().unwrap();
        assert!(!entries[0].undone);
        assert!(entries[1].undone);
    }

    #[test]
    fn test_undo_dry_run_changes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let history = History::new(dir.path().join("h.jsonl"));
        let dest = record(&history, dir.path(), "0.png", b"a");

        let outcomes = history.undo(5, true).unwrap();
        assert_eq!(outcomes, vec![UndoOutcome::WouldRemove(dest.clone())]);
        assert!(dest.exists());
        assert!(!history.read_all().unwrap()[0].undone);
    }

    #[test]
    fn test_clear_missing_file_is_ok() {
        let dir = tempfile::tempdir().unwrap();
        let history = History::new(dir.path().join("none.jsonl"));
        assert!(history.clear().is_ok());
        assert!(history.read_all().unwrap().is_empty());
    }
}
