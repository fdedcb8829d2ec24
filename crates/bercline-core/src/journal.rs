//! JSON-lines error journal for offline diagnosis.
//!
//! Malformed responses and exhausted retries get their full request
//! context appended here, so a failed probe leaves more than a counter.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::Serialize;

/// One journaled failure.
#[derive(Debug, Serialize)]
pub struct JournalEntry {
    pub url: String,
    pub kind: String,
    pub message: String,
    pub attempt: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response: Option<String>,
}

/// Append-only journal; safe to share across workers.
pub struct ErrorJournal {
    path: PathBuf,
    file: Mutex<Option<File>>,
}

impl ErrorJournal {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            file: Mutex::new(None),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one entry, stamping it with the current time.
    ///
    /// Journal write failures are themselves only logged; diagnosis must
    /// never take the harvest down.
    pub fn record(&self, entry: &JournalEntry) {
        #[derive(Serialize)]
        struct Stamped<'a> {
            timestamp: String,
            #[serde(flatten)]
            entry: &'a JournalEntry,
        }
        let stamped = Stamped {
            timestamp: chrono::Local::now().to_rfc3339(),
            entry,
        };
        let line = match serde_json::to_string(&stamped) {
            Ok(l) => l,
            Err(e) => {
                log::warn!("error journal: cannot serialize entry: {e}");
                return;
            }
        };

        let mut guard = match self.file.lock() {
            Ok(g) => g,
            Err(poisoned) => poisoned.into_inner(),
        };
        if guard.is_none() {
            match OpenOptions::new().create(true).append(true).open(&self.path) {
                Ok(f) => *guard = Some(f),
                Err(e) => {
                    log::warn!("error journal: cannot open {}: {e}", self.path.display());
                    return;
                }
            }
        }
        if let Some(file) = guard.as_mut() {
            if let Err(e) = writeln!(file, "{line}") {
                log::warn!("error journal: write failed: {e}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn records_are_json_lines() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("errors.jsonl");
        let journal = ErrorJournal::new(&path);
        journal.record(&JournalEntry {
            url: "https://example.test/api".to_string(),
            kind: "Malformed".to_string(),
            message: "not JSON".to_string(),
            attempt: 1,
            payload: Some(serde_json::json!({"number": "42"})),
            response: Some("<html>".to_string()),
        });
        journal.record(&JournalEntry {
            url: "https://example.test/api".to_string(),
            kind: "Http".to_string(),
            message: "HTTP 503".to_string(),
            attempt: 2,
            payload: None,
            response: None,
        });

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        let first: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first["kind"], "Malformed");
        assert_eq!(first["payload"]["number"], "42");
        assert!(first["timestamp"].is_string());
        let second: serde_json::Value = serde_json::from_str(lines[1]).unwrap();
        assert!(second.get("payload").is_none());
    }

    #[test]
    fn unwritable_journal_does_not_panic() {
        let journal = ErrorJournal::new("/nonexistent-dir/errors.jsonl");
        journal.record(&JournalEntry {
            url: "u".to_string(),
            kind: "Http".to_string(),
            message: "m".to_string(),
            attempt: 1,
            payload: None,
            response: None,
        });
    }
}
