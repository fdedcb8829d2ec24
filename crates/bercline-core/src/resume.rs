//! Resume support for file-per-key streams.
//!
//! The set of `<key>.<ext>` files already on disk tells a re-run where to
//! continue and which keys below the high-water mark still need a retry.

use std::collections::BTreeSet;
use std::path::Path;

/// Where a stream should pick up.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResumePoint {
    /// Highest key already persisted (0 = fresh stream)
    pub last_key: u32,
    /// Records/resources already persisted
    pub records: usize,
}

impl ResumePoint {
    pub fn start_key(&self) -> u32 {
        self.last_key + 1
    }
}

/// Collect the numeric stems of `*.{ext}` files in `dir`.
///
/// A missing directory is an empty stream, not an error. Files whose stem
/// is not a number are ignored.
pub fn numbered_keys(dir: &Path, ext: &str) -> std::io::Result<BTreeSet<u32>> {
    let mut keys = BTreeSet::new();
    if !dir.exists() {
        return Ok(keys);
    }
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.extension().is_some_and(|e| e == ext) {
            if let Some(n) = path
                .file_stem()
                .and_then(|s| s.to_str())
                .and_then(|s| s.parse::<u32>().ok())
            {
                keys.insert(n);
            }
        }
    }
    Ok(keys)
}

/// Keys in `1..=high` absent from `keys` — the gap-recovery work list.
pub fn missing_below(keys: &BTreeSet<u32>, high: u32) -> Vec<u32> {
    (1..=high).filter(|k| !keys.contains(k)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn missing_dir_is_empty_stream() {
        let dir = TempDir::new().unwrap();
        let keys = numbered_keys(&dir.path().join("nope"), "pdf").unwrap();
        assert!(keys.is_empty());
    }

    #[test]
    fn collects_numeric_stems_only() {
        let dir = TempDir::new().unwrap();
        for name in ["1.pdf", "7.pdf", "42.pdf", "notes.pdf", "3.txt"] {
            std::fs::write(dir.path().join(name), b"x").unwrap();
        }
        let keys = numbered_keys(dir.path(), "pdf").unwrap();
        assert_eq!(keys.into_iter().collect::<Vec<_>>(), vec![1, 7, 42]);
    }

    #[test]
    fn missing_below_finds_gaps() {
        let keys: BTreeSet<u32> = [1, 2, 4, 5, 8].into_iter().collect();
        assert_eq!(missing_below(&keys, 8), vec![3, 6, 7]);
        assert_eq!(missing_below(&keys, 2), Vec::<u32>::new());
    }

    #[test]
    fn missing_below_zero_high_is_empty() {
        let keys = BTreeSet::new();
        assert_eq!(missing_below(&keys, 0), Vec::<u32>::new());
    }

    #[test]
    fn resume_point_start_key() {
        assert_eq!(ResumePoint::default().start_key(), 1);
        assert_eq!(
            ResumePoint {
                last_key: 41,
                records: 12
            }
            .start_key(),
            42
        );
    }
}
