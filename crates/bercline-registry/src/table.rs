//! Per-county JSON tables: one array file per county, merged on flush.

use std::path::{Path, PathBuf};

use anyhow::Context;
use bercline_core::{PartitionStore, ResumePoint};

use crate::api::Article;

/// Durable store writing `counties/<County>.json` array files.
///
/// Appends read the existing array, extend it, and write back through a
/// tmp file + rename so a crash never leaves a half-written table.
pub struct JsonTable {
    root: PathBuf,
}

impl JsonTable {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn path(&self, county: &str) -> PathBuf {
        self.root.join(format!("{county}.json"))
    }

    fn read_existing(&self, path: &Path) -> std::io::Result<Vec<Article>> {
        if !path.exists() {
            return Ok(Vec::new());
        }
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content).map_err(|e| {
            std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                format!("{} is not a valid table: {e}", path.display()),
            )
        })
    }

    /// Every publication number persisted for `county`, serving as the
    /// gap-recovery ledger when that pass is enabled for this stream.
    pub fn persisted_keys(&self, county: &str) -> anyhow::Result<std::collections::BTreeSet<u32>> {
        let path = self.path(county);
        if !path.exists() {
            return Ok(Default::default());
        }
        let records = self
            .read_existing(&path)
            .with_context(|| format!("Durable state for {county} is unreadable"))?;
        Ok(records.iter().filter_map(Article::publication_number).collect())
    }

    /// Highest persisted publication number and record count for resume.
    ///
    /// A present-but-unreadable table is an error: resuming from zero
    /// would silently re-harvest everything, so the operator must step in.
    pub fn last_processed(&self, county: &str) -> anyhow::Result<ResumePoint> {
        let path = self.path(county);
        if !path.exists() {
            return Ok(ResumePoint::default());
        }
        let records = self.read_existing(&path).with_context(|| {
            format!(
                "Durable state for {county} is unreadable; refusing to restart from zero \
                 ({})",
                path.display()
            )
        })?;
        let last_key = records
            .iter()
            .filter_map(Article::publication_number)
            .max()
            .unwrap_or(0);
        Ok(ResumePoint {
            last_key,
            records: records.len(),
        })
    }
}

impl PartitionStore<String, Article> for JsonTable {
    fn append(&self, partition: &String, records: &[Article]) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.root)?;
        let path = self.path(partition);
        let mut all = self.read_existing(&path)?;
        all.extend(records.iter().cloned());

        let tmp = self.root.join(format!("{partition}.json.tmp"));
        let content = serde_json::to_string_pretty(&all).map_err(std::io::Error::other)?;
        std::fs::write(&tmp, content)?;
        std::fs::rename(&tmp, &path)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn article(nr: u32) -> Article {
        Article(serde_json::json!({"publication": {"nr": nr.to_string()}, "status": "admis"}))
    }

    #[test]
    fn append_creates_then_merges() {
        let dir = TempDir::new().unwrap();
        let table = JsonTable::new(dir.path());
        let county = "Cluj".to_string();

        table.append(&county, &[article(1), article(2)]).unwrap();
        table.append(&county, &[article(3)]).unwrap();

        let content = std::fs::read_to_string(table.path(&county)).unwrap();
        let all: Vec<Article> = serde_json::from_str(&content).unwrap();
        assert_eq!(all.len(), 3);
        assert_eq!(all[2].publication_number(), Some(3));
    }

    #[test]
    fn partitions_are_independent() {
        let dir = TempDir::new().unwrap();
        let table = JsonTable::new(dir.path());
        table.append(&"Cluj".to_string(), &[article(1)]).unwrap();
        table.append(&"Arad".to_string(), &[article(9)]).unwrap();

        assert!(table.path("Cluj").exists());
        assert!(table.path("Arad").exists());
        let cluj: Vec<Article> =
            serde_json::from_str(&std::fs::read_to_string(table.path("Cluj")).unwrap()).unwrap();
        assert_eq!(cluj.len(), 1);
    }

    #[test]
    fn last_processed_fresh_county() {
        let dir = TempDir::new().unwrap();
        let table = JsonTable::new(dir.path());
        let resume = table.last_processed("Cluj").unwrap();
        assert_eq!(resume, ResumePoint::default());
        assert_eq!(resume.start_key(), 1);
    }

    #[test]
    fn last_processed_reads_trailing_number() {
        let dir = TempDir::new().unwrap();
        let table = JsonTable::new(dir.path());
        let county = "Cluj".to_string();
        table
            .append(&county, &[article(10), article(25), article(19)])
            .unwrap();

        let resume = table.last_processed(&county).unwrap();
        // Highest number referenced, not the trailing entry — flush-batch
        // order is not key order
        assert_eq!(resume.last_key, 25);
        assert_eq!(resume.records, 3);
    }

    #[test]
    fn corrupt_table_is_fatal_for_resume() {
        let dir = TempDir::new().unwrap();
        let table = JsonTable::new(dir.path());
        std::fs::create_dir_all(dir.path()).unwrap();
        std::fs::write(table.path("Cluj"), "{not json").unwrap();

        let err = table.last_processed("Cluj").unwrap_err();
        assert!(err.to_string().contains("refusing to restart"));
    }

    #[test]
    fn corrupt_table_fails_append_too() {
        let dir = TempDir::new().unwrap();
        let table = JsonTable::new(dir.path());
        std::fs::write(table.path("Cluj"), "[broken").unwrap();
        assert!(table.append(&"Cluj".to_string(), &[article(1)]).is_err());
    }
}
