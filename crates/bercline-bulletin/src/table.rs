//! Durable decision tables: one CSV per county and month.
//!
//! First write creates the file with a header row; later batches append
//! records only, so prior content is never rewritten.

use std::fs::OpenOptions;
use std::path::{Path, PathBuf};

use bercline_core::PartitionStore;

use crate::decision::{Decision, DecisionPartition};

pub struct CsvTable {
    root: PathBuf,
}

impl CsvTable {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn path(&self, partition: &DecisionPartition) -> PathBuf {
        self.root
            .join(&partition.county)
            .join(format!("{}.csv", partition.month))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// All partition files currently on disk (`<county>/<month>.csv`).
    pub fn partition_files(&self) -> std::io::Result<Vec<PathBuf>> {
        let mut files = Vec::new();
        if !self.root.exists() {
            return Ok(files);
        }
        for county in std::fs::read_dir(&self.root)? {
            let county_dir = county?.path();
            if !county_dir.is_dir() {
                continue;
            }
            for entry in std::fs::read_dir(&county_dir)? {
                let path = entry?.path();
                if path.extension().is_some_and(|e| e == "csv") {
                    files.push(path);
                }
            }
        }
        files.sort();
        Ok(files)
    }
}

impl PartitionStore<DecisionPartition, Decision> for CsvTable {
    fn append(&self, partition: &DecisionPartition, records: &[Decision]) -> std::io::Result<()> {
        let path = self.path(partition);
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir)?;
        }
        let exists = path.exists();
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        // Header only when the file is born
        let mut writer = csv::WriterBuilder::new()
            .has_headers(!exists)
            .from_writer(file);
        for record in records {
            writer.serialize(record).map_err(std::io::Error::other)?;
        }
        writer.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn partition() -> DecisionPartition {
        DecisionPartition {
            county: "Cluj".to_string(),
            month: "March".to_string(),
        }
    }

    fn decision(dossier: &str) -> Decision {
        Decision {
            dossier_number: dossier.to_string(),
            decision_number: Some("100".to_string()),
            pronounced_date: "15.03.2024".to_string(),
            firm_name: Some("FIRMA, CU VIRGULĂ S.R.L.".to_string()),
            address: None,
            county: Some("Cluj".to_string()),
            registration_code: None,
            registration_order: None,
            euid: None,
            registrar: Some("Popescu Ana".to_string()),
            requestor: None,
            quality: None,
            request_details: None,
            disposition: None,
        }
    }

    #[test]
    fn header_once_then_append() {
        let dir = TempDir::new().unwrap();
        let table = CsvTable::new(dir.path());
        let p = partition();

        table.append(&p, &[decision("1/2024"), decision("2/2024")]).unwrap();
        table.append(&p, &[decision("3/2024")]).unwrap();

        let content = std::fs::read_to_string(table.path(&p)).unwrap();
        let header_lines = content
            .lines()
            .filter(|l| l.starts_with("dossier_number"))
            .count();
        assert_eq!(header_lines, 1);

        let mut reader = csv::Reader::from_path(table.path(&p)).unwrap();
        let rows: Vec<Decision> = reader.deserialize().map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[2].dossier_number, "3/2024");
        // Quoted commas survive the round trip
        assert_eq!(rows[0].firm_name.as_deref(), Some("FIRMA, CU VIRGULĂ S.R.L."));
    }

    #[test]
    fn partitions_get_their_own_files() {
        let dir = TempDir::new().unwrap();
        let table = CsvTable::new(dir.path());
        let march = partition();
        let april = DecisionPartition {
            county: "Cluj".to_string(),
            month: "April".to_string(),
        };
        let arad = DecisionPartition {
            county: "Arad".to_string(),
            month: "March".to_string(),
        };
        for p in [&march, &april, &arad] {
            table.append(p, &[decision("1/2024")]).unwrap();
        }

        let files = table.partition_files().unwrap();
        assert_eq!(files.len(), 3);
        assert!(table.path(&march).exists());
        assert!(table.path(&arad).exists());
    }

    #[test]
    fn empty_root_lists_nothing() {
        let dir = TempDir::new().unwrap();
        let table = CsvTable::new(dir.path().join("missing"));
        assert!(table.partition_files().unwrap().is_empty());
    }
}
