//! Raw bulletin persistence: `bulletins/<year>/<number>.pdf`.
//!
//! The numbered files double as the stream's resume ledger: the highest
//! number on disk is where a re-run continues, and the holes below it are
//! the gap-recovery work list.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use bercline_core::{numbered_keys, ResumePoint};

pub struct PdfStore {
    root: PathBuf,
}

impl PdfStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn year_dir(&self, year: u16) -> PathBuf {
        self.root.join(year.to_string())
    }

    pub fn path(&self, year: u16, number: u32) -> PathBuf {
        self.year_dir(year).join(format!("{number}.pdf"))
    }

    /// Persist one bulletin; tmp + rename so a crash mid-write never
    /// leaves a truncated PDF that resume would count as done.
    pub fn save(&self, year: u16, number: u32, bytes: &[u8]) -> std::io::Result<PathBuf> {
        let dir = self.year_dir(year);
        std::fs::create_dir_all(&dir)?;
        let path = self.path(year, number);
        let tmp = dir.join(format!("{number}.pdf.tmp"));
        std::fs::write(&tmp, bytes)?;
        std::fs::rename(&tmp, &path)?;
        Ok(path)
    }

    /// Bulletin numbers already on disk for `year`.
    pub fn downloaded(&self, year: u16) -> std::io::Result<BTreeSet<u32>> {
        numbered_keys(&self.year_dir(year), "pdf")
    }

    /// Resume point for the year's stream.
    pub fn resume_point(&self, year: u16) -> std::io::Result<ResumePoint> {
        let numbers = self.downloaded(year)?;
        Ok(ResumePoint {
            last_key: numbers.last().copied().unwrap_or(0),
            records: numbers.len(),
        })
    }

    /// Stored bulletins in number order, for the standalone extract pass.
    pub fn stored(&self, year: u16) -> std::io::Result<Vec<(u32, PathBuf)>> {
        Ok(self
            .downloaded(year)?
            .into_iter()
            .map(|n| (n, self.path(year, n)))
            .collect())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}
