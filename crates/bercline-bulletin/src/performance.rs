//! Registrar throughput aggregation over the decision tables.
//!
//! Reads every county×month CSV, groups decisions by normalized registrar
//! name, and derives working days, dossiers per day, and dossiers per
//! hour. The most frequent original spelling is reported alongside the
//! normalized key.

use std::collections::HashSet;
use std::path::Path;

use anyhow::Context;
use chrono::NaiveDate;
use comfy_table::{modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL, Cell, Color, Table};
use rustc_hash::FxHashMap;
use serde::Serialize;

use crate::decision::Decision;
use crate::extract::fold_diacritics;
use crate::table::CsvTable;

/// Longer "names" are extraction noise, not people.
const MAX_NAME_LEN: usize = 45;

/// Working hours assumed per counted day.
const WORKDAY_HOURS: f64 = 8.0;

#[derive(Debug, Clone, Serialize)]
pub struct RegistrarThroughput {
    /// Most frequent original spelling
    pub registrar: String,
    pub normalized_name: String,
    pub days_worked: usize,
    pub dossiers_processed: usize,
    pub dossiers_per_day: f64,
    pub dossiers_per_hour: f64,
}

/// Diacritic-folded, lowercased, word-sorted form of a registrar name,
/// so "Popescu-Maria Ana" and "ana popescu maria" collapse together.
pub(crate) fn normalize_name(name: &str) -> String {
    let folded = fold_diacritics(&name.replace('-', " "));
    let mut words: Vec<&str> = folded.split_whitespace().collect();
    words.sort_unstable();
    words.join(" ")
}

#[derive(Default)]
struct RegistrarEntry {
    days: HashSet<NaiveDate>,
    dossiers: usize,
    spellings: FxHashMap<String, usize>,
}

/// Aggregate throughput per registrar, sorted by dossiers/day descending.
pub fn compute(table: &CsvTable) -> anyhow::Result<Vec<RegistrarThroughput>> {
    let files = table.partition_files()?;
    anyhow::ensure!(
        !files.is_empty(),
        "No decision tables under {}",
        table.root().display()
    );

    let mut per_registrar: FxHashMap<String, RegistrarEntry> = FxHashMap::default();
    let mut rows_read = 0usize;
    let mut rows_skipped = 0usize;

    for file in &files {
        let mut reader = csv::Reader::from_path(file)
            .with_context(|| format!("Cannot read {}", file.display()))?;
        for row in reader.deserialize::<Decision>() {
            let decision = match row {
                Ok(d) => d,
                Err(e) => {
                    rows_skipped += 1;
                    log::debug!("{}: bad row: {e}", file.display());
                    continue;
                }
            };
            rows_read += 1;
            let Some(date) = decision.date() else {
                rows_skipped += 1;
                continue;
            };
            let Some(name) = decision.registrar else {
                rows_skipped += 1;
                continue;
            };
            let original = name.replace('-', " ");
            let normalized = normalize_name(&original);
            if normalized.is_empty() || normalized.len() > MAX_NAME_LEN {
                rows_skipped += 1;
                continue;
            }
            let entry = per_registrar.entry(normalized).or_default();
            entry.days.insert(date);
            entry.dossiers += 1;
            *entry.spellings.entry(original).or_insert(0) += 1;
        }
    }
    log::info!(
        "throughput: {} rows across {} tables ({} skipped)",
        rows_read,
        files.len(),
        rows_skipped
    );

    let mut rows: Vec<RegistrarThroughput> = per_registrar
        .into_iter()
        .map(|(normalized_name, entry)| {
            let registrar = entry
                .spellings
                .into_iter()
                .max_by(|a, b| a.1.cmp(&b.1).then(b.0.cmp(&a.0)))
                .map(|(name, _)| name)
                .unwrap_or_else(|| normalized_name.clone());
            let days = entry.days.len().max(1);
            let per_day = entry.dossiers as f64 / days as f64;
            RegistrarThroughput {
                registrar,
                normalized_name,
                days_worked: entry.days.len(),
                dossiers_processed: entry.dossiers,
                dossiers_per_day: per_day,
                dossiers_per_hour: per_day / WORKDAY_HOURS,
            }
        })
        .collect();
    rows.sort_by(|a, b| {
        b.dossiers_per_day
            .total_cmp(&a.dossiers_per_day)
            .then_with(|| a.normalized_name.cmp(&b.normalized_name))
    });
    Ok(rows)
}

/// Write the aggregation as a CSV next to the decision tables.
pub fn write_csv(rows: &[RegistrarThroughput], path: &Path) -> std::io::Result<()> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)?;
    }
    let mut writer = csv::Writer::from_path(path).map_err(std::io::Error::other)?;
    for row in rows {
        writer.serialize(row).map_err(std::io::Error::other)?;
    }
    writer.flush()
}

/// Render the top `limit` registrars as a console table.
pub fn format_table(rows: &[RegistrarThroughput], limit: usize) -> String {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_header(vec![
            Cell::new("Registrar").fg(Color::Cyan),
            Cell::new("Days").fg(Color::Cyan),
            Cell::new("Dossiers").fg(Color::Cyan),
            Cell::new("Per day").fg(Color::Cyan),
            Cell::new("Per hour").fg(Color::Cyan),
        ]);
    for row in rows.iter().take(limit) {
        table.add_row(vec![
            row.registrar.clone(),
            row.days_worked.to_string(),
            row.dossiers_processed.to_string(),
            format!("{:.2}", row.dossiers_per_day),
            format!("{:.2}", row.dossiers_per_hour),
        ]);
    }
    table.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decision::DecisionPartition;
    use bercline_core::PartitionStore;
    use tempfile::TempDir;

    fn decision(registrar: &str, date: &str) -> Decision {
        Decision {
            dossier_number: "1/2024".to_string(),
            decision_number: None,
            pronounced_date: date.to_string(),
            firm_name: None,
            address: None,
            county: Some("Cluj".to_string()),
            registration_code: None,
            registration_order: None,
            euid: None,
            registrar: Some(registrar.to_string()),
            requestor: None,
            quality: None,
            request_details: None,
            disposition: None,
        }
    }

    #[test]
    fn normalize_collapses_spellings() {
        assert_eq!(normalize_name("Popescu-Maria Ana"), "ana maria popescu");
        assert_eq!(normalize_name("ana POPESCU Maria"), "ana maria popescu");
        assert_eq!(normalize_name("Brândușa Ștefan"), "brandusa stefan");
    }

    #[test]
    fn throughput_over_two_tables() {
        let dir = TempDir::new().unwrap();
        let table = CsvTable::new(dir.path());
        let march = DecisionPartition {
            county: "Cluj".to_string(),
            month: "March".to_string(),
        };
        let april = DecisionPartition {
            county: "Cluj".to_string(),
            month: "April".to_string(),
        };
        table
            .append(
                &march,
                &[
                    decision("Popescu-Maria Ana", "15.03.2024"),
                    decision("Popescu-Maria Ana", "15.03.2024"),
                    decision("Ionescu Dan", "15.03.2024"),
                ],
            )
            .unwrap();
        table
            .append(&april, &[decision("Ana Popescu Maria", "02.04.2024")])
            .unwrap();

        let rows = compute(&table).unwrap();
        assert_eq!(rows.len(), 2);

        let popescu = rows
            .iter()
            .find(|r| r.normalized_name == "ana maria popescu")
            .unwrap();
        // Two spellings merged: 3 dossiers over 2 distinct days
        assert_eq!(popescu.dossiers_processed, 3);
        assert_eq!(popescu.days_worked, 2);
        assert!((popescu.dossiers_per_day - 1.5).abs() < 1e-9);
        assert!((popescu.dossiers_per_hour - 1.5 / 8.0).abs() < 1e-9);
        // Hyphenated form seen twice wins the spelling vote
        assert_eq!(popescu.registrar, "Popescu Maria Ana");

        // Sorted by dossiers/day descending
        assert!(rows[0].dossiers_per_day >= rows[1].dossiers_per_day);
    }

    #[test]
    fn noise_rows_are_skipped() {
        let dir = TempDir::new().unwrap();
        let table = CsvTable::new(dir.path());
        let march = DecisionPartition {
            county: "Cluj".to_string(),
            month: "March".to_string(),
        };
        let long_name = "X".repeat(60);
        table
            .append(
                &march,
                &[
                    decision(&long_name, "15.03.2024"),
                    decision("Ionescu Dan", "not-a-date"),
                    decision("Ionescu Dan", "16.03.2024"),
                ],
            )
            .unwrap();

        let rows = compute(&table).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].dossiers_processed, 1);
    }

    #[test]
    fn empty_output_is_an_error() {
        let dir = TempDir::new().unwrap();
        let table = CsvTable::new(dir.path().join("missing"));
        assert!(compute(&table).is_err());
    }

    #[test]
    fn csv_report_round_trip() {
        let dir = TempDir::new().unwrap();
        let rows = vec![RegistrarThroughput {
            registrar: "Popescu Maria Ana".to_string(),
            normalized_name: "ana maria popescu".to_string(),
            days_worked: 2,
            dossiers_processed: 3,
            dossiers_per_day: 1.5,
            dossiers_per_hour: 0.1875,
        }];
        let path = dir.path().join("performance.csv");
        write_csv(&rows, &path).unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("registrar,normalized_name,days_worked"));
        assert!(content.contains("Popescu Maria Ana"));
    }
}
