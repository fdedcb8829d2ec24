//! Decision records extracted from bulletin text.

use serde::{Deserialize, Serialize};

/// One registry decision from a bulletin.
///
/// The dossier number is the identifying reference; everything else is
/// whatever the bulletin happened to print.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Decision {
    pub dossier_number: String,
    pub decision_number: Option<String>,
    /// `dd.mm.yyyy` as printed in the bulletin
    pub pronounced_date: String,
    pub firm_name: Option<String>,
    pub address: Option<String>,
    pub county: Option<String>,
    pub registration_code: Option<String>,
    pub registration_order: Option<String>,
    pub euid: Option<String>,
    pub registrar: Option<String>,
    pub requestor: Option<String>,
    pub quality: Option<String>,
    pub request_details: Option<String>,
    pub disposition: Option<String>,
}

impl Decision {
    /// Parsed pronouncement date, if the printed form is valid.
    pub fn date(&self) -> Option<chrono::NaiveDate> {
        chrono::NaiveDate::parse_from_str(&self.pronounced_date, "%d.%m.%Y").ok()
    }

    /// Partition key derived from record content: county × month.
    ///
    /// Decisions without a recognized county or a parseable date cannot
    /// be partitioned and are dropped by the caller.
    pub fn partition(&self) -> Option<DecisionPartition> {
        let county = self.county.clone()?;
        let month = self.date()?.format("%B").to_string();
        Some(DecisionPartition { county, month })
    }
}

/// County × month grouping for the durable CSV tables.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DecisionPartition {
    pub county: String,
    pub month: String,
}

impl std::fmt::Display for DecisionPartition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.county, self.month)
    }
}
