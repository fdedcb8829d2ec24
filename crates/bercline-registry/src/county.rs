//! County reference data, loaded from a JSON file.
//!
//! The portal keys everything by county UUID; the list ships as data
//! (`data/counties.json`) rather than living in code.

use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct County {
    pub id: String,
    pub name: String,
    pub siruta: String,
    pub mnemonic: String,
}

impl County {
    /// County object as the API payloads expect it: everything except
    /// the local-only mnemonic.
    pub fn api_value(&self) -> serde_json::Value {
        serde_json::json!({
            "id": self.id,
            "name": self.name,
            "siruta": self.siruta,
        })
    }
}

/// Load the county list from a JSON array file.
pub fn load_counties(path: &Path) -> anyhow::Result<Vec<County>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Cannot read county list: {}", path.display()))?;
    let counties: Vec<County> = serde_json::from_str(&content)
        .with_context(|| format!("Invalid county list: {}", path.display()))?;
    anyhow::ensure!(!counties.is_empty(), "County list is empty: {}", path.display());
    Ok(counties)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cluj() -> County {
        County {
            id: "0a1b2c3d-0000-0000-0000-000000000000".to_string(),
            name: "Cluj".to_string(),
            siruta: "13".to_string(),
            mnemonic: "CJ".to_string(),
        }
    }

    #[test]
    fn api_value_drops_mnemonic() {
        let v = cluj().api_value();
        assert_eq!(v["name"], "Cluj");
        assert_eq!(v["siruta"], "13");
        assert!(v.get("mnemonic").is_none());
    }

    #[test]
    fn load_from_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("counties.json");
        std::fs::write(&path, serde_json::to_string(&vec![cluj()]).unwrap()).unwrap();
        let counties = load_counties(&path).unwrap();
        assert_eq!(counties.len(), 1);
        assert_eq!(counties[0].mnemonic, "CJ");
    }

    #[test]
    fn empty_list_rejected() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("counties.json");
        std::fs::write(&path, "[]").unwrap();
        assert!(load_counties(&path).is_err());
    }
}
