//! Configuration loading from TOML files.

use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::Deserialize;

/// Global configuration for bercline
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub output: OutputConfig,
    pub bulletins: BulletinsSection,
    pub registry: RegistrySection,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub default_dir: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            default_dir: PathBuf::from("./data"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BulletinsSection {
    pub start_year: u16,
    pub workers: usize,
    pub empty_threshold: usize,
    pub max_number: u32,
    pub gap_recovery: bool,
    pub retries: u32,
}

impl Default for BulletinsSection {
    fn default() -> Self {
        Self {
            start_year: 2024,
            workers: 4,
            empty_threshold: 100,
            max_number: 100_001,
            gap_recovery: true,
            retries: 5,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RegistrySection {
    pub year: u16,
    pub workers: usize,
    pub empty_threshold: usize,
    pub max_number: u32,
    pub batch_size: usize,
    pub counties: PathBuf,
    pub gap_recovery: bool,
    pub retries: u32,
}

impl Default for RegistrySection {
    fn default() -> Self {
        Self {
            year: 2024,
            workers: 8,
            empty_threshold: 1_500,
            max_number: 380_001,
            batch_size: 250,
            counties: PathBuf::from("data/counties.json"),
            gap_recovery: false,
            retries: 2,
        }
    }
}

impl Config {
    /// Load configuration from default locations
    ///
    /// Search order:
    /// 1. ./bercline.toml (current directory)
    /// 2. ~/.config/bercline/config.toml
    ///
    /// If no config file found, returns default config.
    pub fn load() -> Result<Self> {
        let local_config = PathBuf::from("bercline.toml");
        if local_config.exists() {
            return Self::from_file(&local_config);
        }

        if let Some(config_dir) = directories::ProjectDirs::from("", "", "bercline") {
            let user_config = config_dir.config_dir().join("config.toml");
            if user_config.exists() {
                return Self::from_file(&user_config);
            }
        }

        log::debug!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// Load configuration from a specific file
    pub fn from_file(path: &PathBuf) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        log::info!("Loaded config from {}", path.display());
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = Config::default();
        assert_eq!(config.output.default_dir, PathBuf::from("./data"));
        assert_eq!(config.bulletins.empty_threshold, 100);
        assert_eq!(config.registry.empty_threshold, 1_500);
        assert!(!config.registry.gap_recovery);
    }

    #[test]
    fn parse_config_toml() {
        let toml = r#"
[output]
default_dir = "/tmp/berc"

[bulletins]
start_year = 2023
workers = 2

[registry]
year = 2023
batch_size = 100
gap_recovery = true
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.output.default_dir, PathBuf::from("/tmp/berc"));
        assert_eq!(config.bulletins.start_year, 2023);
        assert_eq!(config.bulletins.workers, 2);
        // Unset keys keep their defaults
        assert_eq!(config.bulletins.retries, 5);
        assert_eq!(config.registry.batch_size, 100);
        assert!(config.registry.gap_recovery);
    }
}
