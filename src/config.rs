//! Configuration Management
//!
//! Handles persistent configuration storage for gcpinv.

use crate::inventory::databases::DEFAULT_REGIONS;
use crate::inventory::CreationDateSource;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default bucket inventory file name
pub const DEFAULT_BUCKET_OUTPUT: &str = "gcs_bucket_info_with_tags.csv";

/// Default database inventory file name
pub const DEFAULT_DATABASE_OUTPUT: &str = "cloudsql_instances.xlsx";

/// User configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Config {
    /// Project to inventory
    #[serde(default)]
    pub project_id: Option<String>,
    /// Regions for the Cloud SQL inventory
    #[serde(default)]
    pub regions: Option<Vec<String>>,
    /// Bucket CSV path
    #[serde(default)]
    pub bucket_output: Option<PathBuf>,
    /// Cloud SQL workbook path
    #[serde(default)]
    pub database_output: Option<PathBuf>,
    /// Source of the bucket `CreationDate` column
    #[serde(default)]
    pub creation_date: Option<CreationDateSource>,
}

impl Config {
    /// Get the config file path
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("gcpinv").join("config.json"))
    }

    /// Load configuration from disk
    pub fn load() -> Self {
        match Self::config_path() {
            Some(path) => Self::load_from(&path),
            None => Self::default(),
        }
    }

    /// Load configuration from a specific file; missing or invalid files yield defaults
    pub fn load_from(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }

        match std::fs::read_to_string(path) {
            Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
                tracing::warn!("Ignoring invalid config {}: {}", path.display(), e);
                Self::default()
            }),
            Err(_) => Self::default(),
        }
    }

    /// Save configuration to disk
    pub fn save(&self) -> Result<()> {
        let Some(path) = Self::config_path() else {
            return Ok(());
        };
        self.save_to(&path)
    }

    /// Save configuration to a specific file
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write {}", path.display()))?;

        Ok(())
    }

    /// Get effective project (CLI > config > gcloud default)
    pub fn effective_project(&self, cli: Option<&str>) -> Option<String> {
        cli.map(|p| p.to_string())
            .or_else(|| self.project_id.clone())
            .or_else(crate::gcp::auth::get_default_project)
    }

    /// Get effective regions (CLI > config > built-in US regions).
    ///
    /// Blank entries are dropped and repeated regions kept once, first occurrence wins.
    pub fn effective_regions(&self, cli: &[String]) -> Vec<String> {
        let source = if !cli.is_empty() {
            cli.to_vec()
        } else {
            self.regions
                .clone()
                .filter(|r| !r.is_empty())
                .unwrap_or_else(|| DEFAULT_REGIONS.iter().map(|r| r.to_string()).collect())
        };

        let mut regions: Vec<String> = Vec::with_capacity(source.len());
        for region in source {
            let region = region.trim();
            if !region.is_empty() && !regions.iter().any(|r| r == region) {
                regions.push(region.to_string());
            }
        }
        regions
    }

    pub fn effective_bucket_output(&self, cli: Option<&Path>) -> PathBuf {
        cli.map(Path::to_path_buf)
            .or_else(|| self.bucket_output.clone())
            .unwrap_or_else(|| PathBuf::from(DEFAULT_BUCKET_OUTPUT))
    }

    pub fn effective_database_output(&self, cli: Option<&Path>) -> PathBuf {
        cli.map(Path::to_path_buf)
            .or_else(|| self.database_output.clone())
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DATABASE_OUTPUT))
    }

    pub fn effective_creation_date(&self, cli: Option<CreationDateSource>) -> CreationDateSource {
        cli.or(self.creation_date).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");

        let config = Config {
            project_id: Some("inventory-prod".to_string()),
            regions: Some(vec!["us-east1".to_string()]),
            creation_date: Some(CreationDateSource::ResponseDate),
            ..Default::default()
        };
        config.save_to(&path).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("\"response-date\""));
        assert_eq!(Config::load_from(&path), config);
    }

    #[test]
    fn test_load_missing_or_invalid_file_is_default() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(Config::load_from(&dir.path().join("nope.json")), Config::default());

        let path = dir.path().join("broken.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert_eq!(Config::load_from(&path), Config::default());
    }

    #[test]
    fn test_cli_overrides_config() {
        let config = Config {
            project_id: Some("from-config".to_string()),
            regions: Some(vec!["us-west1".to_string()]),
            bucket_output: Some(PathBuf::from("config.csv")),
            ..Default::default()
        };

        assert_eq!(
            config.effective_project(Some("from-cli")),
            Some("from-cli".to_string())
        );
        assert_eq!(
            config.effective_project(None),
            Some("from-config".to_string())
        );
        assert_eq!(
            config.effective_regions(&["us-east4".to_string()]),
            vec!["us-east4"]
        );
        assert_eq!(config.effective_regions(&[]), vec!["us-west1"]);
        assert_eq!(
            config.effective_bucket_output(None),
            PathBuf::from("config.csv")
        );
        assert_eq!(
            config.effective_database_output(None),
            PathBuf::from(DEFAULT_DATABASE_OUTPUT)
        );
        assert_eq!(
            config.effective_creation_date(None),
            CreationDateSource::Metadata
        );
    }

    #[test]
    fn test_regions_are_deduplicated_in_order() {
        let cli = ["us-east1", "us-west1", "us-east1", " ", "us-west1 "]
            .map(String::from)
            .to_vec();
        assert_eq!(
            Config::default().effective_regions(&cli),
            vec!["us-east1", "us-west1"]
        );

        let config = Config {
            regions: Some(vec!["us-east4".to_string(), "us-east4".to_string()]),
            ..Default::default()
        };
        assert_eq!(config.effective_regions(&[]), vec!["us-east4"]);
    }

    #[test]
    fn test_default_regions_are_us() {
        let regions = Config::default().effective_regions(&[]);
        assert_eq!(regions.len(), DEFAULT_REGIONS.len());
        assert!(regions.iter().all(|r| r.starts_with("us-")));
    }
}
