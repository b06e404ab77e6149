//! Source configuration: which local files and remote resources feed the
//! agriculture and climate datasets.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

/// Local agriculture rows below this count trigger the remote fallback
pub const DEFAULT_MIN_LOCAL_ROWS: usize = 1000;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SourcesConfig {
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default)]
    pub agriculture_paths: Vec<PathBuf>,
    #[serde(default)]
    pub climate_path: Option<PathBuf>,
    #[serde(default)]
    pub agriculture_resource_ids: Vec<String>,
    #[serde(default)]
    pub climate_resource_ids: Vec<String>,
    #[serde(default = "default_min_local_rows")]
    pub min_local_rows: usize,
}

fn default_version() -> String {
    "1".to_string()
}

fn default_min_local_rows() -> usize {
    DEFAULT_MIN_LOCAL_ROWS
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            version: default_version(),
            agriculture_paths: [
                "data/RS_Session_258_AU_1212_1.csv",
                "data/RJ_Session_246_AU2742_3.csv",
                "data/rs_session240_au1362_1.1.csv",
                "data/RJ_Session_246_AU2744_3.csv",
                "data/rs_session243_au1475_1.3.csv",
                "data/RS_Session_266_AU_2112_A.csv",
            ]
            .iter()
            .map(PathBuf::from)
            .collect(),
            climate_path: Some(PathBuf::from("data/annual_rainfall.csv")),
            agriculture_resource_ids: vec![
                "f20d7d45-e3d8-4603-bc79-15a3d0db1f9a".to_string(),
                "baf78e76-ff2c-4f8d-be2e-9e549eb9f799".to_string(),
                "4ed94214-0ab1-4b9d-aa64-47f98ccdc687".to_string(),
            ],
            climate_resource_ids: vec![
                "3f373939-30d5-40dd-8c78-f4e9f421415e".to_string(),
                "84f3123a-56b8-42ac-9d19-3fabe0c3e13e".to_string(),
                "b59a4532-63cb-47b1-b42a-9fbc13887b3f".to_string(),
                "2cbb9b86-0d19-4de9-a5c0-8e76813994e4".to_string(),
            ],
            min_local_rows: DEFAULT_MIN_LOCAL_ROWS,
        }
    }
}

impl SourcesConfig {
    /// Load sources configuration from a JSON file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read sources config {}", path.display()))?;
        let config: SourcesConfig =
            serde_json::from_str(&content).context("Failed to parse sources config")?;
        Ok(config)
    }

    /// Load the file when present, built-in sources otherwise
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            info!(path = %path.display(), "loading sources config");
            Self::load(path)
        } else {
            info!(path = %path.display(), "sources config not found, using built-in sources");
            Ok(Self::default())
        }
    }

    /// Every remote resource id, agriculture first
    pub fn all_resource_ids(&self) -> impl Iterator<Item = &str> {
        self.agriculture_resource_ids
            .iter()
            .chain(self.climate_resource_ids.iter())
            .map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: SourcesConfig =
            serde_json::from_str(r#"{"agriculture_paths": ["a.csv"]}"#).unwrap();
        assert_eq!(config.agriculture_paths, vec![PathBuf::from("a.csv")]);
        assert_eq!(config.min_local_rows, 1000);
        assert!(config.climate_path.is_none());
        assert!(config.agriculture_resource_ids.is_empty());
    }

    #[test]
    fn test_load_or_default_missing_file() {
        let config = SourcesConfig::load_or_default(Path::new("/no/such/sources.json")).unwrap();
        assert_eq!(config, SourcesConfig::default());
        assert_eq!(config.all_resource_ids().count(), 7);
    }

    #[test]
    fn test_load_rejects_malformed_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("sources.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(SourcesConfig::load_or_default(&path).is_err());
    }
}
