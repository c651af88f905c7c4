//! Service configuration: a JSON file with sane defaults, secrets from the
//! environment.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use log::warn;
use serde::{Deserialize, Serialize};

use crate::classifier::ClassifierFlow;
use crate::store::MAX_RECORDS;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct Config {
    pub bind_addr: String,
    pub read_mode: ReadMode,
    pub store: StoreConfig,
    pub classifier: ClassifierConfig,
}

/// What the read endpoint reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReadMode {
    /// The dominant direction across the stored history.
    Aggregate,
    /// The single most recent observation.
    Latest,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct StoreConfig {
    pub backend: StoreBackend,
    /// Document location for the file backend; ignored by the memory backend.
    pub path: PathBuf,
    pub max_records: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Memory,
    File,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct ClassifierConfig {
    pub base_url: String,
    pub model: String,
    pub flow: ClassifierFlow,
    pub timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8080".into(),
            read_mode: ReadMode::Aggregate,
            store: StoreConfig::default(),
            classifier: ClassifierConfig::default(),
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::Memory,
            path: PathBuf::from("crowd-analysis.json"),
            max_records: MAX_RECORDS,
        }
    }
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".into(),
            model: "gpt-4o-mini".into(),
            flow: ClassifierFlow::Combined,
            timeout_secs: 30,
        }
    }
}

impl Config {
    /// Load from a JSON file. A missing file is the default configuration; a
    /// malformed one falls back to defaults with a warning rather than
    /// refusing to start.
    pub fn load(path: &Path) -> Result<Config> {
        if !path.exists() {
            return Ok(Config::default());
        }

        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config from {}", path.display()))?;

        Ok(serde_json::from_str(&contents).unwrap_or_else(|err| {
            warn!("ignoring malformed config {}: {err}", path.display());
            Config::default()
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load(&dir.path().join("absent.json")).unwrap();
        assert_eq!(config.read_mode, ReadMode::Aggregate);
        assert_eq!(config.store.backend, StoreBackend::Memory);
        assert_eq!(config.store.max_records, MAX_RECORDS);
    }

    #[test]
    fn partial_file_keeps_defaults_for_omitted_keys() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("crowdsense.json");
        std::fs::write(
            &path,
            r#"{
                "read_mode": "latest",
                "store": { "backend": "file", "max_records": 50 }
            }"#,
        )
        .unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.read_mode, ReadMode::Latest);
        assert_eq!(config.store.backend, StoreBackend::File);
        assert_eq!(config.store.max_records, 50);
        assert_eq!(config.store.path, PathBuf::from("crowd-analysis.json"));
        assert_eq!(config.bind_addr, "127.0.0.1:8080");
    }

    #[test]
    fn malformed_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("crowdsense.json");
        std::fs::write(&path, "{ not json").unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.store.backend, StoreBackend::Memory);
    }

    #[test]
    fn classifier_flow_uses_kebab_case_labels() {
        let flow: ClassifierFlow = serde_json::from_str("\"detect-first\"").unwrap();
        assert_eq!(flow, ClassifierFlow::DetectFirst);
    }
}
