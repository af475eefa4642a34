//! Storage configuration from TOML (`[storage]` section)

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

const APP_DIR: &str = "docfiller";

/// Raw storage configuration from TOML
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileStorageConfig {
    /// JSON file holding user settings and profiles
    pub settings_file: Option<PathBuf>,
    /// JSONL file run metrics are appended to
    pub metrics_file: Option<PathBuf>,
}

impl FileStorageConfig {
    /// Configured settings file, or `$XDG_DATA_HOME/docfiller/settings.json`
    pub fn settings_path(&self) -> PathBuf {
        self.settings_file
            .clone()
            .unwrap_or_else(|| data_dir().join("settings.json"))
    }

    /// Configured metrics file, or `$XDG_DATA_HOME/docfiller/metrics.jsonl`
    pub fn metrics_path(&self) -> PathBuf {
        self.metrics_file
            .clone()
            .unwrap_or_else(|| data_dir().join("metrics.jsonl"))
    }
}

fn data_dir() -> PathBuf {
    dirs::data_dir()
        .map(|d| d.join(APP_DIR))
        .unwrap_or_else(|| PathBuf::from(".").join(format!(".{}", APP_DIR)))
}
