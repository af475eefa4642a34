//! Raw TOML configuration data types
//!
//! These structs represent the exact structure of the TOML config file.
//! They are deserialized directly and use domain types where appropriate.

mod pipeline;
mod providers;
mod storage;

pub use pipeline::FilePipelineConfig;
pub use providers::{
    DEFAULT_TIMEOUT_SECONDS, FileEndpointConfig, FileProvidersConfig, FileWeightEntry,
    ResolvedEndpoint,
};
pub use storage::FileStorageConfig;

use super::issue::ConfigIssue;
use docfiller_application::FillOptions;
use serde::{Deserialize, Serialize};

/// Complete file configuration (raw TOML structure)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    /// Provider selection, weights and endpoints
    pub providers: FileProvidersConfig,
    /// Run defaults
    pub pipeline: FilePipelineConfig,
    /// Where settings and metrics live
    pub storage: FileStorageConfig,
}

impl FileConfig {
    /// Validate the entire configuration, returning all detected issues.
    pub fn validate(&self) -> Vec<ConfigIssue> {
        self.providers.validate()
    }

    /// Run defaults as the application layer sees them
    pub fn fill_options(&self) -> FillOptions {
        self.pipeline
            .fill_options(self.providers.default_provider())
    }
}
