//! Configuration file loading for docfiller
//!
//! This module handles file I/O and merging of configuration from multiple sources.
//! The priority order (highest to lowest):
//!
//! 1. `DOCFILLER_*` environment variables
//! 2. `--config <path>` specified file
//! 3. Project root: `./docfiller.toml` or `./.docfiller.toml`
//! 4. XDG config: `$XDG_CONFIG_HOME/docfiller/config.toml`
//! 5. Default values

mod file_config;
mod issue;
mod loader;

pub use file_config::{
    DEFAULT_TIMEOUT_SECONDS, FileConfig, FileEndpointConfig, FilePipelineConfig,
    FileProvidersConfig, FileStorageConfig, FileWeightEntry, ResolvedEndpoint,
};
pub use issue::{ConfigIssue, ConfigIssueCode, Severity};
pub use loader::ConfigLoader;
