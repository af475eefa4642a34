//! Infrastructure layer for docfiller
//!
//! This crate contains adapters that implement the ports defined
//! in the application layer, including configuration file loading.

pub mod config;
pub mod form;
pub mod logging;
pub mod providers;
pub mod settings;

// Re-export commonly used types
pub use config::{
    ConfigIssue, ConfigIssueCode, ConfigLoader, FileConfig, FilePipelineConfig,
    FileProvidersConfig, FileStorageConfig, Severity,
};
pub use form::{FilledAnswer, FilledForm, FormDocument, FormDocumentError, JsonFormHost};
pub use logging::JsonlMetricsRecorder;
pub use providers::HttpProviderFactory;
pub use settings::{JsonFileSettingsStore, MemorySettingsStore};
