//! Settings store port
//!
//! Asynchronous key-value storage for user settings (weights, provider
//! selection, toggles, profiles). Treated as eventually consistent: there
//! are no transactions, and a read after a failed write may see old data.

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[async_trait]
pub trait SettingsStore: Send + Sync {
    /// `None` when the key has never been set
    async fn get(&self, key: &str) -> Result<Option<Value>, SettingsError>;

    async fn set(&self, key: &str, value: Value) -> Result<(), SettingsError>;

    async fn remove(&self, key: &str) -> Result<(), SettingsError>;
}
