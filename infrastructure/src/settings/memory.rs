//! In-memory settings store, for runs that should not touch disk

use async_trait::async_trait;
use docfiller_application::{SettingsError, SettingsStore};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::RwLock;

#[derive(Default)]
pub struct MemorySettingsStore {
    values: RwLock<HashMap<String, Value>>,
}

impl MemorySettingsStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a store with initial values
    pub fn with_values(values: impl IntoIterator<Item = (String, Value)>) -> Self {
        Self {
            values: RwLock::new(values.into_iter().collect()),
        }
    }
}

#[async_trait]
impl SettingsStore for MemorySettingsStore {
    async fn get(&self, key: &str) -> Result<Option<Value>, SettingsError> {
        Ok(self
            .values
            .read()
            .ok()
            .and_then(|values| values.get(key).cloned()))
    }

    async fn set(&self, key: &str, value: Value) -> Result<(), SettingsError> {
        if let Ok(mut values) = self.values.write() {
            values.insert(key.to_string(), value);
        }
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), SettingsError> {
        if let Ok(mut values) = self.values.write() {
            values.remove(key);
        }
        Ok(())
    }
}
