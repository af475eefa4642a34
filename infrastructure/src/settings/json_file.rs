//! JSON file settings store
//!
//! All keys live in one JSON object on disk. Writes go to a sibling temp
//! file first and are renamed into place.

use async_trait::async_trait;
use docfiller_application::{SettingsError, SettingsStore};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::{debug, warn};

pub struct JsonFileSettingsStore {
    path: PathBuf,
    /// Serializes read-modify-write cycles
    write_lock: Mutex<()>,
}

impl JsonFileSettingsStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            write_lock: Mutex::new(()),
        }
    }

    /// Get the path to the settings file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(&self) -> Result<Map<String, Value>, SettingsError> {
        let text = match tokio::fs::read_to_string(&self.path).await {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Map::new()),
            Err(e) => return Err(e.into()),
        };
        if text.trim().is_empty() {
            return Ok(Map::new());
        }

        match serde_json::from_str::<Value>(&text)? {
            Value::Object(map) => Ok(map),
            other => {
                warn!(
                    "Settings file {} is not a JSON object ({}), ignoring it",
                    self.path.display(),
                    json_kind(&other)
                );
                Ok(Map::new())
            }
        }
    }

    async fn save(&self, map: Map<String, Value>) -> Result<(), SettingsError> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent).await?;
        }

        let text = serde_json::to_string_pretty(&Value::Object(map))?;
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, text).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }

    async fn update(&self, apply: impl FnOnce(&mut Map<String, Value>)) -> Result<(), SettingsError> {
        let _guard = self.write_lock.lock().await;
        let mut map = self.load().await?;
        apply(&mut map);
        self.save(map).await
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[async_trait]
impl SettingsStore for JsonFileSettingsStore {
    async fn get(&self, key: &str) -> Result<Option<Value>, SettingsError> {
        Ok(self.load().await?.remove(key))
    }

    async fn set(&self, key: &str, value: Value) -> Result<(), SettingsError> {
        debug!("settings: set {}", key);
        self.update(|map| {
            map.insert(key.to_string(), value);
        })
        .await
    }

    async fn remove(&self, key: &str) -> Result<(), SettingsError> {
        self.update(|map| {
            map.remove(key);
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_missing_file_reads_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileSettingsStore::new(dir.path().join("settings.json"));
        assert_eq!(store.get("consensus").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_set_get_remove_persist() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("settings.json");

        let store = JsonFileSettingsStore::new(&path);
        store.set("consensus", json!(true)).await.unwrap();
        store
            .set("llmWeights", json!([["gpt-5", 0.6], ["gemini", 0.4]]))
            .await
            .unwrap();

        // A second store on the same file sees the values
        let reopened = JsonFileSettingsStore::new(&path);
        assert_eq!(reopened.get("consensus").await.unwrap(), Some(json!(true)));
        assert_eq!(
            reopened.get("llmWeights").await.unwrap(),
            Some(json!([["gpt-5", 0.6], ["gemini", 0.4]]))
        );

        reopened.remove("consensus").await.unwrap();
        assert_eq!(store.get("consensus").await.unwrap(), None);
        assert!(store.get("llmWeights").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, "{not json").unwrap();

        let store = JsonFileSettingsStore::new(&path);
        assert!(matches!(
            store.get("consensus").await,
            Err(SettingsError::Serialization(_))
        ));
    }

    #[tokio::test]
    async fn test_non_object_file_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, "[1, 2]").unwrap();

        let store = JsonFileSettingsStore::new(&path);
        assert_eq!(store.get("consensus").await.unwrap(), None);
        store.set("consensus", json!(false)).await.unwrap();
        assert_eq!(store.get("consensus").await.unwrap(), Some(json!(false)));
    }
}
