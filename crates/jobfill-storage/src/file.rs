//! JSON file backed durable store.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio::fs;
use tokio::sync::Mutex;
use tracing::debug;

use jobfill_protocols::{DurableStore, StorageError};

/// Durable store persisted as a single JSON object.
///
/// The whole document is mirrored in memory and rewritten on every
/// mutation through a temporary file and a rename, so a crash mid-write
/// leaves the previous document intact. Memory only changes once the
/// write has landed.
///
/// ```text
/// {
///   "accessToken": "...",
///   "fieldFingerprintCache": { "<fp>": { "mapping": {...}, "cached_at": 0 } },
///   "autofillContext": { "context": {...}, "fetched_at": 0 }
/// }
/// ```
pub struct JsonFileStore {
    path: PathBuf,
    document: Mutex<Map<String, Value>>,
}

impl JsonFileStore {
    /// Open the store at `path`, creating parent directories as needed.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }

        let document = Self::read_document(&path).await?;
        debug!("JsonFileStore opened at {:?} with {} keys", path, document.len());

        Ok(Self {
            path,
            document: Mutex::new(document),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_document(path: &Path) -> Result<Map<String, Value>, StorageError> {
        if !fs::try_exists(path).await? {
            return Ok(Map::new());
        }

        let content = fs::read_to_string(path).await?;
        if content.trim().is_empty() {
            return Ok(Map::new());
        }

        match serde_json::from_str::<Value>(&content) {
            Ok(Value::Object(map)) => Ok(map),
            Ok(other) => Err(StorageError::Corrupted {
                path: path.display().to_string(),
                message: format!("expected a JSON object, found {}", type_name(&other)),
            }),
            Err(e) => Err(StorageError::Corrupted {
                path: path.display().to_string(),
                message: e.to_string(),
            }),
        }
    }

    async fn persist(&self, document: &Map<String, Value>) -> Result<(), StorageError> {
        let content = serde_json::to_string_pretty(document)?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, content).await?;
        fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[async_trait]
impl DurableStore for JsonFileStore {
    async fn get(&self, key: &str) -> Result<Option<Value>, StorageError> {
        let document = self.document.lock().await;
        Ok(document.get(key).cloned())
    }

    async fn set(&self, key: &str, value: Value) -> Result<(), StorageError> {
        let mut document = self.document.lock().await;
        let mut next = document.clone();
        next.insert(key.to_string(), value);
        self.persist(&next).await?;
        *document = next;
        debug!("Stored key '{}' in {:?}", key, self.path);
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        let mut document = self.document.lock().await;
        if document.contains_key(key) {
            let mut next = document.clone();
            next.remove(key);
            self.persist(&next).await?;
            *document = next;
            debug!("Removed key '{}' from {:?}", key, self.path);
        }
        Ok(())
    }

    async fn keys(&self) -> Result<Vec<String>, StorageError> {
        let document = self.document.lock().await;
        Ok(document.keys().cloned().collect())
    }
}

#[cfg(test)]
#[path = "file_tests.rs"]
mod tests;
