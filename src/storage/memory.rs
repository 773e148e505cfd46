use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use super::KeyValueStore;
use crate::error::AuthError;

/// Process-local store, for tests and embedders that persist elsewhere.
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: Mutex<HashMap<String, serde_json::Value>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<serde_json::Value>, AuthError> {
        let values = self
            .values
            .lock()
            .map_err(|_| AuthError::Storage("memory store lock poisoned".to_string()))?;
        Ok(values.get(key).cloned())
    }

    async fn set(&self, key: &str, value: serde_json::Value) -> Result<(), AuthError> {
        let mut values = self
            .values
            .lock()
            .map_err(|_| AuthError::Storage("memory store lock poisoned".to_string()))?;
        if value.is_null() {
            values.remove(key);
        } else {
            values.insert(key.to_string(), value);
        }
        Ok(())
    }
}
