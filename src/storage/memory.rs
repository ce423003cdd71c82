use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::AppError;
use crate::storage::client::StorageClient;

/// Storage client keeping objects in a map. For tests and local runs
/// without an S3 endpoint.
#[derive(Default)]
pub struct InMemoryStorage {
    objects: Mutex<HashMap<String, Vec<u8>>>,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keys currently stored, sorted.
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self
            .objects
            .lock()
            .map(|objects| objects.keys().cloned().collect())
            .unwrap_or_default();
        keys.sort();
        keys
    }
}

fn poisoned<T>(_: T) -> AppError {
    AppError::Storage("in-memory storage lock poisoned".to_string())
}

#[async_trait]
impl StorageClient for InMemoryStorage {
    async fn put_object(&self, key: &str, content: Vec<u8>, _content_type: &str) -> Result<(), AppError> {
        self.objects
            .lock()
            .map_err(poisoned)?
            .insert(key.to_string(), content);
        Ok(())
    }

    async fn get_object(&self, key: &str) -> Result<Option<Vec<u8>>, AppError> {
        Ok(self.objects.lock().map_err(poisoned)?.get(key).cloned())
    }

    async fn delete_object(&self, key: &str) -> Result<(), AppError> {
        self.objects.lock().map_err(poisoned)?.remove(key);
        Ok(())
    }
}
