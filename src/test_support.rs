//! Test utilities shared across the crate.
//!
//! This module is only compiled during tests (`#[cfg(test)]`).

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use crate::auth::interceptor::SessionListener;
use crate::auth::storage::{KeyValueStorage, MemoryStorage, StorageError};
use crate::auth::token_store::TokenStore;

/// A token store over fresh in-memory storage.
pub fn memory_token_store() -> TokenStore {
    TokenStore::new(Arc::new(MemoryStorage::new()))
}

/// Storage that fails every operation, for exercising degraded paths.
pub struct FailingStorage;

impl KeyValueStorage for FailingStorage {
    fn get(&self, _key: &str) -> Result<Option<String>, StorageError> {
        Err(StorageError::Parse("injected read failure".to_string()))
    }

    fn set(&self, _key: &str, _value: &str) -> Result<(), StorageError> {
        Err(StorageError::Parse("injected write failure".to_string()))
    }

    fn remove(&self, _key: &str) -> Result<(), StorageError> {
        Err(StorageError::Parse("injected remove failure".to_string()))
    }
}

/// Counts forced-logout notifications from the interceptor.
#[derive(Default)]
pub struct RecordingListener {
    expired: AtomicUsize,
}

impl RecordingListener {
    pub fn expirations(&self) -> usize {
        self.expired.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SessionListener for RecordingListener {
    async fn on_session_expired(&self) {
        self.expired.fetch_add(1, Ordering::SeqCst);
    }
}
