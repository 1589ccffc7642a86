//! In-process credential store.
//!
//! Expiry is measured with `tokio::time::Instant`, so tests running on a
//! paused clock can advance past a TTL deterministically.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;

use super::{CredentialStore, StoreError};

struct Entry {
    value: String,
    expires_at: Instant,
}

/// HashMap-backed [`CredentialStore`].
#[derive(Default)]
pub struct MemoryCredentialStore {
    entries: Mutex<HashMap<String, Entry>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, Entry>>, StoreError> {
        self.entries.lock().map_err(|e| StoreError::Backend {
            reason: format!("lock poisoned: {e}"),
        })
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let mut entries = self.lock()?;
        let now = Instant::now();
        match entries.get(key) {
            Some(entry) if entry.expires_at > now => Ok(Some(entry.value.clone())),
            Some(_) => {
                entries.remove(key);
                tracing::debug!(key, "credential expired");
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), StoreError> {
        let mut entries = self.lock()?;
        let now = Instant::now();
        let expires_at = now.checked_add(ttl).ok_or_else(|| StoreError::Backend {
            reason: format!("ttl of {}s for '{key}' is out of range", ttl.as_secs()),
        })?;
        entries.retain(|_, e| e.expires_at > now);
        entries.insert(
            key.to_string(),
            Entry {
                value: value.to_string(),
                expires_at,
            },
        );
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.lock()?.remove(key);
        Ok(())
    }
}
