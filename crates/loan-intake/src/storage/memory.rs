use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use async_trait::async_trait;

use super::{Collection, StoreError, TemporaryStore};

/// Deadline used when `now + ttl` does not fit in an `Instant`.
const FAR_FUTURE: Duration = Duration::from_secs(100 * 365 * 24 * 60 * 60);

fn deadline(now: Instant, ttl: Duration) -> Instant {
    now.checked_add(ttl)
        .or_else(|| now.checked_add(FAR_FUTURE))
        .unwrap_or(now)
}

#[derive(Debug, Clone)]
struct Entry {
    value: String,
    expires_at: Instant,
}

/// In-process store with per-entry deadlines, used when no Valkey URL is configured.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    entries: Arc<Mutex<HashMap<String, Entry>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live entries in `collection`.
    pub fn len(&self, collection: Collection) -> usize {
        let prefix = format!("{}:", collection.prefix());
        let now = Instant::now();
        self.entries
            .lock()
            .map(|guard| {
                guard
                    .iter()
                    .filter(|(key, entry)| key.starts_with(&prefix) && entry.expires_at > now)
                    .count()
            })
            .unwrap_or(0)
    }

    pub fn is_empty(&self, collection: Collection) -> bool {
        self.len(collection) == 0
    }
}

fn poisoned() -> StoreError {
    StoreError::Unavailable("memory store lock poisoned".to_string())
}

#[async_trait]
impl TemporaryStore for MemoryStore {
    async fn put(
        &self,
        collection: Collection,
        id: &str,
        value: String,
        ttl: Duration,
    ) -> Result<(), StoreError> {
        let mut guard = self.entries.lock().map_err(|_| poisoned())?;
        let now = Instant::now();
        guard.retain(|_, entry| entry.expires_at > now);
        guard.insert(
            collection.key(id),
            Entry {
                value,
                expires_at: deadline(now, ttl),
            },
        );
        Ok(())
    }

    async fn get(&self, collection: Collection, id: &str) -> Result<Option<String>, StoreError> {
        let guard = self.entries.lock().map_err(|_| poisoned())?;
        Ok(guard
            .get(&collection.key(id))
            .filter(|entry| entry.expires_at > Instant::now())
            .map(|entry| entry.value.clone()))
    }

    async fn delete(&self, collection: Collection, id: &str) -> Result<(), StoreError> {
        let mut guard = self.entries.lock().map_err(|_| poisoned())?;
        guard.remove(&collection.key(id));
        Ok(())
    }
}
