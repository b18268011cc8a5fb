use async_trait::async_trait;
use loan_intake::config::StorageConfig;
use loan_intake::storage::{Collection, MemoryStore, StoreError, TemporaryStore, ValkeyStore};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Duration;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Store chosen at start-up: Valkey when a URL is configured, memory otherwise.
#[derive(Clone)]
pub(crate) enum SelectedStore {
    Memory(MemoryStore),
    Valkey(ValkeyStore),
}

impl SelectedStore {
    pub(crate) async fn from_config(config: &StorageConfig) -> Result<Self, StoreError> {
        match config.valkey_url.as_deref() {
            Some(url) => Ok(Self::Valkey(ValkeyStore::connect(url).await?)),
            None => {
                tracing::warn!("VALKEY_URL not set; records live in process memory only");
                Ok(Self::Memory(MemoryStore::new()))
            }
        }
    }

    pub(crate) fn backend(&self) -> &'static str {
        match self {
            SelectedStore::Memory(_) => "memory",
            SelectedStore::Valkey(_) => "valkey",
        }
    }
}

#[async_trait]
impl TemporaryStore for SelectedStore {
    async fn put(
        &self,
        collection: Collection,
        id: &str,
        value: String,
        ttl: Duration,
    ) -> Result<(), StoreError> {
        match self {
            SelectedStore::Memory(store) => store.put(collection, id, value, ttl).await,
            SelectedStore::Valkey(store) => store.put(collection, id, value, ttl).await,
        }
    }

    async fn get(&self, collection: Collection, id: &str) -> Result<Option<String>, StoreError> {
        match self {
            SelectedStore::Memory(store) => store.get(collection, id).await,
            SelectedStore::Valkey(store) => store.get(collection, id).await,
        }
    }

    async fn delete(&self, collection: Collection, id: &str) -> Result<(), StoreError> {
        match self {
            SelectedStore::Memory(store) => store.delete(collection, id).await,
            SelectedStore::Valkey(store) => store.delete(collection, id).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn falls_back_to_memory_without_url() {
        let store = SelectedStore::from_config(&StorageConfig { valkey_url: None })
            .await
            .expect("memory store");
        assert_eq!(store.backend(), "memory");

        store
            .put(Collection::Drafts, "draft_1_a", "{}".to_string(), Duration::from_secs(60))
            .await
            .expect("put");
        assert_eq!(
            store.get(Collection::Drafts, "draft_1_a").await.expect("get"),
            Some("{}".to_string())
        );
    }
}
