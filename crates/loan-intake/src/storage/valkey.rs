use std::time::Duration;

use async_trait::async_trait;
use fred::prelude::*;

use super::{Collection, StoreError, TemporaryStore};

const POOL_SIZE: usize = 4;

/// Valkey/Redis-backed store; expiry is delegated to the server via `SET .. EX`.
#[derive(Clone)]
pub struct ValkeyStore {
    pool: fred::clients::Pool,
}

impl ValkeyStore {
    #[tracing::instrument(skip(url), err)]
    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        let config = fred::types::config::Config::from_url(url)?;
        let pool = fred::clients::Pool::new(config, None, None, None, POOL_SIZE)?;
        pool.init().await?;

        tracing::info!("connected to valkey");
        Ok(Self { pool })
    }
}

impl From<fred::error::Error> for StoreError {
    fn from(err: fred::error::Error) -> Self {
        StoreError::Backend(err.to_string())
    }
}

fn ttl_seconds(ttl: Duration) -> i64 {
    i64::try_from(ttl.as_secs()).unwrap_or(i64::MAX).max(1)
}

#[async_trait]
impl TemporaryStore for ValkeyStore {
    async fn put(
        &self,
        collection: Collection,
        id: &str,
        value: String,
        ttl: Duration,
    ) -> Result<(), StoreError> {
        let expiration = Some(Expiration::EX(ttl_seconds(ttl)));
        self.pool
            .set::<(), _, _>(collection.key(id), value, expiration, None, false)
            .await?;
        Ok(())
    }

    async fn get(&self, collection: Collection, id: &str) -> Result<Option<String>, StoreError> {
        let value: Option<String> = self.pool.get(collection.key(id)).await?;
        Ok(value)
    }

    async fn delete(&self, collection: Collection, id: &str) -> Result<(), StoreError> {
        self.pool.del::<(), _>(collection.key(id)).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ttl_is_rounded_to_whole_seconds_with_floor_of_one() {
        assert_eq!(ttl_seconds(Duration::from_secs(48 * 3600)), 172_800);
        assert_eq!(ttl_seconds(Duration::from_millis(10)), 1);
    }

    #[test]
    fn keys_are_namespaced_by_collection() {
        assert_eq!(Collection::Applications.key("app_1_x"), "application:app_1_x");
        assert_eq!(Collection::Drafts.key("draft_1_x"), "draft:draft_1_x");
        assert_eq!(Collection::AuditLogs.key("log"), "audit:log");
    }
}
