//! Key-value adapter for short-lived records: applications, drafts and audit logs.
//!
//! The adapter enforces no schema. Values are opaque strings and every write carries a TTL,
//! after which the backing store forgets the entry.

pub mod memory;
pub mod valkey;

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;

pub use memory::MemoryStore;
pub use valkey::ValkeyStore;

/// Logical collections sharing one keyspace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Applications,
    Drafts,
    AuditLogs,
}

impl Collection {
    pub const fn prefix(self) -> &'static str {
        match self {
            Collection::Applications => "application",
            Collection::Drafts => "draft",
            Collection::AuditLogs => "audit",
        }
    }

    pub fn key(self, id: &str) -> String {
        format!("{}:{id}", self.prefix())
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.prefix())
    }
}

/// Storage abstraction so the intake pipeline can run against memory or Valkey.
#[async_trait]
pub trait TemporaryStore: Send + Sync {
    async fn put(
        &self,
        collection: Collection,
        id: &str,
        value: String,
        ttl: Duration,
    ) -> Result<(), StoreError>;

    async fn get(&self, collection: Collection, id: &str) -> Result<Option<String>, StoreError>;

    async fn delete(&self, collection: Collection, id: &str) -> Result<(), StoreError>;
}

/// Error enumeration for store failures.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("store command failed: {0}")]
    Backend(String),
}
