use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids;
use crate::storage::{Collection, StoreError, TemporaryStore};

/// Notable actions recorded for traceability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    ApplicationSubmitted,
    ApplicationError,
    ApplicationDeleted,
    DraftSaved,
    DraftLoaded,
}

impl AuditAction {
    pub const fn label(self) -> &'static str {
        match self {
            AuditAction::ApplicationSubmitted => "application_submitted",
            AuditAction::ApplicationError => "application_error",
            AuditAction::ApplicationDeleted => "application_deleted",
            AuditAction::DraftSaved => "draft_saved",
            AuditAction::DraftLoaded => "draft_loaded",
        }
    }
}

/// Append-only audit record. Details carry metadata only, never applicant data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditEntry {
    pub id: String,
    pub action: AuditAction,
    pub resource_id: String,
    pub details: BTreeMap<String, String>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, thiserror::Error)]
pub enum AuditError {
    #[error("audit entry could not be encoded: {0}")]
    Encode(#[from] serde_json::Error),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Writes audit entries into the audit collection of the temporary store.
pub struct AuditTrail<S> {
    store: Arc<S>,
    retention: Duration,
}

impl<S> AuditTrail<S>
where
    S: TemporaryStore + 'static,
{
    pub fn new(store: Arc<S>, retention: Duration) -> Self {
        Self { store, retention }
    }

    pub async fn record(
        &self,
        action: AuditAction,
        resource_id: &str,
        details: BTreeMap<String, String>,
    ) -> Result<AuditEntry, AuditError> {
        let timestamp = Utc::now();
        let entry = AuditEntry {
            id: ids::timestamped("log", timestamp),
            action,
            resource_id: resource_id.to_string(),
            details,
            timestamp,
        };

        let encoded = serde_json::to_string(&entry)?;
        self.store
            .put(Collection::AuditLogs, &entry.id, encoded, self.retention)
            .await?;
        Ok(entry)
    }

    /// Record an entry, logging and swallowing any failure.
    pub async fn record_best_effort(
        &self,
        action: AuditAction,
        resource_id: &str,
        details: BTreeMap<String, String>,
    ) {
        if let Err(err) = self.record(action, resource_id, details).await {
            tracing::warn!(
                action = action.label(),
                resource_id,
                error = %err,
                "audit log write failed"
            );
        }
    }
}

/// Build a detail map from string pairs.
pub fn details<const N: usize>(pairs: [(&str, String); N]) -> BTreeMap<String, String> {
    pairs
        .into_iter()
        .map(|(key, value)| (key.to_string(), value))
        .collect()
}
