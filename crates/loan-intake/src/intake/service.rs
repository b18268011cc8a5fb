use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing::{error, info, warn};

use super::audit::{details, AuditAction, AuditTrail};
use super::domain::{
    expiry_after, ApplicationId, ApplicationStatusView, DraftId, DraftReceipt, LoanApplication,
    RecordStatus, RetentionPolicy, StoredRecord, SubmissionReceipt,
};
use super::validation::{self, ValidationError};
use crate::crypto::{CryptoError, PayloadCipher};
use crate::notify::{NotificationPayload, Notifier};
use crate::storage::{Collection, StoreError, TemporaryStore};

/// Generic message returned to clients for any submission failure.
pub const SUBMISSION_FAILED_MESSAGE: &str = "Failed to submit application. Please try again.";

/// Service composing validation, encryption, the temporary store, notifications and audit.
pub struct ApplicationIntakeService<S, N> {
    store: Arc<S>,
    notifier: Arc<N>,
    cipher: Arc<PayloadCipher>,
    audit: AuditTrail<S>,
    retention: RetentionPolicy,
}

impl<S, N> ApplicationIntakeService<S, N>
where
    S: TemporaryStore + 'static,
    N: Notifier + 'static,
{
    pub fn new(store: Arc<S>, notifier: Arc<N>, cipher: Arc<PayloadCipher>) -> Self {
        Self::with_retention(store, notifier, cipher, RetentionPolicy::default())
    }

    pub fn with_retention(
        store: Arc<S>,
        notifier: Arc<N>,
        cipher: Arc<PayloadCipher>,
        retention: RetentionPolicy,
    ) -> Self {
        let audit = AuditTrail::new(store.clone(), retention.audit);
        Self {
            store,
            notifier,
            cipher,
            audit,
            retention,
        }
    }

    pub fn retention(&self) -> RetentionPolicy {
        self.retention
    }

    /// Validate, encrypt, store, notify and audit a final submission.
    ///
    /// Validation runs before any side effect. Notification and audit failures are logged
    /// and never change the outcome.
    pub async fn submit(&self, raw: Value) -> Result<SubmissionReceipt, IntakeError> {
        let application = validation::validate_application(raw).map_err(|err| {
            warn!(issues = err.issues().len(), error = %err, "application rejected");
            err
        })?;

        let now = Utc::now();
        let application_id = ApplicationId::generate(now);

        let record = match self
            .persist(
                Collection::Applications,
                &application_id.0,
                &application,
                now,
                self.retention.application,
            )
            .await
        {
            Ok(record) => record,
            Err(err) => {
                error!(application_id = %application_id, error = %err, "application could not be stored");
                self.audit
                    .record_best_effort(
                        AuditAction::ApplicationError,
                        &application_id.0,
                        details([("error", err.to_string())]),
                    )
                    .await;
                return Err(err);
            }
        };

        let payload = NotificationPayload {
            application_id: application_id.0.clone(),
            applicant_name: application.applicant_name(),
            applicant_email: application.personal_info.email.trim().to_string(),
            loan_amount: application.loan_details.amount.unwrap_or_default(),
            currency: application.loan_details.currency.clone(),
            locale: application.locale.clone(),
            submitted_at: record.created_at,
            expires_at: record.expires_at,
        };
        self.notify(&payload).await;

        self.audit
            .record_best_effort(
                AuditAction::ApplicationSubmitted,
                &application_id.0,
                details([
                    ("loanAmount", payload.loan_amount.to_string()),
                    ("documents", application.documents.len().to_string()),
                    ("expiresAt", record.expires_at.to_rfc3339()),
                ]),
            )
            .await;

        info!(application_id = %application_id, expires_at = %record.expires_at, "application submitted");
        Ok(SubmissionReceipt {
            application_id,
            expires_at: record.expires_at,
        })
    }

    /// Decrypt a stored application. Expired entries read as not found.
    pub async fn get_application(
        &self,
        application_id: &ApplicationId,
    ) -> Result<LoanApplication, IntakeError> {
        let record = self
            .fetch_live(Collection::Applications, &application_id.0)
            .await?
            .ok_or(IntakeError::NotFound)?;
        self.decrypt(&record)
    }

    /// Non-sensitive status view; the payload is never decrypted.
    pub async fn application_status(
        &self,
        application_id: &ApplicationId,
    ) -> Result<ApplicationStatusView, IntakeError> {
        let record = self
            .fetch_live(Collection::Applications, &application_id.0)
            .await?
            .ok_or(IntakeError::NotFound)?;
        Ok(record.status_view())
    }

    pub async fn delete_application(&self, application_id: &ApplicationId) -> Result<(), IntakeError> {
        self.fetch_live(Collection::Applications, &application_id.0)
            .await?
            .ok_or(IntakeError::NotFound)?;
        self.store
            .delete(Collection::Applications, &application_id.0)
            .await?;
        self.audit
            .record_best_effort(
                AuditAction::ApplicationDeleted,
                &application_id.0,
                details([("reason", "requested".to_string())]),
            )
            .await;
        info!(application_id = %application_id, "application deleted");
        Ok(())
    }

    /// Save a partial application. Passing an existing draft id overwrites that draft.
    pub async fn save_draft(
        &self,
        raw: Value,
        existing: Option<DraftId>,
    ) -> Result<DraftReceipt, IntakeError> {
        let draft = validation::validate_draft(raw).map_err(|err| {
            warn!(issues = err.issues().len(), error = %err, "draft rejected");
            err
        })?;

        let now = Utc::now();
        let draft_id = match existing {
            Some(id) => {
                self.fetch_live(Collection::Drafts, &id.0)
                    .await?
                    .ok_or(IntakeError::NotFound)?;
                id
            }
            None => DraftId::generate(now),
        };

        let record = self
            .persist(Collection::Drafts, &draft_id.0, &draft, now, self.retention.draft)
            .await
            .map_err(|err| {
                error!(draft_id = %draft_id, error = %err, "draft could not be stored");
                err
            })?;

        self.audit
            .record_best_effort(
                AuditAction::DraftSaved,
                &draft_id.0,
                details([("expiresAt", record.expires_at.to_rfc3339())]),
            )
            .await;

        info!(draft_id = %draft_id, "draft saved");
        Ok(DraftReceipt {
            draft_id,
            expires_at: record.expires_at,
        })
    }

    pub async fn load_draft(&self, draft_id: &DraftId) -> Result<LoanApplication, IntakeError> {
        let record = self
            .fetch_live(Collection::Drafts, &draft_id.0)
            .await?
            .ok_or(IntakeError::NotFound)?;
        let draft = self.decrypt(&record)?;

        self.audit
            .record_best_effort(
                AuditAction::DraftLoaded,
                &draft_id.0,
                details([("expiresAt", record.expires_at.to_rfc3339())]),
            )
            .await;
        Ok(draft)
    }

    async fn persist(
        &self,
        collection: Collection,
        id: &str,
        application: &LoanApplication,
        now: DateTime<Utc>,
        ttl: Duration,
    ) -> Result<StoredRecord, IntakeError> {
        let record = StoredRecord {
            id: id.to_string(),
            encrypted_data: self.cipher.seal(application)?,
            created_at: now,
            expires_at: expiry_after(now, ttl),
            status: RecordStatus::Pending,
        };

        let encoded = serde_json::to_string(&record)
            .map_err(|err| IntakeError::CorruptRecord(err.to_string()))?;
        self.store.put(collection, id, encoded, ttl).await?;
        Ok(record)
    }

    /// Fetch a record, treating (and removing) entries past their `expiresAt` as absent.
    async fn fetch_live(
        &self,
        collection: Collection,
        id: &str,
    ) -> Result<Option<StoredRecord>, IntakeError> {
        let Some(raw) = self.store.get(collection, id).await? else {
            return Ok(None);
        };
        let record: StoredRecord = serde_json::from_str(&raw)
            .map_err(|err| IntakeError::CorruptRecord(err.to_string()))?;

        if record.is_expired(Utc::now()) {
            match self.store.delete(collection, id).await {
                Ok(()) => info!(%collection, id, "expired record removed"),
                Err(err) => warn!(%collection, id, error = %err, "expired record removal failed"),
            }
            return Ok(None);
        }

        Ok(Some(record))
    }

    fn decrypt(&self, record: &StoredRecord) -> Result<LoanApplication, IntakeError> {
        self.cipher.open(&record.encrypted_data).map_err(|err| {
            error!(id = %record.id, error = %err, "stored payload could not be decrypted");
            IntakeError::from(err)
        })
    }

    async fn notify(&self, payload: &NotificationPayload) {
        if let Err(err) = self.notifier.admin_notification(payload).await {
            warn!(application_id = %payload.application_id, error = %err, "admin notification failed");
        }
        if let Err(err) = self.notifier.application_confirmation(payload).await {
            warn!(application_id = %payload.application_id, error = %err, "applicant confirmation failed");
        }
    }
}

/// Error raised by the intake service.
#[derive(Debug, thiserror::Error)]
pub enum IntakeError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Crypto(#[from] CryptoError),
    #[error(transparent)]
    Storage(#[from] StoreError),
    #[error("stored record is corrupt: {0}")]
    CorruptRecord(String),
    #[error("record not found")]
    NotFound,
}
