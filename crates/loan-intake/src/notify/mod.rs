//! Notification emails triggered by a submission.
//!
//! The intake pipeline calls a [`Notifier`]; the production one posts to this service's own
//! email endpoints, which compose the message and hand it to a [`Mailer`].

pub mod client;
pub mod email;
pub mod router;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub use client::HttpNotifier;
pub use email::{EmailComposer, EmailMessage, MailError, Mailer, SmtpMailer};
pub use router::{email_router, EmailState};

/// Body posted to the email endpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationPayload {
    pub application_id: String,
    pub applicant_name: String,
    pub applicant_email: String,
    pub loan_amount: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locale: Option<String>,
    pub submitted_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// Outbound notification hooks used by the intake pipeline.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn admin_notification(&self, payload: &NotificationPayload)
        -> Result<(), NotificationError>;

    async fn application_confirmation(
        &self,
        payload: &NotificationPayload,
    ) -> Result<(), NotificationError>;
}

#[derive(Debug, thiserror::Error)]
pub enum NotificationError {
    #[error("notification transport unavailable: {0}")]
    Transport(String),
    #[error("notification endpoint {endpoint} answered {status}")]
    Rejected { endpoint: String, status: u16 },
}
