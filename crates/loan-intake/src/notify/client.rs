use async_trait::async_trait;

use super::{NotificationError, NotificationPayload, Notifier};

pub const ADMIN_NOTIFICATION_PATH: &str = "/api/email/admin-notification";
pub const APPLICATION_CONFIRMATION_PATH: &str = "/api/email/application-confirmation";

/// Calls the email endpoints over HTTP. No retries; a failed call is reported once.
#[derive(Debug, Clone)]
pub struct HttpNotifier {
    client: reqwest::Client,
    base_url: String,
}

impl HttpNotifier {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { client, base_url }
    }

    async fn post(&self, path: &str, payload: &NotificationPayload) -> Result<(), NotificationError> {
        let endpoint = format!("{}{path}", self.base_url);
        let response = self
            .client
            .post(&endpoint)
            .json(payload)
            .send()
            .await
            .map_err(|err| NotificationError::Transport(err.to_string()))?;

        let status = response.status();
        if status.is_success() {
            tracing::debug!(%endpoint, application_id = %payload.application_id, "notification sent");
            Ok(())
        } else {
            Err(NotificationError::Rejected {
                endpoint,
                status: status.as_u16(),
            })
        }
    }
}

#[async_trait]
impl Notifier for HttpNotifier {
    async fn admin_notification(
        &self,
        payload: &NotificationPayload,
    ) -> Result<(), NotificationError> {
        self.post(ADMIN_NOTIFICATION_PATH, payload).await
    }

    async fn application_confirmation(
        &self,
        payload: &NotificationPayload,
    ) -> Result<(), NotificationError> {
        self.post(APPLICATION_CONFIRMATION_PATH, payload).await
    }
}
