use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use serde_json::json;

use super::client::{ADMIN_NOTIFICATION_PATH, APPLICATION_CONFIRMATION_PATH};
use super::email::{EmailComposer, EmailMessage, MailError, Mailer};
use super::NotificationPayload;

/// Shared collaborators for the email endpoints.
pub struct EmailState<M> {
    pub mailer: Arc<M>,
    pub composer: Arc<EmailComposer>,
}

impl<M> Clone for EmailState<M> {
    fn clone(&self) -> Self {
        Self {
            mailer: self.mailer.clone(),
            composer: self.composer.clone(),
        }
    }
}

/// Router exposing the two internal email endpoints.
pub fn email_router<M>(state: EmailState<M>) -> Router
where
    M: Mailer + 'static,
{
    Router::new()
        .route(ADMIN_NOTIFICATION_PATH, post(admin_notification_handler::<M>))
        .route(
            APPLICATION_CONFIRMATION_PATH,
            post(application_confirmation_handler::<M>),
        )
        .with_state(state)
}

pub(crate) async fn admin_notification_handler<M>(
    State(state): State<EmailState<M>>,
    payload: Result<Json<NotificationPayload>, JsonRejection>,
) -> Response
where
    M: Mailer + 'static,
{
    let Json(payload) = match payload {
        Ok(body) => body,
        Err(rejection) => return rejected("admin_notification", &rejection),
    };
    let message = state.composer.admin_notification(&payload);
    deliver(state.mailer.as_ref(), message, "admin_notification").await
}

pub(crate) async fn application_confirmation_handler<M>(
    State(state): State<EmailState<M>>,
    payload: Result<Json<NotificationPayload>, JsonRejection>,
) -> Response
where
    M: Mailer + 'static,
{
    let Json(payload) = match payload {
        Ok(body) => body,
        Err(rejection) => return rejected("application_confirmation", &rejection),
    };
    let message = state.composer.application_confirmation(&payload);
    deliver(state.mailer.as_ref(), message, "application_confirmation").await
}

async fn deliver<M>(
    mailer: &M,
    message: Result<EmailMessage, MailError>,
    template: &'static str,
) -> Response
where
    M: Mailer + ?Sized,
{
    let result = match message {
        Ok(message) => mailer.send(&message).await,
        Err(err) => return rejected(template, &err),
    };

    match result {
        Ok(()) => (StatusCode::OK, Json(json!({ "success": true }))).into_response(),
        Err(err) => {
            tracing::error!(template, error = %err, "email delivery failed");
            let payload = json!({ "success": false, "error": "Failed to send email" });
            (StatusCode::INTERNAL_SERVER_ERROR, Json(payload)).into_response()
        }
    }
}

fn rejected(template: &'static str, err: &dyn std::fmt::Display) -> Response {
    tracing::warn!(template, error = %err, "email request rejected");
    let payload = json!({ "success": false, "error": "Invalid email request" });
    (StatusCode::BAD_REQUEST, Json(payload)).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::i18n::TranslationStore;
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::{header, Request};
    use std::sync::Mutex;
    use tower::ServiceExt;

    #[derive(Default)]
    struct RecordingMailer {
        sent: Mutex<Vec<EmailMessage>>,
        fail: bool,
    }

    #[async_trait]
    impl Mailer for RecordingMailer {
        async fn send(&self, message: &EmailMessage) -> Result<(), MailError> {
            if self.fail {
                return Err(MailError::Transport("relay offline".to_string()));
            }
            self.sent
                .lock()
                .expect("mailer mutex poisoned")
                .push(message.clone());
            Ok(())
        }
    }

    fn router(mailer: Arc<RecordingMailer>) -> Router {
        email_router(EmailState {
            mailer,
            composer: Arc::new(EmailComposer::new(
                Arc::new(TranslationStore::default()),
                "loans@example.org",
            )),
        })
    }

    fn request(path: &str, applicant_email: &str) -> Request<Body> {
        let body = json!({
            "applicationId": "app_1700000000000_abc123xyz",
            "applicantName": "Amina Odhiambo",
            "applicantEmail": applicant_email,
            "loanAmount": 2500.0,
            "submittedAt": "2026-10-14T09:00:00Z",
            "expiresAt": "2026-10-16T09:00:00Z"
        });
        Request::post(path)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .expect("request")
    }

    #[tokio::test]
    async fn confirmation_endpoint_sends_to_applicant() {
        let mailer = Arc::new(RecordingMailer::default());
        let response = router(mailer.clone())
            .oneshot(request(APPLICATION_CONFIRMATION_PATH, "amina@example.org"))
            .await
            .expect("router responds");

        assert_eq!(response.status(), StatusCode::OK);
        let sent = mailer.sent.lock().expect("mailer mutex poisoned");
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to, "amina@example.org");
    }

    #[tokio::test]
    async fn admin_endpoint_sends_to_admin() {
        let mailer = Arc::new(RecordingMailer::default());
        let response = router(mailer.clone())
            .oneshot(request(ADMIN_NOTIFICATION_PATH, "amina@example.org"))
            .await
            .expect("router responds");

        assert_eq!(response.status(), StatusCode::OK);
        let sent = mailer.sent.lock().expect("mailer mutex poisoned");
        assert_eq!(sent[0].to, "loans@example.org");
    }

    #[tokio::test]
    async fn header_injection_is_a_bad_request() {
        let mailer = Arc::new(RecordingMailer::default());
        let response = router(mailer.clone())
            .oneshot(request(
                APPLICATION_CONFIRMATION_PATH,
                "amina@example.org\nBcc: evil@example.org",
            ))
            .await
            .expect("router responds");

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(mailer.sent.lock().expect("mailer mutex poisoned").is_empty());
    }

    #[tokio::test]
    async fn delivery_failure_is_internal_error() {
        let mailer = Arc::new(RecordingMailer {
            fail: true,
            ..RecordingMailer::default()
        });
        let response = router(mailer)
            .oneshot(request(ADMIN_NOTIFICATION_PATH, "amina@example.org"))
            .await
            .expect("router responds");

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn unparseable_bodies_get_json_bad_request() {
        for (path, body, content_type) in [
            (ADMIN_NOTIFICATION_PATH, "{ not json", "application/json"),
            (APPLICATION_CONFIRMATION_PATH, r#"{"applicationId": 1}"#, "application/json"),
            (APPLICATION_CONFIRMATION_PATH, "applicationId=1", "text/plain"),
        ] {
            let mailer = Arc::new(RecordingMailer::default());
            let response = router(mailer.clone())
                .oneshot(
                    Request::post(path)
                        .header(header::CONTENT_TYPE, content_type)
                        .body(Body::from(body))
                        .expect("request"),
                )
                .await
                .expect("router responds");

            assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{path} {body}");
            let bytes = axum::body::to_bytes(response.into_body(), 64 * 1024)
                .await
                .expect("read body");
            let payload: serde_json::Value = serde_json::from_slice(&bytes).expect("json payload");
            assert_eq!(
                payload,
                json!({ "success": false, "error": "Invalid email request" })
            );
            assert!(mailer.sent.lock().expect("mailer mutex poisoned").is_empty());
        }
    }
}
