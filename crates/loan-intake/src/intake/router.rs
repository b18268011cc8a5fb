use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};

use super::domain::{ApplicationId, DraftId};
use super::service::{ApplicationIntakeService, IntakeError, SUBMISSION_FAILED_MESSAGE};
use crate::notify::Notifier;
use crate::storage::TemporaryStore;

const DRAFT_FAILED_MESSAGE: &str = "Failed to save draft. Please try again.";

/// Router builder exposing HTTP endpoints for submission, status and drafts.
pub fn intake_router<S, N>(service: Arc<ApplicationIntakeService<S, N>>) -> Router
where
    S: TemporaryStore + 'static,
    N: Notifier + 'static,
{
    Router::new()
        .route("/api/application/submit", post(submit_handler::<S, N>))
        .route(
            "/api/application/:application_id/status",
            get(status_handler::<S, N>),
        )
        .route("/api/application/draft", post(save_draft_handler::<S, N>))
        .route(
            "/api/application/draft/:draft_id",
            get(load_draft_handler::<S, N>),
        )
        .with_state(service)
}

pub(crate) async fn submit_handler<S, N>(
    State(service): State<Arc<ApplicationIntakeService<S, N>>>,
    submission: Result<Json<Value>, JsonRejection>,
) -> Response
where
    S: TemporaryStore + 'static,
    N: Notifier + 'static,
{
    let Json(submission) = match submission {
        Ok(body) => body,
        Err(rejection) => {
            tracing::warn!(error = %rejection, "submission body rejected");
            return failure(StatusCode::INTERNAL_SERVER_ERROR, SUBMISSION_FAILED_MESSAGE);
        }
    };

    match service.submit(submission).await {
        Ok(receipt) => {
            let payload = json!({
                "success": true,
                "applicationId": receipt.application_id,
                "message": "Application submitted successfully",
            });
            (StatusCode::OK, Json(payload)).into_response()
        }
        Err(_) => failure(StatusCode::INTERNAL_SERVER_ERROR, SUBMISSION_FAILED_MESSAGE),
    }
}

pub(crate) async fn status_handler<S, N>(
    State(service): State<Arc<ApplicationIntakeService<S, N>>>,
    Path(application_id): Path<String>,
) -> Response
where
    S: TemporaryStore + 'static,
    N: Notifier + 'static,
{
    let Some(id) = ApplicationId::parse(&application_id) else {
        return failure(StatusCode::NOT_FOUND, "Application not found");
    };

    match service.application_status(&id).await {
        Ok(view) => {
            let payload = json!({ "success": true, "application": view });
            (StatusCode::OK, Json(payload)).into_response()
        }
        Err(IntakeError::NotFound) => failure(StatusCode::NOT_FOUND, "Application not found"),
        Err(err) => {
            tracing::error!(application_id = %id, error = %err, "status lookup failed");
            failure(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to load application status",
            )
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SaveDraftRequest {
    #[serde(default)]
    pub(crate) draft_id: Option<String>,
    #[serde(default = "empty_object")]
    pub(crate) data: Value,
}

fn empty_object() -> Value {
    Value::Object(Default::default())
}

pub(crate) async fn save_draft_handler<S, N>(
    State(service): State<Arc<ApplicationIntakeService<S, N>>>,
    request: Result<Json<SaveDraftRequest>, JsonRejection>,
) -> Response
where
    S: TemporaryStore + 'static,
    N: Notifier + 'static,
{
    let Json(request) = match request {
        Ok(body) => body,
        Err(rejection) => {
            tracing::warn!(error = %rejection, "draft body rejected");
            return failure(StatusCode::INTERNAL_SERVER_ERROR, DRAFT_FAILED_MESSAGE);
        }
    };

    let existing = match request.draft_id.as_deref() {
        Some(raw) => match DraftId::parse(raw) {
            Some(id) => Some(id),
            None => return failure(StatusCode::NOT_FOUND, "Draft not found"),
        },
        None => None,
    };

    match service.save_draft(request.data, existing).await {
        Ok(receipt) => {
            let payload = json!({
                "success": true,
                "draftId": receipt.draft_id,
                "expiresAt": receipt.expires_at,
            });
            (StatusCode::OK, Json(payload)).into_response()
        }
        Err(IntakeError::NotFound) => failure(StatusCode::NOT_FOUND, "Draft not found"),
        Err(_) => failure(StatusCode::INTERNAL_SERVER_ERROR, DRAFT_FAILED_MESSAGE),
    }
}

pub(crate) async fn load_draft_handler<S, N>(
    State(service): State<Arc<ApplicationIntakeService<S, N>>>,
    Path(draft_id): Path<String>,
) -> Response
where
    S: TemporaryStore + 'static,
    N: Notifier + 'static,
{
    let Some(id) = DraftId::parse(&draft_id) else {
        return failure(StatusCode::NOT_FOUND, "Draft not found");
    };

    match service.load_draft(&id).await {
        Ok(draft) => {
            let payload = json!({ "success": true, "draftId": id, "data": draft });
            (StatusCode::OK, Json(payload)).into_response()
        }
        Err(IntakeError::NotFound) => failure(StatusCode::NOT_FOUND, "Draft not found"),
        Err(err) => {
            tracing::error!(draft_id = %id, error = %err, "draft load failed");
            failure(StatusCode::INTERNAL_SERVER_ERROR, "Failed to load draft")
        }
    }
}

fn failure(status: StatusCode, message: &str) -> Response {
    let payload = json!({ "success": false, "error": message });
    (status, Json(payload)).into_response()
}
