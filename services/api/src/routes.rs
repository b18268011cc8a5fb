use crate::infra::AppState;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::{Extension, Json, Router};
use loan_intake::i18n::{i18n_router, TranslationStore};
use loan_intake::intake::{intake_router, ApplicationIntakeService};
use loan_intake::notify::{email_router, EmailState, Mailer, Notifier};
use loan_intake::storage::TemporaryStore;
use loan_intake::upload::{upload_router, UploadState};
use serde_json::json;
use std::sync::Arc;
use tower_http::services::ServeDir;

/// Everything the HTTP surface needs, assembled by the server at start-up.
pub(crate) struct ServiceComponents<S, N, M> {
    pub(crate) intake: Arc<ApplicationIntakeService<S, N>>,
    pub(crate) email: EmailState<M>,
    pub(crate) translations: Arc<TranslationStore>,
    pub(crate) uploads: Arc<UploadState>,
}

pub(crate) fn with_service_routes<S, N, M>(components: ServiceComponents<S, N, M>) -> Router
where
    S: TemporaryStore + 'static,
    N: Notifier + 'static,
    M: Mailer + 'static,
{
    let static_uploads = ServeDir::new(&components.uploads.directory);
    let mount = format!("/{}", components.uploads.public_path.trim_matches('/'));

    let router = intake_router(components.intake)
        .merge(email_router(components.email))
        .merge(i18n_router(components.translations))
        .merge(upload_router(components.uploads))
        .route("/health", axum::routing::get(healthcheck))
        .route("/ready", axum::routing::get(readiness_endpoint))
        .route("/metrics", axum::routing::get(metrics_endpoint));

    if mount == "/" {
        router.fallback_service(static_uploads)
    } else {
        router.nest_service(&mount, static_uploads)
    }
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}
