use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde_json::json;

use super::store::TranslationStore;

/// Serves raw bundles to the marketing front end.
pub fn i18n_router(store: Arc<TranslationStore>) -> Router {
    Router::new()
        .route("/api/i18n/:locale/:namespace", get(bundle_handler))
        .with_state(store)
}

pub(crate) async fn bundle_handler(
    State(store): State<Arc<TranslationStore>>,
    Path((locale, namespace)): Path<(String, String)>,
) -> Response {
    match store.bundle(&locale, &namespace) {
        Some(bundle) => (StatusCode::OK, Json(bundle.clone())).into_response(),
        None => {
            let payload = json!({
                "error": format!("no translations for namespace '{namespace}'"),
            });
            (StatusCode::NOT_FOUND, Json(payload)).into_response()
        }
    }
}
