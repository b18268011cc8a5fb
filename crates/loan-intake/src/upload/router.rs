use std::sync::Arc;

use axum::{
    extract::{multipart::MultipartRejection, DefaultBodyLimit, Multipart, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use serde::Serialize;
use serde_json::json;

use super::{
    store_upload, validate_document_type, AcceptedUpload, UploadError, UploadPolicy,
    UploadReceipt, UploadState,
};

/// Request bodies may exceed the file ceiling so oversized files are reported as such.
const REQUEST_BODY_LIMIT: usize = 10 * 1024 * 1024;

const UPLOAD_FAILED_MESSAGE: &str = "Failed to upload file";

pub fn upload_router(state: Arc<UploadState>) -> Router {
    Router::new()
        .route("/api/upload", post(upload_handler))
        .layer(DefaultBodyLimit::max(REQUEST_BODY_LIMIT))
        .with_state(state)
}

#[derive(Serialize)]
struct UploadResponse {
    success: bool,
    #[serde(flatten)]
    receipt: UploadReceipt,
}

pub(crate) async fn upload_handler(
    State(state): State<Arc<UploadState>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Response {
    let multipart = match multipart {
        Ok(multipart) => multipart,
        Err(rejection) => {
            tracing::warn!(error = %rejection, "upload rejected before parsing");
            return failure(StatusCode::BAD_REQUEST, "Malformed upload request");
        }
    };

    let outcome = match read_upload(&state.policy, multipart).await {
        Ok(upload) => store_upload(&state, upload).await,
        Err(err) => Err(err),
    };

    match outcome {
        Ok(receipt) => {
            let body = UploadResponse {
                success: true,
                receipt,
            };
            (StatusCode::OK, Json(body)).into_response()
        }
        Err(err) if err.is_client_error() => {
            tracing::warn!(error = %err, "upload refused");
            failure(StatusCode::BAD_REQUEST, &err.to_string())
        }
        Err(err) => {
            tracing::error!(error = %err, "upload failed");
            failure(StatusCode::INTERNAL_SERVER_ERROR, UPLOAD_FAILED_MESSAGE)
        }
    }
}

/// Drains the form, stopping as soon as the file breaks a policy rule.
async fn read_upload(
    policy: &UploadPolicy,
    mut multipart: Multipart,
) -> Result<AcceptedUpload, UploadError> {
    let mut document_type: Option<String> = None;
    let mut file: Option<(String, String, &'static str, Vec<u8>)> = None;

    while let Some(mut field) = multipart.next_field().await? {
        let name = field.name().map(str::to_owned);
        match name.as_deref() {
            Some("documentType") => document_type = Some(field.text().await?),
            Some("file") => {
                let original_name = field.file_name().unwrap_or_default().to_string();
                let content_type = field.content_type().unwrap_or_default().to_string();
                if original_name.is_empty() && content_type.is_empty() {
                    continue;
                }
                let extension = policy
                    .extension_for(&content_type)
                    .ok_or(UploadError::UnsupportedType)?;

                let mut bytes = Vec::new();
                while let Some(chunk) = field.chunk().await? {
                    if bytes.len() + chunk.len() > policy.max_bytes {
                        return Err(UploadError::TooLarge);
                    }
                    bytes.extend_from_slice(&chunk);
                }
                file = Some((original_name, content_type, extension, bytes));
            }
            _ => {}
        }
    }

    let (original_name, content_type, extension, bytes) = file.ok_or(UploadError::MissingFile)?;
    let document_type =
        validate_document_type(&document_type.ok_or(UploadError::MissingDocumentType)?)?;

    Ok(AcceptedUpload {
        document_type,
        original_name,
        content_type,
        extension,
        bytes,
    })
}

fn failure(status: StatusCode, message: &str) -> Response {
    let payload = json!({ "success": false, "error": message });
    (status, Json(payload)).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{header, Request};
    use serde_json::Value;
    use std::path::Path;
    use tower::ServiceExt;

    const BOUNDARY: &str = "loan-intake-boundary";

    struct FilePart<'a> {
        file_name: &'a str,
        content_type: &'a str,
        bytes: Vec<u8>,
    }

    fn multipart_request(document_type: Option<&str>, file: Option<FilePart<'_>>) -> Request<Body> {
        let mut body = Vec::new();
        if let Some(document_type) = document_type {
            body.extend_from_slice(
                format!(
                    "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"documentType\"\r\n\r\n{document_type}\r\n"
                )
                .as_bytes(),
            );
        }
        if let Some(file) = file {
            body.extend_from_slice(
                format!(
                    "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{}\"\r\nContent-Type: {}\r\n\r\n",
                    file.file_name, file.content_type
                )
                .as_bytes(),
            );
            body.extend_from_slice(&file.bytes);
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

        Request::post("/api/upload")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .expect("request")
    }

    async fn send(directory: &Path, request: Request<Body>) -> (StatusCode, Value) {
        let router = upload_router(Arc::new(UploadState::new(directory, "/uploads")));
        let response = router.oneshot(request).await.expect("router responds");
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
            .await
            .expect("read body");
        (status, serde_json::from_slice(&body).expect("json payload"))
    }

    fn stored_files(directory: &Path) -> usize {
        match std::fs::read_dir(directory) {
            Ok(entries) => entries.count(),
            Err(_) => 0,
        }
    }

    #[tokio::test]
    async fn accepts_pdf_and_returns_public_url() {
        let dir = tempfile::tempdir().expect("temp dir");
        let uploads = dir.path().join("uploads");

        let (status, body) = send(
            &uploads,
            multipart_request(
                Some("national_id"),
                Some(FilePart {
                    file_name: "id.pdf",
                    content_type: "application/pdf",
                    bytes: b"%PDF-1.4 sample".to_vec(),
                }),
            ),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["fileName"], "id.pdf");
        assert_eq!(body["fileSize"], 15);
        assert_eq!(body["fileType"], "application/pdf");
        assert_eq!(body["documentType"], "national_id");
        let url = body["fileUrl"].as_str().expect("file url");
        assert!(url.starts_with("/uploads/national_id_"));
        assert!(url.ends_with(".pdf"));
        assert_eq!(stored_files(&uploads), 1);
    }

    #[tokio::test]
    async fn rejects_oversized_file_without_writing() {
        let dir = tempfile::tempdir().expect("temp dir");
        let uploads = dir.path().join("uploads");

        let (status, body) = send(
            &uploads,
            multipart_request(
                Some("national_id"),
                Some(FilePart {
                    file_name: "scan.pdf",
                    content_type: "application/pdf",
                    bytes: vec![b'a'; 6 * 1024 * 1024],
                }),
            ),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
        assert_eq!(body["error"], "File size exceeds 5MB limit");
        assert_eq!(stored_files(&uploads), 0);
    }

    #[tokio::test]
    async fn rejects_plain_text_without_writing() {
        let dir = tempfile::tempdir().expect("temp dir");
        let uploads = dir.path().join("uploads");

        let (status, body) = send(
            &uploads,
            multipart_request(
                Some("national_id"),
                Some(FilePart {
                    file_name: "notes.txt",
                    content_type: "text/plain",
                    bytes: b"hello".to_vec(),
                }),
            ),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(
            body["error"],
            "Invalid file type. Only JPEG, PNG, and PDF files are allowed."
        );
        assert_eq!(stored_files(&uploads), 0);
    }

    #[tokio::test]
    async fn requires_file_and_document_type() {
        let dir = tempfile::tempdir().expect("temp dir");
        let uploads = dir.path().join("uploads");

        let (status, body) = send(&uploads, multipart_request(Some("national_id"), None)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "No file uploaded");

        let (status, body) = send(
            &uploads,
            multipart_request(
                None,
                Some(FilePart {
                    file_name: "photo.jpg",
                    content_type: "image/jpeg",
                    bytes: vec![0xff, 0xd8, 0xff],
                }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Document type is required");
        assert_eq!(stored_files(&uploads), 0);
    }

    #[tokio::test]
    async fn non_multipart_body_is_a_client_error() {
        let dir = tempfile::tempdir().expect("temp dir");
        let request = Request::post("/api/upload")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{}"))
            .expect("request");

        let (status, body) = send(dir.path(), request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
    }
}
