//! Document uploads for loan applications.
//!
//! Files are checked against an [`UploadPolicy`] in full before anything touches the
//! upload directory.

pub mod router;

use std::path::{Path, PathBuf};

use axum::extract::multipart::MultipartError;
use chrono::Utc;
use serde::Serialize;
use thiserror::Error;

use crate::config::UploadConfig;
use crate::ids;

pub use router::upload_router;

const MAX_UPLOAD_BYTES: usize = 5 * 1024 * 1024;

/// Accepted MIME essences and the extension stored files receive.
const ALLOWED_TYPES: [(&str, &str); 3] = [
    ("image/jpeg", "jpg"),
    ("image/png", "png"),
    ("application/pdf", "pdf"),
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadPolicy {
    pub max_bytes: usize,
}

impl Default for UploadPolicy {
    fn default() -> Self {
        Self {
            max_bytes: MAX_UPLOAD_BYTES,
        }
    }
}

impl UploadPolicy {
    /// Extension for an allowed content type, `None` when the type is refused.
    pub fn extension_for(&self, content_type: &str) -> Option<&'static str> {
        let parsed: mime::Mime = content_type.trim().parse().ok()?;
        ALLOWED_TYPES
            .iter()
            .find(|(essence, _)| parsed.essence_str().eq_ignore_ascii_case(essence))
            .map(|(_, extension)| *extension)
    }
}

/// Where uploads land on disk and the URL prefix they are served from.
#[derive(Debug, Clone)]
pub struct UploadState {
    pub policy: UploadPolicy,
    pub directory: PathBuf,
    pub public_path: String,
}

impl UploadState {
    pub fn new(directory: impl Into<PathBuf>, public_path: impl Into<String>) -> Self {
        Self {
            policy: UploadPolicy::default(),
            directory: directory.into(),
            public_path: public_path.into(),
        }
    }

    pub fn from_config(config: &UploadConfig) -> Self {
        Self::new(config.directory.clone(), config.public_path.clone())
    }

    fn public_url(&self, stored_name: &str) -> String {
        format!("{}/{stored_name}", self.public_path.trim_end_matches('/'))
    }
}

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("No file uploaded")]
    MissingFile,
    #[error("Document type is required")]
    MissingDocumentType,
    #[error("Invalid document type")]
    InvalidDocumentType,
    #[error("Invalid file type. Only JPEG, PNG, and PDF files are allowed.")]
    UnsupportedType,
    #[error("File size exceeds 5MB limit")]
    TooLarge,
    #[error("Malformed upload request")]
    Multipart(#[from] MultipartError),
    #[error("failed to write upload: {0}")]
    Io(#[from] std::io::Error),
}

impl UploadError {
    /// Client errors carry their own message; I/O failures do not reach the caller.
    pub fn is_client_error(&self) -> bool {
        !matches!(self, UploadError::Io(_))
    }
}

/// A file that passed every check and is ready to be written.
#[derive(Debug)]
pub struct AcceptedUpload {
    pub document_type: String,
    pub original_name: String,
    pub content_type: String,
    pub extension: &'static str,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadReceipt {
    pub file_url: String,
    pub file_name: String,
    pub file_size: usize,
    pub file_type: String,
    pub document_type: String,
}

/// Document types become part of the stored file name.
pub fn validate_document_type(raw: &str) -> Result<String, UploadError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(UploadError::MissingDocumentType);
    }
    let well_formed = trimmed.len() <= 64
        && trimmed
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-');
    if !well_formed {
        return Err(UploadError::InvalidDocumentType);
    }
    Ok(trimmed.to_string())
}

/// Writes an accepted upload under a generated name and describes where it can be fetched.
#[tracing::instrument(skip(state, upload), fields(document_type = %upload.document_type, size = upload.bytes.len()), err)]
pub async fn store_upload(
    state: &UploadState,
    upload: AcceptedUpload,
) -> Result<UploadReceipt, UploadError> {
    let stored_name = format!(
        "{}.{}",
        ids::timestamped(&upload.document_type, Utc::now()),
        upload.extension
    );

    write_file(&state.directory, &stored_name, &upload.bytes).await?;
    tracing::info!(file = %stored_name, "upload stored");

    Ok(UploadReceipt {
        file_url: state.public_url(&stored_name),
        file_name: upload.original_name,
        file_size: upload.bytes.len(),
        file_type: upload.content_type,
        document_type: upload.document_type,
    })
}

async fn write_file(directory: &Path, name: &str, bytes: &[u8]) -> Result<(), std::io::Error> {
    tokio::fs::create_dir_all(directory).await?;
    tokio::fs::write(directory.join(name), bytes).await
}
