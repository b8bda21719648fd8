//! Response DTOs for Web API.

use serde::Serialize;
use utoipa::ToSchema;

use crate::file::FileRecord;

/// Files owned by the caller, newest first.
#[derive(Debug, Serialize, ToSchema)]
pub struct FileListResponse {
    pub files: Vec<FileRecord>,
}

/// Result of a successful upload.
#[derive(Debug, Serialize, ToSchema)]
pub struct UploadResponse {
    pub message: String,
    pub file: FileRecord,
}

/// Confirmation message.
#[derive(Debug, Serialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Result of a reconcile run.
#[derive(Debug, Serialize, ToSchema)]
pub struct ReconcileResponse {
    pub message: String,
    /// Number of records removed.
    pub removed: u64,
    /// Number of records skipped because remote storage could not be checked.
    pub unchecked: u64,
}
