//! File API handlers.

use axum::{
    extract::{
        multipart::MultipartRejection,
        rejection::QueryRejection,
        Multipart, Query, State,
    },
    Json,
};
use std::sync::Arc;

use super::AppState;
use crate::file::{StagedFile, StagingArea};
use crate::web::dto::{
    DeleteQuery, FileListResponse, MessageResponse, ReconcileResponse, UploadResponse,
};
use crate::web::error::ApiError;
use crate::web::middleware::AuthUser;

/// Multipart field carrying the file.
const FILE_FIELD: &str = "file";

/// GET /api/files - List the caller's files, newest first.
#[utoipa::path(
    get,
    path = "/api/files",
    tag = "files",
    responses(
        (status = 200, description = "Files owned by the caller", body = FileListResponse),
        (status = 401, description = "Unauthorized", body = crate::web::error::ErrorBody),
        (status = 500, description = "Metadata store failure", body = crate::web::error::ErrorBody)
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn list_files(
    State(state): State<Arc<AppState>>,
    AuthUser(identity): AuthUser,
) -> Result<Json<FileListResponse>, ApiError> {
    let files = state
        .files
        .list(&identity)
        .await
        .map_err(|e| ApiError::from_domain(e, "Error fetching files"))?;

    Ok(Json(FileListResponse { files }))
}

/// POST /api/upload - Upload a file to the caller's remote storage.
///
/// Request body: multipart/form-data with a "file" field.
#[utoipa::path(
    post,
    path = "/api/upload",
    tag = "files",
    request_body(content = crate::web::dto::UploadForm, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "File uploaded", body = UploadResponse),
        (status = 400, description = "Not multipart, no file, empty file or file too large", body = crate::web::error::ErrorBody),
        (status = 401, description = "Unauthorized", body = crate::web::error::ErrorBody),
        (status = 500, description = "Remote storage or metadata store failure", body = crate::web::error::ErrorBody)
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn upload_file(
    State(state): State<Arc<AppState>>,
    AuthUser(identity): AuthUser,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<UploadResponse>, ApiError> {
    let mut multipart = multipart.map_err(|e| {
        tracing::debug!("Upload rejected: {}", e.body_text());
        ApiError::bad_request("Request must be multipart/form-data")
    })?;
    let staged = stage_multipart(&state.staging, &mut multipart).await?;

    let file = state
        .files
        .upload(&identity, staged)
        .await
        .map_err(|e| ApiError::from_domain(e, "Error uploading file"))?;

    Ok(Json(UploadResponse {
        message: "File uploaded successfully".to_string(),
        file,
    }))
}

/// Stream the first `file` field into the staging area.
async fn stage_multipart(
    staging: &StagingArea,
    multipart: &mut Multipart,
) -> Result<StagedFile, ApiError> {
    let max_size = staging.max_size();

    while let Some(mut field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::from_multipart(e, max_size))?
    {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }

        let mut writer = staging
            .begin(field.file_name(), field.content_type())
            .map_err(|e| ApiError::from_domain(e, "Error uploading file"))?;

        while let Some(chunk) = field
            .chunk()
            .await
            .map_err(|e| ApiError::from_multipart(e, max_size))?
        {
            writer
                .write_chunk(&chunk)
                .await
                .map_err(|e| ApiError::from_domain(e, "Error uploading file"))?;
        }

        return writer
            .finish()
            .await
            .map_err(|e| ApiError::from_domain(e, "Error uploading file"));
    }

    Err(ApiError::bad_request("No file uploaded"))
}

/// DELETE /api/delete?fileId= - Delete one of the caller's files.
#[utoipa::path(
    delete,
    path = "/api/delete",
    tag = "files",
    params(DeleteQuery),
    responses(
        (status = 200, description = "File deleted", body = MessageResponse),
        (status = 400, description = "Missing file ID or malformed query", body = crate::web::error::ErrorBody),
        (status = 401, description = "Unauthorized", body = crate::web::error::ErrorBody),
        (status = 404, description = "File not found or not owned by the caller", body = crate::web::error::ErrorBody),
        (status = 500, description = "Remote storage or metadata store failure", body = crate::web::error::ErrorBody)
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn delete_file(
    State(state): State<Arc<AppState>>,
    AuthUser(identity): AuthUser,
    query: Result<Query<DeleteQuery>, QueryRejection>,
) -> Result<Json<MessageResponse>, ApiError> {
    let Query(query) =
        query.map_err(|e| ApiError::bad_request(format!("Invalid query: {}", e.body_text())))?;
    let file_id = query.file_id.unwrap_or_default();

    state
        .files
        .delete(&identity, &file_id)
        .await
        .map_err(|e| ApiError::from_domain(e, "Error deleting file"))?;

    Ok(Json(MessageResponse::new("File deleted successfully")))
}

/// POST /api/reconcile - Drop records whose remote object is gone.
#[utoipa::path(
    post,
    path = "/api/reconcile",
    tag = "files",
    responses(
        (status = 200, description = "Reconcile finished", body = ReconcileResponse),
        (status = 401, description = "Unauthorized", body = crate::web::error::ErrorBody),
        (status = 500, description = "Remote storage or metadata store failure", body = crate::web::error::ErrorBody)
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn reconcile_files(
    State(state): State<Arc<AppState>>,
    AuthUser(identity): AuthUser,
) -> Result<Json<ReconcileResponse>, ApiError> {
    let report = state
        .files
        .reconcile(&identity)
        .await
        .map_err(|e| ApiError::from_domain(e, "Error reconciling files"))?;

    let message = if report.unchecked == 0 {
        format!("Removed {} stale file record(s)", report.removed)
    } else {
        format!(
            "Removed {} stale file record(s), {} could not be checked",
            report.removed, report.unchecked
        )
    };

    Ok(Json(ReconcileResponse {
        message,
        removed: report.removed,
        unchecked: report.unchecked,
    }))
}
