//! Remote storage account linking.

use axum::{extract::State, Json};
use std::sync::Arc;

use super::AppState;
use crate::web::dto::{CredentialsRequest, MessageResponse, ValidatedJson};
use crate::web::error::ApiError;
use crate::web::middleware::AuthUser;

/// PUT /api/credentials - Store the caller's delegated Drive tokens.
#[utoipa::path(
    put,
    path = "/api/credentials",
    tag = "credentials",
    request_body = CredentialsRequest,
    responses(
        (status = 200, description = "Account linked", body = MessageResponse),
        (status = 400, description = "Missing access token", body = crate::web::error::ErrorBody),
        (status = 401, description = "Unauthorized", body = crate::web::error::ErrorBody),
        (status = 422, description = "Validation failed", body = crate::web::error::ErrorBody)
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn link_credentials(
    State(state): State<Arc<AppState>>,
    AuthUser(identity): AuthUser,
    ValidatedJson(req): ValidatedJson<CredentialsRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    state
        .files
        .link_credentials(
            &identity,
            &req.access_token,
            req.refresh_token.as_deref(),
            req.expires_in,
        )
        .await
        .map_err(|e| ApiError::from_domain(e, "Error linking storage account"))?;

    Ok(Json(MessageResponse::new("Storage account linked")))
}
