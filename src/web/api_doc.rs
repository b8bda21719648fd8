//! OpenAPI documentation.

use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use super::dto;
use super::error;
use super::handlers;
use crate::file::FileRecord;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "drivebox API",
        description = "Authenticated file manager backed by the caller's Google Drive."
    ),
    paths(
        handlers::files::list_files,
        handlers::files::upload_file,
        handlers::files::delete_file,
        handlers::files::reconcile_files,
        handlers::credentials::link_credentials,
    ),
    components(schemas(
        FileRecord,
        dto::FileListResponse,
        dto::UploadResponse,
        dto::MessageResponse,
        dto::ReconcileResponse,
        dto::CredentialsRequest,
        dto::UploadForm,
        error::ErrorBody,
        error::ErrorCode,
    )),
    modifiers(&SecurityAddon),
    tags(
        (name = "files", description = "Upload, list and delete files"),
        (name = "credentials", description = "Link a remote storage account")
    )
)]
pub struct ApiDoc;

/// Registers the session token as a bearer scheme.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openapi_lists_routes() {
        let doc = ApiDoc::openapi();
        for path in ["/api/files", "/api/upload", "/api/delete", "/api/reconcile", "/api/credentials"] {
            assert!(doc.paths.paths.contains_key(path), "missing {path}");
        }
    }

    #[test]
    fn test_openapi_has_bearer_scheme() {
        let doc = ApiDoc::openapi();
        let components = doc.components.unwrap();
        assert!(components.security_schemes.contains_key("bearer_auth"));
    }
}
