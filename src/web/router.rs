//! Router configuration for Web API.

use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{delete, get, post, put},
    Router,
};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use super::api_doc::ApiDoc;
use super::handlers::{
    delete_file, link_credentials, list_files, reconcile_files, upload_file, AppState,
};
use super::error::ApiError;
use super::middleware::{create_cors_layer, session_layer};
use crate::auth::SessionVerifier;

/// Room for multipart boundaries and part headers on top of the file limit.
const MULTIPART_OVERHEAD: usize = 1024 * 1024;

/// Create the main API router.
pub fn create_router(
    app_state: Arc<AppState>,
    verifier: Arc<SessionVerifier>,
    cors_origins: &[String],
) -> Router {
    let body_limit = usize::try_from(app_state.staging.max_size())
        .unwrap_or(usize::MAX)
        .saturating_add(MULTIPART_OVERHEAD);

    let api_routes = Router::new()
        .route("/files", get(list_files).fallback(method_not_allowed))
        .route(
            "/upload",
            post(upload_file)
                .layer(DefaultBodyLimit::max(body_limit))
                .fallback(method_not_allowed),
        )
        .route("/delete", delete(delete_file).fallback(method_not_allowed))
        .route(
            "/credentials",
            put(link_credentials).fallback(method_not_allowed),
        )
        .route(
            "/reconcile",
            post(reconcile_files).fallback(method_not_allowed),
        )
        .fallback(not_found);

    Router::new()
        .nest("/api", api_routes)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(create_cors_layer(cors_origins))
                .layer(middleware::from_fn(move |req, next| {
                    let verifier = verifier.clone();
                    session_layer(verifier, req, next)
                })),
        )
        .with_state(app_state)
}

async fn method_not_allowed() -> ApiError {
    ApiError::method_not_allowed()
}

async fn not_found() -> ApiError {
    ApiError::not_found("Not found")
}

/// Create a health check router.
pub fn create_health_router() -> Router {
    Router::new().route("/health", get(health_check))
}

/// Health check handler.
async fn health_check() -> &'static str {
    "OK"
}

/// Create the Swagger UI router serving the OpenAPI document.
pub fn create_swagger_router() -> Router {
    Router::new().merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}
