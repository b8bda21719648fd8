//! Session authentication for API handlers.

use axum::{
    async_trait,
    body::Body,
    extract::FromRequestParts,
    http::{request::Parts, Request},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;

use crate::auth::{Identity, SessionVerifier};
use crate::web::error::ApiError;

/// Extractor for authenticated callers.
///
/// Runs before any body extractor, so a request without a valid session is
/// rejected before its body is read.
#[derive(Debug, Clone)]
pub struct AuthUser(pub Identity);

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        // Verifier is injected by `session_layer`
        let verifier = parts
            .extensions
            .get::<Arc<SessionVerifier>>()
            .ok_or_else(|| ApiError::internal("Session verifier not configured"))?;

        let identity = verifier.verify(&parts.headers).map_err(|e| {
            tracing::debug!("Session rejected: {}", e);
            ApiError::unauthorized()
        })?;

        Ok(AuthUser(identity))
    }
}

/// Middleware function to inject the session verifier into request extensions.
pub async fn session_layer(
    verifier: Arc<SessionVerifier>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    request.extensions_mut().insert(verifier);
    next.run(request).await
}
