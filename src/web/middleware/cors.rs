//! CORS configuration.

use axum::http::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use axum::http::{HeaderValue, Method};
use tower_http::cors::{Any, CorsLayer};

const METHODS: [Method; 5] = [
    Method::GET,
    Method::POST,
    Method::PUT,
    Method::DELETE,
    Method::OPTIONS,
];

/// Create a CORS layer from configured origins.
///
/// With no valid origins every origin is allowed, without credentials.
/// Listed origins may send the session cookie.
pub fn create_cors_layer(origins: &[String]) -> CorsLayer {
    let parsed_origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| match o.parse() {
            Ok(v) => Some(v),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin: {}", o);
                None
            }
        })
        .collect();

    if parsed_origins.is_empty() {
        CorsLayer::new()
            .allow_methods(METHODS)
            .allow_headers(Any)
            .allow_origin(Any)
    } else {
        CorsLayer::new()
            .allow_methods(METHODS)
            .allow_headers([AUTHORIZATION, CONTENT_TYPE, ACCEPT])
            .allow_credentials(true)
            .allow_origin(parsed_origins)
    }
}
