//! Test helpers for Web API tests.
//!
//! Builds the full router over an in-memory database and the in-memory
//! storage backend, and mints session tokens the way the identity provider
//! would.

#![allow(dead_code)]

use std::sync::Arc;

use axum::http::header::AUTHORIZATION;
use axum_test::multipart::{MultipartForm, Part};
use axum_test::{TestResponse, TestServer};
use jsonwebtoken::{encode, EncodingKey, Header};
use serde_json::json;
use tempfile::TempDir;

use drivebox::auth::SessionClaims;
use drivebox::config::{Config, StorageBackend};
use drivebox::db::{Database, SharedDatabase};
use drivebox::drive::{InMemoryStorage, LocalTokenRefresher};
use drivebox::web::router::create_router;
use drivebox::web::AppState;
use drivebox::SessionVerifier;

/// Secret shared with the (simulated) identity provider.
pub const TEST_SECRET: &str = "test-session-secret-for-testing-only";

/// Session cookie name used by the test server.
pub const COOKIE_NAME: &str = "drivebox_session";

/// A running test application.
pub struct TestApp {
    pub server: TestServer,
    pub db: SharedDatabase,
    pub storage: Arc<InMemoryStorage>,
    pub staging_dir: TempDir,
}

/// Create a test app with the default upload limit.
pub async fn create_test_app() -> TestApp {
    create_test_app_with_limit_mb(100).await
}

/// Create a test app with the given upload limit in megabytes.
pub async fn create_test_app_with_limit_mb(limit_mb: u64) -> TestApp {
    let staging_dir = tempfile::tempdir().expect("Failed to create staging dir");

    let mut config = Config::default();
    config.auth.session_secret = TEST_SECRET.to_string();
    config.drive.backend = StorageBackend::Memory;
    config.uploads.temp_dir = staging_dir.path().display().to_string();
    config.uploads.max_upload_size_mb = limit_mb;

    let db = Arc::new(
        Database::open_in_memory()
            .await
            .expect("Failed to create test database"),
    );
    let storage = Arc::new(InMemoryStorage::new());

    let app_state = Arc::new(
        AppState::new(
            db.clone(),
            storage.clone(),
            Arc::new(LocalTokenRefresher),
            &config,
        )
        .expect("Failed to create app state"),
    );
    let verifier = Arc::new(SessionVerifier::new(TEST_SECRET, COOKIE_NAME));

    let router = create_router(app_state, verifier, &[]);
    let server = TestServer::new(router).expect("Failed to create test server");

    TestApp {
        server,
        db,
        storage,
        staging_dir,
    }
}

/// Mint a session token signed with `secret`, expiring `exp_offset` seconds from now.
pub fn token_with(sub: &str, secret: &str, exp_offset: i64) -> String {
    let now = chrono::Utc::now().timestamp();
    let claims = SessionClaims {
        sub: sub.to_string(),
        email: Some(format!("{sub}@example.com")),
        name: None,
        iat: now as u64,
        exp: (now + exp_offset) as u64,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .expect("Failed to encode session token")
}

/// A valid session token for `sub`.
pub fn session_token(sub: &str) -> String {
    token_with(sub, TEST_SECRET, 3600)
}

/// An expired session token for `sub`.
pub fn expired_token(sub: &str) -> String {
    token_with(sub, TEST_SECRET, -3600)
}

/// Authorization header value for a token.
pub fn bearer(token: &str) -> String {
    format!("Bearer {token}")
}

/// Multipart form with a single `file` part.
pub fn file_form(name: &str, mime: &str, content: Vec<u8>) -> MultipartForm {
    MultipartForm::new().add_part(
        "file",
        Part::bytes(content).file_name(name).mime_type(mime),
    )
}

impl TestApp {
    /// Link a Drive account for the identity behind `token`.
    pub async fn link_drive(&self, token: &str) {
        self.server
            .put("/api/credentials")
            .add_header(AUTHORIZATION, bearer(token))
            .json(&json!({ "accessToken": "drive-access-token" }))
            .await
            .assert_status_ok();
    }

    /// Upload a file as the identity behind `token`.
    pub async fn upload(&self, token: &str, name: &str, mime: &str, content: Vec<u8>) -> TestResponse {
        self.server
            .post("/api/upload")
            .add_header(AUTHORIZATION, bearer(token))
            .multipart(file_form(name, mime, content))
            .await
    }

    /// Number of files currently in the staging directory.
    pub fn staged_file_count(&self) -> usize {
        std::fs::read_dir(self.staging_dir.path())
            .expect("Failed to read staging dir")
            .count()
    }

    /// Number of file records in the metadata store, across all owners.
    pub async fn record_count(&self) -> i64 {
        sqlx::query_scalar("SELECT COUNT(*) FROM files")
            .fetch_one(self.db.pool())
            .await
            .expect("Failed to count records")
    }
}
