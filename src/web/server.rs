//! Web server for drivebox.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use tokio::net::TcpListener;
use tower_http::compression::CompressionLayer;

use crate::auth::SessionVerifier;
use crate::config::ServerConfig;
use crate::{DriveboxError, Result};

use super::handlers::AppState;
use super::router::{create_health_router, create_router, create_swagger_router};

/// Web server for the API.
pub struct WebServer {
    /// Server address.
    addr: SocketAddr,
    /// Application state.
    app_state: Arc<AppState>,
    /// Session verifier.
    verifier: Arc<SessionVerifier>,
    /// Allowed CORS origins.
    cors_origins: Vec<String>,
}

impl WebServer {
    /// Create a new web server.
    pub fn new(
        config: &ServerConfig,
        app_state: Arc<AppState>,
        verifier: Arc<SessionVerifier>,
    ) -> Result<Self> {
        let addr = format!("{}:{}", config.host, config.port)
            .parse()
            .map_err(|e| {
                DriveboxError::Config(format!(
                    "invalid server address {}:{}: {e}",
                    config.host, config.port
                ))
            })?;

        Ok(Self {
            addr,
            app_state,
            verifier,
            cors_origins: config.cors_origins.clone(),
        })
    }

    /// Get the server address.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    fn into_router(self) -> (SocketAddr, Router) {
        let router = create_router(self.app_state, self.verifier, &self.cors_origins)
            .merge(create_health_router())
            .merge(create_swagger_router())
            .layer(CompressionLayer::new());
        (self.addr, router)
    }

    /// Run the web server until `shutdown` resolves.
    ///
    /// In-flight requests are allowed to finish before this returns.
    pub async fn run<F>(self, shutdown: F) -> std::io::Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let (addr, router) = self.into_router();

        let listener = TcpListener::bind(addr).await?;
        tracing::info!("Web server listening on http://{}", listener.local_addr()?);

        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown)
            .await
    }

    /// Run the server in the background and return the actual bound address.
    ///
    /// This is useful for testing when binding to port 0.
    pub async fn run_with_addr(self) -> std::io::Result<SocketAddr> {
        let (addr, router) = self.into_router();

        let listener = TcpListener::bind(addr).await?;
        let local_addr = listener.local_addr()?;
        tracing::info!("Web server listening on http://{}", local_addr);

        tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, router).await {
                tracing::error!("Web server error: {}", e);
            }
        });

        Ok(local_addr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Config, StorageBackend};
    use crate::db::Database;
    use crate::drive::create_remote_storage;

    async fn create_test_server(host: &str) -> (Result<WebServer>, tempfile::TempDir) {
        let temp_dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.server.host = host.to_string();
        config.server.port = 0;
        config.drive.backend = StorageBackend::Memory;
        config.uploads.temp_dir = temp_dir.path().display().to_string();

        let db = Arc::new(Database::open_in_memory().await.unwrap());
        let (storage, refresher) = create_remote_storage(&config.drive).unwrap();
        let app_state = Arc::new(AppState::new(db, storage, refresher, &config).unwrap());
        let verifier = Arc::new(SessionVerifier::new("secret", "sid"));

        (
            WebServer::new(&config.server, app_state, verifier),
            temp_dir,
        )
    }

    #[tokio::test]
    async fn test_web_server_new() {
        let (server, _dir) = create_test_server("127.0.0.1").await;
        assert_eq!(server.unwrap().addr().ip().to_string(), "127.0.0.1");
    }

    #[tokio::test]
    async fn test_web_server_invalid_host() {
        let (server, _dir) = create_test_server("not a host").await;
        assert!(matches!(server, Err(DriveboxError::Config(_))));
    }

    #[tokio::test]
    async fn test_web_server_run() {
        let (server, _dir) = create_test_server("127.0.0.1").await;
        let addr = server.unwrap().run_with_addr().await.unwrap();

        let client = reqwest::Client::new();
        let resp = client
            .get(format!("http://{}/health", addr))
            .send()
            .await
            .unwrap();

        assert!(resp.status().is_success());
        assert_eq!(resp.text().await.unwrap(), "OK");
    }
}
