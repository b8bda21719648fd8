//! Delegated access tokens for remote storage calls.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::DriveConfig;
use crate::db::{
    expiry_after, with_timeout, CredentialRepository, NewDriveCredentials, SharedDatabase,
};
use crate::{DriveboxError, Result};

/// Lifetime of tokens minted by [`LocalTokenRefresher`].
const LOCAL_TOKEN_LIFETIME_SECS: i64 = 3600;

/// A freshly issued access token.
#[derive(Debug, Clone, Deserialize)]
pub struct RefreshedToken {
    /// New access token.
    pub access_token: String,
    /// Lifetime of the token in seconds.
    #[serde(default)]
    pub expires_in: Option<i64>,
}

/// Exchanges a refresh token for a new access token.
#[async_trait]
pub trait TokenRefresher: Send + Sync {
    /// Obtain a new access token.
    async fn refresh(&self, refresh_token: &str) -> Result<RefreshedToken>;
}

/// OAuth 2.0 refresh against Google's token endpoint.
pub struct GoogleTokenRefresher {
    client: Client,
    token_url: String,
    client_id: String,
    client_secret: String,
}

impl GoogleTokenRefresher {
    /// Create a refresher from configuration.
    pub fn new(config: &DriveConfig) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| DriveboxError::Config(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            token_url: config.token_url.clone(),
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
        })
    }
}

#[async_trait]
impl TokenRefresher for GoogleTokenRefresher {
    async fn refresh(&self, refresh_token: &str) -> Result<RefreshedToken> {
        let params = [
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
            ("refresh_token", refresh_token),
            ("grant_type", "refresh_token"),
        ];

        let response = self
            .client
            .post(&self.token_url)
            .form(&params)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(%status, "Token refresh rejected");
            return Err(DriveboxError::Upstream(format!(
                "token refresh failed with HTTP {status}: {body}"
            )));
        }

        let token: RefreshedToken = response.json().await?;
        if token.access_token.is_empty() {
            return Err(DriveboxError::Upstream(
                "token endpoint returned an empty access token".to_string(),
            ));
        }
        Ok(token)
    }
}

/// Refresher paired with the in-memory backend; mints opaque local tokens.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalTokenRefresher;

#[async_trait]
impl TokenRefresher for LocalTokenRefresher {
    async fn refresh(&self, _refresh_token: &str) -> Result<RefreshedToken> {
        Ok(RefreshedToken {
            access_token: format!("local-{}", Uuid::new_v4()),
            expires_in: Some(LOCAL_TOKEN_LIFETIME_SECS),
        })
    }
}

/// Resolves the delegated access token for an identity.
///
/// Tokens are read from the metadata store and refreshed when they are
/// about to expire. The refreshed token is written back before use.
#[derive(Clone)]
pub struct CredentialProvider {
    db: SharedDatabase,
    refresher: Arc<dyn TokenRefresher>,
    store_timeout: Duration,
}

impl CredentialProvider {
    /// Create a new provider.
    pub fn new(
        db: SharedDatabase,
        refresher: Arc<dyn TokenRefresher>,
        store_timeout: Duration,
    ) -> Self {
        Self {
            db,
            refresher,
            store_timeout,
        }
    }

    /// Get a usable access token for `owner_id`.
    pub async fn access_token(&self, owner_id: &str) -> Result<String> {
        let repo = CredentialRepository::new(self.db.pool());
        let creds = with_timeout(self.store_timeout, repo.get(owner_id))
            .await?
            .ok_or_else(|| {
                DriveboxError::Upstream("remote storage account not linked".to_string())
            })?;

        if !creds.needs_refresh(Utc::now()) {
            return Ok(creds.access_token);
        }

        let refresh_token = creds.refresh_token.as_deref().ok_or_else(|| {
            DriveboxError::Upstream(
                "remote storage access expired and cannot be refreshed".to_string(),
            )
        })?;

        debug!(owner_id, "Refreshing remote storage access token");
        let token = self.refresher.refresh(refresh_token).await?;
        let expires_at = token
            .expires_in
            .map(|secs| {
                expiry_after(secs).ok_or_else(|| {
                    DriveboxError::Upstream(format!(
                        "token endpoint returned an invalid lifetime: {secs}"
                    ))
                })
            })
            .transpose()?;

        with_timeout(
            self.store_timeout,
            repo.update_access_token(owner_id, &token.access_token, expires_at),
        )
        .await?;

        Ok(token.access_token)
    }

    /// Store credentials for an identity, replacing any previous link.
    pub async fn link(&self, creds: NewDriveCredentials) -> Result<()> {
        if creds.access_token.trim().is_empty() {
            return Err(DriveboxError::BadRequest(
                "Access token is required".to_string(),
            ));
        }

        let repo = CredentialRepository::new(self.db.pool());
        with_timeout(self.store_timeout, repo.upsert(&creds)).await?;
        info!(owner_id = %creds.owner_id, "Remote storage account linked");
        Ok(())
    }
}
