//! Delegated remote storage credentials.
//!
//! Each identity links its own remote storage account. The access token is
//! refreshed in place when it nears expiry; the refresh token is kept until
//! the identity links again.

use chrono::{DateTime, Duration, SecondsFormat, Utc};

use super::DbPool;
use crate::{DriveboxError, Result};

/// Access tokens expiring within this window are treated as expired.
const EXPIRY_SKEW_SECS: i64 = 60;

/// Longest accepted access token lifetime (ten years).
pub const MAX_TOKEN_LIFETIME_SECS: i64 = 10 * 365 * 24 * 60 * 60;

/// Expiry instant for a token lifetime in seconds, counted from now.
///
/// Returns `None` for lifetimes beyond [`MAX_TOKEN_LIFETIME_SECS`] in either
/// direction.
pub fn expiry_after(seconds: i64) -> Option<DateTime<Utc>> {
    if seconds.unsigned_abs() > MAX_TOKEN_LIFETIME_SECS.unsigned_abs() {
        return None;
    }
    Duration::try_seconds(seconds).and_then(|lifetime| Utc::now().checked_add_signed(lifetime))
}

/// Stored delegated credentials for one identity.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct DriveCredentials {
    /// Identity the credentials belong to.
    pub owner_id: String,
    /// OAuth access token.
    pub access_token: String,
    /// OAuth refresh token, if the provider issued one.
    pub refresh_token: Option<String>,
    /// When the access token expires.
    pub expires_at: Option<DateTime<Utc>>,
    /// Last time the row was written.
    pub updated_at: DateTime<Utc>,
}

impl DriveCredentials {
    /// Whether the access token should be refreshed before use at `now`.
    pub fn needs_refresh(&self, now: DateTime<Utc>) -> bool {
        match self.expires_at {
            Some(expires_at) => expires_at <= now + Duration::seconds(EXPIRY_SKEW_SECS),
            None => false,
        }
    }
}

/// Credentials to store for an identity.
#[derive(Debug, Clone)]
pub struct NewDriveCredentials {
    /// Identity the credentials belong to.
    pub owner_id: String,
    /// OAuth access token.
    pub access_token: String,
    /// OAuth refresh token.
    pub refresh_token: Option<String>,
    /// When the access token expires.
    pub expires_at: Option<DateTime<Utc>>,
}

impl NewDriveCredentials {
    /// Create credentials with only an access token.
    pub fn new(owner_id: impl Into<String>, access_token: impl Into<String>) -> Self {
        Self {
            owner_id: owner_id.into(),
            access_token: access_token.into(),
            refresh_token: None,
            expires_at: None,
        }
    }

    /// Set the refresh token.
    pub fn with_refresh_token(mut self, refresh_token: impl Into<String>) -> Self {
        self.refresh_token = Some(refresh_token.into());
        self
    }

    /// Set the expiry from a lifetime in seconds, counted from now.
    pub fn expires_in(mut self, seconds: i64) -> Result<Self> {
        let expires_at = expiry_after(seconds).ok_or_else(|| {
            DriveboxError::BadRequest("Token lifetime is out of range".to_string())
        })?;
        self.expires_at = Some(expires_at);
        Ok(self)
    }
}

fn to_db_time(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Repository for delegated credential operations.
pub struct CredentialRepository<'a> {
    pool: &'a DbPool,
}

impl<'a> CredentialRepository<'a> {
    /// Create a new repository instance.
    pub fn new(pool: &'a DbPool) -> Self {
        Self { pool }
    }

    /// Store credentials for an identity, replacing any existing row.
    pub async fn upsert(&self, creds: &NewDriveCredentials) -> Result<DriveCredentials> {
        sqlx::query(
            "INSERT INTO drive_credentials (owner_id, access_token, refresh_token, expires_at, updated_at)
             VALUES ($1, $2, $3, $4, $5)
             ON CONFLICT(owner_id) DO UPDATE SET
                access_token = excluded.access_token,
                refresh_token = excluded.refresh_token,
                expires_at = excluded.expires_at,
                updated_at = excluded.updated_at",
        )
        .bind(&creds.owner_id)
        .bind(&creds.access_token)
        .bind(&creds.refresh_token)
        .bind(creds.expires_at.as_ref().map(to_db_time))
        .bind(to_db_time(&Utc::now()))
        .execute(self.pool)
        .await?;

        self.get(&creds.owner_id).await?.ok_or_else(|| {
            crate::DriveboxError::Store("credentials vanished after write".into())
        })
    }

    /// Get the credentials for an identity.
    pub async fn get(&self, owner_id: &str) -> Result<Option<DriveCredentials>> {
        let creds = sqlx::query_as::<_, DriveCredentials>(
            "SELECT owner_id, access_token, refresh_token, expires_at, updated_at
             FROM drive_credentials WHERE owner_id = $1",
        )
        .bind(owner_id)
        .fetch_optional(self.pool)
        .await?;

        Ok(creds)
    }

    /// Replace the access token after a refresh, keeping the refresh token.
    pub async fn update_access_token(
        &self,
        owner_id: &str,
        access_token: &str,
        expires_at: Option<DateTime<Utc>>,
    ) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE drive_credentials
             SET access_token = $1, expires_at = $2, updated_at = $3
             WHERE owner_id = $4",
        )
        .bind(access_token)
        .bind(expires_at.as_ref().map(to_db_time))
        .bind(to_db_time(&Utc::now()))
        .bind(owner_id)
        .execute(self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;

    #[tokio::test]
    async fn test_upsert_and_get() {
        let db = Database::open_in_memory().await.unwrap();
        let repo = CredentialRepository::new(db.pool());

        let creds = NewDriveCredentials::new("user-a", "access-1")
            .with_refresh_token("refresh-1")
            .expires_in(3600)
            .unwrap();
        let stored = repo.upsert(&creds).await.unwrap();

        assert_eq!(stored.owner_id, "user-a");
        assert_eq!(stored.access_token, "access-1");
        assert_eq!(stored.refresh_token.as_deref(), Some("refresh-1"));
        assert!(stored.expires_at.is_some());
    }

    #[tokio::test]
    async fn test_upsert_replaces_existing() {
        let db = Database::open_in_memory().await.unwrap();
        let repo = CredentialRepository::new(db.pool());

        repo.upsert(&NewDriveCredentials::new("user-a", "old").with_refresh_token("r"))
            .await
            .unwrap();
        let stored = repo
            .upsert(&NewDriveCredentials::new("user-a", "new"))
            .await
            .unwrap();

        assert_eq!(stored.access_token, "new");
        assert!(stored.refresh_token.is_none());
    }

    #[tokio::test]
    async fn test_get_missing() {
        let db = Database::open_in_memory().await.unwrap();
        let repo = CredentialRepository::new(db.pool());
        assert!(repo.get("nobody").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_update_access_token_keeps_refresh_token() {
        let db = Database::open_in_memory().await.unwrap();
        let repo = CredentialRepository::new(db.pool());

        repo.upsert(&NewDriveCredentials::new("user-a", "old").with_refresh_token("r"))
            .await
            .unwrap();

        let expires_at = Utc::now() + Duration::hours(1);
        assert!(repo
            .update_access_token("user-a", "fresh", Some(expires_at))
            .await
            .unwrap());

        let stored = repo.get("user-a").await.unwrap().unwrap();
        assert_eq!(stored.access_token, "fresh");
        assert_eq!(stored.refresh_token.as_deref(), Some("r"));
        assert!(!stored.needs_refresh(Utc::now()));
    }

    #[tokio::test]
    async fn test_update_access_token_unknown_owner() {
        let db = Database::open_in_memory().await.unwrap();
        let repo = CredentialRepository::new(db.pool());
        assert!(!repo.update_access_token("nobody", "t", None).await.unwrap());
    }

    #[test]
    fn test_expires_in_rejects_out_of_range_lifetime() {
        let creds = NewDriveCredentials::new("user-a", "t");
        assert!(matches!(
            creds.clone().expires_in(i64::MAX),
            Err(DriveboxError::BadRequest(_))
        ));
        assert!(creds.clone().expires_in(i64::MIN).is_err());
        assert!(creds.clone().expires_in(MAX_TOKEN_LIFETIME_SECS + 1).is_err());

        let creds = creds.expires_in(MAX_TOKEN_LIFETIME_SECS).unwrap();
        assert!(creds.expires_at.is_some());
    }

    #[test]
    fn test_expiry_after() {
        let before = Utc::now();
        let expires_at = expiry_after(3600).unwrap();
        assert!(expires_at >= before + Duration::seconds(3600));
        assert!(expiry_after(-10).unwrap() < Utc::now());
        assert!(expiry_after(i64::MAX).is_none());
    }

    #[test]
    fn test_needs_refresh() {
        let now = Utc::now();
        let mut creds = DriveCredentials {
            owner_id: "u".to_string(),
            access_token: "t".to_string(),
            refresh_token: None,
            expires_at: None,
            updated_at: now,
        };
        assert!(!creds.needs_refresh(now));

        creds.expires_at = Some(now + Duration::seconds(30));
        assert!(creds.needs_refresh(now));

        creds.expires_at = Some(now + Duration::hours(1));
        assert!(!creds.needs_refresh(now));
    }
}
