//! Remote storage client.
//!
//! File bytes live with an external object-storage provider (Google Drive).
//! Every call is made on behalf of one identity using that identity's
//! delegated access token, obtained through [`CredentialProvider`].

mod credentials;
mod google;
mod memory;

pub use credentials::{
    CredentialProvider, GoogleTokenRefresher, LocalTokenRefresher, RefreshedToken, TokenRefresher,
};
pub use google::GoogleDrive;
pub use memory::InMemoryStorage;

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;

use crate::config::{DriveConfig, StorageBackend};
use crate::Result;

/// An object created in remote storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteObject {
    /// Provider-assigned object ID.
    pub id: String,
    /// Externally resolvable link to the object.
    pub link: String,
}

/// A staged local file to be written to remote storage.
#[derive(Debug, Clone, Copy)]
pub struct ObjectUpload<'a> {
    /// Name the object is created with.
    pub name: &'a str,
    /// MIME type of the content.
    pub mime_type: &'a str,
    /// Local path of the staged bytes.
    pub path: &'a Path,
    /// Size of the staged bytes.
    pub size: u64,
}

/// Remote object storage operations.
///
/// Implementations report every provider failure, including timeouts, as
/// [`crate::DriveboxError::Upstream`].
#[async_trait]
pub trait RemoteStorage: Send + Sync {
    /// Short backend name for logs.
    fn backend_name(&self) -> &'static str;

    /// Create an object from a staged file.
    ///
    /// Fails if the provider does not return both an object ID and a link.
    async fn create_object(
        &self,
        access_token: &str,
        upload: ObjectUpload<'_>,
    ) -> Result<RemoteObject>;

    /// Delete an object. Deleting an object that no longer exists succeeds.
    async fn delete_object(&self, access_token: &str, object_id: &str) -> Result<()>;

    /// Check whether an object still exists.
    async fn object_exists(&self, access_token: &str, object_id: &str) -> Result<bool>;
}

/// Build the configured storage backend and its matching token refresher.
pub fn create_remote_storage(
    config: &DriveConfig,
) -> Result<(Arc<dyn RemoteStorage>, Arc<dyn TokenRefresher>)> {
    match config.backend {
        StorageBackend::Google => {
            let storage: Arc<dyn RemoteStorage> = Arc::new(GoogleDrive::new(config)?);
            let refresher: Arc<dyn TokenRefresher> = Arc::new(GoogleTokenRefresher::new(config)?);
            Ok((storage, refresher))
        }
        StorageBackend::Memory => {
            tracing::warn!("Using in-memory remote storage; uploaded files are not persisted");
            let storage: Arc<dyn RemoteStorage> = Arc::new(InMemoryStorage::new());
            let refresher: Arc<dyn TokenRefresher> = Arc::new(LocalTokenRefresher);
            Ok((storage, refresher))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_memory_backend() {
        let config = DriveConfig {
            backend: StorageBackend::Memory,
            ..Default::default()
        };
        let (storage, _) = create_remote_storage(&config).unwrap();
        assert_eq!(storage.backend_name(), "memory");
    }

    #[test]
    fn test_create_google_backend() {
        let config = DriveConfig {
            client_id: "id".to_string(),
            client_secret: "secret".to_string(),
            ..Default::default()
        };
        let (storage, _) = create_remote_storage(&config).unwrap();
        assert_eq!(storage.backend_name(), "google-drive");
    }
}
