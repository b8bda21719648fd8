//! Process-local remote storage.
//!
//! Objects are held in memory and addressed with `memory://` links. Used for
//! local development and tests; contents are lost on restart.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{ObjectUpload, RemoteObject, RemoteStorage};
use crate::{DriveboxError, Result};

#[derive(Debug, Clone)]
struct StoredObject {
    name: String,
    mime_type: String,
    content: Vec<u8>,
}

/// In-memory [`RemoteStorage`] implementation.
#[derive(Debug, Default)]
pub struct InMemoryStorage {
    objects: RwLock<HashMap<String, StoredObject>>,
    unavailable: AtomicBool,
}

impl InMemoryStorage {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate a provider outage; every call fails while set.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Whether an object with this ID is stored.
    pub async fn contains(&self, object_id: &str) -> bool {
        self.objects.read().await.contains_key(object_id)
    }

    /// Number of stored objects.
    pub async fn len(&self) -> usize {
        self.objects.read().await.len()
    }

    /// Whether the store holds no objects.
    pub async fn is_empty(&self) -> bool {
        self.objects.read().await.is_empty()
    }

    /// Remove an object out of band, as if it were deleted at the provider.
    pub async fn remove(&self, object_id: &str) -> bool {
        self.objects.write().await.remove(object_id).is_some()
    }

    /// Content, name and MIME type of a stored object.
    pub async fn object(&self, object_id: &str) -> Option<(String, String, Vec<u8>)> {
        self.objects
            .read()
            .await
            .get(object_id)
            .map(|o| (o.name.clone(), o.mime_type.clone(), o.content.clone()))
    }

    fn check(&self, access_token: &str) -> Result<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(DriveboxError::Upstream(
                "remote storage unavailable".to_string(),
            ));
        }
        if access_token.is_empty() {
            return Err(DriveboxError::Upstream(
                "remote storage rejected empty access token".to_string(),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl RemoteStorage for InMemoryStorage {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    async fn create_object(
        &self,
        access_token: &str,
        upload: ObjectUpload<'_>,
    ) -> Result<RemoteObject> {
        self.check(access_token)?;

        let content = tokio::fs::read(upload.path).await?;
        let id = Uuid::new_v4().simple().to_string();
        let link = format!("memory://{id}");

        self.objects.write().await.insert(
            id.clone(),
            StoredObject {
                name: upload.name.to_string(),
                mime_type: upload.mime_type.to_string(),
                content,
            },
        );

        Ok(RemoteObject { id, link })
    }

    async fn delete_object(&self, access_token: &str, object_id: &str) -> Result<()> {
        self.check(access_token)?;
        self.objects.write().await.remove(object_id);
        Ok(())
    }

    async fn object_exists(&self, access_token: &str, object_id: &str) -> Result<bool> {
        self.check(access_token)?;
        Ok(self.contains(object_id).await)
    }
}
