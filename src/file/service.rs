//! File workflows.
//!
//! Each workflow touches two independent systems: remote storage holds the
//! bytes and the metadata store holds the [`FileRecord`]. There is no
//! transaction across them. Upload compensates a failed metadata write by
//! deleting the remote object it just created; [`FileService::reconcile`]
//! removes records whose remote object has disappeared.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use futures::stream::{self, StreamExt};
use tracing::{error, info, warn};

use super::{FileRecord, FileRepository, NewFileRecord, StagedFile};
use crate::auth::Identity;
use crate::db::{with_timeout, NewDriveCredentials, SharedDatabase};
use crate::drive::{CredentialProvider, ObjectUpload, RemoteStorage};
use crate::{DriveboxError, Result};

/// Concurrent existence checks during reconcile.
const RECONCILE_CONCURRENCY: usize = 4;

/// Outcome of a reconcile run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    /// Records removed because their remote object is gone.
    pub removed: u64,
    /// Records left in place because their existence check failed.
    pub unchecked: u64,
}

/// Orchestrates remote storage and the metadata store.
pub struct FileService {
    db: SharedDatabase,
    storage: Arc<dyn RemoteStorage>,
    credentials: CredentialProvider,
    store_timeout: Duration,
    remote_timeout: Duration,
}

impl FileService {
    /// Create a new file service.
    pub fn new(
        db: SharedDatabase,
        storage: Arc<dyn RemoteStorage>,
        credentials: CredentialProvider,
        store_timeout: Duration,
        remote_timeout: Duration,
    ) -> Self {
        Self {
            db,
            storage,
            credentials,
            store_timeout,
            remote_timeout,
        }
    }

    /// Run a remote storage call with the caller-side timeout.
    async fn remote<T, F>(&self, call: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        match tokio::time::timeout(self.remote_timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(DriveboxError::Upstream(format!(
                "{} call timed out after {}ms",
                self.storage.backend_name(),
                self.remote_timeout.as_millis()
            ))),
        }
    }

    /// List the caller's files, newest first.
    pub async fn list(&self, identity: &Identity) -> Result<Vec<FileRecord>> {
        let repo = FileRepository::new(self.db.pool());
        with_timeout(self.store_timeout, repo.list_by_owner(&identity.id)).await
    }

    /// Store a staged upload remotely and record it.
    ///
    /// The staged file is consumed and removed whatever the outcome.
    pub async fn upload(&self, identity: &Identity, staged: StagedFile) -> Result<FileRecord> {
        let token = self.credentials.access_token(&identity.id).await?;

        let upload = ObjectUpload {
            name: staged.file_name(),
            mime_type: staged.mime_type(),
            path: staged.path(),
            size: staged.size(),
        };
        let object = self
            .remote(self.storage.create_object(&token, upload))
            .await?;

        let new_record = NewFileRecord::new(
            &identity.id,
            staged.file_name(),
            staged.size() as i64,
            staged.mime_type(),
            &object.id,
            &object.link,
        );
        drop(staged);

        let repo = FileRepository::new(self.db.pool());
        match with_timeout(self.store_timeout, repo.create(&new_record)).await {
            Ok(record) => {
                info!(
                    owner_id = %identity.id,
                    file_id = %record.id,
                    drive_file_id = %record.drive_file_id,
                    size = record.file_size,
                    "File uploaded"
                );
                Ok(record)
            }
            Err(e) => {
                error!(
                    owner_id = %identity.id,
                    drive_file_id = %object.id,
                    "Failed to record upload, removing remote object: {}",
                    e
                );
                if let Err(cleanup) = self
                    .remote(self.storage.delete_object(&token, &object.id))
                    .await
                {
                    error!(
                        drive_file_id = %object.id,
                        "Orphaned remote object left behind: {}",
                        cleanup
                    );
                }
                Err(e)
            }
        }
    }

    /// Delete one of the caller's files, remote object first.
    pub async fn delete(&self, identity: &Identity, file_id: &str) -> Result<()> {
        let file_id = file_id.trim();
        if file_id.is_empty() {
            return Err(DriveboxError::BadRequest("File ID is required".to_string()));
        }

        let repo = FileRepository::new(self.db.pool());
        let record = with_timeout(self.store_timeout, repo.get_owned(file_id, &identity.id))
            .await?
            .ok_or_else(|| {
                DriveboxError::NotFound(
                    "File not found or you do not have permission to delete it".to_string(),
                )
            })?;

        let token = self.credentials.access_token(&identity.id).await?;
        self.remote(self.storage.delete_object(&token, &record.drive_file_id))
            .await?;

        let removed =
            with_timeout(self.store_timeout, repo.delete_owned(&record.id, &identity.id)).await?;
        if !removed {
            warn!(file_id = %record.id, "File record already removed");
        }

        info!(
            owner_id = %identity.id,
            file_id = %record.id,
            drive_file_id = %record.drive_file_id,
            "File deleted"
        );
        Ok(())
    }

    /// Remove the caller's records whose remote object no longer exists.
    ///
    /// Every record is checked before any is removed. Records whose check
    /// fails are skipped and counted; the run fails only when no check
    /// succeeds.
    pub async fn reconcile(&self, identity: &Identity) -> Result<ReconcileReport> {
        let records = self.list(identity).await?;
        if records.is_empty() {
            return Ok(ReconcileReport::default());
        }

        let token = self.credentials.access_token(&identity.id).await?;

        let checks: Vec<(FileRecord, Result<bool>)> = stream::iter(records)
            .map(|record| {
                let token = token.as_str();
                async move {
                    let exists = self
                        .remote(self.storage.object_exists(token, &record.drive_file_id))
                        .await;
                    (record, exists)
                }
            })
            .buffer_unordered(RECONCILE_CONCURRENCY)
            .collect()
            .await;

        let checked = checks.len();
        let mut missing = Vec::new();
        let mut unchecked = 0;
        let mut first_error = None;
        for (record, exists) in checks {
            match exists {
                Ok(true) => {}
                Ok(false) => missing.push(record),
                Err(e) => {
                    warn!(
                        file_id = %record.id,
                        drive_file_id = %record.drive_file_id,
                        "Existence check failed, keeping record: {}",
                        e
                    );
                    unchecked += 1;
                    if first_error.is_none() {
                        first_error = Some(e);
                    }
                }
            }
        }

        if unchecked == checked {
            if let Some(e) = first_error {
                return Err(e);
            }
        }

        let repo = FileRepository::new(self.db.pool());
        let mut removed = 0;
        for record in missing {
            if with_timeout(self.store_timeout, repo.delete_owned(&record.id, &identity.id))
                .await?
            {
                warn!(
                    owner_id = %identity.id,
                    file_id = %record.id,
                    drive_file_id = %record.drive_file_id,
                    "Removed record for missing remote object"
                );
                removed += 1;
            }
        }

        info!(owner_id = %identity.id, removed, unchecked, "Reconcile complete");
        Ok(ReconcileReport {
            removed,
            unchecked: unchecked as u64,
        })
    }

    /// Link the caller's remote storage account.
    pub async fn link_credentials(
        &self,
        identity: &Identity,
        access_token: &str,
        refresh_token: Option<&str>,
        expires_in: Option<i64>,
    ) -> Result<()> {
        let mut creds = NewDriveCredentials::new(&identity.id, access_token);
        if let Some(refresh_token) = refresh_token.filter(|t| !t.is_empty()) {
            creds = creds.with_refresh_token(refresh_token);
        }
        if let Some(secs) = expires_in {
            creds = creds.expires_in(secs)?;
        }
        self.credentials.link(creds).await
    }
}
