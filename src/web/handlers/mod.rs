//! API handlers and shared state.

pub mod credentials;
pub mod files;

pub use credentials::*;
pub use files::*;

use std::sync::Arc;
use std::time::Duration;

use crate::config::Config;
use crate::db::SharedDatabase;
use crate::drive::{CredentialProvider, RemoteStorage, TokenRefresher};
use crate::file::{FileService, StagingArea};
use crate::Result;

/// Application state shared across handlers.
pub struct AppState {
    /// File workflows.
    pub files: Arc<FileService>,
    /// Upload staging directory.
    pub staging: Arc<StagingArea>,
}

impl AppState {
    /// Wire the workflows from configuration.
    pub fn new(
        db: SharedDatabase,
        storage: Arc<dyn RemoteStorage>,
        refresher: Arc<dyn TokenRefresher>,
        config: &Config,
    ) -> Result<Self> {
        let store_timeout = Duration::from_secs(config.database.timeout_secs);
        let remote_timeout = Duration::from_secs(config.drive.timeout_secs);

        let credentials = CredentialProvider::new(db.clone(), refresher, store_timeout);
        let files = FileService::new(
            db,
            storage,
            credentials,
            store_timeout,
            remote_timeout,
        );
        let staging = StagingArea::new(
            &config.uploads.temp_dir,
            config.uploads.max_upload_size_bytes(),
        )?;

        Ok(Self {
            files: Arc::new(files),
            staging: Arc::new(staging),
        })
    }
}
