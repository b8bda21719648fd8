//! drivebox - authenticated file manager backed by Google Drive.
//!
//! Signed-in users upload files that are forwarded to their own Drive
//! account; a local metadata store keeps one record per remote object so
//! files can be listed and deleted per owner.

pub mod auth;
pub mod config;
pub mod db;
pub mod drive;
pub mod error;
pub mod file;
pub mod logging;
pub mod web;

pub use auth::{Identity, SessionVerifier};
pub use config::Config;
pub use db::{Database, SharedDatabase};
pub use drive::{create_remote_storage, InMemoryStorage, RemoteStorage};
pub use error::{DriveboxError, Result};
pub use file::{FileRecord, FileService, StagingArea};
pub use web::{AppState, WebServer};
