//! File management module for drivebox.
//!
//! This module provides the upload, list and delete workflows:
//! - File record metadata keyed by owner
//! - Staging of incoming uploads in uniquely named temporary files
//! - Orchestration between remote storage and the metadata store

mod metadata;
mod service;
mod staging;

pub use metadata::{FileRecord, FileRepository, NewFileRecord};
pub use service::{FileService, ReconcileReport};
pub use staging::{StagedFile, StagingArea, StagingWriter};

/// File name used when the upload does not declare one.
pub const DEFAULT_FILE_NAME: &str = "uploaded_file";

/// MIME type used when none is declared or can be guessed.
pub const DEFAULT_MIME_TYPE: &str = "application/octet-stream";
