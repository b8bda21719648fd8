//! Upload staging.
//!
//! Incoming upload bodies are streamed into uniquely named temporary files
//! under the staging directory. A staged file is removed when it is dropped,
//! so every exit path of a request releases it.

use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tokio::io::AsyncWriteExt;
use tracing::debug;

use super::{DEFAULT_FILE_NAME, DEFAULT_MIME_TYPE};
use crate::{DriveboxError, Result};

/// Directory where uploads are staged, with the size limit applied to each.
#[derive(Debug, Clone)]
pub struct StagingArea {
    dir: PathBuf,
    max_size: u64,
}

impl StagingArea {
    /// Create a staging area. The directory is created if it doesn't exist.
    pub fn new(dir: impl Into<PathBuf>, max_size: u64) -> Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir, max_size })
    }

    /// Staging directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Maximum accepted upload size in bytes.
    pub fn max_size(&self) -> u64 {
        self.max_size
    }

    /// Start staging one upload.
    ///
    /// Missing names fall back to `uploaded_file`; missing MIME types are
    /// guessed from the name.
    pub fn begin(&self, file_name: Option<&str>, mime_type: Option<&str>) -> Result<StagingWriter> {
        let file_name = normalize_file_name(file_name);
        let mime_type = resolve_mime_type(&file_name, mime_type);

        let temp = tempfile::Builder::new()
            .prefix("upload-")
            .suffix(".part")
            .tempfile_in(&self.dir)?;
        let handle = tokio::fs::File::from_std(temp.as_file().try_clone()?);

        debug!(path = ?temp.path(), file_name = %file_name, "Staging upload");

        Ok(StagingWriter {
            temp,
            handle,
            file_name,
            mime_type,
            size: 0,
            max_size: self.max_size,
        })
    }
}

/// Take the last path component of a client-supplied name.
fn normalize_file_name(name: Option<&str>) -> String {
    name.and_then(|n| n.rsplit(['/', '\\']).next())
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .unwrap_or(DEFAULT_FILE_NAME)
        .to_string()
}

fn resolve_mime_type(file_name: &str, declared: Option<&str>) -> String {
    declared
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .map(str::to_string)
        .or_else(|| mime_guess::from_path(file_name).first_raw().map(str::to_string))
        .unwrap_or_else(|| DEFAULT_MIME_TYPE.to_string())
}

/// An upload being written to its temporary file.
pub struct StagingWriter {
    temp: NamedTempFile,
    handle: tokio::fs::File,
    file_name: String,
    mime_type: String,
    size: u64,
    max_size: u64,
}

impl StagingWriter {
    /// Append a chunk, enforcing the size limit.
    pub async fn write_chunk(&mut self, chunk: &[u8]) -> Result<()> {
        let new_size = self.size + chunk.len() as u64;
        if new_size > self.max_size {
            return Err(DriveboxError::BadRequest(format!(
                "File too large (max {} MB)",
                self.max_size / (1024 * 1024)
            )));
        }

        self.handle.write_all(chunk).await?;
        self.size = new_size;
        Ok(())
    }

    /// Finish staging. Empty uploads are rejected.
    pub async fn finish(mut self) -> Result<StagedFile> {
        if self.size == 0 {
            return Err(DriveboxError::BadRequest(
                "Uploaded file is empty".to_string(),
            ));
        }

        self.handle.flush().await?;

        Ok(StagedFile {
            file: self.temp,
            file_name: self.file_name,
            mime_type: self.mime_type,
            size: self.size,
        })
    }
}

/// A complete upload waiting to be sent to remote storage.
///
/// Dropping it deletes the temporary file.
#[derive(Debug)]
pub struct StagedFile {
    file: NamedTempFile,
    file_name: String,
    mime_type: String,
    size: u64,
}

impl StagedFile {
    /// Path of the temporary file.
    pub fn path(&self) -> &Path {
        self.file.path()
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn size(&self) -> u64 {
        self.size
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn staged_count(dir: &Path) -> usize {
        std::fs::read_dir(dir).unwrap().count()
    }

    #[tokio::test]
    async fn test_stage_and_release() {
        let temp_dir = tempfile::tempdir().unwrap();
        let area = StagingArea::new(temp_dir.path().join("staging"), 1024).unwrap();

        let mut writer = area.begin(Some("notes.txt"), Some("text/plain")).unwrap();
        writer.write_chunk(b"hello ").await.unwrap();
        writer.write_chunk(b"world").await.unwrap();
        let staged = writer.finish().await.unwrap();

        assert_eq!(staged.file_name(), "notes.txt");
        assert_eq!(staged.mime_type(), "text/plain");
        assert_eq!(staged.size(), 11);
        assert_eq!(std::fs::read(staged.path()).unwrap(), b"hello world");
        assert_eq!(staged_count(area.dir()), 1);

        drop(staged);
        assert_eq!(staged_count(area.dir()), 0);
    }

    #[tokio::test]
    async fn test_exact_limit_accepted() {
        let temp_dir = tempfile::tempdir().unwrap();
        let area = StagingArea::new(temp_dir.path(), 4).unwrap();

        let mut writer = area.begin(Some("a.bin"), None).unwrap();
        writer.write_chunk(b"abcd").await.unwrap();
        assert_eq!(writer.finish().await.unwrap().size(), 4);
    }

    #[tokio::test]
    async fn test_over_limit_rejected_and_removed() {
        let temp_dir = tempfile::tempdir().unwrap();
        let area = StagingArea::new(temp_dir.path(), 4).unwrap();

        let mut writer = area.begin(Some("a.bin"), None).unwrap();
        writer.write_chunk(b"abc").await.unwrap();
        let result = writer.write_chunk(b"de").await;
        assert!(matches!(result, Err(DriveboxError::BadRequest(_))));

        drop(writer);
        assert_eq!(staged_count(temp_dir.path()), 0);
    }

    #[tokio::test]
    async fn test_empty_upload_rejected() {
        let temp_dir = tempfile::tempdir().unwrap();
        let area = StagingArea::new(temp_dir.path(), 4).unwrap();

        let writer = area.begin(Some("a.bin"), None).unwrap();
        let result = writer.finish().await;
        assert!(matches!(result, Err(DriveboxError::BadRequest(_))));
        assert_eq!(staged_count(temp_dir.path()), 0);
    }

    #[tokio::test]
    async fn test_concurrent_stages_get_unique_paths() {
        let temp_dir = tempfile::tempdir().unwrap();
        let area = StagingArea::new(temp_dir.path(), 1024).unwrap();

        let a = area.begin(Some("same.txt"), None).unwrap();
        let b = area.begin(Some("same.txt"), None).unwrap();
        assert_ne!(a.temp.path(), b.temp.path());
        assert_eq!(staged_count(temp_dir.path()), 2);
    }

    #[test]
    fn test_normalize_file_name() {
        assert_eq!(normalize_file_name(Some("report.pdf")), "report.pdf");
        assert_eq!(normalize_file_name(Some("dir/sub/report.pdf")), "report.pdf");
        assert_eq!(normalize_file_name(Some("C:\\docs\\report.pdf")), "report.pdf");
        assert_eq!(normalize_file_name(Some("  ")), DEFAULT_FILE_NAME);
        assert_eq!(normalize_file_name(None), DEFAULT_FILE_NAME);
    }

    #[test]
    fn test_resolve_mime_type() {
        assert_eq!(resolve_mime_type("a.pdf", Some("application/x-custom")), "application/x-custom");
        assert_eq!(resolve_mime_type("a.pdf", None), "application/pdf");
        assert_eq!(resolve_mime_type("a.pdf", Some("")), "application/pdf");
        assert_eq!(resolve_mime_type("uploaded_file", None), DEFAULT_MIME_TYPE);
    }
}
