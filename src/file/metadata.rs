//! File record types and repository.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::db::DbPool;
use crate::{DriveboxError, Result};

/// Metadata for one file held by remote storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct FileRecord {
    /// Unique record ID (UUID v4).
    pub id: String,
    /// Identity that uploaded the file.
    pub owner_id: String,
    /// Declared file name.
    pub file_name: String,
    /// Size in bytes.
    pub file_size: i64,
    /// MIME type.
    pub mime_type: String,
    /// Remote storage object ID.
    pub drive_file_id: String,
    /// Link to the remote object.
    pub drive_link: String,
    /// When the record was created.
    pub created_at: DateTime<Utc>,
}

/// Data for creating a new file record.
#[derive(Debug, Clone)]
pub struct NewFileRecord {
    pub owner_id: String,
    pub file_name: String,
    pub file_size: i64,
    pub mime_type: String,
    pub drive_file_id: String,
    pub drive_link: String,
    /// Creation time; defaults to now.
    pub created_at: Option<DateTime<Utc>>,
}

impl NewFileRecord {
    /// Create a new NewFileRecord.
    pub fn new(
        owner_id: impl Into<String>,
        file_name: impl Into<String>,
        file_size: i64,
        mime_type: impl Into<String>,
        drive_file_id: impl Into<String>,
        drive_link: impl Into<String>,
    ) -> Self {
        Self {
            owner_id: owner_id.into(),
            file_name: file_name.into(),
            file_size,
            mime_type: mime_type.into(),
            drive_file_id: drive_file_id.into(),
            drive_link: drive_link.into(),
            created_at: None,
        }
    }

    /// Set an explicit creation time.
    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = Some(created_at);
        self
    }
}

// Fixed-width timestamps keep text ordering equal to time ordering.
fn to_db_time(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

const SELECT_COLUMNS: &str = "SELECT id, owner_id, file_name, file_size, mime_type, \
     drive_file_id, drive_link, created_at FROM files";

/// Repository for file record operations.
///
/// Every read and delete is scoped to an owner.
pub struct FileRepository<'a> {
    pool: &'a DbPool,
}

impl<'a> FileRepository<'a> {
    /// Create a new repository instance.
    pub fn new(pool: &'a DbPool) -> Self {
        Self { pool }
    }

    /// Insert a new file record.
    pub async fn create(&self, record: &NewFileRecord) -> Result<FileRecord> {
        let id = Uuid::new_v4().to_string();
        let created_at = record.created_at.unwrap_or_else(Utc::now);

        sqlx::query(
            "INSERT INTO files (id, owner_id, file_name, file_size, mime_type, drive_file_id, drive_link, created_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(&id)
        .bind(&record.owner_id)
        .bind(&record.file_name)
        .bind(record.file_size)
        .bind(&record.mime_type)
        .bind(&record.drive_file_id)
        .bind(&record.drive_link)
        .bind(to_db_time(&created_at))
        .execute(self.pool)
        .await?;

        self.get_owned(&id, &record.owner_id)
            .await?
            .ok_or_else(|| DriveboxError::Store("file record vanished after insert".into()))
    }

    /// Get a record by ID, only if owned by `owner_id`.
    pub async fn get_owned(&self, id: &str, owner_id: &str) -> Result<Option<FileRecord>> {
        let record = sqlx::query_as::<_, FileRecord>(&format!(
            "{SELECT_COLUMNS} WHERE id = $1 AND owner_id = $2"
        ))
        .bind(id)
        .bind(owner_id)
        .fetch_optional(self.pool)
        .await?;

        Ok(record)
    }

    /// List all records owned by `owner_id`, newest first.
    pub async fn list_by_owner(&self, owner_id: &str) -> Result<Vec<FileRecord>> {
        let records = sqlx::query_as::<_, FileRecord>(&format!(
            "{SELECT_COLUMNS} WHERE owner_id = $1 ORDER BY created_at DESC, rowid DESC"
        ))
        .bind(owner_id)
        .fetch_all(self.pool)
        .await?;

        Ok(records)
    }

    /// Delete a record by ID, only if owned by `owner_id`.
    pub async fn delete_owned(&self, id: &str, owner_id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM files WHERE id = $1 AND owner_id = $2")
            .bind(id)
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
    use chrono::Duration;

    fn new_record(owner: &str, name: &str) -> NewFileRecord {
        NewFileRecord::new(
            owner,
            name,
            42,
            "text/plain",
            format!("drive-{name}"),
            format!("https://drive.example/{name}"),
        )
    }

    #[tokio::test]
    async fn test_create_record() {
        let db = Database::open_in_memory().await.unwrap();
        let repo = FileRepository::new(db.pool());

        let record = repo.create(&new_record("alice", "a.txt")).await.unwrap();
        assert_eq!(record.owner_id, "alice");
        assert_eq!(record.file_name, "a.txt");
        assert_eq!(record.file_size, 42);
        assert_eq!(record.mime_type, "text/plain");
        assert_eq!(record.drive_file_id, "drive-a.txt");
        assert!(Uuid::parse_str(&record.id).is_ok());
    }

    #[tokio::test]
    async fn test_get_owned_filters_by_owner() {
        let db = Database::open_in_memory().await.unwrap();
        let repo = FileRepository::new(db.pool());

        let record = repo.create(&new_record("alice", "a.txt")).await.unwrap();
        assert!(repo.get_owned(&record.id, "alice").await.unwrap().is_some());
        assert!(repo.get_owned(&record.id, "bob").await.unwrap().is_none());
        assert!(repo.get_owned("missing", "alice").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_newest_first() {
        let db = Database::open_in_memory().await.unwrap();
        let repo = FileRepository::new(db.pool());
        let base = Utc::now();

        repo.create(&new_record("alice", "old.txt").with_created_at(base - Duration::hours(2)))
            .await
            .unwrap();
        repo.create(&new_record("alice", "new.txt").with_created_at(base))
            .await
            .unwrap();
        repo.create(&new_record("alice", "mid.txt").with_created_at(base - Duration::hours(1)))
            .await
            .unwrap();

        let names: Vec<_> = repo
            .list_by_owner("alice")
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.file_name)
            .collect();
        assert_eq!(names, vec!["new.txt", "mid.txt", "old.txt"]);
    }

    #[tokio::test]
    async fn test_list_same_timestamp_uses_insertion_order() {
        let db = Database::open_in_memory().await.unwrap();
        let repo = FileRepository::new(db.pool());
        let at = Utc::now();

        repo.create(&new_record("alice", "first").with_created_at(at))
            .await
            .unwrap();
        repo.create(&new_record("alice", "second").with_created_at(at))
            .await
            .unwrap();

        let records = repo.list_by_owner("alice").await.unwrap();
        assert_eq!(records[0].file_name, "second");
        assert_eq!(records[1].file_name, "first");
    }

    #[tokio::test]
    async fn test_list_scoped_to_owner() {
        let db = Database::open_in_memory().await.unwrap();
        let repo = FileRepository::new(db.pool());

        repo.create(&new_record("alice", "a.txt")).await.unwrap();
        assert_eq!(repo.list_by_owner("alice").await.unwrap().len(), 1);
        assert!(repo.list_by_owner("bob").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delete_owned() {
        let db = Database::open_in_memory().await.unwrap();
        let repo = FileRepository::new(db.pool());

        let record = repo.create(&new_record("alice", "a.txt")).await.unwrap();
        assert!(!repo.delete_owned(&record.id, "bob").await.unwrap());
        assert!(repo.delete_owned(&record.id, "alice").await.unwrap());
        assert!(!repo.delete_owned(&record.id, "alice").await.unwrap());
    }

    #[test]
    fn test_serialize_camel_case() {
        let record = FileRecord {
            id: "1".to_string(),
            owner_id: "alice".to_string(),
            file_name: "a.txt".to_string(),
            file_size: 3,
            mime_type: "text/plain".to_string(),
            drive_file_id: "d1".to_string(),
            drive_link: "https://drive.example/d1".to_string(),
            created_at: Utc::now(),
        };
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["ownerId"], "alice");
        assert_eq!(json["fileName"], "a.txt");
        assert_eq!(json["fileSize"], 3);
        assert_eq!(json["mimeType"], "text/plain");
        assert_eq!(json["driveFileId"], "d1");
        assert!(json["driveLink"].is_string());
        assert!(json["createdAt"].is_string());
    }
}
