//! Database schema and migrations for drivebox.
//!
//! Migrations are applied in order when the database is opened; the
//! schema_version table records which ones have run.

/// Database migrations.
pub const MIGRATIONS: &[&str] = &[
    // v1: File records mirroring objects held by the remote storage provider
    r#"
CREATE TABLE files (
    id              TEXT PRIMARY KEY,       -- UUID v4
    owner_id        TEXT NOT NULL,          -- verified session identity
    file_name       TEXT NOT NULL,
    file_size       INTEGER NOT NULL,
    mime_type       TEXT NOT NULL,
    drive_file_id   TEXT NOT NULL,
    drive_link      TEXT NOT NULL,
    created_at      TEXT NOT NULL           -- RFC 3339, fixed microsecond precision
);

CREATE INDEX idx_files_owner_created ON files(owner_id, created_at DESC);
"#,
    // v2: Delegated remote storage credentials, one row per identity
    r#"
CREATE TABLE drive_credentials (
    owner_id        TEXT PRIMARY KEY,
    access_token    TEXT NOT NULL,
    refresh_token   TEXT,
    expires_at      TEXT,                   -- NULL when the provider gave no expiry
    updated_at      TEXT NOT NULL
);
"#,
];
