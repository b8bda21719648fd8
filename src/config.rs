//! Configuration module for drivebox.

use serde::Deserialize;
use std::path::Path;

use crate::{DriveboxError, Result};

/// HTTP server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host address to bind.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port number to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
    /// CORS allowed origins.
    #[serde(default)]
    pub cors_origins: Vec<String>,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3000
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origins: vec![],
        }
    }
}

/// Metadata store configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_db_path")]
    pub path: String,
    /// Maximum pooled connections.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Timeout applied to every store call, in seconds.
    #[serde(default = "default_db_timeout")]
    pub timeout_secs: u64,
}

fn default_db_path() -> String {
    "data/drivebox.db".to_string()
}

fn default_max_connections() -> u32 {
    8
}

fn default_db_timeout() -> u64 {
    10
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
            max_connections: default_max_connections(),
            timeout_secs: default_db_timeout(),
        }
    }
}

/// Upload staging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct UploadsConfig {
    /// Directory holding staged uploads while a request is in flight.
    #[serde(default = "default_temp_dir")]
    pub temp_dir: String,
    /// Maximum upload size in megabytes.
    #[serde(default = "default_max_upload_size")]
    pub max_upload_size_mb: u64,
}

fn default_temp_dir() -> String {
    "tmp".to_string()
}

fn default_max_upload_size() -> u64 {
    100
}

/// Largest accepted `uploads.max_upload_size_mb`.
pub const MAX_UPLOAD_SIZE_MB: u64 = 4096;

impl UploadsConfig {
    /// Maximum upload size in bytes.
    pub fn max_upload_size_bytes(&self) -> u64 {
        self.max_upload_size_mb.saturating_mul(1024 * 1024)
    }
}

impl Default for UploadsConfig {
    fn default() -> Self {
        Self {
            temp_dir: default_temp_dir(),
            max_upload_size_mb: default_max_upload_size(),
        }
    }
}

/// Remote storage backend selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// Google Drive v3 API.
    Google,
    /// Process-local storage for development.
    Memory,
}

/// Remote storage (Google Drive) configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DriveConfig {
    /// Which backend to use.
    #[serde(default = "default_backend")]
    pub backend: StorageBackend,
    /// OAuth client ID used to refresh delegated tokens.
    #[serde(default)]
    pub client_id: String,
    /// OAuth client secret used to refresh delegated tokens.
    #[serde(default)]
    pub client_secret: String,
    /// Base URL of the Drive metadata API.
    #[serde(default = "default_api_base")]
    pub api_base: String,
    /// Base URL of the Drive upload API.
    #[serde(default = "default_upload_base")]
    pub upload_base: String,
    /// OAuth token endpoint.
    #[serde(default = "default_token_url")]
    pub token_url: String,
    /// Total timeout for a single remote call, in seconds.
    #[serde(default = "default_drive_timeout")]
    pub timeout_secs: u64,
    /// Folder new objects are created in.
    #[serde(default = "default_parent_folder")]
    pub parent_folder: String,
}

fn default_backend() -> StorageBackend {
    StorageBackend::Google
}

fn default_api_base() -> String {
    "https://www.googleapis.com/drive/v3".to_string()
}

fn default_upload_base() -> String {
    "https://www.googleapis.com/upload/drive/v3".to_string()
}

fn default_token_url() -> String {
    "https://oauth2.googleapis.com/token".to_string()
}

fn default_drive_timeout() -> u64 {
    120
}

fn default_parent_folder() -> String {
    "root".to_string()
}

impl Default for DriveConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            client_id: String::new(),
            client_secret: String::new(),
            api_base: default_api_base(),
            upload_base: default_upload_base(),
            token_url: default_token_url(),
            timeout_secs: default_drive_timeout(),
            parent_folder: default_parent_folder(),
        }
    }
}

/// Session verification configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// Shared secret used to verify session tokens (must be set).
    #[serde(default)]
    pub session_secret: String,
    /// Name of the cookie carrying the session token.
    #[serde(default = "default_session_cookie")]
    pub session_cookie: String,
}

fn default_session_cookie() -> String {
    "drivebox_session".to_string()
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            session_secret: String::new(),
            session_cookie: default_session_cookie(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Path to the log file. Empty disables file logging.
    #[serde(default = "default_log_file")]
    pub file: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_file() -> String {
    "logs/drivebox.log".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: default_log_file(),
        }
    }
}

/// Main configuration structure.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    /// HTTP server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Metadata store configuration.
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Upload staging configuration.
    #[serde(default)]
    pub uploads: UploadsConfig,
    /// Remote storage configuration.
    #[serde(default)]
    pub drive: DriveConfig,
    /// Session configuration.
    #[serde(default)]
    pub auth: AuthConfig,
    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(DriveboxError::Io)?;
        Self::parse(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(s: &str) -> Result<Self> {
        toml::from_str(s).map_err(|e| DriveboxError::Config(format!("config parse error: {e}")))
    }

    /// Apply environment variable overrides to the configuration.
    ///
    /// Supported environment variables:
    /// - `DRIVEBOX_SESSION_SECRET`: session token secret
    /// - `DRIVEBOX_DATABASE_PATH`: SQLite database path
    /// - `GOOGLE_CLIENT_ID` / `GOOGLE_CLIENT_SECRET`: OAuth client credentials
    pub fn apply_env_overrides(&mut self) {
        fn non_empty(name: &str) -> Option<String> {
            std::env::var(name).ok().filter(|v| !v.is_empty())
        }

        if let Some(secret) = non_empty("DRIVEBOX_SESSION_SECRET") {
            self.auth.session_secret = secret;
        }
        if let Some(path) = non_empty("DRIVEBOX_DATABASE_PATH") {
            self.database.path = path;
        }
        if let Some(client_id) = non_empty("GOOGLE_CLIENT_ID") {
            self.drive.client_id = client_id;
        }
        if let Some(client_secret) = non_empty("GOOGLE_CLIENT_SECRET") {
            self.drive.client_secret = client_secret;
        }
    }

    /// Validate the configuration.
    ///
    /// Returns an error if:
    /// - the session secret is not set
    /// - the Google backend is selected without OAuth client credentials
    /// - the upload size limit is zero or above [`MAX_UPLOAD_SIZE_MB`]
    pub fn validate(&self) -> Result<()> {
        if self.auth.session_secret.is_empty() {
            return Err(DriveboxError::Config(
                "session_secret is not set. \
                 Set it in config.toml or via DRIVEBOX_SESSION_SECRET environment variable."
                    .to_string(),
            ));
        }

        if self.drive.backend == StorageBackend::Google
            && (self.drive.client_id.is_empty() || self.drive.client_secret.is_empty())
        {
            return Err(DriveboxError::Config(
                "Google Drive backend requires client_id and client_secret \
                 (or GOOGLE_CLIENT_ID / GOOGLE_CLIENT_SECRET)."
                    .to_string(),
            ));
        }

        if self.uploads.max_upload_size_mb == 0 {
            return Err(DriveboxError::Config(
                "uploads.max_upload_size_mb must be greater than zero".to_string(),
            ));
        }

        if self.uploads.max_upload_size_mb > MAX_UPLOAD_SIZE_MB {
            return Err(DriveboxError::Config(format!(
                "uploads.max_upload_size_mb must be at most {MAX_UPLOAD_SIZE_MB}"
            )));
        }

        Ok(())
    }
}
