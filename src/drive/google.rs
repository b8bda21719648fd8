//! Google Drive v3 backend.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::{self, StreamExt};
use reqwest::header::{CONTENT_LENGTH, CONTENT_TYPE};
use reqwest::{Body, Client, Response, StatusCode};
use serde::Deserialize;
use tokio_util::io::ReaderStream;
use tracing::{debug, warn};
use url::Url;
use uuid::Uuid;

use super::{ObjectUpload, RemoteObject, RemoteStorage};
use crate::config::DriveConfig;
use crate::{DriveboxError, Result};

/// Connect timeout in seconds.
const CONNECT_TIMEOUT_SECS: u64 = 10;

/// User agent string for Drive API calls.
const USER_AGENT: &str = concat!("drivebox/", env!("CARGO_PKG_VERSION"));

/// Longest provider error body echoed into an error message.
const MAX_ERROR_BODY: usize = 512;

/// Subset of the Drive `File` resource returned on create.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DriveFile {
    id: Option<String>,
    web_view_link: Option<String>,
    #[serde(default)]
    trashed: bool,
}

/// Google Drive client acting with per-user delegated access tokens.
pub struct GoogleDrive {
    client: Client,
    api_base: Url,
    upload_base: Url,
    parent_folder: String,
}

impl GoogleDrive {
    /// Create a new client from configuration.
    pub fn new(config: &DriveConfig) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| DriveboxError::Config(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_base: parse_base(&config.api_base)?,
            upload_base: parse_base(&config.upload_base)?,
            parent_folder: config.parent_folder.clone(),
        })
    }

    /// URL of the `files` collection under `base`, optionally with an object ID.
    fn files_url(base: &Url, object_id: Option<&str>) -> Result<Url> {
        let mut url = base.clone();
        {
            let mut segments = url.path_segments_mut().map_err(|_| {
                DriveboxError::Config(format!("drive base URL cannot be a base: {base}"))
            })?;
            segments.pop_if_empty().push("files");
            if let Some(id) = object_id {
                segments.push(id);
            }
        }
        Ok(url)
    }
}

fn parse_base(raw: &str) -> Result<Url> {
    Url::parse(raw).map_err(|e| DriveboxError::Config(format!("invalid drive URL {raw}: {e}")))
}

/// Parts of a `multipart/related` body surrounding the media bytes.
///
/// The full body is `head`, the media, then `tail`.
fn multipart_related_envelope(
    boundary: &str,
    metadata: &serde_json::Value,
    mime_type: &str,
) -> (Vec<u8>, Vec<u8>) {
    let mut head = Vec::new();
    head.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
    head.extend_from_slice(b"Content-Type: application/json; charset=UTF-8\r\n\r\n");
    head.extend_from_slice(metadata.to_string().as_bytes());
    head.extend_from_slice(format!("\r\n--{boundary}\r\n").as_bytes());
    head.extend_from_slice(format!("Content-Type: {mime_type}\r\n\r\n").as_bytes());

    let tail = format!("\r\n--{boundary}--\r\n").into_bytes();
    (head, tail)
}

/// Turn a non-success response into an upstream error.
async fn upstream_error(action: &str, response: Response) -> DriveboxError {
    let status = response.status();
    let mut body = response.text().await.unwrap_or_default();
    if body.len() > MAX_ERROR_BODY {
        let mut end = MAX_ERROR_BODY;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        body.truncate(end);
    }
    DriveboxError::Upstream(format!("{action} failed with HTTP {status}: {body}"))
}

#[async_trait]
impl RemoteStorage for GoogleDrive {
    fn backend_name(&self) -> &'static str {
        "google-drive"
    }

    async fn create_object(
        &self,
        access_token: &str,
        upload: ObjectUpload<'_>,
    ) -> Result<RemoteObject> {
        let file = tokio::fs::File::open(upload.path).await?;
        let boundary = format!("drivebox-{}", Uuid::new_v4().simple());
        let metadata = serde_json::json!({
            "name": upload.name,
            "parents": [self.parent_folder],
        });
        let (head, tail) = multipart_related_envelope(&boundary, &metadata, upload.mime_type);
        let content_length = head.len() as u64 + upload.size + tail.len() as u64;

        // Media is streamed from the staged file.
        let body = stream::once(async move { Ok::<_, std::io::Error>(Bytes::from(head)) })
            .chain(ReaderStream::new(file))
            .chain(stream::once(async move { Ok(Bytes::from(tail)) }));

        let mut url = Self::files_url(&self.upload_base, None)?;
        url.query_pairs_mut()
            .append_pair("uploadType", "multipart")
            .append_pair("fields", "id,webViewLink");

        debug!(name = upload.name, size = upload.size, "Creating Drive object");

        let response = self
            .client
            .post(url)
            .bearer_auth(access_token)
            .header(
                CONTENT_TYPE,
                format!("multipart/related; boundary={boundary}"),
            )
            .header(CONTENT_LENGTH, content_length)
            .body(Body::wrap_stream(body))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(upstream_error("Drive upload", response).await);
        }

        let file: DriveFile = response.json().await?;
        match (file.id, file.web_view_link) {
            (Some(id), Some(link)) if !id.is_empty() && !link.is_empty() => {
                Ok(RemoteObject { id, link })
            }
            _ => Err(DriveboxError::Upstream(
                "Drive did not return an object id and link".to_string(),
            )),
        }
    }

    async fn delete_object(&self, access_token: &str, object_id: &str) -> Result<()> {
        let url = Self::files_url(&self.api_base, Some(object_id))?;

        let response = self
            .client
            .delete(url)
            .bearer_auth(access_token)
            .send()
            .await?;

        match response.status() {
            status if status.is_success() => Ok(()),
            StatusCode::NOT_FOUND => {
                warn!(drive_file_id = object_id, "Drive object already gone");
                Ok(())
            }
            _ => Err(upstream_error("Drive delete", response).await),
        }
    }

    async fn object_exists(&self, access_token: &str, object_id: &str) -> Result<bool> {
        let mut url = Self::files_url(&self.api_base, Some(object_id))?;
        url.query_pairs_mut().append_pair("fields", "id,trashed");

        let response = self
            .client
            .get(url)
            .bearer_auth(access_token)
            .send()
            .await?;

        match response.status() {
            status if status.is_success() => {
                let file: DriveFile = response.json().await?;
                Ok(!file.trashed)
            }
            StatusCode::NOT_FOUND => Ok(false),
            _ => Err(upstream_error("Drive lookup", response).await),
        }
    }
}
