//! Box API connector implementation
//!
//! Implements the `DocumentStorage` trait for the Box content API.

use async_trait::async_trait;
use bridge_traits::error::Result;
use bridge_traits::http::{HttpClient, HttpMethod, HttpRequest, HttpResponse};
use bridge_traits::storage::{DocumentStorage, RemoteEntry, RemoteEntryKind, RemoteIdentity};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::error::BoxError;
use crate::types::{BoxApiError, BoxFolder, BoxItem, BoxUser, ItemCollection, UploadedFiles, CODE_ITEM_NAME_IN_USE};

/// Box API base URL
const API_BASE: &str = "https://api.box.com/2.0";

/// Box upload API base URL (content uploads use a separate host)
const UPLOAD_BASE: &str = "https://upload.box.com/api/2.0";

/// Maximum results per page (Box API limit for folder items)
const PAGE_LIMIT: u32 = 1000;

/// Fields to request for item entries
const ITEM_FIELDS: &str = "id,type,name,modified_at";

/// Maximum retry attempts for rate-limited or transient failures
const MAX_RETRIES: u32 = 3;

/// Timeout for metadata API requests
const API_TIMEOUT_SECS: u64 = 30;

/// Timeout for content upload requests
const UPLOAD_TIMEOUT_SECS: u64 = 120;

/// Box API connector
///
/// Implements `DocumentStorage` for the Box content API.
///
/// # Features
///
/// - Paginated folder item listing with a minimal field projection
/// - Folder creation with structured name-conflict classification
/// - Multipart content uploads and new-version uploads
/// - Exponential backoff for rate limiting and server errors
/// - Bearer authentication via an access token supplied by the host
///
/// # Example
///
/// ```ignore
/// use provider_box::BoxConnector;
/// use bridge_traits::storage::DocumentStorage;
///
/// let connector = BoxConnector::new(http_client, access_token);
/// let children = connector.list_children("0").await?;
/// ```
pub struct BoxConnector {
    /// HTTP client for API requests
    http_client: Arc<dyn HttpClient>,

    /// Bearer access token
    access_token: String,
}

impl BoxConnector {
    /// Create a new Box connector
    ///
    /// # Arguments
    ///
    /// * `http_client` - HTTP client implementation
    /// * `access_token` - Access token obtained by the host's auth layer
    pub fn new(http_client: Arc<dyn HttpClient>, access_token: String) -> Self {
        Self {
            http_client,
            access_token,
        }
    }

    /// Parse RFC 3339 timestamp to Unix timestamp
    fn parse_timestamp(rfc3339: &str) -> Option<i64> {
        DateTime::parse_from_rfc3339(rfc3339)
            .ok()
            .map(|dt| dt.with_timezone(&Utc).timestamp())
    }

    /// Convert a Box item entry to a RemoteEntry
    ///
    /// Item types other than folders and files (e.g. web links) are not
    /// upload targets and are dropped.
    fn convert_item(item: BoxItem) -> Option<RemoteEntry> {
        let kind = match item.item_type.as_str() {
            "folder" => RemoteEntryKind::Folder,
            "file" => RemoteEntryKind::File,
            _ => return None,
        };

        Some(RemoteEntry {
            id: item.id,
            name: item.name,
            kind,
            modified_at: item.modified_at.as_deref().and_then(Self::parse_timestamp),
        })
    }

    /// Classify a non-retryable API error response
    ///
    /// `conflict_name` is the name the request tried to claim; a
    /// machine-readable `item_name_in_use` code becomes a `NameConflict`
    /// carrying it.
    fn classify_error(status: u16, body: &[u8], conflict_name: Option<&str>) -> BoxError {
        if let Ok(api_error) = serde_json::from_slice::<BoxApiError>(body) {
            if api_error.code == CODE_ITEM_NAME_IN_USE {
                if let Some(name) = conflict_name {
                    return BoxError::NameConflict {
                        name: name.to_string(),
                    };
                }
            }

            return match status {
                401 => BoxError::AuthenticationFailed(api_error.message),
                404 => BoxError::NotFound(api_error.message),
                _ => BoxError::ApiError {
                    status_code: status,
                    message: api_error.message,
                },
            };
        }

        BoxError::ApiError {
            status_code: status,
            message: String::from_utf8_lossy(body).to_string(),
        }
    }

    /// Execute an API request with retry logic
    ///
    /// Implements exponential backoff for rate limiting and server errors.
    /// Client errors are classified and returned without retrying.
    #[instrument(skip(self, request), fields(url = %request.url))]
    async fn execute_with_retry(
        &self,
        request: HttpRequest,
        conflict_name: Option<&str>,
    ) -> std::result::Result<HttpResponse, BoxError> {
        let mut attempt = 0;

        loop {
            let attempt_request = request
                .clone()
                .bearer_token(&self.access_token)
                .header("Accept", "application/json");

            match self.http_client.execute(attempt_request).await {
                Ok(response) => {
                    let status = response.status;

                    if response.is_success() {
                        debug!("API request succeeded: status={}", status);
                        return Ok(response);
                    } else if status == 429 || response.is_server_error() {
                        attempt += 1;
                        if attempt >= MAX_RETRIES {
                            warn!(
                                "API request failed after {} attempts: status={}",
                                MAX_RETRIES, status
                            );
                            return Err(BoxError::ApiError {
                                status_code: status,
                                message: format!("Request failed after {} retries", MAX_RETRIES),
                            });
                        }

                        let backoff_ms = 100u64 * 2u64.pow(attempt);
                        warn!(
                            "API request failed (attempt {}/{}): status={}, retrying in {}ms",
                            attempt, MAX_RETRIES, status, backoff_ms
                        );
                        tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
                    } else {
                        warn!("API request failed: status={}", status);
                        return Err(Self::classify_error(status, &response.body, conflict_name));
                    }
                }
                Err(e) => {
                    attempt += 1;
                    if attempt >= MAX_RETRIES {
                        warn!("API request failed after {} attempts: {}", MAX_RETRIES, e);
                        return Err(BoxError::BridgeError(e));
                    }

                    let backoff_ms = 100u64 * 2u64.pow(attempt);
                    warn!(
                        "API request failed (attempt {}/{}): {}, retrying in {}ms",
                        attempt, MAX_RETRIES, e, backoff_ms
                    );
                    tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
                }
            }
        }
    }

    /// Build a multipart/form-data body for a content upload
    ///
    /// The Box upload endpoints take an `attributes` JSON part followed by
    /// the `file` part.
    fn multipart_body(attributes: &str, file_name: &str, content: &Bytes) -> (String, Bytes) {
        let boundary = format!("certmedia-{}", Uuid::new_v4().simple());

        let mut body = Vec::with_capacity(content.len() + attributes.len() + 256);
        body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"attributes\"\r\n\r\n{}\r\n",
                boundary, attributes
            )
            .as_bytes(),
        );
        body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{}\"\r\nContent-Type: application/octet-stream\r\n\r\n",
                boundary, file_name
            )
            .as_bytes(),
        );
        body.extend_from_slice(content);
        body.extend_from_slice(format!("\r\n--{}--\r\n", boundary).as_bytes());

        (
            format!("multipart/form-data; boundary={}", boundary),
            Bytes::from(body),
        )
    }

    /// Parse an upload response envelope into the uploaded file's id
    fn parse_uploaded_file(response: &HttpResponse) -> std::result::Result<String, BoxError> {
        let uploaded: UploadedFiles = serde_json::from_slice(&response.body).map_err(|e| {
            BoxError::ParseError(format!("Failed to parse upload response: {}", e))
        })?;

        uploaded
            .entries
            .into_iter()
            .next()
            .map(|entry| entry.id)
            .ok_or_else(|| {
                BoxError::ParseError("Upload succeeded but no file was returned".to_string())
            })
    }
}

#[async_trait]
impl DocumentStorage for BoxConnector {
    #[instrument(skip(self), fields(folder_id = %folder_id))]
    async fn list_children(&self, folder_id: &str) -> Result<Vec<RemoteEntry>> {
        debug!("Listing items of folder {}", folder_id);

        let mut entries = Vec::new();
        let mut offset: u64 = 0;

        loop {
            let url = format!(
                "{}/folders/{}/items?fields={}&limit={}&offset={}",
                API_BASE,
                urlencoding::encode(folder_id),
                ITEM_FIELDS,
                PAGE_LIMIT,
                offset
            );

            let request = HttpRequest::new(HttpMethod::Get, url)
                .timeout(Duration::from_secs(API_TIMEOUT_SECS));
            let response = self.execute_with_retry(request, None).await?;

            let collection: ItemCollection = serde_json::from_slice(&response.body)
                .map_err(|e| {
                    BoxError::ParseError(format!("Failed to parse item collection: {}", e))
                })?;

            let page_len = collection.entries.len() as u64;
            entries.extend(collection.entries.into_iter().filter_map(Self::convert_item));

            offset += page_len;
            if page_len == 0 || offset >= collection.total_count {
                break;
            }
        }

        debug!("Listed {} items in folder {}", entries.len(), folder_id);
        Ok(entries)
    }

    #[instrument(skip(self), fields(parent_id = %parent_id, name = %name))]
    async fn create_folder(&self, parent_id: &str, name: &str) -> Result<String> {
        info!("Creating folder '{}' under {}", name, parent_id);

        let request = HttpRequest::new(HttpMethod::Post, format!("{}/folders", API_BASE))
            .json(&serde_json::json!({
                "name": name,
                "parent": { "id": parent_id },
            }))?
            .timeout(Duration::from_secs(API_TIMEOUT_SECS));

        let response = self.execute_with_retry(request, Some(name)).await?;

        let folder: BoxFolder = serde_json::from_slice(&response.body)
            .map_err(|e| BoxError::ParseError(format!("Failed to parse folder response: {}", e)))?;

        info!("Created folder '{}' with id {}", folder.name, folder.id);
        Ok(folder.id)
    }

    #[instrument(skip(self, content), fields(parent_id = %parent_id, name = %name, size = content.len()))]
    async fn upload_file(&self, parent_id: &str, name: &str, content: Bytes) -> Result<String> {
        info!("Uploading '{}' ({} bytes) to folder {}", name, content.len(), parent_id);

        let attributes = serde_json::json!({
            "name": name,
            "parent": { "id": parent_id },
        })
        .to_string();

        let (content_type, body) = Self::multipart_body(&attributes, name, &content);

        let request = HttpRequest::new(HttpMethod::Post, format!("{}/files/content", UPLOAD_BASE))
            .header("Content-Type", content_type)
            .body(body)
            .timeout(Duration::from_secs(UPLOAD_TIMEOUT_SECS));

        let response = self.execute_with_retry(request, Some(name)).await?;
        let file_id = Self::parse_uploaded_file(&response)?;

        info!("Uploaded '{}' as file {}", name, file_id);
        Ok(file_id)
    }

    #[instrument(skip(self, content), fields(file_id = %file_id, name = %name, size = content.len()))]
    async fn upload_new_version(
        &self,
        file_id: &str,
        name: &str,
        content: Bytes,
    ) -> Result<String> {
        info!("Uploading new version of file {} ({} bytes)", file_id, content.len());

        let attributes = serde_json::json!({ "name": name }).to_string();
        let (content_type, body) = Self::multipart_body(&attributes, name, &content);

        let request = HttpRequest::new(
            HttpMethod::Post,
            format!("{}/files/{}/content", UPLOAD_BASE, urlencoding::encode(file_id)),
        )
        .header("Content-Type", content_type)
        .body(body)
        .timeout(Duration::from_secs(UPLOAD_TIMEOUT_SECS));

        let response = self.execute_with_retry(request, Some(name)).await?;
        let file_id = Self::parse_uploaded_file(&response)?;

        info!("Uploaded new version as file {}", file_id);
        Ok(file_id)
    }

    #[instrument(skip(self))]
    async fn current_identity(&self) -> Result<RemoteIdentity> {
        debug!("Fetching current user");

        let request = HttpRequest::new(HttpMethod::Get, format!("{}/users/me", API_BASE))
            .timeout(Duration::from_secs(API_TIMEOUT_SECS));

        let response = self.execute_with_retry(request, None).await?;

        let user: BoxUser = serde_json::from_slice(&response.body)
            .map_err(|e| BoxError::ParseError(format!("Failed to parse user response: {}", e)))?;

        info!("Connected to Box as {} ({})", user.name, user.login);
        Ok(RemoteIdentity {
            display_name: user.name,
            login: user.login,
        })
    }
}
