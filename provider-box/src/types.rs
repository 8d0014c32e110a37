//! Box API response types
//!
//! Data structures for deserializing Box API v2 responses.

use serde::{Deserialize, Serialize};

/// An entry in a folder's item collection
///
/// See: https://developer.box.com/reference/get-folders-id-items/
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoxItem {
    /// Item type ("folder", "file", or "web_link")
    #[serde(rename = "type")]
    pub item_type: String,

    /// Item ID
    pub id: String,

    /// Item name, unique within the parent folder
    pub name: String,

    /// Modification time (RFC 3339), present when requested via `fields`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modified_at: Option<String>,
}

/// Box API folder items response (offset pagination)
///
/// See: https://developer.box.com/reference/get-folders-id-items/
#[derive(Debug, Deserialize)]
pub struct ItemCollection {
    /// Total number of items in the folder
    pub total_count: u64,

    /// Items in this page
    pub entries: Vec<BoxItem>,

    /// Offset of this page
    #[serde(default)]
    pub offset: u64,

    /// Page size limit
    #[serde(default)]
    pub limit: u64,
}

/// Box API folder resource (subset)
///
/// See: https://developer.box.com/reference/post-folders/
#[derive(Debug, Deserialize)]
pub struct BoxFolder {
    /// Folder ID
    pub id: String,

    /// Folder name
    pub name: String,
}

/// Box API upload response envelope
///
/// Uploads return a collection with a single file entry.
///
/// See: https://developer.box.com/reference/post-files-content/
#[derive(Debug, Deserialize)]
pub struct UploadedFiles {
    /// Uploaded file entries
    pub entries: Vec<BoxItem>,
}

/// Box API user resource (subset)
///
/// See: https://developer.box.com/reference/get-users-me/
#[derive(Debug, Deserialize)]
pub struct BoxUser {
    /// User ID
    pub id: String,

    /// Display name
    pub name: String,

    /// Login (email address)
    pub login: String,
}

/// Box API error body
///
/// The `code` field is the machine-readable error classification; a
/// conflicting name is reported as `item_name_in_use`.
///
/// See: https://developer.box.com/reference/resources/client-error/
#[derive(Debug, Deserialize)]
pub struct BoxApiError {
    /// HTTP status the API reports
    #[serde(default)]
    pub status: u16,

    /// Machine-readable error code
    #[serde(default)]
    pub code: String,

    /// Human-readable message
    #[serde(default)]
    pub message: String,
}

/// The `code` value Box uses to signal an occupied name
pub const CODE_ITEM_NAME_IN_USE: &str = "item_name_in_use";
