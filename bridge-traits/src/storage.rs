//! Remote Document Storage and File System Abstractions
//!
//! Provides the capability traits the upload core consumes: the remote
//! document-storage service (folders, files, versions) and local file access
//! for reading media content.

use async_trait::async_trait;
use bytes::Bytes;
use std::path::Path;

use crate::error::Result;

/// Kind of an entry inside a remote folder
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteEntryKind {
    Folder,
    File,
}

/// One child entry of a remote folder
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteEntry {
    /// Opaque identifier assigned by the remote service
    pub id: String,
    /// Entry name, unique within its parent folder
    pub name: String,
    /// Whether the entry is a folder or a file
    pub kind: RemoteEntryKind,
    /// Last modification time (Unix timestamp), when the service reports one
    pub modified_at: Option<i64>,
}

impl RemoteEntry {
    /// Whether this entry is a folder with exactly the given name
    pub fn is_folder_named(&self, name: &str) -> bool {
        self.kind == RemoteEntryKind::Folder && self.name == name
    }

    /// Whether this entry is a file with exactly the given name
    pub fn is_file_named(&self, name: &str) -> bool {
        self.kind == RemoteEntryKind::File && self.name == name
    }
}

/// The identity the remote service associates with the current session.
///
/// Used only for connectivity verification, never on the upload path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteIdentity {
    pub display_name: String,
    pub login: String,
}

/// Remote document-storage capability set
///
/// Abstracts the cloud document service the core uploads into. The core
/// depends only on this contract; transport, authentication protocol, and
/// API shape live behind the implementing connector.
///
/// # Conflict signalling
///
/// `create_folder` and `upload_file` must report a taken name as
/// [`BridgeError::NameConflict`](crate::error::BridgeError::NameConflict)
/// so callers can distinguish a recoverable name collision from a genuine
/// failure without inspecting message text.
///
/// # Example
///
/// ```ignore
/// use bridge_traits::storage::DocumentStorage;
///
/// async fn folder_exists(storage: &dyn DocumentStorage, parent: &str, name: &str) -> Result<bool> {
///     let children = storage.list_children(parent).await?;
///     Ok(children.iter().any(|e| e.is_folder_named(name)))
/// }
/// ```
#[async_trait]
pub trait DocumentStorage: Send + Sync {
    /// List the direct children of a remote folder
    async fn list_children(&self, folder_id: &str) -> Result<Vec<RemoteEntry>>;

    /// Create a folder under `parent_id`, returning the new folder's id
    ///
    /// # Errors
    ///
    /// Returns `BridgeError::NameConflict` when a sibling of that name
    /// already exists.
    async fn create_folder(&self, parent_id: &str, name: &str) -> Result<String>;

    /// Upload a new file under `parent_id`, returning the new file's id
    ///
    /// # Errors
    ///
    /// Returns `BridgeError::NameConflict` when a file of that name already
    /// exists in the folder.
    async fn upload_file(&self, parent_id: &str, name: &str, content: Bytes) -> Result<String>;

    /// Upload a new version of an existing file, returning the file's id
    async fn upload_new_version(&self, file_id: &str, name: &str, content: Bytes)
        -> Result<String>;

    /// The identity behind the current session, for connectivity checks
    async fn current_identity(&self) -> Result<RemoteIdentity>;
}

/// Local file metadata
#[derive(Debug, Clone)]
pub struct FileMetadata {
    pub size: u64,
    pub modified_at: Option<i64>,
    pub is_directory: bool,
}

/// Local file system access trait
///
/// Abstracts the reads the upload core performs against the local media
/// store, so tests can substitute in-memory content and hosts can route
/// through sandboxed storage.
#[async_trait]
pub trait FileSystemAccess: Send + Sync {
    /// Check if a file or directory exists
    async fn exists(&self, path: &Path) -> Result<bool>;

    /// Get metadata for a file or directory
    async fn metadata(&self, path: &Path) -> Result<FileMetadata>;

    /// Read entire file contents into memory
    async fn read_file(&self, path: &Path) -> Result<Bytes>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remote_entry_matching() {
        let folder = RemoteEntry {
            id: "100".to_string(),
            name: "444337-1".to_string(),
            kind: RemoteEntryKind::Folder,
            modified_at: None,
        };

        assert!(folder.is_folder_named("444337-1"));
        assert!(!folder.is_folder_named("444337-2"));
        assert!(!folder.is_file_named("444337-1"));
    }

    #[test]
    fn test_file_metadata() {
        let metadata = FileMetadata {
            size: 1024,
            modified_at: Some(1234567890),
            is_directory: false,
        };

        assert_eq!(metadata.size, 1024);
        assert!(!metadata.is_directory);
    }
}
