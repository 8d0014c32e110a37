//! # File Uploader
//!
//! Uploads one local file into one remote folder, transparently switching
//! to a new-version upload when a file of that name already exists.
//!
//! The conflict path re-lists the target folder to locate the existing
//! file's id; the remote service's conflict signal does not carry it. A
//! conflict with no matching file in the listing means the remote state
//! changed under us and is surfaced as an upload error.

use crate::{Result, UploadError};
use bridge_traits::storage::{DocumentStorage, FileSystemAccess};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// Uploads local media files to remote folders
pub struct FileUploader {
    storage: Arc<dyn DocumentStorage>,
    file_system: Arc<dyn FileSystemAccess>,
}

impl FileUploader {
    pub fn new(storage: Arc<dyn DocumentStorage>, file_system: Arc<dyn FileSystemAccess>) -> Self {
        Self {
            storage,
            file_system,
        }
    }

    /// Upload a local file into a remote folder, returning the remote file id
    ///
    /// The file is uploaded under `file_name` when given, otherwise under
    /// the local file's base name. When a file of that name already exists
    /// in the folder, a new version is uploaded against it instead.
    ///
    /// # Errors
    ///
    /// - `UploadError::FileNotFound` when the local file is absent
    /// - `UploadError::FileRead` when the local content cannot be read
    ///   (reported before any bytes are transmitted)
    /// - `UploadError::Upload` when the remote upload or the
    ///   conflict-recovery lookup fails
    #[instrument(skip(self), fields(path = %local_path.display(), folder_id = %folder_id))]
    pub async fn upload_file(
        &self,
        local_path: &Path,
        folder_id: &str,
        file_name: Option<&str>,
    ) -> Result<String> {
        let exists = self
            .file_system
            .exists(local_path)
            .await
            .map_err(|e| UploadError::FileRead {
                path: local_path.display().to_string(),
                message: e.to_string(),
            })?;

        if !exists {
            return Err(UploadError::FileNotFound {
                path: local_path.display().to_string(),
            });
        }

        let upload_name = match file_name {
            Some(name) => name.to_string(),
            None => local_path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| local_path.display().to_string()),
        };

        let content =
            self.file_system
                .read_file(local_path)
                .await
                .map_err(|e| UploadError::FileRead {
                    path: local_path.display().to_string(),
                    message: e.to_string(),
                })?;

        debug!(
            "Uploading '{}' ({} bytes) to folder {}",
            upload_name,
            content.len(),
            folder_id
        );

        match self
            .storage
            .upload_file(folder_id, &upload_name, content.clone())
            .await
        {
            Ok(file_id) => {
                info!("Uploaded '{}' as file {}", upload_name, file_id);
                Ok(file_id)
            }
            Err(e) if e.is_name_conflict() => {
                debug!(
                    "'{}' already exists in folder {}, uploading new version",
                    upload_name, folder_id
                );

                let existing_id = self
                    .find_file(folder_id, &upload_name)
                    .await?
                    .ok_or_else(|| UploadError::Upload {
                        name: upload_name.clone(),
                        message: format!(
                            "remote reported '{}' as existing in folder {} but it was not found",
                            upload_name, folder_id
                        ),
                    })?;

                let file_id = self
                    .storage
                    .upload_new_version(&existing_id, &upload_name, content)
                    .await
                    .map_err(|e| UploadError::Upload {
                        name: upload_name.clone(),
                        message: e.to_string(),
                    })?;

                info!("Uploaded new version of '{}' as file {}", upload_name, file_id);
                Ok(file_id)
            }
            Err(e) => Err(UploadError::Upload {
                name: upload_name,
                message: e.to_string(),
            }),
        }
    }

    /// Find a file by exact name in a folder, returning its id if present
    async fn find_file(&self, folder_id: &str, name: &str) -> Result<Option<String>> {
        let children =
            self.storage
                .list_children(folder_id)
                .await
                .map_err(|e| UploadError::Upload {
                    name: name.to_string(),
                    message: format!("Failed to list folder {}: {}", folder_id, e),
                })?;

        Ok(children
            .into_iter()
            .find(|entry| entry.is_file_named(name))
            .map(|entry| entry.id))
    }
}
