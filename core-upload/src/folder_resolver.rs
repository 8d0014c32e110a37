//! # Folder Resolver
//!
//! Maps human-readable folder paths to remote folder identifiers, creating
//! intermediate folders on demand and caching resolved ids to avoid
//! redundant round-trips.
//!
//! ## Caching
//!
//! The cache is a single map keyed by the composite `(parent_id, name)`
//! tuple. An entry is only ever written after the remote service confirmed
//! the folder (found in a listing, created, or discovered after losing a
//! creation race). The cache is owned by one orchestration run: access is
//! `&mut self`, so sharing a resolver across concurrent runs requires an
//! external wrapper by construction.
//!
//! ## Race recovery
//!
//! Folder creation is not exclusive: a concurrent run may create the same
//! folder between our listing and our create call. The remote service
//! signals this as a name conflict; the resolver recovers by re-listing the
//! parent and returning the discovered id instead of propagating the
//! conflict.

use crate::{Result, UploadError};
use bridge_traits::storage::DocumentStorage;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, instrument};

/// Resolves folder paths against the remote service with caching
pub struct FolderResolver {
    storage: Arc<dyn DocumentStorage>,
    /// Cache: (parent folder id, child name) -> child folder id
    cache: HashMap<(String, String), String>,
}

impl FolderResolver {
    /// Create a resolver with an empty cache
    pub fn new(storage: Arc<dyn DocumentStorage>) -> Self {
        Self {
            storage,
            cache: HashMap::new(),
        }
    }

    /// Get or create a folder under `parent_id`, returning its id
    ///
    /// Checks the cache first, then the parent's children, then creates the
    /// folder. A creation race lost to a concurrent creator is recovered by
    /// re-listing the parent.
    ///
    /// # Errors
    ///
    /// Returns `UploadError::Folder` when listing or creation fails for any
    /// reason other than a resolvable name conflict.
    #[instrument(skip(self), fields(parent_id = %parent_id, name = %name))]
    pub async fn get_or_create_folder(&mut self, parent_id: &str, name: &str) -> Result<String> {
        let key = (parent_id.to_string(), name.to_string());
        if let Some(folder_id) = self.cache.get(&key) {
            debug!("Cache hit for '{}' under {}", name, parent_id);
            return Ok(folder_id.clone());
        }

        let folder_id = match self.find_folder(parent_id, name).await? {
            Some(folder_id) => folder_id,
            None => match self.storage.create_folder(parent_id, name).await {
                Ok(folder_id) => {
                    debug!("Created folder '{}' under {}", name, parent_id);
                    folder_id
                }
                Err(e) if e.is_name_conflict() => {
                    // A concurrent creator won the race; the folder exists now
                    debug!(
                        "Folder '{}' appeared concurrently under {}, re-listing",
                        name, parent_id
                    );
                    self.find_folder(parent_id, name).await?.ok_or_else(|| {
                        UploadError::Folder {
                            path: name.to_string(),
                            message: format!(
                                "folder '{}' reported as existing in {} but was not found",
                                name, parent_id
                            ),
                        }
                    })?
                }
                Err(e) => {
                    return Err(UploadError::Folder {
                        path: name.to_string(),
                        message: format!(
                            "Failed to create folder '{}' in {}: {}",
                            name, parent_id, e
                        ),
                    })
                }
            },
        };

        self.cache.insert(key, folder_id.clone());
        Ok(folder_id)
    }

    /// Ensure a nested folder path exists, creating folders as needed
    ///
    /// Splits `path` on `/`, trims blank segments, and folds
    /// [`get_or_create_folder`](Self::get_or_create_folder) left to right
    /// starting from `root_id`. An empty path returns `root_id` unchanged.
    #[instrument(skip(self), fields(root_id = %root_id, path = %path))]
    pub async fn ensure_folder_path(&mut self, root_id: &str, path: &str) -> Result<String> {
        let mut current_id = root_id.to_string();

        for part in path.split('/').map(str::trim).filter(|p| !p.is_empty()) {
            current_id = self.get_or_create_folder(&current_id, part).await?;
        }

        Ok(current_id)
    }

    /// Discard all cached entries; subsequent resolutions re-query the
    /// remote service
    pub fn clear_cache(&mut self) {
        self.cache.clear();
    }

    /// Find a folder by exact name in a parent, returning its id if present
    async fn find_folder(&self, parent_id: &str, name: &str) -> Result<Option<String>> {
        let children =
            self.storage
                .list_children(parent_id)
                .await
                .map_err(|e| UploadError::Folder {
                    path: name.to_string(),
                    message: format!("Failed to list folder {}: {}", parent_id, e),
                })?;

        Ok(children
            .into_iter()
            .find(|entry| entry.is_folder_named(name))
            .map(|entry| entry.id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bridge_traits::error::{BridgeError, Result as BridgeResult};
    use bridge_traits::storage::{RemoteEntry, RemoteEntryKind, RemoteIdentity};
    use bytes::Bytes;
    use mockall::mock;
    use mockall::predicate::eq;
    use std::sync::Mutex;

    mock! {
        Storage {}

        #[async_trait]
        impl DocumentStorage for Storage {
            async fn list_children(&self, folder_id: &str) -> BridgeResult<Vec<RemoteEntry>>;
            async fn create_folder(&self, parent_id: &str, name: &str) -> BridgeResult<String>;
            async fn upload_file(&self, parent_id: &str, name: &str, content: Bytes) -> BridgeResult<String>;
            async fn upload_new_version(&self, file_id: &str, name: &str, content: Bytes) -> BridgeResult<String>;
            async fn current_identity(&self) -> BridgeResult<RemoteIdentity>;
        }
    }

    fn folder_entry(id: &str, name: &str) -> RemoteEntry {
        RemoteEntry {
            id: id.to_string(),
            name: name.to_string(),
            kind: RemoteEntryKind::Folder,
            modified_at: None,
        }
    }

    #[tokio::test]
    async fn test_cache_hit_skips_remote_calls() {
        let mut storage = MockStorage::new();
        storage
            .expect_list_children()
            .with(eq("root"))
            .times(1)
            .returning(|_| Ok(vec![folder_entry("100", "444337")]));
        storage.expect_create_folder().times(0);

        let mut resolver = FolderResolver::new(Arc::new(storage));

        let first = resolver.get_or_create_folder("root", "444337").await.unwrap();
        // Second resolution must come from the cache: list_children is
        // limited to one call above.
        let second = resolver.get_or_create_folder("root", "444337").await.unwrap();

        assert_eq!(first, "100");
        assert_eq!(second, "100");
    }

    #[tokio::test]
    async fn test_finds_existing_folder_without_creating() {
        let mut storage = MockStorage::new();
        storage.expect_list_children().times(1).returning(|_| {
            Ok(vec![
                folder_entry("99", "other"),
                folder_entry("100", "444337"),
            ])
        });
        storage.expect_create_folder().times(0);

        let mut resolver = FolderResolver::new(Arc::new(storage));
        let folder_id = resolver.get_or_create_folder("root", "444337").await.unwrap();

        assert_eq!(folder_id, "100");
    }

    #[tokio::test]
    async fn test_creates_missing_folder_exactly_once() {
        let mut storage = MockStorage::new();
        storage
            .expect_list_children()
            .times(1)
            .returning(|_| Ok(vec![]));
        storage
            .expect_create_folder()
            .with(eq("root"), eq("444337"))
            .times(1)
            .returning(|_, _| Ok("100".to_string()));

        let mut resolver = FolderResolver::new(Arc::new(storage));

        let first = resolver.get_or_create_folder("root", "444337").await.unwrap();
        let second = resolver.get_or_create_folder("root", "444337").await.unwrap();

        assert_eq!(first, "100");
        assert_eq!(second, "100");
    }

    #[tokio::test]
    async fn test_name_match_requires_folder_kind() {
        let mut storage = MockStorage::new();
        storage.expect_list_children().times(1).returning(|_| {
            Ok(vec![RemoteEntry {
                id: "200".to_string(),
                name: "444337".to_string(),
                kind: RemoteEntryKind::File,
                modified_at: None,
            }])
        });
        storage
            .expect_create_folder()
            .times(1)
            .returning(|_, _| Ok("100".to_string()));

        let mut resolver = FolderResolver::new(Arc::new(storage));
        let folder_id = resolver.get_or_create_folder("root", "444337").await.unwrap();

        // The file of the same name must not satisfy the lookup
        assert_eq!(folder_id, "100");
    }

    #[tokio::test]
    async fn test_race_recovery_returns_discovered_id() {
        let mut storage = MockStorage::new();
        let listings = Mutex::new(0u32);

        storage.expect_list_children().times(2).returning(move |_| {
            let mut listings = listings.lock().unwrap();
            *listings += 1;
            if *listings == 1 {
                // Folder absent when we first look
                Ok(vec![])
            } else {
                // A concurrent creator made it in the meantime
                Ok(vec![folder_entry("100", "444337")])
            }
        });
        storage.expect_create_folder().times(1).returning(|_, name| {
            Err(BridgeError::NameConflict {
                name: name.to_string(),
            })
        });

        let mut resolver = FolderResolver::new(Arc::new(storage));
        let folder_id = resolver.get_or_create_folder("root", "444337").await.unwrap();

        assert_eq!(folder_id, "100");
    }

    #[tokio::test]
    async fn test_race_recovery_caches_discovered_id() {
        let mut storage = MockStorage::new();
        let listings = Mutex::new(0u32);

        storage.expect_list_children().times(2).returning(move |_| {
            let mut listings = listings.lock().unwrap();
            *listings += 1;
            if *listings == 1 {
                Ok(vec![])
            } else {
                Ok(vec![folder_entry("100", "444337")])
            }
        });
        storage
            .expect_create_folder()
            .times(1)
            .returning(|_, name| {
                Err(BridgeError::NameConflict {
                    name: name.to_string(),
                })
            });

        let mut resolver = FolderResolver::new(Arc::new(storage));
        resolver.get_or_create_folder("root", "444337").await.unwrap();

        // Must be served from the cache; the mocks above admit no further calls
        let cached = resolver.get_or_create_folder("root", "444337").await.unwrap();
        assert_eq!(cached, "100");
    }

    #[tokio::test]
    async fn test_race_recovery_with_inconsistent_remote_state_fails() {
        let mut storage = MockStorage::new();
        storage
            .expect_list_children()
            .times(2)
            .returning(|_| Ok(vec![]));
        storage
            .expect_create_folder()
            .times(1)
            .returning(|_, name| {
                Err(BridgeError::NameConflict {
                    name: name.to_string(),
                })
            });

        let mut resolver = FolderResolver::new(Arc::new(storage));
        let result = resolver.get_or_create_folder("root", "444337").await;

        assert!(matches!(result, Err(UploadError::Folder { .. })));
    }

    #[tokio::test]
    async fn test_other_creation_failures_propagate_as_folder_error() {
        let mut storage = MockStorage::new();
        storage
            .expect_list_children()
            .times(1)
            .returning(|_| Ok(vec![]));
        storage.expect_create_folder().times(1).returning(|_, _| {
            Err(BridgeError::OperationFailed(
                "permission denied".to_string(),
            ))
        });

        let mut resolver = FolderResolver::new(Arc::new(storage));
        let result = resolver.get_or_create_folder("root", "444337").await;

        match result {
            Err(UploadError::Folder { message, .. }) => {
                assert!(message.contains("permission denied"));
            }
            other => panic!("Expected folder error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_listing_failure_propagates_as_folder_error() {
        let mut storage = MockStorage::new();
        storage
            .expect_list_children()
            .times(1)
            .returning(|_| Err(BridgeError::OperationFailed("network down".to_string())));

        let mut resolver = FolderResolver::new(Arc::new(storage));
        let result = resolver.get_or_create_folder("root", "444337").await;

        assert!(matches!(result, Err(UploadError::Folder { .. })));
    }

    #[tokio::test]
    async fn test_ensure_folder_path_folds_segments() {
        let mut storage = MockStorage::new();
        storage
            .expect_list_children()
            .times(2)
            .returning(|_| Ok(vec![]));
        storage
            .expect_create_folder()
            .with(eq("root"), eq("444337 (PO#TEST123)"))
            .times(1)
            .returning(|_, _| Ok("100".to_string()));
        storage
            .expect_create_folder()
            .with(eq("100"), eq("444337-1"))
            .times(1)
            .returning(|_, _| Ok("101".to_string()));

        let mut resolver = FolderResolver::new(Arc::new(storage));
        let folder_id = resolver
            .ensure_folder_path("root", "444337 (PO#TEST123)/444337-1")
            .await
            .unwrap();

        assert_eq!(folder_id, "101");
    }

    #[tokio::test]
    async fn test_ensure_folder_path_matches_chained_resolution() {
        // ensure_folder_path must resolve to the same id as two chained
        // get_or_create_folder calls over the same remote state
        fn storage_with_path() -> MockStorage {
            let mut storage = MockStorage::new();
            storage.expect_list_children().returning(|parent| {
                Ok(match parent {
                    "root" => vec![folder_entry("100", "444337 (PO#TEST123)")],
                    "100" => vec![folder_entry("101", "444337-1")],
                    _ => vec![],
                })
            });
            storage.expect_create_folder().times(0);
            storage
        }

        let mut path_resolver = FolderResolver::new(Arc::new(storage_with_path()));
        let via_path = path_resolver
            .ensure_folder_path("root", "444337 (PO#TEST123)/444337-1")
            .await
            .unwrap();

        let mut chained_resolver = FolderResolver::new(Arc::new(storage_with_path()));
        let order_id = chained_resolver
            .get_or_create_folder("root", "444337 (PO#TEST123)")
            .await
            .unwrap();
        let via_chain = chained_resolver
            .get_or_create_folder(&order_id, "444337-1")
            .await
            .unwrap();

        assert_eq!(via_path, via_chain);
    }

    #[tokio::test]
    async fn test_ensure_folder_path_skips_blank_segments() {
        let mut storage = MockStorage::new();
        storage.expect_list_children().returning(|_| Ok(vec![]));
        storage
            .expect_create_folder()
            .returning(|_, name| Ok(format!("id-{}", name)));

        let mut resolver = FolderResolver::new(Arc::new(storage));
        let messy = resolver.ensure_folder_path("root", "a//b/ /c").await.unwrap();

        let mut clean_resolver = FolderResolver::new(Arc::new({
            let mut storage = MockStorage::new();
            storage.expect_list_children().returning(|_| Ok(vec![]));
            storage
                .expect_create_folder()
                .returning(|_, name| Ok(format!("id-{}", name)));
            storage
        }));
        let clean = clean_resolver.ensure_folder_path("root", "a/b/c").await.unwrap();

        assert_eq!(messy, clean);
        assert_eq!(messy, "id-c");
    }

    #[tokio::test]
    async fn test_ensure_folder_path_empty_returns_root() {
        let mut storage = MockStorage::new();
        storage.expect_list_children().times(0);
        storage.expect_create_folder().times(0);

        let mut resolver = FolderResolver::new(Arc::new(storage));

        assert_eq!(resolver.ensure_folder_path("root", "").await.unwrap(), "root");
        assert_eq!(
            resolver.ensure_folder_path("root", " / / ").await.unwrap(),
            "root"
        );
    }

    #[tokio::test]
    async fn test_clear_cache_forces_requery() {
        let mut storage = MockStorage::new();
        storage
            .expect_list_children()
            .times(2)
            .returning(|_| Ok(vec![folder_entry("100", "444337")]));

        let mut resolver = FolderResolver::new(Arc::new(storage));

        resolver.get_or_create_folder("root", "444337").await.unwrap();
        resolver.clear_cache();
        let folder_id = resolver.get_or_create_folder("root", "444337").await.unwrap();

        assert_eq!(folder_id, "100");
    }
}
