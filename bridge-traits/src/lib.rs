//! # Host Bridge Traits
//!
//! Capability traits that must be implemented by the hosting environment.
//!
//! ## Overview
//!
//! This crate defines the contract between the upload core and its
//! collaborators. Each trait represents a capability the core requires but
//! that is provided from outside: HTTP transport, the remote document
//! storage service, and local file access.
//!
//! ## Traits
//!
//! - [`HttpClient`](http::HttpClient) - Async HTTP operations with retry and TLS
//! - [`DocumentStorage`](storage::DocumentStorage) - Remote folder/file/version operations
//! - [`FileSystemAccess`](storage::FileSystemAccess) - Local media file reads
//!
//! ## Error Handling
//!
//! All bridge traits use the [`BridgeError`](error::BridgeError) type for
//! consistent error handling. Implementations should:
//!
//! - Convert service-specific errors to `BridgeError`
//! - Report occupied names as `BridgeError::NameConflict` so callers never
//!   have to pattern-match on message text
//! - Provide actionable error messages with context
//!
//! ## Thread Safety
//!
//! All bridge traits require `Send + Sync` bounds to support safe concurrent
//! usage across async tasks.

pub mod error;
pub mod http;
pub mod storage;

pub use error::BridgeError;

// Re-export commonly used types
pub use http::{HttpClient, HttpMethod, HttpRequest, HttpResponse, RetryPolicy};
pub use storage::{
    DocumentStorage, FileMetadata, FileSystemAccess, RemoteEntry, RemoteEntryKind, RemoteIdentity,
};
