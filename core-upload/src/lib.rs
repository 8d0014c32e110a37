//! # Certification Media Upload Module
//!
//! Orchestrates uploading certification media files into a remote
//! document-storage folder hierarchy.
//!
//! ## Overview
//!
//! This module manages the lifecycle of batch upload runs, including:
//! - Resolving per-certification destination folders via `DocumentStorage`
//! - Caching folder resolutions within a run
//! - Uploading files with transparent new-version fallback on name conflicts
//! - Tracking per-file jobs with validated state transitions
//! - Reporting progress over the event bus and supporting cooperative
//!   cancellation
//!
//! ## Components
//!
//! - **Upload Job State Machine** (`job`): Per-file job lifecycle with validated state transitions
//! - **Folder Resolver** (`folder_resolver`): Path-to-folder-id resolution with caching and race recovery
//! - **File Uploader** (`uploader`): Single-file upload with version fallback
//! - **Upload Coordinator** (`coordinator`): Orchestrates batch runs on a background worker

pub mod coordinator;
pub mod error;
pub mod folder_resolver;
pub mod job;
pub mod uploader;

pub use coordinator::{UploadConfig, UploadCoordinator};
pub use error::{Result, UploadError};
pub use folder_resolver::FolderResolver;
pub use job::{
    Certification, MediaFileRef, UploadJob, UploadJobId, UploadReport, UploadRunId, UploadStatus,
};
pub use uploader::FileUploader;
