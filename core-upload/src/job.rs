//! # Upload Job State Machine
//!
//! Manages the lifecycle of per-file upload jobs with validated state
//! transitions.
//!
//! ## State Machine
//!
//! ```text
//! Pending → Uploading → Completed
//!     ↓         ↓           ↑
//!     └──────→ Failed      │
//!     └──────→ Cancelled   │
//! ```
//!
//! A job is created the moment a file is handed to the orchestrator,
//! mutated only by the orchestration worker, and handed back to the caller
//! once finalized. Terminal states never transition.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use core_upload::{Certification, MediaFileRef, UploadJob, UploadStatus};
//!
//! let job = UploadJob::new(&certification, &media_file);
//! let job = job.begin()?;
//! let job = job.complete("9001".to_string())?;
//! assert_eq!(job.status, UploadStatus::Completed);
//! ```

use crate::{Result, UploadError};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

// ============================================================================
// ID Types
// ============================================================================

/// Unique identifier for an upload job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UploadJobId(Uuid);

impl UploadJobId {
    /// Create a new random upload job ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parse an upload job ID from a string
    ///
    /// # Errors
    ///
    /// Returns an error if the string is not a valid UUID
    pub fn from_string(s: &str) -> Result<Self> {
        Ok(Self(
            Uuid::parse_str(s).map_err(|e| UploadError::InvalidJobId(e.to_string()))?,
        ))
    }
}

impl Default for UploadJobId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for UploadJobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a batch upload run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UploadRunId(Uuid);

impl UploadRunId {
    /// Create a new random upload run ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for UploadRunId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for UploadRunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Status Types
// ============================================================================

/// The current status of an upload job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UploadStatus {
    /// Job has been created but not yet started
    Pending,
    /// File is being uploaded
    Uploading,
    /// File uploaded (or versioned) successfully
    Completed,
    /// Upload failed
    Failed,
    /// Upload was cancelled before this file began
    Cancelled,
}

impl UploadStatus {
    /// Check if this status represents a terminal state
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            UploadStatus::Completed | UploadStatus::Failed | UploadStatus::Cancelled
        )
    }

    /// Check if this status represents an active state
    pub fn is_active(&self) -> bool {
        matches!(self, UploadStatus::Pending | UploadStatus::Uploading)
    }

    /// Get the string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            UploadStatus::Pending => "pending",
            UploadStatus::Uploading => "uploading",
            UploadStatus::Completed => "completed",
            UploadStatus::Failed => "failed",
            UploadStatus::Cancelled => "cancelled",
        }
    }
}

impl FromStr for UploadStatus {
    type Err = UploadError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(UploadStatus::Pending),
            "uploading" => Ok(UploadStatus::Uploading),
            "completed" => Ok(UploadStatus::Completed),
            "failed" => Ok(UploadStatus::Failed),
            "cancelled" => Ok(UploadStatus::Cancelled),
            _ => Err(UploadError::InvalidStatus(s.to_string())),
        }
    }
}

impl std::fmt::Display for UploadStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// Input Types
// ============================================================================

/// Reference to one local media file belonging to a certification
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaFileRef {
    /// Path relative to the configured local media root
    pub relative_path: String,
    /// Human-readable description
    pub description: String,
}

impl MediaFileRef {
    /// Base name of the file, used as the remote file name
    pub fn file_name(&self) -> String {
        Path::new(&self.relative_path)
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.relative_path.clone())
    }
}

/// An order/certificate grouping with its ordered media files
///
/// Produced by the caller's query layer; read-only input to the
/// orchestrator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Certification {
    /// External order identifier
    pub order_id: String,
    /// Certificate number
    pub cert_no: String,
    /// Customer name
    pub customer_name: String,
    /// Purchase-order number, when the order carries one
    pub po_number: Option<String>,
    /// Ordered media files to upload
    pub media_files: Vec<MediaFileRef>,
}

impl Certification {
    /// Destination folder path for this certification's files:
    /// `"{order_id} (PO#{po_number})/{cert_no}"`, with the PO segment
    /// omitted when no purchase-order number is present.
    pub fn folder_path(&self) -> String {
        match self
            .po_number
            .as_deref()
            .map(str::trim)
            .filter(|po| !po.is_empty())
        {
            Some(po) => format!("{} (PO#{})/{}", self.order_id, po, self.cert_no),
            None => format!("{}/{}", self.order_id, self.cert_no),
        }
    }
}

// ============================================================================
// Upload Job Entity
// ============================================================================

/// A per-file upload job with state machine semantics
///
/// Jobs are created in `Pending` state and must transition through valid
/// states. Each job belongs to exactly one upload attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadJob {
    /// Unique identifier for this job
    pub id: UploadJobId,
    /// External order identifier of the owning certification
    pub order_id: String,
    /// Certificate number of the owning certification
    pub cert_no: String,
    /// The media file this job uploads
    pub media_file: MediaFileRef,
    /// Current status
    pub status: UploadStatus,
    /// Remote file id, set on success
    pub remote_file_id: Option<String>,
    /// Error message, set on failure
    pub error_message: Option<String>,
    /// Progress percentage (0-100)
    pub progress_percent: u8,
    /// When the job was created
    pub created_at: i64,
    /// When the upload started
    pub started_at: Option<i64>,
    /// When the job reached a terminal state
    pub completed_at: Option<i64>,
}

impl UploadJob {
    /// Create a new upload job in pending state
    pub fn new(certification: &Certification, media_file: &MediaFileRef) -> Self {
        Self {
            id: UploadJobId::new(),
            order_id: certification.order_id.clone(),
            cert_no: certification.cert_no.clone(),
            media_file: media_file.clone(),
            status: UploadStatus::Pending,
            remote_file_id: None,
            error_message: None,
            progress_percent: 0,
            created_at: current_timestamp(),
            started_at: None,
            completed_at: None,
        }
    }

    /// Base name of the file this job uploads
    pub fn file_name(&self) -> String {
        self.media_file.file_name()
    }

    /// Mark the job as uploading
    ///
    /// # Errors
    ///
    /// Returns an error if the job is not in `Pending` state
    pub fn begin(mut self) -> Result<Self> {
        self.validate_transition(UploadStatus::Uploading)?;
        self.status = UploadStatus::Uploading;
        self.started_at = Some(current_timestamp());
        Ok(self)
    }

    /// Mark the job as completed with the uploaded file's remote id
    ///
    /// # Errors
    ///
    /// Returns an error if the job is not in `Uploading` state
    pub fn complete(mut self, remote_file_id: String) -> Result<Self> {
        self.validate_transition(UploadStatus::Completed)?;
        self.status = UploadStatus::Completed;
        self.remote_file_id = Some(remote_file_id);
        self.progress_percent = 100;
        self.completed_at = Some(current_timestamp());
        Ok(self)
    }

    /// Mark the job as failed with an error message
    ///
    /// # Errors
    ///
    /// Returns an error if the job is already in a terminal state
    pub fn fail(mut self, error_message: String) -> Result<Self> {
        self.validate_transition(UploadStatus::Failed)?;
        self.status = UploadStatus::Failed;
        self.error_message = Some(error_message);
        self.completed_at = Some(current_timestamp());
        Ok(self)
    }

    /// Cancel the job
    ///
    /// # Errors
    ///
    /// Returns an error if the job is already in a terminal state
    pub fn cancel(mut self) -> Result<Self> {
        self.validate_transition(UploadStatus::Cancelled)?;
        self.status = UploadStatus::Cancelled;
        self.completed_at = Some(current_timestamp());
        Ok(self)
    }

    /// Validate a state transition
    fn validate_transition(&self, to: UploadStatus) -> Result<()> {
        let valid = match (self.status, to) {
            // From Pending
            (UploadStatus::Pending, UploadStatus::Uploading) => true,
            (UploadStatus::Pending, UploadStatus::Failed) => true,
            (UploadStatus::Pending, UploadStatus::Cancelled) => true,

            // From Uploading
            (UploadStatus::Uploading, UploadStatus::Completed) => true,
            (UploadStatus::Uploading, UploadStatus::Failed) => true,
            (UploadStatus::Uploading, UploadStatus::Cancelled) => true,

            // Terminal states cannot transition
            _ => false,
        };

        if !valid {
            return Err(UploadError::InvalidStateTransition {
                from: self.status.as_str().to_string(),
                to: to.as_str().to_string(),
                reason: format!(
                    "Cannot transition from {} to {}",
                    self.status.as_str(),
                    to.as_str()
                ),
            });
        }

        Ok(())
    }
}

// ============================================================================
// Aggregate Result
// ============================================================================

/// The finalized result of a batch upload run
///
/// Jobs appear in processing order: certification order, then each
/// certification's media-file order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadReport {
    /// Finalized jobs, one per processed media file
    pub jobs: Vec<UploadJob>,
    /// Number of jobs that completed successfully
    pub succeeded: u64,
    /// Number of jobs that failed
    pub failed: u64,
}

impl UploadReport {
    /// Build a report from finalized jobs, deriving the counters from job
    /// statuses
    pub fn from_jobs(jobs: Vec<UploadJob>) -> Self {
        let succeeded = jobs
            .iter()
            .filter(|j| j.status == UploadStatus::Completed)
            .count() as u64;
        let failed = jobs
            .iter()
            .filter(|j| j.status == UploadStatus::Failed)
            .count() as u64;

        Self {
            jobs,
            succeeded,
            failed,
        }
    }
}

/// Get current Unix timestamp
fn current_timestamp() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn certification(po_number: Option<&str>) -> Certification {
        Certification {
            order_id: "444337".to_string(),
            cert_no: "444337-1".to_string(),
            customer_name: "Acme Plating".to_string(),
            po_number: po_number.map(str::to_string),
            media_files: vec![media_file("orders/444337/cert.pdf")],
        }
    }

    fn media_file(relative_path: &str) -> MediaFileRef {
        MediaFileRef {
            relative_path: relative_path.to_string(),
            description: "Certification document".to_string(),
        }
    }

    #[test]
    fn test_upload_job_id_unique() {
        let id1 = UploadJobId::new();
        let id2 = UploadJobId::new();
        assert_ne!(id1, id2);
    }

    #[test]
    fn test_upload_job_id_from_string() {
        let uuid_str = "550e8400-e29b-41d4-a716-446655440000";
        let id = UploadJobId::from_string(uuid_str).unwrap();
        assert_eq!(id.to_string(), uuid_str);
    }

    #[test]
    fn test_upload_job_id_from_invalid_string() {
        assert!(UploadJobId::from_string("not-a-uuid").is_err());
    }

    #[test]
    fn test_upload_status_is_terminal() {
        assert!(!UploadStatus::Pending.is_terminal());
        assert!(!UploadStatus::Uploading.is_terminal());
        assert!(UploadStatus::Completed.is_terminal());
        assert!(UploadStatus::Failed.is_terminal());
        assert!(UploadStatus::Cancelled.is_terminal());
    }

    #[test]
    fn test_upload_status_is_active() {
        assert!(UploadStatus::Pending.is_active());
        assert!(UploadStatus::Uploading.is_active());
        assert!(!UploadStatus::Completed.is_active());
        assert!(!UploadStatus::Cancelled.is_active());
    }

    #[test]
    fn test_upload_status_from_str() {
        assert_eq!(
            UploadStatus::from_str("pending").unwrap(),
            UploadStatus::Pending
        );
        assert_eq!(
            UploadStatus::from_str("UPLOADING").unwrap(),
            UploadStatus::Uploading
        );
        assert!(UploadStatus::from_str("invalid").is_err());
    }

    #[test]
    fn test_media_file_name() {
        assert_eq!(media_file("orders/444337/cert.pdf").file_name(), "cert.pdf");
        assert_eq!(media_file("cert.pdf").file_name(), "cert.pdf");
    }

    #[test]
    fn test_folder_path_with_po() {
        let cert = certification(Some("TEST123"));
        assert_eq!(cert.folder_path(), "444337 (PO#TEST123)/444337-1");
    }

    #[test]
    fn test_folder_path_without_po() {
        let cert = certification(None);
        assert_eq!(cert.folder_path(), "444337/444337-1");
    }

    #[test]
    fn test_folder_path_blank_po_is_omitted() {
        let cert = certification(Some("  "));
        assert_eq!(cert.folder_path(), "444337/444337-1");
    }

    #[test]
    fn test_upload_job_new() {
        let cert = certification(Some("TEST123"));
        let job = UploadJob::new(&cert, &cert.media_files[0]);

        assert_eq!(job.status, UploadStatus::Pending);
        assert_eq!(job.cert_no, "444337-1");
        assert_eq!(job.progress_percent, 0);
        assert!(job.remote_file_id.is_none());
        assert!(job.started_at.is_none());
        assert!(job.completed_at.is_none());
    }

    #[test]
    fn test_upload_job_begin() {
        let cert = certification(None);
        let job = UploadJob::new(&cert, &cert.media_files[0]);
        let job = job.begin().unwrap();

        assert_eq!(job.status, UploadStatus::Uploading);
        assert!(job.started_at.is_some());
    }

    #[test]
    fn test_upload_job_complete() {
        let cert = certification(None);
        let job = UploadJob::new(&cert, &cert.media_files[0]);
        let job = job.begin().unwrap();
        let job = job.complete("9001".to_string()).unwrap();

        assert_eq!(job.status, UploadStatus::Completed);
        assert_eq!(job.remote_file_id, Some("9001".to_string()));
        assert_eq!(job.progress_percent, 100);
        assert!(job.completed_at.is_some());
    }

    #[test]
    fn test_upload_job_complete_requires_uploading() {
        let cert = certification(None);
        let job = UploadJob::new(&cert, &cert.media_files[0]);

        assert!(job.complete("9001".to_string()).is_err());
    }

    #[test]
    fn test_upload_job_fail_from_pending() {
        // Folder-resolution failures fail jobs that never started uploading
        let cert = certification(None);
        let job = UploadJob::new(&cert, &cert.media_files[0]);
        let job = job.fail("Failed to create folder: boom".to_string()).unwrap();

        assert_eq!(job.status, UploadStatus::Failed);
        assert_eq!(
            job.error_message,
            Some("Failed to create folder: boom".to_string())
        );
    }

    #[test]
    fn test_upload_job_fail_from_uploading() {
        let cert = certification(None);
        let job = UploadJob::new(&cert, &cert.media_files[0]);
        let job = job.begin().unwrap();
        let job = job.fail("Upload failed".to_string()).unwrap();

        assert_eq!(job.status, UploadStatus::Failed);
    }

    #[test]
    fn test_upload_job_cancel() {
        let cert = certification(None);
        let job = UploadJob::new(&cert, &cert.media_files[0]);
        let job = job.cancel().unwrap();

        assert_eq!(job.status, UploadStatus::Cancelled);
        assert!(job.completed_at.is_some());
    }

    #[test]
    fn test_terminal_states_cannot_transition() {
        let cert = certification(None);
        let job = UploadJob::new(&cert, &cert.media_files[0]);
        let completed = job.begin().unwrap().complete("9001".to_string()).unwrap();

        assert!(completed.clone().begin().is_err());
        assert!(completed.clone().fail("late".to_string()).is_err());
        assert!(completed.cancel().is_err());
    }

    #[test]
    fn test_no_job_reenters_pending() {
        let cert = certification(None);
        let job = UploadJob::new(&cert, &cert.media_files[0]);
        let job = job.begin().unwrap();

        // There is no transition back to Pending
        assert!(job.validate_transition(UploadStatus::Pending).is_err());
    }

    #[test]
    fn test_upload_report_counters() {
        let cert = certification(None);
        let completed = UploadJob::new(&cert, &cert.media_files[0])
            .begin()
            .unwrap()
            .complete("9001".to_string())
            .unwrap();
        let failed = UploadJob::new(&cert, &cert.media_files[0])
            .fail("boom".to_string())
            .unwrap();
        let cancelled = UploadJob::new(&cert, &cert.media_files[0]).cancel().unwrap();

        let report = UploadReport::from_jobs(vec![completed, failed, cancelled]);

        assert_eq!(report.jobs.len(), 3);
        assert_eq!(report.succeeded, 1);
        assert_eq!(report.failed, 1);
    }
}
