//! # Upload Coordinator
//!
//! Orchestrates batch uploads of certification media files.
//!
//! ## Overview
//!
//! The `UploadCoordinator` is the central orchestrator for upload runs. It
//! coordinates between the other modules to:
//! - Verify the remote session via `DocumentStorage::current_identity`
//! - Resolve each certification's destination folder via `FolderResolver`
//! - Upload each media file via `FileUploader`
//! - Track per-file jobs through their state machine
//! - Emit progress and completion events via `EventBus`
//! - Honor cooperative cancellation between files
//!
//! ## Workflow
//!
//! 1. Verify the remote connection (a failure here is fatal for the run and
//!    produces no jobs)
//! 2. Spawn the sequential worker task; the caller's task is never blocked
//! 3. Per certification: build the destination path
//!    (`"{order} (PO#{po})/{cert}"`), resolve it once, then upload the
//!    certification's files strictly in order
//! 4. A folder-resolution failure fails every job of that certification and
//!    the run proceeds with the next one
//! 5. Emit exactly one final summary event after the last per-file event
//!
//! ## Cancellation
//!
//! Cancellation is polled between files, never mid-upload: an in-flight
//! file finishes naturally, and files that have not started are omitted
//! from the report.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use core_upload::{UploadConfig, UploadCoordinator};
//! use std::sync::Arc;
//!
//! # async fn example(coordinator: Arc<UploadCoordinator>) -> Result<(), Box<dyn std::error::Error>> {
//! let config = UploadConfig {
//!     root_folder_id: "4200".to_string(),
//!     media_root: "/srv/media".into(),
//! };
//!
//! let run_id = coordinator.start_batch(config, certifications).await?;
//!
//! // Cancel if needed
//! coordinator.cancel().await;
//! # Ok(())
//! # }
//! ```

use crate::folder_resolver::FolderResolver;
use crate::job::{Certification, UploadJob, UploadReport, UploadRunId};
use crate::uploader::FileUploader;
use crate::{Result, UploadError};
use bridge_traits::storage::{DocumentStorage, FileSystemAccess, RemoteIdentity};
use core_runtime::events::{ConnectionEvent, CoreEvent, EventBus, UploadEvent};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

/// Upload run configuration
///
/// All configuration is explicit: the coordinator holds no ambient state
/// about destinations or local paths.
#[derive(Debug, Clone)]
pub struct UploadConfig {
    /// Remote folder id under which order folders are created
    pub root_folder_id: String,

    /// Local directory media file paths are relative to
    pub media_root: PathBuf,
}

/// Active upload run tracking
#[derive(Clone)]
struct ActiveRun {
    run_id: UploadRunId,
    cancellation_token: CancellationToken,
}

/// Coordinator for batch upload runs
pub struct UploadCoordinator {
    /// Remote document storage
    storage: Arc<dyn DocumentStorage>,

    /// Local file access
    file_system: Arc<dyn FileSystemAccess>,

    /// Event bus for progress and completion events
    event_bus: Arc<EventBus>,

    /// The single run allowed to be active at a time
    active_run: Arc<Mutex<Option<ActiveRun>>>,

    /// Finished reports by run id
    reports: Arc<Mutex<HashMap<UploadRunId, UploadReport>>>,
}

impl UploadCoordinator {
    /// Create a new upload coordinator
    ///
    /// # Arguments
    ///
    /// * `storage` - Remote document storage implementation
    /// * `file_system` - Local file access implementation
    /// * `event_bus` - Event bus for progress events
    pub fn new(
        storage: Arc<dyn DocumentStorage>,
        file_system: Arc<dyn FileSystemAccess>,
        event_bus: Arc<EventBus>,
    ) -> Self {
        Self {
            storage,
            file_system,
            event_bus,
            active_run: Arc::new(Mutex::new(None)),
            reports: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Verify the remote session by asking the service who we are
    ///
    /// Emits a connection event either way.
    ///
    /// # Errors
    ///
    /// Returns `UploadError::Connection` when the remote service cannot be
    /// reached or rejects the session.
    pub async fn verify_connection(&self) -> Result<RemoteIdentity> {
        match self.storage.current_identity().await {
            Ok(identity) => {
                info!(
                    "Verified remote connection as {} ({})",
                    identity.display_name, identity.login
                );
                self.event_bus
                    .emit(CoreEvent::Connection(ConnectionEvent::Verified {
                        display_name: identity.display_name.clone(),
                        login: identity.login.clone(),
                    }))
                    .ok();
                Ok(identity)
            }
            Err(e) => {
                error!("Remote connection verification failed: {}", e);
                self.event_bus
                    .emit(CoreEvent::Connection(ConnectionEvent::Failed {
                        message: e.to_string(),
                    }))
                    .ok();
                Err(UploadError::Connection(e.to_string()))
            }
        }
    }

    /// Start a batch upload run
    ///
    /// Verifies the remote connection, spawns the sequential worker, and
    /// returns its run id immediately. The worker processes certifications
    /// and their files strictly in order; results arrive as events and as
    /// the final [`UploadReport`] retrievable via [`report`](Self::report).
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Another run is already in progress
    /// - The remote connection cannot be verified (no jobs are produced)
    #[instrument(skip(self, config, certifications), fields(root_folder_id = %config.root_folder_id))]
    pub async fn start_batch(
        &self,
        config: UploadConfig,
        certifications: Vec<Certification>,
    ) -> Result<UploadRunId> {
        {
            let active = self.active_run.lock().await;
            if active.is_some() {
                return Err(UploadError::RunInProgress);
            }
        }

        // A connection failure is surfaced once, before any job exists
        self.verify_connection().await?;

        let run_id = UploadRunId::new();
        let cancellation_token = CancellationToken::new();

        {
            let mut active = self.active_run.lock().await;
            if active.is_some() {
                return Err(UploadError::RunInProgress);
            }
            *active = Some(ActiveRun {
                run_id,
                cancellation_token: cancellation_token.clone(),
            });
        }

        let certification_count = certifications.len() as u64;
        let file_count: u64 = certifications
            .iter()
            .map(|c| c.media_files.len() as u64)
            .sum();

        self.event_bus
            .emit(CoreEvent::Upload(UploadEvent::Started {
                run_id: run_id.to_string(),
                certification_count,
                file_count,
            }))
            .ok();

        let coordinator = self.clone_for_task();
        tokio::spawn(async move {
            coordinator
                .run_batch_task(run_id, config, certifications, cancellation_token)
                .await;
        });

        info!(
            "Started upload run {} ({} certifications, {} files)",
            run_id, certification_count, file_count
        );

        Ok(run_id)
    }

    /// Request cancellation of the active run
    ///
    /// Cancellation is cooperative: the worker polls between files, so the
    /// file in flight finishes naturally and no further files begin.
    /// Returns whether a run was active.
    pub async fn cancel(&self) -> bool {
        let active = self.active_run.lock().await;
        match active.as_ref() {
            Some(run) => {
                info!("Cancellation requested for upload run {}", run.run_id);
                run.cancellation_token.cancel();
                true
            }
            None => false,
        }
    }

    /// Whether a run is currently active
    pub async fn is_running(&self) -> bool {
        self.active_run.lock().await.is_some()
    }

    /// The finished report for a run, once its worker has completed
    pub async fn report(&self, run_id: UploadRunId) -> Option<UploadReport> {
        self.reports.lock().await.get(&run_id).cloned()
    }

    /// Clone for the background task
    fn clone_for_task(&self) -> Self {
        Self {
            storage: Arc::clone(&self.storage),
            file_system: Arc::clone(&self.file_system),
            event_bus: Arc::clone(&self.event_bus),
            active_run: Arc::clone(&self.active_run),
            reports: Arc::clone(&self.reports),
        }
    }

    /// Run the batch worker, record its report, and emit the final summary
    ///
    /// The summary is emitted exactly once, after the last per-file event
    /// and after the report became retrievable.
    #[instrument(skip(self, config, certifications, cancellation_token), fields(run_id = %run_id))]
    async fn run_batch_task(
        &self,
        run_id: UploadRunId,
        config: UploadConfig,
        certifications: Vec<Certification>,
        cancellation_token: CancellationToken,
    ) {
        let started = Instant::now();
        let (report, cancelled) = self
            .execute_batch(run_id, &config, &certifications, &cancellation_token)
            .await;

        let files_processed = report.jobs.len() as u64;
        let succeeded = report.succeeded;
        let failed = report.failed;

        {
            let mut reports = self.reports.lock().await;
            reports.insert(run_id, report);
        }
        {
            let mut active = self.active_run.lock().await;
            *active = None;
        }

        if cancelled {
            info!(
                "Upload run {} cancelled after {} files ({} succeeded, {} failed)",
                run_id, files_processed, succeeded, failed
            );
            self.event_bus
                .emit(CoreEvent::Upload(UploadEvent::Cancelled {
                    run_id: run_id.to_string(),
                    succeeded,
                    failed,
                    files_processed,
                }))
                .ok();
        } else {
            info!(
                "Upload run {} completed ({} succeeded, {} failed)",
                run_id, succeeded, failed
            );
            self.event_bus
                .emit(CoreEvent::Upload(UploadEvent::Completed {
                    run_id: run_id.to_string(),
                    succeeded,
                    failed,
                    duration_secs: started.elapsed().as_secs(),
                }))
                .ok();
        }
    }

    /// The sequential upload worker
    ///
    /// Processes certifications and their media files strictly in order.
    /// Returns the finalized report and whether cancellation cut the run
    /// short.
    async fn execute_batch(
        &self,
        run_id: UploadRunId,
        config: &UploadConfig,
        certifications: &[Certification],
        cancellation_token: &CancellationToken,
    ) -> (UploadReport, bool) {
        // The resolver cache belongs to this run alone
        let mut resolver = FolderResolver::new(Arc::clone(&self.storage));
        let uploader = FileUploader::new(Arc::clone(&self.storage), Arc::clone(&self.file_system));

        let total_count: u64 = certifications
            .iter()
            .map(|c| c.media_files.len() as u64)
            .sum();
        let mut jobs: Vec<UploadJob> = Vec::with_capacity(total_count as usize);
        let mut current_index: u64 = 0;
        let mut cancelled = false;

        'certifications: for certification in certifications {
            if cancellation_token.is_cancelled() {
                cancelled = true;
                break;
            }

            let folder_path = certification.folder_path();
            debug!(
                "Resolving destination folder '{}' for certification {}",
                folder_path, certification.cert_no
            );

            let folder_id = match resolver
                .ensure_folder_path(&config.root_folder_id, &folder_path)
                .await
            {
                Ok(folder_id) => folder_id,
                Err(e) => {
                    // One certification's folder failure never aborts the
                    // siblings: fail its files and move on
                    warn!(
                        "Folder resolution failed for certification {}: {}",
                        certification.cert_no, e
                    );
                    for media_file in &certification.media_files {
                        current_index += 1;
                        let job = UploadJob::new(certification, media_file);
                        let Ok(job) = job.fail(format!("Failed to create folder: {}", e)) else {
                            continue;
                        };
                        self.emit_file_completed(run_id, &job);
                        jobs.push(job);
                    }
                    continue;
                }
            };

            for media_file in &certification.media_files {
                if cancellation_token.is_cancelled() {
                    cancelled = true;
                    break 'certifications;
                }

                current_index += 1;
                let job = UploadJob::new(certification, media_file);
                let Ok(job) = job.begin() else {
                    continue;
                };

                self.event_bus
                    .emit(CoreEvent::Upload(UploadEvent::FileStarted {
                        run_id: run_id.to_string(),
                        current_index,
                        total_count,
                        file_name: job.file_name(),
                    }))
                    .ok();

                let local_path = config.media_root.join(&media_file.relative_path);
                let finalized = match uploader.upload_file(&local_path, &folder_id, None).await {
                    Ok(remote_file_id) => job.complete(remote_file_id),
                    Err(e) => job.fail(e.to_string()),
                };
                let Ok(job) = finalized else {
                    continue;
                };

                self.emit_file_completed(run_id, &job);
                jobs.push(job);
            }
        }

        (UploadReport::from_jobs(jobs), cancelled)
    }

    fn emit_file_completed(&self, run_id: UploadRunId, job: &UploadJob) {
        self.event_bus
            .emit(CoreEvent::Upload(UploadEvent::FileCompleted {
                run_id: run_id.to_string(),
                job_id: job.id.to_string(),
                cert_no: job.cert_no.clone(),
                file_name: job.file_name(),
                status: job.status.to_string(),
                remote_file_id: job.remote_file_id.clone(),
                error_message: job.error_message.clone(),
            }))
            .ok();
    }
}
