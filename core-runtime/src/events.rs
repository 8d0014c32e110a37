//! # Event Bus System
//!
//! Provides an event-driven architecture for the upload core using
//! `tokio::sync::broadcast`. This module enables decoupled communication
//! between the background upload worker and its observers through typed
//! events: the worker never touches caller-owned state, it only publishes
//! messages the caller consumes at its own pace.
//!
//! ## Overview
//!
//! The event bus system consists of:
//! - **Event Types**: Strongly-typed enum hierarchies per domain
//! - **EventBus**: Central broadcast channel for publishing events
//! - **Subscription Management**: Multiple subscribers can listen independently
//!
//! ## Usage
//!
//! ```rust
//! use core_runtime::events::{EventBus, CoreEvent, ConnectionEvent};
//!
//! let event_bus = EventBus::new(100);
//! let mut subscriber = event_bus.subscribe();
//!
//! let event = CoreEvent::Connection(ConnectionEvent::Verified {
//!     display_name: "Upload Service".to_string(),
//!     login: "svc@example.com".to_string(),
//! });
//! event_bus.emit(event).ok();
//! ```
//!
//! ## Error Handling
//!
//! The bus uses `tokio::sync::broadcast`, which can produce two receive
//! errors:
//!
//! - **`RecvError::Lagged(n)`**: the subscriber was too slow and missed `n`
//!   events. Non-fatal; the subscriber keeps receiving newer events.
//! - **`RecvError::Closed`**: all senders have been dropped.
//!
//! Subscribers should handle `Lagged` gracefully and treat `Closed` as a
//! signal to exit.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

// Re-export commonly used types
pub use tokio::sync::broadcast::error::{RecvError, SendError};
pub use tokio::sync::broadcast::Receiver;

/// Default buffer size for the event bus channel.
///
/// Balances memory usage with the ability to absorb bursts of per-file
/// events. Subscribers that fall further behind receive `RecvError::Lagged`.
pub const DEFAULT_EVENT_BUFFER_SIZE: usize = 100;

// ============================================================================
// Core Event Types
// ============================================================================

/// Top-level event enum encompassing all event categories.
///
/// This is the main event type published and received through the event bus.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "payload")]
pub enum CoreEvent {
    /// Remote connection events
    Connection(ConnectionEvent),
    /// Upload batch events
    Upload(UploadEvent),
}

impl CoreEvent {
    /// Returns a human-readable description of the event.
    pub fn description(&self) -> &str {
        match self {
            CoreEvent::Connection(e) => e.description(),
            CoreEvent::Upload(e) => e.description(),
        }
    }

    /// Returns the severity level of the event.
    pub fn severity(&self) -> EventSeverity {
        match self {
            CoreEvent::Connection(ConnectionEvent::Failed { .. }) => EventSeverity::Error,
            CoreEvent::Connection(ConnectionEvent::Verified { .. }) => EventSeverity::Info,
            CoreEvent::Upload(UploadEvent::Completed { .. }) => EventSeverity::Info,
            CoreEvent::Upload(UploadEvent::Cancelled { .. }) => EventSeverity::Warning,
            _ => EventSeverity::Debug,
        }
    }
}

/// Event severity levels for filtering and logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EventSeverity {
    /// Debug-level events (verbose)
    Debug,
    /// Informational events
    Info,
    /// Warning events
    Warning,
    /// Error events
    Error,
}

// ============================================================================
// Connection Events
// ============================================================================

/// Events related to the remote document-storage session.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum ConnectionEvent {
    /// The remote service answered an identity probe.
    Verified {
        /// Display name of the authenticated identity.
        display_name: String,
        /// Login name of the authenticated identity.
        login: String,
    },
    /// The remote service could not be reached or rejected the session.
    Failed {
        /// Human-readable error message.
        message: String,
    },
}

impl ConnectionEvent {
    fn description(&self) -> &str {
        match self {
            ConnectionEvent::Verified { .. } => "Remote connection verified",
            ConnectionEvent::Failed { .. } => "Remote connection failed",
        }
    }
}

// ============================================================================
// Upload Events
// ============================================================================

/// Events emitted by the batch upload worker.
///
/// Per-file notifications are emitted strictly in processing order
/// (certification order, then each certification's media-file order), and
/// exactly one final summary (`Completed` or `Cancelled`) is emitted after
/// the last per-file notification.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum UploadEvent {
    /// Upload run initiated.
    Started {
        /// Unique identifier for this upload run.
        run_id: String,
        /// Number of certifications in the batch.
        certification_count: u64,
        /// Total number of media files across all certifications.
        file_count: u64,
    },
    /// A file began processing.
    FileStarted {
        /// The upload run ID.
        run_id: String,
        /// 1-based index of this file within the batch.
        current_index: u64,
        /// Total number of media files in the batch.
        total_count: u64,
        /// Base name of the file being uploaded.
        file_name: String,
    },
    /// A job reached a terminal state.
    FileCompleted {
        /// The upload run ID.
        run_id: String,
        /// The finalized job's ID.
        job_id: String,
        /// Certificate number the file belongs to.
        cert_no: String,
        /// Base name of the file.
        file_name: String,
        /// Terminal status (`completed`, `failed`, or `cancelled`).
        status: String,
        /// Remote file id, when the upload succeeded.
        remote_file_id: Option<String>,
        /// Error message, when the job failed.
        error_message: Option<String>,
    },
    /// Upload run finished processing every file.
    Completed {
        /// The upload run ID.
        run_id: String,
        /// Number of files uploaded successfully.
        succeeded: u64,
        /// Number of files that failed.
        failed: u64,
        /// Duration of the run in seconds.
        duration_secs: u64,
    },
    /// Upload run stopped early on a cancellation request.
    Cancelled {
        /// The upload run ID.
        run_id: String,
        /// Number of files uploaded successfully before cancellation.
        succeeded: u64,
        /// Number of files that failed before cancellation.
        failed: u64,
        /// Number of files processed before cancellation.
        files_processed: u64,
    },
}

impl UploadEvent {
    fn description(&self) -> &str {
        match self {
            UploadEvent::Started { .. } => "Upload run started",
            UploadEvent::FileStarted { .. } => "File upload started",
            UploadEvent::FileCompleted { .. } => "File upload finished",
            UploadEvent::Completed { .. } => "Upload run completed",
            UploadEvent::Cancelled { .. } => "Upload run cancelled",
        }
    }
}

// ============================================================================
// Event Bus
// ============================================================================

/// Central event bus for publishing and subscribing to events.
///
/// Uses `tokio::sync::broadcast` internally, which provides:
/// - Multiple producers (clone the `EventBus`)
/// - Multiple consumers (each `subscribe()` creates a new receiver)
/// - Non-blocking sends (events are cloned for each subscriber)
/// - Lagging detection (slow subscribers get `RecvError::Lagged`)
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<CoreEvent>,
}

impl EventBus {
    /// Creates a new event bus with the specified buffer size.
    ///
    /// # Arguments
    ///
    /// * `capacity` - Maximum number of events to buffer per subscriber.
    ///   When a subscriber falls behind by more than this amount, it will
    ///   receive a `RecvError::Lagged` error.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Creates a new event bus with the default buffer size.
    #[allow(clippy::should_implement_trait)]
    pub fn default() -> Self {
        Self::new(DEFAULT_EVENT_BUFFER_SIZE)
    }

    /// Publishes an event to all subscribers.
    ///
    /// Returns the number of subscribers that received the event.
    /// Returns an error if there are no active subscribers.
    pub fn emit(&self, event: CoreEvent) -> Result<usize, SendError<CoreEvent>> {
        self.sender.send(event)
    }

    /// Creates a new subscriber to receive events.
    ///
    /// Each call creates an independent receiver that will receive all
    /// future events. Past events are not replayed.
    pub fn subscribe(&self) -> Receiver<CoreEvent> {
        self.sender.subscribe()
    }

    /// Returns the number of active subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_emit_and_receive() {
        let bus = EventBus::new(16);
        let mut rx = bus.subscribe();

        let event = CoreEvent::Upload(UploadEvent::Started {
            run_id: "run-1".to_string(),
            certification_count: 2,
            file_count: 5,
        });

        bus.emit(event.clone()).unwrap();
        assert_eq!(rx.recv().await.unwrap(), event);
    }

    #[tokio::test]
    async fn test_multiple_subscribers() {
        let bus = EventBus::new(16);
        let mut rx1 = bus.subscribe();
        let mut rx2 = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 2);

        let event = CoreEvent::Connection(ConnectionEvent::Failed {
            message: "timeout".to_string(),
        });
        bus.emit(event.clone()).unwrap();

        assert_eq!(rx1.recv().await.unwrap(), event);
        assert_eq!(rx2.recv().await.unwrap(), event);
    }

    #[test]
    fn test_emit_without_subscribers() {
        let bus = EventBus::new(16);
        let event = CoreEvent::Connection(ConnectionEvent::Failed {
            message: "nobody listening".to_string(),
        });
        assert!(bus.emit(event).is_err());
    }

    #[test]
    fn test_event_severity() {
        let failed = CoreEvent::Connection(ConnectionEvent::Failed {
            message: "boom".to_string(),
        });
        assert_eq!(failed.severity(), EventSeverity::Error);

        let completed = CoreEvent::Upload(UploadEvent::Completed {
            run_id: "run-1".to_string(),
            succeeded: 3,
            failed: 0,
            duration_secs: 12,
        });
        assert_eq!(completed.severity(), EventSeverity::Info);

        let progress = CoreEvent::Upload(UploadEvent::FileStarted {
            run_id: "run-1".to_string(),
            current_index: 1,
            total_count: 3,
            file_name: "cert.pdf".to_string(),
        });
        assert_eq!(progress.severity(), EventSeverity::Debug);
    }

    #[test]
    fn test_event_serialization_round_trip() {
        let event = CoreEvent::Upload(UploadEvent::FileCompleted {
            run_id: "run-1".to_string(),
            job_id: "job-1".to_string(),
            cert_no: "444337-1".to_string(),
            file_name: "cert.pdf".to_string(),
            status: "completed".to_string(),
            remote_file_id: Some("9001".to_string()),
            error_message: None,
        });

        let json = serde_json::to_string(&event).unwrap();
        let parsed: CoreEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, event);
    }
}
