use thiserror::Error;

#[derive(Error, Debug)]
pub enum UploadError {
    #[error("Connection to remote storage failed: {0}")]
    Connection(String),

    #[error("Folder operation failed for '{path}': {message}")]
    Folder { path: String, message: String },

    #[error("Local file not found: {path}")]
    FileNotFound { path: String },

    #[error("Failed to read local file '{path}': {message}")]
    FileRead { path: String, message: String },

    #[error("Upload failed for '{name}': {message}")]
    Upload { name: String, message: String },

    #[error("An upload run is already in progress")]
    RunInProgress,

    #[error("Invalid job ID: {0}")]
    InvalidJobId(String),

    #[error("Invalid upload status: {0}")]
    InvalidStatus(String),

    #[error("Invalid state transition from {from} to {to}: {reason}")]
    InvalidStateTransition {
        from: String,
        to: String,
        reason: String,
    },
}

pub type Result<T> = std::result::Result<T, UploadError>;
