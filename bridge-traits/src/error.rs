use thiserror::Error;

#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("Bridge capability not available: {0}")]
    NotAvailable(String),

    #[error("Bridge operation failed: {0}")]
    OperationFailed(String),

    #[error("Name already in use: {name}")]
    NameConflict { name: String },

    #[error("Remote item not found: {0}")]
    NotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl BridgeError {
    /// Whether this error is the remote service's signal that a create or
    /// upload targeted a name already occupied in the parent folder.
    pub fn is_name_conflict(&self) -> bool {
        matches!(self, BridgeError::NameConflict { .. })
    }
}

pub type Result<T> = std::result::Result<T, BridgeError>;
