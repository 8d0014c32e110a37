//! Error types for the Box provider

use thiserror::Error;

/// Box provider errors
#[derive(Error, Debug)]
pub enum BoxError {
    /// Authentication failed or token is invalid
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    /// API request returned an error
    #[error("Box API error (status {status_code}): {message}")]
    ApiError { status_code: u16, message: String },

    /// An item of that name already exists in the target folder
    #[error("Item name already in use: {name}")]
    NameConflict { name: String },

    /// Folder or file not found
    #[error("Item not found: {0}")]
    NotFound(String),

    /// Failed to parse API response
    #[error("Failed to parse API response: {0}")]
    ParseError(String),

    /// Bridge error
    #[error(transparent)]
    BridgeError(#[from] bridge_traits::error::BridgeError),
}

/// Result type for Box operations
pub type Result<T> = std::result::Result<T, BoxError>;

impl From<BoxError> for bridge_traits::error::BridgeError {
    fn from(error: BoxError) -> Self {
        match error {
            BoxError::AuthenticationFailed(msg) => {
                bridge_traits::error::BridgeError::OperationFailed(format!(
                    "Authentication failed: {}",
                    msg
                ))
            }
            BoxError::ApiError {
                status_code,
                message,
            } => bridge_traits::error::BridgeError::OperationFailed(format!(
                "Box API error (status {}): {}",
                status_code, message
            )),
            BoxError::NameConflict { name } => {
                bridge_traits::error::BridgeError::NameConflict { name }
            }
            BoxError::NotFound(item) => bridge_traits::error::BridgeError::NotFound(item),
            BoxError::ParseError(msg) => {
                bridge_traits::error::BridgeError::OperationFailed(format!("Parse error: {}", msg))
            }
            BoxError::BridgeError(e) => e,
        }
    }
}
