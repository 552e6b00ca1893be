// SPDX-License-Identifier: MIT OR Apache-2.0

//! Store Error Types
//!
//! Error handling for synchronized-file and filter operations.

use thiserror::Error;

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Store error types
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Item not found: {message}")]
    ItemNotFound { message: String },

    #[error("Index {index} out of range for length {len}")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("{0}")]
    Other(String),
}

// Custom error creation helpers
impl StoreError {
    /// Create an item not found error
    pub fn item_not_found(message: impl Into<String>) -> Self {
        Self::ItemNotFound {
            message: message.into(),
        }
    }

    /// Create an index out of range error
    pub fn index_out_of_range(index: usize, len: usize) -> Self {
        Self::IndexOutOfRange { index, len }
    }

    /// Create a generic error from a string
    pub fn other(message: impl Into<String>) -> Self {
        Self::Other(message.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_item_not_found_error() {
        let error = StoreError::item_not_found("\"x\" is not in the list");
        assert!(matches!(error, StoreError::ItemNotFound { .. }));
    }

    #[test]
    fn test_index_out_of_range_error() {
        let error = StoreError::index_out_of_range(3, 2);
        assert_eq!(error.to_string(), "Index 3 out of range for length 2");
    }

    #[test]
    fn test_io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let error: StoreError = io.into();
        assert!(matches!(error, StoreError::Io(_)));
    }
}
