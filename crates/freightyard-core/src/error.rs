//! Error types for Freightyard core operations.

use thiserror::Error;

/// Result type alias using [`Error`] as the error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur when validating or decoding core resources.
#[derive(Error, Debug)]
pub enum Error {
    /// A subscription is malformed.
    #[error("Invalid subscription at index {index}: {reason}")]
    InvalidSubscription {
        /// Position of the subscription in the Warehouse spec.
        index: usize,
        /// Reason the subscription is invalid.
        reason: String,
    },

    /// Resource metadata is malformed.
    #[error("Invalid metadata: {reason}")]
    InvalidMetadata {
        /// Reason the metadata is invalid.
        reason: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_invalid_subscription() {
        let err = Error::InvalidSubscription {
            index: 2,
            reason: "repoURL must not be empty".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Invalid subscription at index 2: repoURL must not be empty"
        );
    }

    #[test]
    fn test_error_display_invalid_metadata() {
        let err = Error::InvalidMetadata {
            reason: "name must not be empty".to_string(),
        };
        assert_eq!(err.to_string(), "Invalid metadata: name must not be empty");
    }
}
