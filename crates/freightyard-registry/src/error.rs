//! Error types for registry operations.

use thiserror::Error;

/// Errors that can occur during registry operations and selector construction.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// Failed to connect to registry.
    #[error("Failed to connect to registry at {url}: {source}")]
    ConnectionFailed {
        /// Registry URL.
        url: String,
        /// Underlying error.
        #[source]
        source: reqwest::Error,
    },

    /// Authentication failed.
    #[error("Authentication failed: {message}")]
    AuthenticationFailed {
        /// Error message.
        message: String,
    },

    /// HTTP error from registry.
    #[error("HTTP error from registry: {status} - {message}")]
    HttpError {
        /// HTTP status code (0 when no response was received).
        status: u16,
        /// Error message.
        message: String,
    },

    /// JSON serialization/deserialization error.
    #[error("JSON error: {source}")]
    JsonError {
        /// Underlying error.
        #[source]
        source: serde_json::Error,
    },

    /// Invalid URL.
    #[error("Invalid URL: {url}")]
    InvalidUrl {
        /// URL string.
        url: String,
    },

    /// Invalid image repository reference.
    #[error("Invalid image reference '{reference}': {message}")]
    InvalidReference {
        /// Reference string.
        reference: String,
        /// Error message.
        message: String,
    },

    /// Invalid version constraint.
    #[error("Invalid version constraint '{constraint}': {message}")]
    InvalidConstraint {
        /// Constraint string.
        constraint: String,
        /// Error message.
        message: String,
    },

    /// Invalid tag filter pattern.
    #[error("Invalid tag pattern '{pattern}': {source}")]
    InvalidTagPattern {
        /// Pattern string.
        pattern: String,
        /// Underlying error.
        #[source]
        source: regex::Error,
    },

    /// Invalid platform string.
    #[error("Invalid platform '{platform}': expected os/arch[/variant]")]
    InvalidPlatform {
        /// Platform string.
        platform: String,
    },

    /// The selection strategy requires a constraint that was not provided.
    #[error("Selection strategy {strategy} requires a constraint")]
    MissingConstraint {
        /// Strategy name.
        strategy: String,
    },

    /// The registry returned a manifest of an unknown media type.
    #[error("Unsupported manifest media type: {media_type}")]
    UnsupportedMediaType {
        /// Media type returned by the registry.
        media_type: String,
    },
}

impl RegistryError {
    /// Returns true if retrying the same request may succeed.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::ConnectionFailed { .. } => true,
            Self::HttpError { status, .. } => *status == 0 || *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

impl From<reqwest::Error> for RegistryError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_connect() || err.is_timeout() {
            Self::ConnectionFailed {
                url: err
                    .url()
                    .map_or_else(|| "unknown".to_string(), ToString::to_string),
                source: err,
            }
        } else if err.is_status() {
            let status = err.status().map_or(0, |s| s.as_u16());
            Self::HttpError {
                status,
                message: err.to_string(),
            }
        } else {
            Self::HttpError {
                status: 0,
                message: err.to_string(),
            }
        }
    }
}

impl From<serde_json::Error> for RegistryError {
    fn from(err: serde_json::Error) -> Self {
        Self::JsonError { source: err }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_missing_constraint() {
        let err = RegistryError::MissingConstraint {
            strategy: "Digest".to_string(),
        };
        assert_eq!(err.to_string(), "Selection strategy Digest requires a constraint");
    }

    #[test]
    fn test_error_display_auth_failed() {
        let err = RegistryError::AuthenticationFailed {
            message: "invalid token".to_string(),
        };
        assert_eq!(err.to_string(), "Authentication failed: invalid token");
    }

    #[test]
    fn test_retryable_statuses() {
        let err = |status| RegistryError::HttpError {
            status,
            message: String::new(),
        };
        assert!(err(503).is_retryable());
        assert!(err(429).is_retryable());
        assert!(!err(404).is_retryable());
        assert!(!RegistryError::InvalidPlatform {
            platform: "linux".to_string()
        }
        .is_retryable());
    }
}
