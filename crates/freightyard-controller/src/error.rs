//! Error types for the controller crate.
//!
//! Every [`DiscoveryError`] is fatal for the whole discovery pass: results
//! already computed for earlier subscriptions are discarded and the caller
//! keeps the previously persisted status.

use freightyard_registry::RegistryError;
use thiserror::Error;

/// Boxed error returned by external collaborators.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Result type alias for discovery operations.
pub type Result<T> = std::result::Result<T, DiscoveryError>;

/// Errors that abort a discovery pass.
#[derive(Error, Debug)]
pub enum DiscoveryError {
    /// The credential store failed (absent credentials are not an error).
    #[error("error obtaining credentials for image repository '{repo_url}'")]
    CredentialLookupFailed {
        /// Repository URL of the subscription.
        repo_url: String,
        /// Underlying error.
        #[source]
        source: BoxError,
    },

    /// The subscription could not be turned into a selector.
    #[error("error creating image selector for '{repo_url}'")]
    SelectorConstructionFailed {
        /// Repository URL of the subscription.
        repo_url: String,
        /// Underlying error.
        #[source]
        source: RegistryError,
    },

    /// Querying the registry failed.
    #[error("error discovering images from '{repo_url}'")]
    RegistryDiscoveryFailed {
        /// Repository URL of the subscription.
        repo_url: String,
        /// Underlying error.
        #[source]
        source: RegistryError,
    },

    /// Listing active Freight for the Warehouse failed.
    #[error("error listing active freight for warehouse '{namespace}/{warehouse}'")]
    ActivityIndexQueryFailed {
        /// Warehouse namespace.
        namespace: String,
        /// Warehouse name.
        warehouse: String,
        /// Underlying error.
        #[source]
        source: BoxError,
    },
}

impl DiscoveryError {
    /// Returns the repository URL the error is attributed to, if any.
    #[must_use]
    pub fn repo_url(&self) -> Option<&str> {
        match self {
            Self::CredentialLookupFailed { repo_url, .. }
            | Self::SelectorConstructionFailed { repo_url, .. }
            | Self::RegistryDiscoveryFailed { repo_url, .. } => Some(repo_url),
            Self::ActivityIndexQueryFailed { .. } => None,
        }
    }

    /// Returns true if retrying the pass may succeed.
    ///
    /// Construction failures stem from the subscription itself and will
    /// recur until the Warehouse spec changes.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::CredentialLookupFailed { .. } | Self::ActivityIndexQueryFailed { .. } => true,
            Self::SelectorConstructionFailed { .. } => false,
            Self::RegistryDiscoveryFailed { source, .. } => source.is_retryable(),
        }
    }
}

/// Errors in static controller configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// A credential entry's repository pattern is not a valid regex.
    #[error("invalid repoURLPattern '{pattern}' in credential entry {index}")]
    InvalidCredentialPattern {
        /// Entry index.
        index: usize,
        /// Pattern string.
        pattern: String,
        /// Underlying error.
        #[source]
        source: regex::Error,
    },

    /// A credential entry is malformed.
    #[error("invalid credential entry {index}: {reason}")]
    InvalidCredentialEntry {
        /// Entry index.
        index: usize,
        /// Reason for invalidity.
        reason: String,
    },
}
