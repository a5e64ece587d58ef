//! Configuration types for registry client.

use std::time::Duration;

use freightyard_core::Credentials;
use serde::Deserialize;

use crate::reference::ImageRepository;

/// Client settings shared by every repository a process talks to.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ClientOptions {
    /// Request timeout in seconds.
    pub timeout_secs: u64,

    /// User agent string.
    pub user_agent: String,

    /// Number of tags requested per page of the tag list.
    pub page_size: usize,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            user_agent: format!("freightyard-registry/{}", env!("CARGO_PKG_VERSION")),
            page_size: 1000,
        }
    }
}

impl ClientOptions {
    /// Returns the request timeout.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Configuration for a client bound to one image repository.
#[derive(Debug, Clone)]
pub struct RegistryConfig {
    /// Repository the client talks to.
    pub repository: ImageRepository,

    /// Authentication configuration.
    pub auth: RegistryAuth,

    /// Request timeout.
    pub timeout: Duration,

    /// User agent string.
    pub user_agent: String,

    /// Number of tags requested per page.
    pub page_size: usize,

    /// Whether to skip certificate verification.
    pub insecure_skip_verify: bool,
}

impl RegistryConfig {
    /// Creates a new registry configuration for the given repository.
    ///
    /// # Examples
    ///
    /// ```
    /// use freightyard_registry::{ImageRepository, RegistryConfig};
    ///
    /// let repo = ImageRepository::parse("ghcr.io/acme/web").unwrap();
    /// let config = RegistryConfig::new(repo);
    /// assert_eq!(config.page_size, 1000);
    /// ```
    #[must_use]
    pub fn new(repository: ImageRepository) -> Self {
        Self::with_options(repository, &ClientOptions::default())
    }

    /// Creates a configuration from shared client options.
    #[must_use]
    pub fn with_options(repository: ImageRepository, options: &ClientOptions) -> Self {
        Self {
            repository,
            auth: RegistryAuth::None,
            timeout: options.timeout(),
            user_agent: options.user_agent.clone(),
            page_size: options.page_size.max(1),
            insecure_skip_verify: false,
        }
    }

    /// Sets the authentication method.
    #[must_use]
    pub fn with_auth(mut self, auth: RegistryAuth) -> Self {
        self.auth = auth;
        self
    }

    /// Sets the request timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Enables insecure mode (skips certificate verification).
    #[must_use]
    pub const fn insecure(mut self, insecure: bool) -> Self {
        self.insecure_skip_verify = insecure;
        self
    }

    /// Returns the URL prefix for Distribution API calls on the repository.
    #[must_use]
    pub fn repository_url(&self) -> String {
        format!("{}/v2/{}", self.repository.base_url(), self.repository.path)
    }
}

/// Authentication methods for registry access.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryAuth {
    /// Anonymous access.
    None,

    /// Basic authentication (username/password or username/token).
    ///
    /// Also used to obtain bearer tokens when the registry issues a token
    /// challenge.
    Basic {
        /// Username.
        username: String,
        /// Password or token.
        password: String,
    },

    /// Static bearer token.
    Bearer {
        /// Token value.
        token: String,
    },
}

impl RegistryAuth {
    /// Creates basic authentication.
    #[must_use]
    pub fn basic(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self::Basic {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Creates bearer token authentication.
    #[must_use]
    pub fn bearer(token: impl Into<String>) -> Self {
        Self::Bearer {
            token: token.into(),
        }
    }

    /// Creates authentication from optional resolved credentials.
    #[must_use]
    pub fn from_credentials(credentials: Option<&Credentials>) -> Self {
        credentials.map_or(Self::None, |c| Self::basic(&c.username, &c.password))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn repo() -> ImageRepository {
        ImageRepository::parse("ghcr.io/acme/web").unwrap()
    }

    #[test]
    fn test_config_new() {
        let config = RegistryConfig::new(repo());
        assert_eq!(config.auth, RegistryAuth::None);
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert!(!config.insecure_skip_verify);
    }

    #[test]
    fn test_repository_url() {
        let config = RegistryConfig::new(repo());
        assert_eq!(config.repository_url(), "https://ghcr.io/v2/acme/web");
    }

    #[test]
    fn test_auth_from_credentials() {
        assert_eq!(RegistryAuth::from_credentials(None), RegistryAuth::None);
        let creds = Credentials::new("user", "pass");
        assert_eq!(
            RegistryAuth::from_credentials(Some(&creds)),
            RegistryAuth::basic("user", "pass")
        );
    }

    #[test]
    fn test_client_options_partial_yaml_keeps_defaults() {
        let options: ClientOptions = serde_json::from_str(r#"{"timeoutSecs": 5}"#).unwrap();
        assert_eq!(options.timeout(), Duration::from_secs(5));
        assert_eq!(options.page_size, 1000);
    }

    #[test]
    fn test_page_size_never_zero() {
        let options = ClientOptions {
            page_size: 0,
            ..ClientOptions::default()
        };
        assert_eq!(RegistryConfig::with_options(repo(), &options).page_size, 1);
    }
}
