//! Image repository references.
//!
//! Normalizes the repository strings users write in subscriptions into the
//! registry host and repository path used by the Distribution API.

use crate::error::RegistryError;

/// Registry host Docker Hub references resolve to.
pub const DOCKER_HUB_HOST: &str = "registry-1.docker.io";

/// A normalized image repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRepository {
    /// URL scheme (`https` unless the reference explicitly says `http`).
    pub scheme: String,

    /// API host, including port if any.
    pub host: String,

    /// Repository path (e.g., `library/nginx`).
    pub path: String,
}

impl ImageRepository {
    /// Parses and normalizes a repository reference.
    ///
    /// # Examples
    ///
    /// ```
    /// use freightyard_registry::ImageRepository;
    ///
    /// let repo = ImageRepository::parse("nginx").unwrap();
    /// assert_eq!(repo.host, "registry-1.docker.io");
    /// assert_eq!(repo.path, "library/nginx");
    ///
    /// let repo = ImageRepository::parse("ghcr.io/acme/web").unwrap();
    /// assert_eq!(repo.base_url(), "https://ghcr.io");
    /// assert_eq!(repo.path, "acme/web");
    /// ```
    ///
    /// # Errors
    ///
    /// Returns an error if the reference is empty, carries a tag or digest,
    /// or contains uppercase characters in the repository path.
    pub fn parse(reference: &str) -> Result<Self, RegistryError> {
        let invalid = |message: &str| RegistryError::InvalidReference {
            reference: reference.to_string(),
            message: message.to_string(),
        };

        let trimmed = reference.trim();
        let (scheme, rest) = if let Some(rest) = trimmed.strip_prefix("https://") {
            ("https", rest)
        } else if let Some(rest) = trimmed.strip_prefix("http://") {
            ("http", rest)
        } else {
            ("https", trimmed)
        };
        let rest = rest.trim_end_matches('/');

        if rest.is_empty() {
            return Err(invalid("reference is empty"));
        }
        if rest.contains('@') {
            return Err(invalid("reference must not include a digest"));
        }

        let (host, path) = match rest.split_once('/') {
            Some((first, remainder)) if Self::looks_like_host(first) => {
                (first.to_string(), remainder.to_string())
            }
            _ => ("docker.io".to_string(), rest.to_string()),
        };

        if path.is_empty() {
            return Err(invalid("repository path is empty"));
        }
        if path.rsplit('/').next().is_some_and(|last| last.contains(':')) {
            return Err(invalid("reference must not include a tag"));
        }
        if path.chars().any(char::is_uppercase) {
            return Err(invalid("repository path must be lowercase"));
        }

        let (host, path) = if host == "docker.io" || host == "index.docker.io" {
            let path = if path.contains('/') {
                path
            } else {
                format!("library/{path}")
            };
            (DOCKER_HUB_HOST.to_string(), path)
        } else {
            (host, path)
        };

        Ok(Self {
            scheme: scheme.to_string(),
            host,
            path,
        })
    }

    /// Returns the registry base URL.
    #[must_use]
    pub fn base_url(&self) -> String {
        format!("{}://{}", self.scheme, self.host)
    }

    fn looks_like_host(component: &str) -> bool {
        component.contains('.') || component.contains(':') || component == "localhost"
    }
}

impl std::fmt::Display for ImageRepository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.host, self.path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_docker_hub_official() {
        let repo = ImageRepository::parse("alpine").unwrap();
        assert_eq!(repo.host, DOCKER_HUB_HOST);
        assert_eq!(repo.path, "library/alpine");
        assert_eq!(repo.scheme, "https");
    }

    #[test]
    fn test_parse_docker_hub_user_repo() {
        let repo = ImageRepository::parse("docker.io/bitnami/redis").unwrap();
        assert_eq!(repo.host, DOCKER_HUB_HOST);
        assert_eq!(repo.path, "bitnami/redis");
    }

    #[test]
    fn test_parse_registry_with_port() {
        let repo = ImageRepository::parse("http://localhost:5000/team/app").unwrap();
        assert_eq!(repo.base_url(), "http://localhost:5000");
        assert_eq!(repo.path, "team/app");
        assert_eq!(repo.to_string(), "localhost:5000/team/app");
    }

    #[test]
    fn test_parse_rejects_tag() {
        assert!(ImageRepository::parse("ghcr.io/acme/web:v1").is_err());
    }

    #[test]
    fn test_parse_rejects_digest() {
        assert!(ImageRepository::parse("ghcr.io/acme/web@sha256:abc").is_err());
    }

    #[test]
    fn test_parse_rejects_uppercase() {
        assert!(ImageRepository::parse("ghcr.io/Acme/web").is_err());
    }

    #[test]
    fn test_parse_rejects_empty() {
        assert!(ImageRepository::parse("  ").is_err());
        assert!(ImageRepository::parse("https://").is_err());
    }
}
