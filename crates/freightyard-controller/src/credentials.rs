//! Credential lookup for repository access.

use async_trait::async_trait;
use freightyard_core::{CredentialType, Credentials};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{BoxError, ConfigError};

/// Source of repository credentials.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Looks up credentials for a repository in a namespace.
    ///
    /// Returns `Ok(None)` when no credentials are configured; callers then
    /// attempt anonymous access.
    async fn get(
        &self,
        namespace: &str,
        credential_type: CredentialType,
        repo_url: &str,
    ) -> Result<Option<Credentials>, BoxError>;
}

/// One configured credential.
///
/// Exactly one of `repo_url` and `repo_url_pattern` must be set.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialEntry {
    /// Namespace the credential is visible in.
    pub namespace: String,

    /// Repository kind.
    #[serde(rename = "type")]
    pub credential_type: CredentialType,

    /// Exact repository URL.
    #[serde(default, rename = "repoURL", skip_serializing_if = "Option::is_none")]
    pub repo_url: Option<String>,

    /// Regular expression matched against repository URLs.
    #[serde(default, rename = "repoURLPattern", skip_serializing_if = "Option::is_none")]
    pub repo_url_pattern: Option<String>,

    /// Username and password.
    #[serde(flatten)]
    pub credentials: Credentials,
}

impl CredentialEntry {
    /// Creates an entry for an exact repository URL.
    #[must_use]
    pub fn exact(
        namespace: impl Into<String>,
        credential_type: CredentialType,
        repo_url: impl Into<String>,
        credentials: Credentials,
    ) -> Self {
        Self {
            namespace: namespace.into(),
            credential_type,
            repo_url: Some(repo_url.into()),
            repo_url_pattern: None,
            credentials,
        }
    }

    /// Creates an entry matching repository URLs by pattern.
    #[must_use]
    pub fn pattern(
        namespace: impl Into<String>,
        credential_type: CredentialType,
        pattern: impl Into<String>,
        credentials: Credentials,
    ) -> Self {
        Self {
            namespace: namespace.into(),
            credential_type,
            repo_url: None,
            repo_url_pattern: Some(pattern.into()),
            credentials,
        }
    }
}

#[derive(Debug)]
enum Matcher {
    Exact(String),
    Pattern(Regex),
}

/// Credential store over a fixed list of entries.
///
/// An exact repository URL match wins over pattern matches; among patterns
/// the first declared match wins.
#[derive(Debug)]
pub struct StaticCredentialStore {
    entries: Vec<(Matcher, CredentialEntry)>,
}

impl StaticCredentialStore {
    /// Builds a store, compiling repository patterns.
    ///
    /// # Errors
    ///
    /// Returns an error if an entry sets neither or both of `repoURL` and
    /// `repoURLPattern`, or if a pattern does not compile.
    pub fn new(entries: Vec<CredentialEntry>) -> Result<Self, ConfigError> {
        let entries = entries
            .into_iter()
            .enumerate()
            .map(|(index, entry)| {
                let matcher = match (&entry.repo_url, &entry.repo_url_pattern) {
                    (Some(url), None) => Matcher::Exact(url.clone()),
                    (None, Some(pattern)) => Matcher::Pattern(Regex::new(pattern).map_err(
                        |source| ConfigError::InvalidCredentialPattern {
                            index,
                            pattern: pattern.clone(),
                            source,
                        },
                    )?),
                    _ => {
                        return Err(ConfigError::InvalidCredentialEntry {
                            index,
                            reason: "exactly one of repoURL and repoURLPattern must be set"
                                .to_string(),
                        })
                    }
                };
                Ok((matcher, entry))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { entries })
    }

    /// Creates a store with no credentials.
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Returns the number of configured entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if no entries are configured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn lookup(
        &self,
        namespace: &str,
        credential_type: CredentialType,
        repo_url: &str,
    ) -> Option<&CredentialEntry> {
        let candidates = self
            .entries
            .iter()
            .filter(|(_, e)| e.namespace == namespace && e.credential_type == credential_type);

        let mut first_pattern = None;
        for (matcher, entry) in candidates {
            match matcher {
                Matcher::Exact(url) if url == repo_url => return Some(entry),
                Matcher::Pattern(pattern)
                    if first_pattern.is_none() && pattern.is_match(repo_url) =>
                {
                    first_pattern = Some(entry);
                }
                _ => {}
            }
        }
        first_pattern
    }
}

impl Default for StaticCredentialStore {
    fn default() -> Self {
        Self::empty()
    }
}

#[async_trait]
impl CredentialStore for StaticCredentialStore {
    async fn get(
        &self,
        namespace: &str,
        credential_type: CredentialType,
        repo_url: &str,
    ) -> Result<Option<Credentials>, BoxError> {
        let found = self.lookup(namespace, credential_type, repo_url);
        tracing::trace!(
            namespace,
            repo_url,
            credential_type = %credential_type,
            found = found.is_some(),
            "Credential lookup"
        );
        Ok(found.map(|entry| entry.credentials.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn creds(user: &str) -> Credentials {
        Credentials::new(user, "secret")
    }

    #[tokio::test]
    async fn test_exact_match_wins_over_pattern() {
        let store = StaticCredentialStore::new(vec![
            CredentialEntry::pattern(
                "team",
                CredentialType::Image,
                "^ghcr\\.io/",
                creds("pattern"),
            ),
            CredentialEntry::exact(
                "team",
                CredentialType::Image,
                "ghcr.io/acme/web",
                creds("exact"),
            ),
        ])
        .unwrap();

        let found = store
            .get("team", CredentialType::Image, "ghcr.io/acme/web")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.username, "exact");

        let found = store
            .get("team", CredentialType::Image, "ghcr.io/acme/api")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.username, "pattern");
    }

    #[tokio::test]
    async fn test_first_pattern_wins() {
        let store = StaticCredentialStore::new(vec![
            CredentialEntry::pattern("team", CredentialType::Image, "acme", creds("first")),
            CredentialEntry::pattern("team", CredentialType::Image, "acme/web", creds("second")),
        ])
        .unwrap();

        let found = store
            .get("team", CredentialType::Image, "ghcr.io/acme/web")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.username, "first");
    }

    #[tokio::test]
    async fn test_namespace_and_type_scope() {
        let store = StaticCredentialStore::new(vec![CredentialEntry::exact(
            "team",
            CredentialType::Git,
            "ghcr.io/acme/web",
            creds("git"),
        )])
        .unwrap();

        assert!(store
            .get("team", CredentialType::Image, "ghcr.io/acme/web")
            .await
            .unwrap()
            .is_none());
        assert!(store
            .get("other", CredentialType::Git, "ghcr.io/acme/web")
            .await
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_invalid_entries() {
        let err = StaticCredentialStore::new(vec![CredentialEntry::pattern(
            "team",
            CredentialType::Image,
            "(",
            creds("x"),
        )])
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidCredentialPattern { index: 0, .. }));

        let mut entry = CredentialEntry::exact("team", CredentialType::Image, "a", creds("x"));
        entry.repo_url_pattern = Some("b".to_string());
        let err = StaticCredentialStore::new(vec![entry]).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidCredentialEntry { index: 0, .. }));
    }

    #[test]
    fn test_entry_yaml() {
        let yaml = r#"
- namespace: team
  type: image
  repoURLPattern: "^ghcr\\.io/acme/"
  username: robot
  password: s3cr3t
"#;
        let entries: Vec<CredentialEntry> = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(entries[0].credentials.username, "robot");
        assert!(!format!("{:?}", entries[0]).contains("s3cr3t"));
        assert_eq!(StaticCredentialStore::new(entries).unwrap().len(), 1);
    }
}
