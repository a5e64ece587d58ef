//! Repository credentials.

use serde::{Deserialize, Serialize};

/// Kind of repository a credential applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CredentialType {
    /// Git repository credentials.
    Git,
    /// Helm chart repository credentials.
    Helm,
    /// Container image registry credentials.
    Image,
}

impl CredentialType {
    /// Returns a string representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Git => "git",
            Self::Helm => "helm",
            Self::Image => "image",
        }
    }
}

impl std::fmt::Display for CredentialType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Username/password pair resolved for a repository.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    /// Username (or token name).
    pub username: String,

    /// Password or token.
    pub password: String,
}

impl Credentials {
    /// Creates a new credential pair.
    #[must_use]
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_redacts_password() {
        let creds = Credentials::new("robot", "s3cr3t");
        let debug = format!("{creds:?}");
        assert!(debug.contains("robot"));
        assert!(!debug.contains("s3cr3t"));
    }

    #[test]
    fn test_credential_type_serde() {
        let json = serde_json::to_string(&CredentialType::Image).unwrap();
        assert_eq!(json, "\"image\"");
        assert_eq!(CredentialType::Git.to_string(), "git");
    }
}
