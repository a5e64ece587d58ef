//! Registry authentication challenges and token exchange.
//!
//! Registries that delegate authentication to a token service answer an
//! unauthenticated request with `401` and a `WWW-Authenticate: Bearer ...`
//! challenge naming the token realm. The client exchanges its credentials at
//! that realm for a short-lived token.

use std::collections::BTreeMap;

use serde::Deserialize;
use url::Url;

use crate::error::RegistryError;

/// A parsed `WWW-Authenticate` challenge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Challenge {
    /// The registry accepts basic credentials directly.
    Basic,

    /// The registry requires a token from the given realm.
    Bearer {
        /// Token endpoint URL.
        realm: String,
        /// Service name to request the token for.
        service: Option<String>,
        /// Requested scope.
        scope: Option<String>,
    },
}

impl Challenge {
    /// Parses a `WWW-Authenticate` header value.
    ///
    /// Returns `None` for unknown schemes or bearer challenges without a realm.
    #[must_use]
    pub fn parse(header: &str) -> Option<Self> {
        let header = header.trim();
        let (scheme, rest) = header.split_once(' ').unwrap_or((header, ""));

        if scheme.eq_ignore_ascii_case("basic") {
            return Some(Self::Basic);
        }
        if !scheme.eq_ignore_ascii_case("bearer") {
            return None;
        }

        let mut params = parse_params(rest);
        Some(Self::Bearer {
            realm: params.remove("realm")?,
            service: params.remove("service"),
            scope: params.remove("scope"),
        })
    }

    /// Builds the token request URL for a bearer challenge.
    ///
    /// `default_scope` is used when the challenge does not name one.
    ///
    /// # Errors
    ///
    /// Returns an error if this is not a bearer challenge or the realm is not a URL.
    pub fn token_url(&self, default_scope: &str) -> Result<Url, RegistryError> {
        let Self::Bearer {
            realm,
            service,
            scope,
        } = self
        else {
            return Err(RegistryError::AuthenticationFailed {
                message: "registry did not issue a token challenge".to_string(),
            });
        };

        let mut url = Url::parse(realm).map_err(|_| RegistryError::InvalidUrl {
            url: realm.clone(),
        })?;
        {
            let mut query = url.query_pairs_mut();
            if let Some(service) = service {
                query.append_pair("service", service);
            }
            query.append_pair("scope", scope.as_deref().unwrap_or(default_scope));
        }
        Ok(url)
    }
}

/// Splits `key="value",key2=value2` parameters, honoring quoted commas.
fn parse_params(input: &str) -> BTreeMap<String, String> {
    let mut params = BTreeMap::new();
    let mut rest = input.trim();

    while !rest.is_empty() {
        let Some((key, after_key)) = rest.split_once('=') else {
            break;
        };
        let key = key.trim().trim_start_matches(',').trim().to_ascii_lowercase();

        let (value, remainder) = if let Some(quoted) = after_key.strip_prefix('"') {
            match quoted.split_once('"') {
                Some((value, remainder)) => (value, remainder),
                None => (quoted, ""),
            }
        } else {
            after_key.split_once(',').unwrap_or((after_key, ""))
        };

        params.insert(key, value.trim().to_string());
        rest = remainder.trim_start_matches(|c: char| c == ',' || c.is_whitespace());
    }

    params
}

/// Response body of a token endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TokenResponse {
    /// Token as issued by Docker-style token services.
    #[serde(default)]
    pub token: Option<String>,

    /// Token as issued by OAuth2-style token services.
    #[serde(default)]
    pub access_token: Option<String>,
}

impl TokenResponse {
    /// Returns the issued token, whichever field carried it.
    ///
    /// # Errors
    ///
    /// Returns an error if the response carries no token.
    pub fn into_token(self) -> Result<String, RegistryError> {
        self.token
            .filter(|t| !t.is_empty())
            .or(self.access_token.filter(|t| !t.is_empty()))
            .ok_or_else(|| RegistryError::AuthenticationFailed {
                message: "token endpoint returned no token".to_string(),
            })
    }
}
