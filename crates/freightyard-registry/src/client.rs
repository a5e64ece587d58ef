//! OCI Distribution API client for image discovery.
//!
//! This module provides the read-only client used to list tags and resolve
//! image metadata in OCI-compatible container registries.

use parking_lot::Mutex;
use reqwest::header::{
    HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE, LINK, WWW_AUTHENTICATE,
};
use reqwest::{Response, StatusCode};
use sha2::{Digest, Sha256};
use url::Url;

use crate::auth::{Challenge, TokenResponse};
use crate::config::{RegistryAuth, RegistryConfig};
use crate::error::RegistryError;
use crate::oci::{ImageConfig, ImageIndex, Manifest, MediaType, Platform, TagList};
use crate::selector::ImageMetadata;

/// Upper bound on tag list pages followed for one repository.
const MAX_TAG_PAGES: usize = 1000;

/// Manifest annotation carrying the image build time.
const CREATED_ANNOTATION: &str = "org.opencontainers.image.created";

const DIGEST_HEADER: &str = "docker-content-digest";

/// Client for reading one OCI-compatible image repository.
#[derive(Debug)]
pub struct RegistryClient {
    config: RegistryConfig,
    http: reqwest::Client,
    token: Mutex<Option<String>>,
}

impl RegistryClient {
    /// Creates a new registry client with the given configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use freightyard_registry::{ImageRepository, RegistryClient, RegistryConfig};
    ///
    /// let repo = ImageRepository::parse("ghcr.io/acme/web")?;
    /// let client = RegistryClient::new(RegistryConfig::new(repo))?;
    /// # Ok::<(), freightyard_registry::RegistryError>(())
    /// ```
    pub fn new(config: RegistryConfig) -> Result<Self, RegistryError> {
        let http = Self::build_http_client(&config)?;

        Ok(Self {
            config,
            http,
            token: Mutex::new(None),
        })
    }

    /// Returns the registry configuration.
    #[must_use]
    pub const fn config(&self) -> &RegistryConfig {
        &self.config
    }

    /// Lists all tags in the repository, following pagination links.
    ///
    /// A repository that does not exist has no tags.
    ///
    /// # Errors
    ///
    /// Returns an error if the tags cannot be retrieved.
    pub async fn list_tags(&self) -> Result<Vec<String>, RegistryError> {
        let mut next = Some(format!(
            "{}/tags/list?n={}",
            self.config.repository_url(),
            self.config.page_size
        ));
        let mut tags = Vec::new();
        let mut pages = 0;

        while let Some(url) = next.take() {
            pages += 1;
            if pages > MAX_TAG_PAGES {
                tracing::warn!(
                    repository = %self.config.repository,
                    pages = MAX_TAG_PAGES,
                    "Stopped following tag list pages"
                );
                break;
            }

            let response = self.get(&url, None).await?;
            if response.status() == StatusCode::NOT_FOUND {
                break;
            }
            let response = Self::check_status(response).await?;

            next = Self::next_page(&url, response.headers())?;
            let page: TagList = response.json().await?;
            tags.extend(page.tags.unwrap_or_default());
        }

        tracing::debug!(
            repository = %self.config.repository,
            tags = tags.len(),
            pages,
            "Listed tags"
        );
        Ok(tags)
    }

    /// Resolves a tag to its digest, build time and annotations.
    ///
    /// For a multi-platform index and a requested platform, the metadata of
    /// the matching platform manifest is returned. Without a platform the
    /// index itself is described.
    ///
    /// # Returns
    ///
    /// `None` if the tag does not exist or has no image for the platform.
    ///
    /// # Errors
    ///
    /// Returns an error if the manifest or config cannot be fetched or parsed.
    pub async fn image_metadata(
        &self,
        tag: &str,
        platform: Option<&Platform>,
    ) -> Result<Option<ImageMetadata>, RegistryError> {
        let Some((digest, media_type, body)) = self.fetch_manifest(tag).await? else {
            return Ok(None);
        };

        if MediaType::is_index(&media_type) {
            let index: ImageIndex = serde_json::from_slice(&body)?;
            let Some(platform) = platform else {
                let created_at = Self::created_annotation(&index.annotations);
                return Ok(Some(ImageMetadata {
                    digest,
                    created_at,
                    annotations: index.annotations,
                }));
            };

            let Some(descriptor) = index.find_platform(platform) else {
                tracing::trace!(tag, platform = %platform, "Index has no manifest for platform");
                return Ok(None);
            };
            let child = descriptor.digest.clone();
            let Some((digest, media_type, body)) = self.fetch_manifest(&child).await? else {
                return Ok(None);
            };
            if !MediaType::is_manifest(&media_type) {
                return Err(RegistryError::UnsupportedMediaType { media_type });
            }
            let manifest: Manifest = serde_json::from_slice(&body)?;
            return self.describe(digest, manifest, None).await;
        }

        if MediaType::is_manifest(&media_type) {
            let manifest: Manifest = serde_json::from_slice(&body)?;
            return self.describe(digest, manifest, platform).await;
        }

        Err(RegistryError::UnsupportedMediaType { media_type })
    }

    /// Builds metadata for a single-platform manifest.
    async fn describe(
        &self,
        digest: String,
        manifest: Manifest,
        platform: Option<&Platform>,
    ) -> Result<Option<ImageMetadata>, RegistryError> {
        let config = self.fetch_config(&manifest.config.digest).await?;
        if let Some(platform) = platform {
            if !config.matches_platform(platform) {
                return Ok(None);
            }
        }

        let created_at = config
            .created_at()
            .or_else(|| Self::created_annotation(&manifest.annotations));
        Ok(Some(ImageMetadata {
            digest,
            created_at,
            annotations: manifest.annotations,
        }))
    }

    /// Fetches a manifest by tag or digest.
    ///
    /// Returns the content digest, media type and raw body.
    async fn fetch_manifest(
        &self,
        reference: &str,
    ) -> Result<Option<(String, String, Vec<u8>)>, RegistryError> {
        let url = format!("{}/manifests/{reference}", self.config.repository_url());
        let accept = MediaType::manifest_accept();

        let response = self.get(&url, Some(&accept)).await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let response = Self::check_status(response).await?;

        let headers = response.headers();
        let header_digest = headers
            .get(DIGEST_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(ToString::to_string);
        let header_media_type = headers
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.split(';').next().unwrap_or(v).trim().to_string());

        let body = response.bytes().await?.to_vec();
        let digest = header_digest.unwrap_or_else(|| Self::compute_digest(&body));
        let media_type = Self::detect_media_type(header_media_type, &body)?;

        Ok(Some((digest, media_type, body)))
    }

    /// Fetches and parses an image config blob.
    async fn fetch_config(&self, digest: &str) -> Result<ImageConfig, RegistryError> {
        let url = format!("{}/blobs/{digest}", self.config.repository_url());
        let response = Self::check_status(self.get(&url, None).await?).await?;
        let body = response.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }

    /// Sends a GET, answering one bearer challenge if the registry issues it.
    async fn get(&self, url: &str, accept: Option<&str>) -> Result<Response, RegistryError> {
        let response = self.send(url, accept).await?;
        if response.status() != StatusCode::UNAUTHORIZED {
            return Ok(response);
        }

        let challenge = response
            .headers()
            .get(WWW_AUTHENTICATE)
            .and_then(|v| v.to_str().ok())
            .and_then(Challenge::parse);

        match challenge {
            Some(challenge @ Challenge::Bearer { .. }) => {
                let token = self.fetch_token(&challenge).await?;
                *self.token.lock() = Some(token);
                let response = self.send(url, accept).await?;
                if response.status() == StatusCode::UNAUTHORIZED {
                    return Err(RegistryError::AuthenticationFailed {
                        message: format!("registry rejected token for {}", self.config.repository),
                    });
                }
                Ok(response)
            }
            _ => Err(RegistryError::AuthenticationFailed {
                message: format!("registry rejected credentials for {}", self.config.repository),
            }),
        }
    }

    async fn send(&self, url: &str, accept: Option<&str>) -> Result<Response, RegistryError> {
        let mut request = self.http.get(url).headers(self.auth_headers()?);
        if let Some(accept) = accept {
            request = request.header(ACCEPT, accept);
        }
        Ok(request.send().await?)
    }

    /// Exchanges the configured credentials for a bearer token.
    async fn fetch_token(&self, challenge: &Challenge) -> Result<String, RegistryError> {
        let scope = format!("repository:{}:pull", self.config.repository.path);
        let url = challenge.token_url(&scope)?;

        let mut request = self.http.get(url.as_str());
        if let RegistryAuth::Basic { username, password } = &self.config.auth {
            request = request.basic_auth(username, Some(password));
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            return Err(RegistryError::AuthenticationFailed {
                message: format!(
                    "token request to {} failed with {}",
                    url.host_str().unwrap_or("realm"),
                    response.status()
                ),
            });
        }

        tracing::debug!(repository = %self.config.repository, "Obtained registry token");
        response.json::<TokenResponse>().await?.into_token()
    }

    async fn check_status(response: Response) -> Result<Response, RegistryError> {
        if response.status().is_success() {
            return Ok(response);
        }
        Err(RegistryError::HttpError {
            status: response.status().as_u16(),
            message: response.text().await.unwrap_or_default(),
        })
    }

    /// Resolves the `rel="next"` target of a `Link` header against `current`.
    fn next_page(current: &str, headers: &HeaderMap) -> Result<Option<String>, RegistryError> {
        let Some(link) = headers.get(LINK).and_then(|v| v.to_str().ok()) else {
            return Ok(None);
        };

        let Some(target) = link.split(',').find_map(|entry| {
            let (target, params) = entry.split_once(';')?;
            params
                .contains("rel=\"next\"")
                .then(|| target.trim().trim_start_matches('<').trim_end_matches('>'))
        }) else {
            return Ok(None);
        };

        let base = Url::parse(current).map_err(|_| RegistryError::InvalidUrl {
            url: current.to_string(),
        })?;
        let next = base.join(target).map_err(|_| RegistryError::InvalidUrl {
            url: target.to_string(),
        })?;
        Ok(Some(next.to_string()))
    }

    /// Determines the manifest media type from the response or the body.
    fn detect_media_type(header: Option<String>, body: &[u8]) -> Result<String, RegistryError> {
        let known = |m: &String| MediaType::is_index(m) || MediaType::is_manifest(m);
        if let Some(media_type) = header.filter(known) {
            return Ok(media_type);
        }

        let value: serde_json::Value = serde_json::from_slice(body)?;
        if let Some(media_type) = value.get("mediaType").and_then(serde_json::Value::as_str) {
            return Ok(media_type.to_string());
        }
        if value.get("manifests").is_some() {
            return Ok(MediaType::OCI_INDEX.to_string());
        }
        if value.get("config").is_some() {
            return Ok(MediaType::OCI_MANIFEST.to_string());
        }
        Err(RegistryError::UnsupportedMediaType {
            media_type: "unknown".to_string(),
        })
    }

    fn created_annotation(
        annotations: &std::collections::BTreeMap<String, String>,
    ) -> Option<chrono::DateTime<chrono::Utc>> {
        ImageConfig {
            created: annotations.get(CREATED_ANNOTATION).cloned(),
            ..ImageConfig::default()
        }
        .created_at()
    }

    /// Builds the HTTP client with proper configuration.
    fn build_http_client(config: &RegistryConfig) -> Result<reqwest::Client, RegistryError> {
        let mut builder = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(&config.user_agent);

        if config.insecure_skip_verify {
            builder = builder.danger_accept_invalid_certs(true);
        }

        builder.build().map_err(|e| RegistryError::ConnectionFailed {
            url: config.repository.base_url(),
            source: e,
        })
    }

    /// Creates authentication headers based on configuration.
    ///
    /// A token obtained from a challenge takes precedence over configured
    /// credentials.
    fn auth_headers(&self) -> Result<HeaderMap, RegistryError> {
        let mut headers = HeaderMap::new();

        if let Some(token) = self.token.lock().as_deref() {
            headers.insert(AUTHORIZATION, Self::header_value(&format!("Bearer {token}"))?);
            return Ok(headers);
        }

        match &self.config.auth {
            RegistryAuth::None => {}
            RegistryAuth::Basic { username, password } => {
                let credentials = base64::Engine::encode(
                    &base64::engine::general_purpose::STANDARD,
                    format!("{username}:{password}"),
                );
                headers.insert(AUTHORIZATION, Self::header_value(&format!("Basic {credentials}"))?);
            }
            RegistryAuth::Bearer { token } => {
                headers.insert(AUTHORIZATION, Self::header_value(&format!("Bearer {token}"))?);
            }
        }

        Ok(headers)
    }

    fn header_value(value: &str) -> Result<HeaderValue, RegistryError> {
        HeaderValue::from_str(value).map_err(|_| RegistryError::AuthenticationFailed {
            message: "Invalid credentials".to_string(),
        })
    }

    /// Computes SHA-256 digest of data.
    fn compute_digest(data: &[u8]) -> String {
        let mut hasher = Sha256::new();
        hasher.update(data);
        format!("sha256:{}", hex::encode(hasher.finalize()))
    }
}
