//! Image tag selectors.
//!
//! A selector turns one image subscription into an ordered, bounded list of
//! discovered image references. Each selection strategy decides which tags
//! qualify and how they rank; all of them share tag filtering, platform
//! matching and metadata enrichment through [`TagSource`].

mod digest;
mod lexical;
mod newest_build;
mod semver;

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use freightyard_core::{
    Credentials, DiscoveredImageReference, ImageSubscription, SelectionStrategy,
};
use regex::Regex;

use crate::client::RegistryClient;
use crate::config::{ClientOptions, RegistryAuth, RegistryConfig};
use crate::error::RegistryError;
use crate::oci::Platform;
use crate::reference::ImageRepository;

pub use self::digest::DigestSelector;
pub use self::lexical::LexicalSelector;
pub use self::newest_build::NewestBuildSelector;
pub use self::semver::SemverSelector;

/// Metadata the registry reports for one tag.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImageMetadata {
    /// Manifest digest the tag resolves to.
    pub digest: String,

    /// Build timestamp, if the image records one.
    pub created_at: Option<DateTime<Utc>>,

    /// Manifest annotations.
    pub annotations: BTreeMap<String, String>,
}

impl ImageMetadata {
    /// Converts the metadata into a discovered reference for `tag`.
    #[must_use]
    pub fn into_reference(self, tag: impl Into<String>) -> DiscoveredImageReference {
        let mut reference = DiscoveredImageReference::new(tag).with_digest(self.digest);
        reference.created_at = self.created_at;
        reference.annotations = self.annotations;
        reference
    }
}

/// Read access to one image repository.
#[async_trait]
pub trait TagSource: Send + Sync {
    /// Lists every tag in the repository.
    async fn list_tags(&self) -> Result<Vec<String>, RegistryError>;

    /// Fetches metadata for a tag.
    ///
    /// Returns `None` if the tag does not exist or has no image for
    /// `platform`.
    async fn image_metadata(
        &self,
        tag: &str,
        platform: Option<&Platform>,
    ) -> Result<Option<ImageMetadata>, RegistryError>;
}

#[async_trait]
impl TagSource for RegistryClient {
    async fn list_tags(&self) -> Result<Vec<String>, RegistryError> {
        Self::list_tags(self).await
    }

    async fn image_metadata(
        &self,
        tag: &str,
        platform: Option<&Platform>,
    ) -> Result<Option<ImageMetadata>, RegistryError> {
        Self::image_metadata(self, tag, platform).await
    }
}

/// Applies a subscription's strategy against its repository.
#[async_trait]
pub trait ImageSelector: Send + Sync {
    /// Returns true if the tag passes the subscription's filters and the
    /// strategy's own admission rule (e.g., satisfying a semver constraint).
    fn matches_tag(&self, tag: &str) -> bool;

    /// Queries the repository and returns qualifying references, best first.
    async fn select(&self) -> Result<Vec<DiscoveredImageReference>, RegistryError>;
}

/// Builds selectors for image subscriptions.
pub trait SelectorFactory: Send + Sync {
    /// Creates a selector for the subscription using the resolved credentials.
    ///
    /// # Errors
    ///
    /// Returns an error if the subscription is invalid for its strategy or a
    /// registry client cannot be built.
    fn new_selector(
        &self,
        subscription: &ImageSubscription,
        credentials: Option<&Credentials>,
    ) -> Result<Box<dyn ImageSelector>, RegistryError>;
}

/// Selector factory backed by real registry clients.
#[derive(Debug, Clone, Default)]
pub struct RegistrySelectorFactory {
    options: ClientOptions,
}

impl RegistrySelectorFactory {
    /// Creates a factory using the given client options.
    #[must_use]
    pub const fn new(options: ClientOptions) -> Self {
        Self { options }
    }
}

impl SelectorFactory for RegistrySelectorFactory {
    fn new_selector(
        &self,
        subscription: &ImageSubscription,
        credentials: Option<&Credentials>,
    ) -> Result<Box<dyn ImageSelector>, RegistryError> {
        let repository = ImageRepository::parse(&subscription.repo_url)?;
        let config = RegistryConfig::with_options(repository, &self.options)
            .with_auth(RegistryAuth::from_credentials(credentials))
            .insecure(subscription.insecure_skip_tls_verify);
        let client = RegistryClient::new(config)?;
        new_selector(subscription, Arc::new(client))
    }
}

/// Creates the selector for a subscription's strategy over `source`.
///
/// # Errors
///
/// Returns an error if the subscription's tag filters, platform or
/// constraint are invalid for its strategy.
pub fn new_selector(
    subscription: &ImageSubscription,
    source: Arc<dyn TagSource>,
) -> Result<Box<dyn ImageSelector>, RegistryError> {
    let base = SelectorBase::new(subscription, source)?;
    let selector: Box<dyn ImageSelector> = match subscription.image_selection_strategy {
        SelectionStrategy::SemVer => Box::new(SemverSelector::new(
            base,
            subscription.constraint.as_deref(),
            subscription.strict_semvers,
        )?),
        SelectionStrategy::Lexical => Box::new(LexicalSelector::new(base)),
        SelectionStrategy::NewestBuild => Box::new(NewestBuildSelector::new(base)),
        SelectionStrategy::Digest => Box::new(DigestSelector::new(
            base,
            subscription.constraint.as_deref(),
        )?),
    };
    Ok(selector)
}

/// Tag allow/ignore filters from a subscription.
#[derive(Debug, Clone, Default)]
pub struct TagFilter {
    allow: Option<Regex>,
    ignore: Vec<String>,
}

impl TagFilter {
    /// Builds a filter from an optional allow pattern and ignore list.
    ///
    /// # Errors
    ///
    /// Returns an error if the allow pattern is not a valid regular expression.
    pub fn new(allow: Option<&str>, ignore: &[String]) -> Result<Self, RegistryError> {
        let allow = allow
            .filter(|p| !p.is_empty())
            .map(|pattern| {
                Regex::new(pattern).map_err(|source| RegistryError::InvalidTagPattern {
                    pattern: pattern.to_string(),
                    source,
                })
            })
            .transpose()?;
        Ok(Self {
            allow,
            ignore: ignore.to_vec(),
        })
    }

    /// Returns true if the tag is allowed and not ignored.
    #[must_use]
    pub fn matches(&self, tag: &str) -> bool {
        !self.ignore.iter().any(|ignored| ignored == tag)
            && self.allow.as_ref().is_none_or(|allow| allow.is_match(tag))
    }
}

/// State and behavior shared by every strategy.
pub(crate) struct SelectorBase {
    source: Arc<dyn TagSource>,
    filter: TagFilter,
    platform: Option<Platform>,
    limit: usize,
    repo_url: String,
}

impl SelectorBase {
    fn new(
        subscription: &ImageSubscription,
        source: Arc<dyn TagSource>,
    ) -> Result<Self, RegistryError> {
        let platform = subscription
            .platform
            .as_deref()
            .filter(|p| !p.is_empty())
            .map(Platform::parse)
            .transpose()?;
        Ok(Self {
            source,
            filter: TagFilter::new(subscription.allow_tags.as_deref(), &subscription.ignore_tags)?,
            platform,
            limit: subscription.effective_discovery_limit(),
            repo_url: subscription.repo_url.clone(),
        })
    }

    /// Lists tags that pass the subscription filters.
    async fn filtered_tags(&self) -> Result<Vec<String>, RegistryError> {
        let tags = self.source.list_tags().await?;
        let total = tags.len();
        let tags: Vec<String> = tags.into_iter().filter(|t| self.filter.matches(t)).collect();
        tracing::debug!(
            repo_url = %self.repo_url,
            total,
            filtered = tags.len(),
            "Listed repository tags"
        );
        Ok(tags)
    }

    async fn metadata(&self, tag: &str) -> Result<Option<ImageMetadata>, RegistryError> {
        self.source.image_metadata(tag, self.platform.as_ref()).await
    }

    /// Resolves ranked candidates in order until the limit is reached.
    ///
    /// Tags without an image for the subscription's platform are skipped.
    async fn enrich(
        &self,
        ranked: Vec<String>,
    ) -> Result<Vec<DiscoveredImageReference>, RegistryError> {
        let mut references = Vec::with_capacity(ranked.len().min(self.limit));
        for tag in ranked {
            if references.len() >= self.limit {
                break;
            }
            match self.metadata(&tag).await? {
                Some(metadata) => references.push(metadata.into_reference(tag)),
                None => {
                    tracing::trace!(
                        repo_url = %self.repo_url,
                        tag = %tag,
                        "Skipping tag without matching image"
                    );
                }
            }
        }
        Ok(references)
    }
}
