//! Mutable tag tracking.

use async_trait::async_trait;
use freightyard_core::{DiscoveredImageReference, SelectionStrategy};

use super::{ImageSelector, SelectorBase};
use crate::error::RegistryError;

/// Tracks the digest a single mutable tag (e.g., `latest`) points to.
///
/// The subscription constraint names the tag. At most one reference is
/// returned.
pub struct DigestSelector {
    base: SelectorBase,
    tag: String,
}

impl DigestSelector {
    pub(crate) fn new(base: SelectorBase, constraint: Option<&str>) -> Result<Self, RegistryError> {
        let tag = constraint
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .ok_or_else(|| RegistryError::MissingConstraint {
                strategy: SelectionStrategy::Digest.to_string(),
            })?;
        Ok(Self {
            base,
            tag: tag.to_string(),
        })
    }
}

#[async_trait]
impl ImageSelector for DigestSelector {
    fn matches_tag(&self, tag: &str) -> bool {
        tag == self.tag && self.base.filter.matches(tag)
    }

    async fn select(&self) -> Result<Vec<DiscoveredImageReference>, RegistryError> {
        if !self.base.filter.matches(&self.tag) {
            return Ok(Vec::new());
        }
        self.base.enrich(vec![self.tag.clone()]).await
    }
}
