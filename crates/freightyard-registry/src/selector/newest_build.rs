//! Build-time selection.

use std::cmp::Ordering;

use async_trait::async_trait;
use freightyard_core::DiscoveredImageReference;

use super::{ImageSelector, SelectorBase};
use crate::error::RegistryError;

/// Selects the most recently built images.
///
/// The build time is only known after fetching each tag's metadata, so every
/// filtered tag is resolved before ranking. Images without a build time rank
/// last.
pub struct NewestBuildSelector {
    base: SelectorBase,
}

impl NewestBuildSelector {
    pub(crate) const fn new(base: SelectorBase) -> Self {
        Self { base }
    }
}

#[async_trait]
impl ImageSelector for NewestBuildSelector {
    fn matches_tag(&self, tag: &str) -> bool {
        self.base.filter.matches(tag)
    }

    async fn select(&self) -> Result<Vec<DiscoveredImageReference>, RegistryError> {
        let tags = self.base.filtered_tags().await?;

        let mut references = Vec::with_capacity(tags.len());
        for tag in tags {
            if let Some(metadata) = self.base.metadata(&tag).await? {
                references.push(metadata.into_reference(tag));
            }
        }

        references.sort_by(|a, b| match (&a.created_at, &b.created_at) {
            (Some(a_time), Some(b_time)) => b_time.cmp(a_time).then_with(|| b.tag.cmp(&a.tag)),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => b.tag.cmp(&a.tag),
        });
        references.truncate(self.base.limit);
        Ok(references)
    }
}
