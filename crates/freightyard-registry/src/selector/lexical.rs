//! Lexical tag selection.

use async_trait::async_trait;
use freightyard_core::DiscoveredImageReference;

use super::{ImageSelector, SelectorBase};
use crate::error::RegistryError;

/// Selects tags in reverse lexical order.
///
/// Suited to tags that embed a sortable timestamp or build number such as
/// `nightly-20260105`.
pub struct LexicalSelector {
    base: SelectorBase,
}

impl LexicalSelector {
    pub(crate) const fn new(base: SelectorBase) -> Self {
        Self { base }
    }
}

#[async_trait]
impl ImageSelector for LexicalSelector {
    fn matches_tag(&self, tag: &str) -> bool {
        self.base.filter.matches(tag)
    }

    async fn select(&self) -> Result<Vec<DiscoveredImageReference>, RegistryError> {
        let mut tags = self.base.filtered_tags().await?;
        tags.sort_unstable_by(|a, b| b.cmp(a));
        tags.dedup();
        self.base.enrich(tags).await
    }
}
