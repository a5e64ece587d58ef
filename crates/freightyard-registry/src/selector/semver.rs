//! Semantic version selection.

use async_trait::async_trait;
use freightyard_core::DiscoveredImageReference;

use super::{ImageSelector, SelectorBase};
use crate::error::RegistryError;
use crate::version::{Version, VersionConstraint};

/// Selects tags that parse as semantic versions, newest version first.
pub struct SemverSelector {
    base: SelectorBase,
    constraint: Option<VersionConstraint>,
    strict: bool,
}

impl SemverSelector {
    pub(crate) fn new(
        base: SelectorBase,
        constraint: Option<&str>,
        strict: bool,
    ) -> Result<Self, RegistryError> {
        let constraint = constraint
            .filter(|c| !c.trim().is_empty())
            .map(VersionConstraint::parse)
            .transpose()?;
        Ok(Self {
            base,
            constraint,
            strict,
        })
    }

    fn version(&self, tag: &str) -> Option<Version> {
        let version = Version::parse(tag, self.strict)?;
        self.constraint
            .as_ref()
            .is_none_or(|c| c.matches(&version))
            .then_some(version)
    }
}

#[async_trait]
impl ImageSelector for SemverSelector {
    fn matches_tag(&self, tag: &str) -> bool {
        self.base.filter.matches(tag) && self.version(tag).is_some()
    }

    async fn select(&self) -> Result<Vec<DiscoveredImageReference>, RegistryError> {
        let mut ranked: Vec<(Version, String)> = self
            .base
            .filtered_tags()
            .await?
            .into_iter()
            .filter_map(|tag| self.version(&tag).map(|v| (v, tag)))
            .collect();
        ranked.sort_by(|a, b| b.cmp(a));

        self.base
            .enrich(ranked.into_iter().map(|(_, tag)| tag).collect())
            .await
    }
}
