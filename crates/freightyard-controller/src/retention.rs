//! Active-freight retention.
//!
//! A selector only returns the newest tags in its discovery window. Tags that
//! are still deployed to a Stage must nevertheless stay selectable, so the
//! retention engine merges them back into the discovered list, flagged with
//! `fromActiveFreight`.
//!
//! The active set comes either from a fresh activity query
//! ([`RetentionSource::Fresh`]) or, between generation changes, from the
//! retained entries of the previous discovery result
//! ([`RetentionSource::Cached`]).

use std::collections::{BTreeMap, BTreeSet, HashSet};

use freightyard_core::{
    DiscoveredImageReference, Freight, ImageSubscription, SelectionStrategy, Warehouse,
};
use freightyard_registry::ImageSelector;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::activity::FreightActivityIndex;
use crate::error::{DiscoveryError, Result};

/// Where the engine learns which tags are active.
#[derive(Debug, Clone, Copy)]
pub enum RetentionSource<'a> {
    /// Freight currently deployed to at least one Stage.
    ///
    /// The slice must already be scoped to the Warehouse being discovered.
    /// Only the image repository is checked here, not the Freight origin.
    Fresh(&'a [Freight]),

    /// References of the previous discovery result for the same repository.
    Cached(&'a [DiscoveredImageReference]),
}

/// Which subscriptions retention applies to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RetentionPolicy {
    /// Whether retention runs at all.
    pub enabled: bool,

    /// Strategies retention is limited to (`None` = every strategy).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strategies: Option<Vec<SelectionStrategy>>,
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self {
            enabled: true,
            strategies: None,
        }
    }
}

impl RetentionPolicy {
    /// Policy that never retains.
    #[must_use]
    pub const fn disabled() -> Self {
        Self {
            enabled: false,
            strategies: None,
        }
    }

    /// Policy limited to the given strategies.
    #[must_use]
    pub fn only(strategies: impl IntoIterator<Item = SelectionStrategy>) -> Self {
        Self {
            enabled: true,
            strategies: Some(strategies.into_iter().collect()),
        }
    }

    /// Returns true if retention applies to subscriptions using `strategy`.
    #[must_use]
    pub fn applies_to(&self, strategy: SelectionStrategy) -> bool {
        self.enabled
            && self
                .strategies
                .as_ref()
                .is_none_or(|strategies| strategies.contains(&strategy))
    }
}

/// Merges active tags into discovered references.
#[derive(Debug, Clone, Default)]
pub struct RetentionEngine {
    policy: RetentionPolicy,
}

impl RetentionEngine {
    /// Creates an engine with the given policy.
    #[must_use]
    pub const fn new(policy: RetentionPolicy) -> Self {
        Self { policy }
    }

    /// Returns the engine's policy.
    #[must_use]
    pub const fn policy(&self) -> &RetentionPolicy {
        &self.policy
    }

    /// Returns `discovered` followed by the retained references.
    ///
    /// Discovered entries are kept unchanged and in order. Retained entries
    /// are appended sorted by tag and are never duplicates of a discovered
    /// tag. Only tags the selector still matches are retained.
    #[must_use]
    pub fn retain(
        &self,
        subscription: &ImageSubscription,
        selector: &dyn ImageSelector,
        discovered: Vec<DiscoveredImageReference>,
        source: RetentionSource<'_>,
    ) -> Vec<DiscoveredImageReference> {
        if !self.policy.applies_to(subscription.image_selection_strategy) {
            trace!(
                repo = %subscription.repo_url,
                strategy = %subscription.image_selection_strategy,
                "Retention not applicable"
            );
            return discovered;
        }

        let known: HashSet<&str> = discovered.iter().map(|r| r.tag.as_str()).collect();
        let retained = match source {
            RetentionSource::Fresh(freight) => {
                Self::from_freight(subscription, selector, &known, freight)
            }
            RetentionSource::Cached(previous) => Self::from_previous(selector, &known, previous),
        };

        if retained.is_empty() {
            return discovered;
        }

        debug!(
            repo = %subscription.repo_url,
            count = discovered.len(),
            added = retained.len(),
            total = discovered.len() + retained.len(),
            "Retained active freight tags"
        );

        let mut merged = discovered;
        merged.extend(retained);
        merged
    }

    /// Queries active Freight for the Warehouse and retains from it.
    ///
    /// # Errors
    ///
    /// Returns [`DiscoveryError::ActivityIndexQueryFailed`] if the lookup fails.
    pub async fn retain_from_index(
        &self,
        index: &dyn FreightActivityIndex,
        warehouse: &Warehouse,
        subscription: &ImageSubscription,
        selector: &dyn ImageSelector,
        discovered: Vec<DiscoveredImageReference>,
    ) -> Result<Vec<DiscoveredImageReference>> {
        let freight = index
            .list_active_freight(warehouse.namespace(), warehouse.name())
            .await
            .map_err(|source| DiscoveryError::ActivityIndexQueryFailed {
                namespace: warehouse.namespace().to_string(),
                warehouse: warehouse.name().to_string(),
                source,
            })?;

        Ok(self.retain(
            subscription,
            selector,
            discovered,
            RetentionSource::Fresh(&freight),
        ))
    }

    fn from_freight(
        subscription: &ImageSubscription,
        selector: &dyn ImageSelector,
        known: &HashSet<&str>,
        freight: &[Freight],
    ) -> Vec<DiscoveredImageReference> {
        let mut active = BTreeSet::new();
        for image in freight
            .iter()
            .filter(|f| f.is_active())
            .flat_map(|f| &f.images)
            .filter(|image| image.repo_url == subscription.repo_url && !image.tag.is_empty())
        {
            if known.contains(image.tag.as_str()) {
                continue;
            }
            if !selector.matches_tag(&image.tag) {
                trace!(
                    repo = %subscription.repo_url,
                    tag = %image.tag,
                    "Active tag rejected by selector"
                );
                continue;
            }
            active.insert(image.tag.as_str());
        }

        active.into_iter().map(DiscoveredImageReference::retained).collect()
    }

    fn from_previous(
        selector: &dyn ImageSelector,
        known: &HashSet<&str>,
        previous: &[DiscoveredImageReference],
    ) -> Vec<DiscoveredImageReference> {
        let mut retained = BTreeMap::new();
        for reference in previous.iter().filter(|r| r.from_active_freight) {
            let tag = reference.tag.as_str();
            if known.contains(tag) || retained.contains_key(tag) {
                continue;
            }
            if !selector.matches_tag(&reference.tag) {
                trace!(tag = %reference.tag, "Previously retained tag rejected by selector");
                continue;
            }
            retained.insert(tag, reference.clone());
        }

        retained.into_values().collect()
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use freightyard_core::{Image, ObjectMeta, RepoSubscription};
    use freightyard_registry::RegistryError;

    use super::*;
    use crate::activity::InMemoryFreightIndex;
    use crate::error::BoxError;

    const REPO: &str = "ghcr.io/acme/web";

    /// Selector matching every tag with the given prefix.
    struct PrefixSelector(&'static str);

    #[async_trait]
    impl ImageSelector for PrefixSelector {
        fn matches_tag(&self, tag: &str) -> bool {
            tag.starts_with(self.0)
        }

        async fn select(
            &self,
        ) -> std::result::Result<Vec<DiscoveredImageReference>, RegistryError> {
            Ok(Vec::new())
        }
    }

    struct FailingIndex;

    #[async_trait]
    impl FreightActivityIndex for FailingIndex {
        async fn list_active_freight(
            &self,
            _namespace: &str,
            _warehouse: &str,
        ) -> std::result::Result<Vec<Freight>, BoxError> {
            Err("connection reset".into())
        }
    }

    fn subscription() -> ImageSubscription {
        ImageSubscription::new(REPO)
    }

    fn warehouse() -> Warehouse {
        Warehouse::new(ObjectMeta::new("team", "web"))
            .with_subscription(RepoSubscription::image(subscription()))
    }

    fn discovered(tags: &[&str]) -> Vec<DiscoveredImageReference> {
        tags.iter()
            .map(|t| DiscoveredImageReference::new(*t).with_digest(format!("sha256:{t}")))
            .collect()
    }

    fn active(name: &str, warehouse: &str, tag: &str, stage: &str) -> Freight {
        Freight::from_warehouse("team", name, warehouse)
            .with_image(Image::new(REPO, tag).with_digest(format!("sha256:{tag}")))
            .in_stage(stage)
    }

    fn tags(references: &[DiscoveredImageReference]) -> Vec<&str> {
        references.iter().map(|r| r.tag.as_str()).collect()
    }

    async fn from_index(
        engine: &RetentionEngine,
        index: &dyn FreightActivityIndex,
        prefix: &'static str,
        discovered: Vec<DiscoveredImageReference>,
    ) -> Result<Vec<DiscoveredImageReference>> {
        engine
            .retain_from_index(
                index,
                &warehouse(),
                &subscription(),
                &PrefixSelector(prefix),
                discovered,
            )
            .await
    }

    fn fresh(
        engine: &RetentionEngine,
        subscription: &ImageSubscription,
        discovered: Vec<DiscoveredImageReference>,
        freight: &[Freight],
    ) -> Vec<DiscoveredImageReference> {
        engine.retain(
            subscription,
            &PrefixSelector("v"),
            discovered,
            RetentionSource::Fresh(freight),
        )
    }

    #[tokio::test]
    async fn test_no_freight_keeps_discovered() {
        let engine = RetentionEngine::default();
        let index = InMemoryFreightIndex::new();
        let out = from_index(&engine, &index, "v", discovered(&["v1.0.0", "v1.0.1"]))
            .await
            .unwrap();
        assert_eq!(tags(&out), vec!["v1.0.0", "v1.0.1"]);
    }

    #[tokio::test]
    async fn test_active_tag_outside_window_is_retained() {
        let engine = RetentionEngine::default();
        let index =
            InMemoryFreightIndex::from_freight(vec![active("f1", "web", "v0.9.0", "prod")]);
        let out = from_index(&engine, &index, "v", discovered(&["v1.0.0", "v1.0.1"]))
            .await
            .unwrap();

        assert_eq!(tags(&out), vec!["v1.0.0", "v1.0.1", "v0.9.0"]);
        let stub = &out[2];
        assert!(stub.from_active_freight);
        assert!(stub.digest.is_none());
        assert!(stub.created_at.is_none());
        assert!(stub.annotations.is_empty());
    }

    #[tokio::test]
    async fn test_discovered_entry_wins_over_active() {
        let engine = RetentionEngine::default();
        let index =
            InMemoryFreightIndex::from_freight(vec![active("f1", "web", "v1.0.0", "prod")]);
        let out = from_index(&engine, &index, "v", discovered(&["v1.0.0"])).await.unwrap();

        assert_eq!(out.len(), 1);
        assert_eq!(out[0].digest.as_deref(), Some("sha256:v1.0.0"));
        assert!(!out[0].from_active_freight);
    }

    #[tokio::test]
    async fn test_tags_from_several_stages() {
        let engine = RetentionEngine::default();
        let index = InMemoryFreightIndex::from_freight(vec![
            active("f1", "web", "v1.0.1", "stage-b"),
            active("f2", "web", "v1.0.0", "stage-a"),
        ]);
        let out = from_index(&engine, &index, "v", discovered(&["v1.0.2"])).await.unwrap();

        assert_eq!(tags(&out), vec!["v1.0.2", "v1.0.0", "v1.0.1"]);
        assert!(!out[0].from_active_freight);
        assert!(out[1].from_active_freight && out[2].from_active_freight);
    }

    #[tokio::test]
    async fn test_other_warehouse_contributes_nothing() {
        let engine = RetentionEngine::default();
        let index =
            InMemoryFreightIndex::from_freight(vec![active("f1", "api", "v0.9.0", "prod")]);
        let out = from_index(&engine, &index, "v", discovered(&["v1.0.0"])).await.unwrap();
        assert_eq!(tags(&out), vec!["v1.0.0"]);
    }

    #[tokio::test]
    async fn test_selector_gates_active_tags() {
        let engine = RetentionEngine::default();
        let index = InMemoryFreightIndex::from_freight(vec![
            active("f1", "web", "v2.0.0", "prod"),
            active("f2", "web", "v1.5.0", "dev"),
        ]);
        let out = from_index(&engine, &index, "v1.", discovered(&["v1.0.0"])).await.unwrap();
        assert_eq!(tags(&out), vec!["v1.0.0", "v1.5.0"]);
    }

    #[tokio::test]
    async fn test_index_failure_is_forwarded() {
        let engine = RetentionEngine::default();
        let err = from_index(&engine, &FailingIndex, "v", Vec::new()).await.unwrap_err();
        assert!(matches!(
            err,
            DiscoveryError::ActivityIndexQueryFailed { ref namespace, ref warehouse, .. }
                if namespace == "team" && warehouse == "web"
        ));
    }

    #[test]
    fn test_other_repository_and_empty_tags_ignored() {
        let engine = RetentionEngine::default();
        let freight = vec![
            Freight::from_warehouse("team", "f1", "web")
                .with_image(Image::new("ghcr.io/acme/api", "v0.1.0"))
                .with_image(Image::new(REPO, ""))
                .in_stage("prod"),
        ];
        let out = engine.retain(
            &subscription(),
            &PrefixSelector(""),
            discovered(&["v1"]),
            RetentionSource::Fresh(&freight),
        );
        assert_eq!(tags(&out), vec!["v1"]);
    }

    #[test]
    fn test_fresh_source_is_taken_as_scoped() {
        let engine = RetentionEngine::default();
        let freight = vec![active("f1", "api", "v0.9.0", "prod")];
        let out = fresh(&engine, &subscription(), discovered(&["v1.0.0"]), &freight);
        assert_eq!(tags(&out), vec!["v1.0.0", "v0.9.0"]);
    }

    #[test]
    fn test_inactive_freight_ignored() {
        let engine = RetentionEngine::default();
        let freight = vec![
            Freight::from_warehouse("team", "f1", "web").with_image(Image::new(REPO, "v0.1.0")),
        ];
        let out = fresh(&engine, &subscription(), Vec::new(), &freight);
        assert!(out.is_empty());
    }

    #[test]
    fn test_cached_mode_readmits_retained_entries_with_metadata() {
        let engine = RetentionEngine::default();
        let previous = vec![
            DiscoveredImageReference::new("v1.0.3").with_digest("sha256:old"),
            DiscoveredImageReference::retained("v0.9.0").with_digest("sha256:kept"),
            DiscoveredImageReference::retained("v0.8.0"),
            DiscoveredImageReference::retained("v1.0.4"),
            DiscoveredImageReference::retained("x-legacy"),
        ];
        let out = engine.retain(
            &subscription(),
            &PrefixSelector("v"),
            discovered(&["v1.0.4", "v1.0.5"]),
            RetentionSource::Cached(&previous),
        );

        assert_eq!(tags(&out), vec!["v1.0.4", "v1.0.5", "v0.8.0", "v0.9.0"]);
        assert!(!out[0].from_active_freight);
        assert_eq!(out[3].digest.as_deref(), Some("sha256:kept"));
    }

    #[test]
    fn test_policy_scope() {
        let freight = vec![active("f1", "web", "v0.9.0", "prod")];

        let disabled = RetentionEngine::new(RetentionPolicy::disabled());
        let out = fresh(&disabled, &subscription(), discovered(&["v1.0.0"]), &freight);
        assert_eq!(out.len(), 1);

        let lexical_only =
            RetentionEngine::new(RetentionPolicy::only([SelectionStrategy::Lexical]));
        let out = fresh(&lexical_only, &subscription(), discovered(&["v1.0.0"]), &freight);
        assert_eq!(out.len(), 1);

        let lexical = subscription().with_strategy(SelectionStrategy::Lexical);
        let out = fresh(&lexical_only, &lexical, discovered(&["v1.0.0"]), &freight);
        assert_eq!(tags(&out), vec!["v1.0.0", "v0.9.0"]);
    }

    #[test]
    fn test_policy_yaml() {
        let policy: RetentionPolicy =
            serde_yaml::from_str("strategies: [SemVer, Digest]").unwrap();
        assert!(policy.enabled);
        assert!(policy.applies_to(SelectionStrategy::Digest));
        assert!(!policy.applies_to(SelectionStrategy::NewestBuild));
    }
}
