//! Property-based tests for active-freight retention.
//!
//! These tests use proptest to verify the merge invariants across many
//! randomly generated discovered lists and active Freight sets.

use std::collections::HashSet;

use async_trait::async_trait;
use freightyard_core::{DiscoveredImageReference, Freight, Image, ImageSubscription};
use freightyard_registry::{ImageSelector, RegistryError};
use proptest::prelude::*;

use crate::retention::{RetentionEngine, RetentionSource};

const REPO: &str = "ghcr.io/acme/web";

/// Selector admitting tags that start with `v`.
struct VersionTags;

#[async_trait]
impl ImageSelector for VersionTags {
    fn matches_tag(&self, tag: &str) -> bool {
        tag.starts_with('v')
    }

    async fn select(&self) -> Result<Vec<DiscoveredImageReference>, RegistryError> {
        Ok(Vec::new())
    }
}

/// Strategy for generating tags, some of which the selector rejects.
fn tag_strategy() -> impl Strategy<Value = String> {
    "(v|x)[0-3]\\.[0-3]"
}

/// Strategy for generating fully enriched discovered references with unique tags.
fn discovered_strategy() -> impl Strategy<Value = Vec<DiscoveredImageReference>> {
    prop::collection::btree_set(tag_strategy(), 0..8).prop_map(|tags| {
        tags.into_iter()
            .map(|t| {
                let digest = format!("sha256:{t}");
                DiscoveredImageReference::new(t).with_digest(digest)
            })
            .collect()
    })
}

/// Strategy for generating Freight with images from this and another repository.
fn freight_strategy() -> impl Strategy<Value = Vec<Freight>> {
    prop::collection::vec(
        (
            prop::collection::vec((tag_strategy(), any::<bool>()), 1..4),
            any::<bool>(),
        ),
        0..6,
    )
    .prop_map(|specs| {
        specs
            .into_iter()
            .enumerate()
            .map(|(i, (images, active))| {
                let mut freight = Freight::from_warehouse("team", format!("f{i}"), "web");
                for (tag, same_repo) in images {
                    let repo = if same_repo { REPO } else { "ghcr.io/acme/other" };
                    freight = freight.with_image(Image::new(repo, tag));
                }
                if active {
                    freight = freight.in_stage("prod");
                }
                freight
            })
            .collect()
    })
}

fn retain_fresh(
    discovered: &[DiscoveredImageReference],
    freight: &[Freight],
) -> Vec<DiscoveredImageReference> {
    RetentionEngine::default().retain(
        &ImageSubscription::new(REPO),
        &VersionTags,
        discovered.to_vec(),
        RetentionSource::Fresh(freight),
    )
}

proptest! {
    /// Output never contains the same tag twice.
    #[test]
    fn output_has_no_duplicate_tags(
        discovered in discovered_strategy(),
        freight in freight_strategy(),
    ) {
        let out = retain_fresh(&discovered, &freight);
        let unique: HashSet<&str> = out.iter().map(|r| r.tag.as_str()).collect();
        prop_assert_eq!(unique.len(), out.len());
    }

    /// Discovered entries come first, unchanged and in order.
    #[test]
    fn output_starts_with_discovered(
        discovered in discovered_strategy(),
        freight in freight_strategy(),
    ) {
        let out = retain_fresh(&discovered, &freight);
        prop_assert!(out.len() >= discovered.len());
        prop_assert_eq!(&out[..discovered.len()], &discovered[..]);
    }

    /// Retained entries are sorted bare stubs for admitted active tags of this repository.
    #[test]
    fn retained_entries_are_gated_stubs(
        discovered in discovered_strategy(),
        freight in freight_strategy(),
    ) {
        let out = retain_fresh(&discovered, &freight);
        let active: HashSet<&str> = freight
            .iter()
            .filter(|f| f.is_active())
            .flat_map(|f| &f.images)
            .filter(|i| i.repo_url == REPO)
            .map(|i| i.tag.as_str())
            .collect();

        let retained = &out[discovered.len()..];
        for reference in retained {
            prop_assert!(reference.from_active_freight);
            prop_assert!(reference.digest.is_none());
            prop_assert!(reference.tag.starts_with('v'));
            prop_assert!(active.contains(reference.tag.as_str()));
        }
        prop_assert!(retained.windows(2).all(|w| w[0].tag < w[1].tag));
    }

    /// Every admitted active tag ends up in the output exactly once.
    #[test]
    fn admitted_active_tags_are_present(
        discovered in discovered_strategy(),
        freight in freight_strategy(),
    ) {
        let out = retain_fresh(&discovered, &freight);
        let tags: HashSet<&str> = out.iter().map(|r| r.tag.as_str()).collect();
        for image in freight.iter().filter(|f| f.is_active()).flat_map(|f| &f.images) {
            if image.repo_url == REPO && image.tag.starts_with('v') {
                prop_assert!(tags.contains(image.tag.as_str()));
            }
        }
    }

    /// Replaying from the cached fresh result yields the same output.
    #[test]
    fn cached_replay_matches_fresh(
        discovered in discovered_strategy(),
        freight in freight_strategy(),
    ) {
        let fresh = retain_fresh(&discovered, &freight);
        let cached = RetentionEngine::default().retain(
            &ImageSubscription::new(REPO),
            &VersionTags,
            discovered.clone(),
            RetentionSource::Cached(&fresh),
        );
        prop_assert_eq!(cached, fresh);
    }
}
