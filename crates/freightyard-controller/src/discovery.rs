//! Warehouse image discovery.
//!
//! One discovery pass walks a Warehouse's image subscriptions in declared
//! order, queries each repository through its selector and merges in tags
//! held by active Freight. The pass is all-or-nothing: the first failure
//! aborts it and no partial result is returned.

use std::sync::Arc;

use freightyard_core::{CredentialType, DiscoveredArtifacts, ImageDiscoveryResult, Warehouse};
use freightyard_registry::{RegistrySelectorFactory, SelectorFactory};
use tracing::{debug, info, instrument};
use uuid::Uuid;

use crate::activity::FreightActivityIndex;
use crate::config::DiscoveryConfig;
use crate::credentials::CredentialStore;
use crate::error::{DiscoveryError, Result};
use crate::retention::{RetentionEngine, RetentionSource};

/// Returns true if the pass must query live Freight activity.
///
/// That is the case on the first discovery and whenever the spec changed
/// since the last recorded one. Otherwise the retained entries persisted in
/// status are reused.
#[must_use]
pub fn needs_fresh_activity(warehouse: &Warehouse) -> bool {
    warehouse.status.discovered_artifacts.is_none()
        || warehouse.status.observed_generation != warehouse.metadata.generation
}

/// Discovers images for Warehouse subscriptions.
pub struct ImageDiscoverer {
    credentials: Arc<dyn CredentialStore>,
    activity: Arc<dyn FreightActivityIndex>,
    selectors: Arc<dyn SelectorFactory>,
    retention: RetentionEngine,
}

impl ImageDiscoverer {
    /// Creates a discoverer with the default retention policy.
    #[must_use]
    pub fn new(
        credentials: Arc<dyn CredentialStore>,
        activity: Arc<dyn FreightActivityIndex>,
        selectors: Arc<dyn SelectorFactory>,
    ) -> Self {
        Self {
            credentials,
            activity,
            selectors,
            retention: RetentionEngine::default(),
        }
    }

    /// Creates a discoverer that talks to real registries.
    #[must_use]
    pub fn from_config(
        config: &DiscoveryConfig,
        credentials: Arc<dyn CredentialStore>,
        activity: Arc<dyn FreightActivityIndex>,
    ) -> Self {
        Self::new(
            credentials,
            activity,
            Arc::new(RegistrySelectorFactory::new(config.registry.clone())),
        )
        .with_retention(RetentionEngine::new(config.retention.clone()))
    }

    /// Replaces the retention engine.
    #[must_use]
    pub fn with_retention(mut self, retention: RetentionEngine) -> Self {
        self.retention = retention;
        self
    }

    /// Runs one pass and stamps the result for persisting in status.
    ///
    /// # Errors
    ///
    /// See [`discover_images`](Self::discover_images).
    #[instrument(
        skip_all,
        fields(
            pass_id = %Uuid::now_v7(),
            namespace = %warehouse.namespace(),
            warehouse = %warehouse.name(),
        )
    )]
    pub async fn discover(&self, warehouse: &Warehouse) -> Result<DiscoveredArtifacts> {
        let images = self.discover_images(warehouse).await?;
        let references: usize = images.iter().map(|i| i.references.len()).sum();
        info!(repositories = images.len(), references, "Discovery pass complete");
        Ok(DiscoveredArtifacts::new(images))
    }

    /// Discovers images for every image subscription, in declared order.
    ///
    /// Active Freight is listed at most once per call and only when
    /// [`needs_fresh_activity`] holds. Otherwise retention reuses the previous
    /// result for each repository.
    ///
    /// # Errors
    ///
    /// Returns the first credential, selector, registry or activity failure.
    pub async fn discover_images(
        &self,
        warehouse: &Warehouse,
    ) -> Result<Vec<ImageDiscoveryResult>> {
        let subscriptions: Vec<_> = warehouse.image_subscriptions().collect();
        if subscriptions.is_empty() {
            return Ok(Vec::new());
        }

        let active = if needs_fresh_activity(warehouse) {
            let freight = self
                .activity
                .list_active_freight(warehouse.namespace(), warehouse.name())
                .await
                .map_err(|source| DiscoveryError::ActivityIndexQueryFailed {
                    namespace: warehouse.namespace().to_string(),
                    warehouse: warehouse.name().to_string(),
                    source,
                })?;
            debug!(active = freight.len(), "Listed active freight");
            Some(freight)
        } else {
            debug!("Reusing retained tags from previous discovery");
            None
        };

        let mut results = Vec::with_capacity(subscriptions.len());
        for subscription in subscriptions {
            let repo_url = &subscription.repo_url;

            let credentials = self
                .credentials
                .get(warehouse.namespace(), CredentialType::Image, repo_url)
                .await
                .map_err(|source| DiscoveryError::CredentialLookupFailed {
                    repo_url: repo_url.clone(),
                    source,
                })?;
            if credentials.is_none() {
                debug!(repo = %repo_url, "No credentials found, using anonymous access");
            }

            let selector = self
                .selectors
                .new_selector(subscription, credentials.as_ref())
                .map_err(|source| DiscoveryError::SelectorConstructionFailed {
                    repo_url: repo_url.clone(),
                    source,
                })?;

            let discovered = selector.select().await.map_err(|source| {
                DiscoveryError::RegistryDiscoveryFailed {
                    repo_url: repo_url.clone(),
                    source,
                }
            })?;

            let source = match &active {
                Some(freight) => RetentionSource::Fresh(freight),
                None => RetentionSource::Cached(
                    warehouse
                        .previous_image_discovery(repo_url)
                        .map_or(&[][..], |previous| previous.references.as_slice()),
                ),
            };
            let references = self
                .retention
                .retain(subscription, selector.as_ref(), discovered, source);

            if references.is_empty() {
                debug!(repo = %repo_url, "Discovered no images");
            } else {
                debug!(repo = %repo_url, count = references.len(), "Discovered images");
            }

            results.push(
                ImageDiscoveryResult::new(repo_url.clone(), subscription.platform.clone())
                    .with_references(references),
            );
        }

        Ok(results)
    }
}

impl std::fmt::Debug for ImageDiscoverer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageDiscoverer")
            .field("retention", &self.retention)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use freightyard_core::{DiscoveredArtifacts, ObjectMeta, WarehouseStatus};

    use super::*;

    fn warehouse() -> Warehouse {
        Warehouse::new(ObjectMeta::new("team", "web").with_generation(3))
    }

    #[test]
    fn test_fresh_activity_on_first_discovery() {
        assert!(needs_fresh_activity(&warehouse()));
    }

    #[test]
    fn test_fresh_activity_on_generation_change() {
        let mut status = WarehouseStatus::default();
        status.record_discovery(2, DiscoveredArtifacts::new(Vec::new()));
        assert!(needs_fresh_activity(&warehouse().with_status(status)));
    }

    #[test]
    fn test_cache_reuse_when_generation_observed() {
        let mut status = WarehouseStatus::default();
        status.record_discovery(3, DiscoveredArtifacts::new(Vec::new()));
        assert!(!needs_fresh_activity(&warehouse().with_status(status)));
    }
}
