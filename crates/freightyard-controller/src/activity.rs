//! Freight activity lookup.
//!
//! Discovery needs the Freight a Warehouse produced that is still deployed to
//! at least one Stage. The lookup runs on every generation-changed pass of
//! every Warehouse, so implementations must answer it from an index keyed by
//! the producing Warehouse rather than by scanning all Freight.

use std::collections::{BTreeSet, HashMap};

use async_trait::async_trait;
use freightyard_core::Freight;
use tokio::sync::RwLock;

use crate::error::BoxError;

/// Query for Freight currently deployed somewhere.
#[async_trait]
pub trait FreightActivityIndex: Send + Sync {
    /// Lists active Freight produced by the named Warehouse.
    ///
    /// Returns an empty list when none is active.
    async fn list_active_freight(
        &self,
        namespace: &str,
        warehouse: &str,
    ) -> Result<Vec<Freight>, BoxError>;
}

/// Index key for Freight by producing Warehouse.
///
/// Returns `None` for Freight not produced by a Warehouse.
#[must_use]
pub fn freight_by_warehouse(freight: &Freight) -> Option<String> {
    freight
        .origin_warehouse()
        .filter(|name| !name.is_empty())
        .map(|name| warehouse_key(&freight.metadata.namespace, name))
}

fn warehouse_key(namespace: &str, warehouse: &str) -> String {
    format!("{namespace}/{warehouse}")
}

type FreightId = (String, String);

#[derive(Debug, Default)]
struct IndexState {
    objects: HashMap<FreightId, Freight>,
    by_warehouse: HashMap<String, BTreeSet<FreightId>>,
}

impl IndexState {
    fn insert(&mut self, freight: Freight) {
        let id = (freight.metadata.namespace.clone(), freight.metadata.name.clone());
        self.remove(&id);
        if let Some(key) = freight_by_warehouse(&freight) {
            self.by_warehouse.entry(key).or_default().insert(id.clone());
        }
        self.objects.insert(id, freight);
    }

    fn remove(&mut self, id: &FreightId) -> Option<Freight> {
        let previous = self.objects.remove(id)?;
        if let Some(key) = freight_by_warehouse(&previous) {
            if let Some(ids) = self.by_warehouse.get_mut(&key) {
                ids.remove(id);
                if ids.is_empty() {
                    self.by_warehouse.remove(&key);
                }
            }
        }
        Some(previous)
    }
}

/// In-memory Freight store indexed by producing Warehouse.
#[derive(Debug, Default)]
pub struct InMemoryFreightIndex {
    state: RwLock<IndexState>,
}

impl InMemoryFreightIndex {
    /// Creates an empty index.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an index holding the given Freight.
    ///
    /// Later entries replace earlier ones with the same namespace and name.
    #[must_use]
    pub fn from_freight(freight: impl IntoIterator<Item = Freight>) -> Self {
        let mut state = IndexState::default();
        for f in freight {
            state.insert(f);
        }
        Self {
            state: RwLock::new(state),
        }
    }

    /// Inserts or replaces a Freight, re-indexing it if its origin changed.
    pub async fn upsert(&self, freight: Freight) {
        self.state.write().await.insert(freight);
    }

    /// Removes a Freight by namespace and name.
    pub async fn remove(&self, namespace: &str, name: &str) -> Option<Freight> {
        self.state
            .write()
            .await
            .remove(&(namespace.to_string(), name.to_string()))
    }

    /// Returns the number of stored Freight.
    pub async fn len(&self) -> usize {
        self.state.read().await.objects.len()
    }

    /// Returns true if no Freight is stored.
    pub async fn is_empty(&self) -> bool {
        self.state.read().await.objects.is_empty()
    }
}

#[async_trait]
impl FreightActivityIndex for InMemoryFreightIndex {
    async fn list_active_freight(
        &self,
        namespace: &str,
        warehouse: &str,
    ) -> Result<Vec<Freight>, BoxError> {
        let state = self.state.read().await;
        let Some(ids) = state.by_warehouse.get(&warehouse_key(namespace, warehouse)) else {
            return Ok(Vec::new());
        };

        Ok(ids
            .iter()
            .filter_map(|id| state.objects.get(id))
            .filter(|f| f.is_active())
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use freightyard_core::Image;

    use super::*;

    fn freight(name: &str, warehouse: &str) -> Freight {
        Freight::from_warehouse("team", name, warehouse)
            .with_image(Image::new("ghcr.io/acme/web", "v1.0.0"))
    }

    #[test]
    fn test_index_key() {
        assert_eq!(
            freight_by_warehouse(&freight("f1", "web")).as_deref(),
            Some("team/web")
        );
        assert!(freight_by_warehouse(&freight("f1", "")).is_none());
    }

    #[tokio::test]
    async fn test_lists_only_active_freight_of_warehouse() {
        let index = InMemoryFreightIndex::from_freight(vec![
            freight("active", "web").in_stage("prod"),
            freight("idle", "web"),
            freight("other", "api").in_stage("prod"),
        ]);

        let active = index.list_active_freight("team", "web").await.unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].metadata.name, "active");
        assert!(index.list_active_freight("team", "missing").await.unwrap().is_empty());
        assert!(index.list_active_freight("elsewhere", "web").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_upsert_reindexes_moved_freight() {
        let index = InMemoryFreightIndex::new();
        index.upsert(freight("f1", "web").in_stage("dev")).await;
        index.upsert(freight("f1", "api").in_stage("dev")).await;

        assert_eq!(index.len().await, 1);
        assert!(index.list_active_freight("team", "web").await.unwrap().is_empty());
        assert_eq!(index.list_active_freight("team", "api").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_remove() {
        let index = InMemoryFreightIndex::from_freight(vec![freight("f1", "web").in_stage("dev")]);
        assert!(index.remove("team", "f1").await.is_some());
        assert!(index.remove("team", "f1").await.is_none());
        assert!(index.is_empty().await);
        assert!(index.list_active_freight("team", "web").await.unwrap().is_empty());
    }
}
