//! Freight resource model.
//!
//! Freight lifecycle is owned by the promotion system; discovery only reads
//! which Freight is currently deployed.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::warehouse::ObjectMeta;

/// An immutable bundle of artifact references produced by a Warehouse.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Freight {
    /// Resource identity.
    pub metadata: ObjectMeta,

    /// Resource that produced this Freight.
    #[serde(default)]
    pub origin: FreightOrigin,

    /// Container images referenced by this Freight.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub images: Vec<Image>,

    /// Observed state.
    #[serde(default)]
    pub status: FreightStatus,
}

impl Freight {
    /// Creates Freight produced by the named Warehouse.
    #[must_use]
    pub fn from_warehouse(
        namespace: impl Into<String>,
        name: impl Into<String>,
        warehouse: impl Into<String>,
    ) -> Self {
        Self {
            metadata: ObjectMeta::new(namespace, name),
            origin: FreightOrigin::warehouse(warehouse),
            images: Vec::new(),
            status: FreightStatus::default(),
        }
    }

    /// Adds an image reference.
    #[must_use]
    pub fn with_image(mut self, image: Image) -> Self {
        self.images.push(image);
        self
    }

    /// Marks the Freight as currently deployed to a Stage.
    #[must_use]
    pub fn in_stage(mut self, stage: impl Into<String>) -> Self {
        self.status.currently_in.insert(
            stage.into(),
            CurrentStage {
                since: Some(Utc::now()),
            },
        );
        self
    }

    /// Returns true if the Freight is deployed to at least one Stage.
    #[must_use]
    pub fn is_active(&self) -> bool {
        !self.status.currently_in.is_empty()
    }

    /// Returns the name of the producing Warehouse, if the origin is a Warehouse.
    #[must_use]
    pub fn origin_warehouse(&self) -> Option<&str> {
        match self.origin.kind {
            FreightOriginKind::Warehouse => Some(self.origin.name.as_str()),
        }
    }
}

/// Kind of resource that can produce Freight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum FreightOriginKind {
    /// Produced by a Warehouse.
    #[default]
    Warehouse,
}

/// Reference to the resource that produced a Freight.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FreightOrigin {
    /// Kind of the producing resource.
    #[serde(default)]
    pub kind: FreightOriginKind,

    /// Name of the producing resource.
    pub name: String,
}

impl FreightOrigin {
    /// Creates a Warehouse origin.
    #[must_use]
    pub fn warehouse(name: impl Into<String>) -> Self {
        Self {
            kind: FreightOriginKind::Warehouse,
            name: name.into(),
        }
    }
}

/// A container image reference inside a Freight.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Image {
    /// Image repository reference.
    #[serde(rename = "repoURL")]
    pub repo_url: String,

    /// Image tag.
    #[serde(default)]
    pub tag: String,

    /// Image digest.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub digest: String,
}

impl Image {
    /// Creates an image reference without a digest.
    #[must_use]
    pub fn new(repo_url: impl Into<String>, tag: impl Into<String>) -> Self {
        Self {
            repo_url: repo_url.into(),
            tag: tag.into(),
            digest: String::new(),
        }
    }

    /// Sets the digest.
    #[must_use]
    pub fn with_digest(mut self, digest: impl Into<String>) -> Self {
        self.digest = digest.into();
        self
    }
}

/// Observed state of a Freight.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FreightStatus {
    /// Stages this Freight is currently deployed to, keyed by Stage name.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub currently_in: BTreeMap<String, CurrentStage>,
}

/// Record of a Freight's presence in a Stage.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CurrentStage {
    /// When the Freight became current in the Stage.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub since: Option<DateTime<Utc>>,
}
