//! Discovery results persisted in Warehouse status.
//!
//! The persisted [`DiscoveredArtifacts`] is also the input of the next
//! cache-reuse pass: entries flagged `fromActiveFreight` are the only ones
//! replayed without consulting live Freight activity.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A container image tag discovered in, or retained for, a repository.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscoveredImageReference {
    /// Image tag. Unique within one [`ImageDiscoveryResult`].
    pub tag: String,

    /// Manifest digest.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub digest: Option<String>,

    /// When the image was built.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,

    /// Manifest annotations.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: BTreeMap<String, String>,

    /// True when the entry exists only because active Freight references it.
    #[serde(default, skip_serializing_if = "is_false")]
    pub from_active_freight: bool,
}

#[allow(clippy::trivially_copy_pass_by_ref)]
const fn is_false(value: &bool) -> bool {
    !*value
}

impl DiscoveredImageReference {
    /// Creates a freshly discovered reference with no metadata.
    #[must_use]
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            ..Self::default()
        }
    }

    /// Creates a bare retained reference carrying only the tag.
    #[must_use]
    pub fn retained(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            from_active_freight: true,
            ..Self::default()
        }
    }

    /// Sets the digest.
    #[must_use]
    pub fn with_digest(mut self, digest: impl Into<String>) -> Self {
        self.digest = Some(digest.into());
        self
    }

    /// Sets the creation timestamp.
    #[must_use]
    pub const fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = Some(created_at);
        self
    }

    /// Adds an annotation.
    #[must_use]
    pub fn with_annotation(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.annotations.insert(key.into(), value.into());
        self
    }
}

/// Discovery result for one image repository.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageDiscoveryResult {
    /// Image repository reference.
    #[serde(rename = "repoURL")]
    pub repo_url: String,

    /// Platform the references were resolved for.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub platform: Option<String>,

    /// Discovered references: fresh entries first, retained entries after.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub references: Vec<DiscoveredImageReference>,
}

impl ImageDiscoveryResult {
    /// Creates a result with no references.
    #[must_use]
    pub fn new(repo_url: impl Into<String>, platform: Option<String>) -> Self {
        Self {
            repo_url: repo_url.into(),
            platform,
            references: Vec::new(),
        }
    }

    /// Sets the references.
    #[must_use]
    pub fn with_references(mut self, references: Vec<DiscoveredImageReference>) -> Self {
        self.references = references;
        self
    }

    /// Returns true if no references were found.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.references.is_empty()
    }

    /// Iterates over the entries kept because of active Freight.
    pub fn retained(&self) -> impl Iterator<Item = &DiscoveredImageReference> {
        self.references.iter().filter(|r| r.from_active_freight)
    }
}

/// Artifacts discovered for a Warehouse in one pass.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscoveredArtifacts {
    /// When the pass completed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discovered_at: Option<DateTime<Utc>>,

    /// One entry per subscribed image repository.
    #[serde(default)]
    pub images: Vec<ImageDiscoveryResult>,
}

impl DiscoveredArtifacts {
    /// Creates artifacts stamped with the current time.
    #[must_use]
    pub fn new(images: Vec<ImageDiscoveryResult>) -> Self {
        Self {
            discovered_at: Some(Utc::now()),
            images,
        }
    }
}
