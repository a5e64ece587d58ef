//! OCI Distribution Specification types.
//!
//! This module defines the subset of the OCI image and Docker v2 schemas the
//! client reads: tag lists, manifests, image indexes and image configs.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::RegistryError;

/// Manifest media types understood by the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MediaType;

impl MediaType {
    /// OCI image manifest media type.
    pub const OCI_MANIFEST: &'static str = "application/vnd.oci.image.manifest.v1+json";

    /// OCI image index media type.
    pub const OCI_INDEX: &'static str = "application/vnd.oci.image.index.v1+json";

    /// Docker v2 schema 2 manifest media type.
    pub const DOCKER_MANIFEST: &'static str =
        "application/vnd.docker.distribution.manifest.v2+json";

    /// Docker v2 manifest list media type.
    pub const DOCKER_MANIFEST_LIST: &'static str =
        "application/vnd.docker.distribution.manifest.list.v2+json";

    /// Value of the `Accept` header for manifest requests.
    #[must_use]
    pub fn manifest_accept() -> String {
        [
            Self::OCI_INDEX,
            Self::OCI_MANIFEST,
            Self::DOCKER_MANIFEST_LIST,
            Self::DOCKER_MANIFEST,
        ]
        .join(", ")
    }

    /// Returns true if the media type denotes an index or manifest list.
    #[must_use]
    pub fn is_index(media_type: &str) -> bool {
        media_type == Self::OCI_INDEX || media_type == Self::DOCKER_MANIFEST_LIST
    }

    /// Returns true if the media type denotes a single-platform manifest.
    #[must_use]
    pub fn is_manifest(media_type: &str) -> bool {
        media_type == Self::OCI_MANIFEST || media_type == Self::DOCKER_MANIFEST
    }
}

/// Response body of `GET /v2/<name>/tags/list`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TagList {
    /// Repository name.
    #[serde(default)]
    pub name: String,

    /// Tags on this page. Some registries send `null` for an empty page.
    #[serde(default)]
    pub tags: Option<Vec<String>>,
}

/// OCI content descriptor.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Descriptor {
    /// Media type of the referenced content.
    #[serde(default)]
    pub media_type: String,

    /// Digest of the targeted content.
    pub digest: String,

    /// Size in bytes of the content.
    #[serde(default)]
    pub size: u64,

    /// Platform of the referenced manifest (index entries only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub platform: Option<Platform>,

    /// Optional annotations.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: BTreeMap<String, String>,
}

/// Single-platform image manifest.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    /// Media type declared in the body, if any.
    #[serde(default)]
    pub media_type: Option<String>,

    /// Image configuration blob.
    pub config: Descriptor,

    /// Layer descriptors.
    #[serde(default)]
    pub layers: Vec<Descriptor>,

    /// Manifest annotations.
    #[serde(default)]
    pub annotations: BTreeMap<String, String>,
}

/// Multi-platform image index (or Docker manifest list).
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageIndex {
    /// Media type declared in the body, if any.
    #[serde(default)]
    pub media_type: Option<String>,

    /// Per-platform manifests.
    pub manifests: Vec<Descriptor>,

    /// Index annotations.
    #[serde(default)]
    pub annotations: BTreeMap<String, String>,
}

impl ImageIndex {
    /// Returns the manifest descriptor for the given platform.
    #[must_use]
    pub fn find_platform(&self, platform: &Platform) -> Option<&Descriptor> {
        self.manifests
            .iter()
            .find(|d| d.platform.as_ref().is_some_and(|p| platform.matches(p)))
    }
}

/// Subset of the image configuration blob.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ImageConfig {
    /// When the image was built, as written by the builder.
    #[serde(default)]
    pub created: Option<String>,

    /// Operating system.
    #[serde(default)]
    pub os: Option<String>,

    /// CPU architecture.
    #[serde(default)]
    pub architecture: Option<String>,

    /// CPU variant.
    #[serde(default)]
    pub variant: Option<String>,
}

impl ImageConfig {
    /// Returns the build timestamp if it is valid RFC 3339.
    #[must_use]
    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        self.created
            .as_deref()
            .and_then(|c| DateTime::parse_from_rfc3339(c).ok())
            .map(|c| c.with_timezone(&Utc))
    }

    /// Returns true if the config is compatible with the platform.
    ///
    /// Configs that do not declare an OS or architecture are accepted.
    #[must_use]
    pub fn matches_platform(&self, platform: &Platform) -> bool {
        match (&self.os, &self.architecture) {
            (Some(os), Some(architecture)) => platform.matches(&Platform {
                os: os.clone(),
                architecture: architecture.clone(),
                variant: self.variant.clone(),
            }),
            _ => true,
        }
    }
}

/// Target platform of an image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Platform {
    /// Operating system (e.g., `linux`).
    pub os: String,

    /// CPU architecture (e.g., `arm64`).
    pub architecture: String,

    /// CPU variant (e.g., `v8`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variant: Option<String>,
}

impl Platform {
    /// Parses an `os/arch[/variant]` string.
    ///
    /// # Errors
    ///
    /// Returns an error if the string does not have two or three non-empty parts.
    pub fn parse(input: &str) -> Result<Self, RegistryError> {
        let parts: Vec<&str> = input.trim().split('/').collect();
        if parts.iter().any(|p| p.is_empty()) {
            return Err(RegistryError::InvalidPlatform {
                platform: input.to_string(),
            });
        }

        match parts.as_slice() {
            [os, architecture] => Ok(Self {
                os: (*os).to_string(),
                architecture: (*architecture).to_string(),
                variant: None,
            }),
            [os, architecture, variant] => Ok(Self {
                os: (*os).to_string(),
                architecture: (*architecture).to_string(),
                variant: Some((*variant).to_string()),
            }),
            _ => Err(RegistryError::InvalidPlatform {
                platform: input.to_string(),
            }),
        }
    }

    /// Returns true if `other` satisfies this platform.
    ///
    /// A variant is only compared when this platform names one.
    #[must_use]
    pub fn matches(&self, other: &Self) -> bool {
        self.os == other.os
            && self.architecture == other.architecture
            && self
                .variant
                .as_ref()
                .is_none_or(|v| other.variant.as_ref() == Some(v))
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.variant {
            Some(variant) => write!(f, "{}/{}/{variant}", self.os, self.architecture),
            None => write!(f, "{}/{}", self.os, self.architecture),
        }
    }
}
