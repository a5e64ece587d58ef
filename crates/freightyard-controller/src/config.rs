//! Configuration types for the discovery controller.
//!
//! This module provides the retention policy and registry client settings
//! used when assembling an [`ImageDiscoverer`](crate::ImageDiscoverer).

use std::time::Duration;

use freightyard_registry::ClientOptions;
use serde::Deserialize;

use crate::retention::RetentionPolicy;

/// Configuration for image discovery.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DiscoveryConfig {
    /// Active-freight retention policy.
    pub retention: RetentionPolicy,

    /// Registry client settings.
    pub registry: ClientOptions,
}

impl DiscoveryConfig {
    /// Creates a new configuration builder.
    #[must_use]
    pub fn builder() -> DiscoveryConfigBuilder {
        DiscoveryConfigBuilder::default()
    }
}

/// Builder for `DiscoveryConfig`.
#[derive(Debug, Default)]
pub struct DiscoveryConfigBuilder {
    retention: Option<RetentionPolicy>,
    registry: Option<ClientOptions>,
}

impl DiscoveryConfigBuilder {
    /// Sets the retention policy.
    #[must_use]
    pub fn retention(mut self, policy: RetentionPolicy) -> Self {
        self.retention = Some(policy);
        self
    }

    /// Sets the registry client settings.
    #[must_use]
    pub fn registry(mut self, options: ClientOptions) -> Self {
        self.registry = Some(options);
        self
    }

    /// Sets the registry request timeout.
    #[must_use]
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.registry.get_or_insert_with(ClientOptions::default).timeout_secs = timeout.as_secs();
        self
    }

    /// Builds the configuration.
    #[must_use]
    pub fn build(self) -> DiscoveryConfig {
        DiscoveryConfig {
            retention: self.retention.unwrap_or_default(),
            registry: self.registry.unwrap_or_default(),
        }
    }
}
