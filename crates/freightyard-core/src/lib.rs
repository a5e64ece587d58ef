//! # Freightyard Core
//!
//! Core resource types for the Freightyard continuous-delivery control plane.
//!
//! This crate provides the data structures shared by the registry layer, the
//! discovery controller and the CLI:
//!
//! - [`Warehouse`] - A source of subscriptions whose artifacts are discovered
//! - [`Freight`] - An immutable bundle of artifact references produced by a Warehouse
//! - [`DiscoveredImageReference`] / [`ImageDiscoveryResult`] - Discovery output
//!   persisted in Warehouse status
//! - [`Credentials`] - Registry credentials resolved for a repository
//!
//! ## Persisted Schema
//!
//! Status types serialize with camelCase keys (`repoURL`, `fromActiveFreight`,
//! `observedGeneration`). The persisted status doubles as the discovery cache
//! between reconciliations, so the schema is kept backward compatible.
//!
//! ## Example
//!
//! ```rust
//! use freightyard_core::{DiscoveredImageReference, ImageDiscoveryResult};
//!
//! let result = ImageDiscoveryResult::new("example.com/app", None)
//!     .with_references(vec![
//!         DiscoveredImageReference::new("v1.0.1"),
//!         DiscoveredImageReference::retained("v0.9.0"),
//!     ]);
//!
//! assert_eq!(result.retained().count(), 1);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod credentials;
pub mod discovery;
pub mod error;
pub mod freight;
pub mod warehouse;

pub use credentials::{CredentialType, Credentials};
pub use discovery::{DiscoveredArtifacts, DiscoveredImageReference, ImageDiscoveryResult};
pub use error::{Error, Result};
pub use freight::{CurrentStage, Freight, FreightOrigin, FreightOriginKind, FreightStatus, Image};
pub use warehouse::{
    ChartSubscription, GitSubscription, ImageSubscription, ObjectMeta, RepoSubscription,
    SelectionStrategy, Warehouse, WarehouseSpec, WarehouseStatus,
};
