//! Freightyard Discovery Controller
//!
//! This crate computes the artifacts a Warehouse has discovered, the value
//! persisted in `status.discoveredArtifacts` after each reconciliation.
//!
//! # Overview
//!
//! The controller handles:
//! - **Image Discovery**: Runs each image subscription's selector against its registry
//! - **Active-Freight Retention**: Keeps tags deployed to a Stage selectable after
//!   they fall out of the discovery window
//! - **Activity Lookup**: Indexed queries for active Freight by producing Warehouse
//! - **Credential Resolution**: Per-namespace registry credentials with exact and
//!   pattern matches
//!
//! # Architecture
//!
//! ```text
//!                    ┌─────────────────────┐
//!                    │   ImageDiscoverer   │
//!                    └──────────┬──────────┘
//!        ┌──────────────────────┼──────────────────────┐
//!        ▼                      ▼                      ▼
//! ┌─────────────┐       ┌─────────────┐       ┌─────────────────┐
//! │ Credential  │       │  Selector   │       │ FreightActivity │
//! │   Store     │       │  Factory    │       │     Index       │
//! └─────────────┘       └──────┬──────┘       └────────┬────────┘
//!                              ▼                       ▼
//!                       ┌─────────────┐       ┌─────────────────┐
//!                       │  Registry   │──────▶│ RetentionEngine │
//!                       └─────────────┘       └─────────────────┘
//! ```
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use freightyard_controller::{
//!     DiscoveryConfig, ImageDiscoverer, InMemoryFreightIndex, StaticCredentialStore,
//! };
//! use freightyard_core::{ImageSubscription, ObjectMeta, RepoSubscription, Warehouse};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let discoverer = ImageDiscoverer::from_config(
//!         &DiscoveryConfig::default(),
//!         Arc::new(StaticCredentialStore::empty()),
//!         Arc::new(InMemoryFreightIndex::new()),
//!     );
//!
//!     let mut warehouse = Warehouse::new(ObjectMeta::new("team", "web"))
//!         .with_subscription(RepoSubscription::image(ImageSubscription::new("ghcr.io/acme/web")));
//!
//!     let artifacts = discoverer.discover(&warehouse).await?;
//!     let generation = warehouse.metadata.generation;
//!     warehouse.status.record_discovery(generation, artifacts);
//!     Ok(())
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::module_name_repetitions)]

pub mod activity;
pub mod config;
pub mod credentials;
pub mod discovery;
pub mod error;
pub mod retention;

#[cfg(test)]
mod proptest_tests;

pub use activity::{freight_by_warehouse, FreightActivityIndex, InMemoryFreightIndex};
pub use config::{DiscoveryConfig, DiscoveryConfigBuilder};
pub use credentials::{CredentialEntry, CredentialStore, StaticCredentialStore};
pub use discovery::{needs_fresh_activity, ImageDiscoverer};
pub use error::{BoxError, ConfigError, DiscoveryError, Result};
pub use retention::{RetentionEngine, RetentionPolicy, RetentionSource};
