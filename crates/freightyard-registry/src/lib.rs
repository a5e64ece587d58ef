//! # Freightyard Registry
//!
//! OCI registry client and image tag selectors for Freightyard.
//!
//! This crate lists tags in OCI-compatible container registries (Docker Hub,
//! GHCR, Harbor, ECR, etc.) and ranks them according to an image
//! subscription's selection strategy.
//!
//! ## Features
//!
//! - **OCI Distribution API**: Paginated tag listing, manifest and index resolution
//! - **Token Authentication**: Bearer challenges answered with basic credentials
//! - **Selection Strategies**: SemVer, Lexical, NewestBuild and Digest
//! - **Platform Matching**: Multi-platform indexes resolved to one `os/arch[/variant]`
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use freightyard_core::{ImageSubscription, SelectionStrategy};
//! use freightyard_registry::{RegistrySelectorFactory, SelectorFactory};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let subscription = ImageSubscription::new("ghcr.io/acme/web")
//!         .with_strategy(SelectionStrategy::SemVer)
//!         .with_constraint("^1.0");
//!
//!     let selector = RegistrySelectorFactory::default().new_selector(&subscription, None)?;
//!     for reference in selector.select().await? {
//!         println!("{} {:?}", reference.tag, reference.digest);
//!     }
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    ImageSelector                            │
//! │  ┌─────────────┐  ┌─────────────┐  ┌─────────────────────┐  │
//! │  │  TagFilter  │  │  Strategy   │  │ VersionConstraint   │  │
//! │  │  (Regex)    │  │  (Ranking)  │  │ (SemVer)            │  │
//! │  └─────────────┘  └─────────────┘  └─────────────────────┘  │
//! └─────────────────────────────────────────────────────────────┘
//!                          │ TagSource
//!                          ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                  RegistryClient                             │
//! │     (tags/list, manifests, blobs, token auth)               │
//! └─────────────────────────────────────────────────────────────┘
//! ```

#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

mod auth;
mod client;
mod config;
mod error;
mod oci;
mod reference;
pub mod selector;
mod version;

pub use auth::{Challenge, TokenResponse};
pub use client::RegistryClient;
pub use config::{ClientOptions, RegistryAuth, RegistryConfig};
pub use error::RegistryError;
pub use oci::{Descriptor, ImageConfig, ImageIndex, Manifest, MediaType, Platform, TagList};
pub use reference::{ImageRepository, DOCKER_HUB_HOST};
pub use selector::{
    new_selector, DigestSelector, ImageMetadata, ImageSelector, LexicalSelector,
    NewestBuildSelector, RegistrySelectorFactory, SelectorFactory, SemverSelector, TagFilter,
    TagSource,
};
pub use version::{Identifier, Version, VersionConstraint};
