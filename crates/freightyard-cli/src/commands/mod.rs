//! CLI commands and argument parsing.

pub mod discover;
pub mod status;

use std::path::Path;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::de::DeserializeOwned;

/// Freightyard - artifact discovery for Warehouses
#[derive(Parser)]
#[command(name = "freightyard")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands.
#[derive(Subcommand)]
pub enum Commands {
    /// Run one discovery pass and record it in the Warehouse status
    Discover(discover::DiscoverArgs),

    /// Show the persisted discovery result of a Warehouse
    Status(status::StatusArgs),

    /// Print version information
    Version,
}

/// Reads a YAML or JSON document.
///
/// Files ending in `.json` are parsed as JSON; anything else as YAML, which
/// also accepts JSON input.
pub fn read_document<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;

    if path.extension().is_some_and(|e| e == "json") {
        serde_json::from_str(&content)
            .with_context(|| format!("failed to parse JSON in {}", path.display()))
    } else {
        serde_yaml::from_str(&content)
            .with_context(|| format!("failed to parse YAML in {}", path.display()))
    }
}

/// Reads an optional document, falling back to the type's default.
pub fn read_optional<T: DeserializeOwned + Default>(path: Option<&Path>) -> Result<T> {
    path.map_or_else(|| Ok(T::default()), read_document)
}
