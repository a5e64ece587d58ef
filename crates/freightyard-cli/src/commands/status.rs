//! Status command implementation.

use std::path::{Path, PathBuf};

use anyhow::Result;
use chrono::{DateTime, Utc};
use clap::Args;
use freightyard_core::{ImageDiscoveryResult, Warehouse};
use serde::Serialize;
use tracing::info;

use super::read_document;

/// Arguments for the status command.
#[derive(Args)]
pub struct StatusArgs {
    /// Warehouse document (YAML or JSON)
    #[arg(short, long, env = "FREIGHTYARD_WAREHOUSE")]
    pub warehouse: PathBuf,

    /// Output format (text, json)
    #[arg(short, long, default_value = "text")]
    pub format: OutputFormat,

    /// Show every discovered reference
    #[arg(short, long)]
    pub verbose: bool,
}

/// Output format for status command.
#[derive(Clone, Debug, Default, clap::ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Discovery status of one Warehouse.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusSummary {
    pub namespace: String,
    pub warehouse: String,
    pub generation: i64,
    pub observed_generation: i64,
    pub discovered_at: Option<DateTime<Utc>>,
    pub repositories: Vec<RepositoryStatus>,
    pub total_references: usize,
    pub retained_references: usize,
}

impl StatusSummary {
    /// True when the persisted result was computed for the current spec.
    #[must_use]
    pub const fn is_current(&self) -> bool {
        self.discovered_at.is_some() && self.generation == self.observed_generation
    }
}

/// Discovered references of one repository.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RepositoryStatus {
    #[serde(rename = "repoURL")]
    pub repo_url: String,
    pub platform: Option<String>,
    pub references: Vec<ReferenceStatus>,
}

/// A single discovered or retained tag.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferenceStatus {
    pub tag: String,
    pub digest: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub retained: bool,
}

/// Runs the status command.
pub fn run(args: &StatusArgs) -> Result<()> {
    info!(warehouse = %args.warehouse.display(), "Reading discovery status");

    let summary = read_status(&args.warehouse)?;

    match args.format {
        OutputFormat::Text => print_text_status(&summary, args.verbose),
        OutputFormat::Json => print_json_status(&summary)?,
    }

    Ok(())
}

fn read_status(path: &Path) -> Result<StatusSummary> {
    let warehouse: Warehouse = read_document(path)?;
    Ok(summarize(&warehouse))
}

fn summarize(warehouse: &Warehouse) -> StatusSummary {
    let artifacts = warehouse.status.discovered_artifacts.as_ref();
    let repositories: Vec<RepositoryStatus> = artifacts
        .map(|a| a.images.iter().map(repository_status).collect())
        .unwrap_or_default();

    let total_references = repositories.iter().map(|r| r.references.len()).sum();
    let retained_references = repositories
        .iter()
        .flat_map(|r| &r.references)
        .filter(|r| r.retained)
        .count();

    StatusSummary {
        namespace: warehouse.namespace().to_string(),
        warehouse: warehouse.name().to_string(),
        generation: warehouse.metadata.generation,
        observed_generation: warehouse.status.observed_generation,
        discovered_at: artifacts.and_then(|a| a.discovered_at),
        repositories,
        total_references,
        retained_references,
    }
}

fn repository_status(result: &ImageDiscoveryResult) -> RepositoryStatus {
    RepositoryStatus {
        repo_url: result.repo_url.clone(),
        platform: result.platform.clone(),
        references: result
            .references
            .iter()
            .map(|r| ReferenceStatus {
                tag: r.tag.clone(),
                digest: r.digest.clone(),
                created_at: r.created_at,
                retained: r.from_active_freight,
            })
            .collect(),
    }
}

fn print_text_status(summary: &StatusSummary, verbose: bool) {
    let title = format!("Warehouse {}/{}", summary.namespace, summary.warehouse);
    println!("{title}");
    println!("{}", "=".repeat(title.chars().count()));
    println!();

    let Some(discovered_at) = summary.discovered_at else {
        println!("No discovery recorded.");
        println!();
        println!("Run 'freightyard discover' to run a discovery pass.");
        return;
    };

    let freshness = if summary.is_current() { "current" } else { "stale" };
    println!(
        "Discovered at {} for generation {} ({freshness}, spec at generation {})",
        discovered_at.to_rfc3339(),
        summary.observed_generation,
        summary.generation
    );
    println!(
        "Total: {} references ({} retained for active freight)",
        summary.total_references, summary.retained_references
    );
    println!();

    for repository in &summary.repositories {
        match &repository.platform {
            Some(platform) => println!("{} [{platform}]", repository.repo_url),
            None => println!("{}", repository.repo_url),
        }

        if repository.references.is_empty() {
            println!("  No images discovered");
        } else if verbose {
            for reference in &repository.references {
                let icon = if reference.retained { "○" } else { "●" };
                let marker = if reference.retained { " (retained)" } else { "" };
                println!("  {icon} {}{marker}", reference.tag);
                if let Some(digest) = &reference.digest {
                    println!("      Digest: {digest}");
                }
                if let Some(created_at) = &reference.created_at {
                    println!("      Created: {}", created_at.to_rfc3339());
                }
            }
        } else {
            let retained = repository.references.iter().filter(|r| r.retained).count();
            let newest = &repository.references[0].tag;
            println!(
                "  Images: {} ({retained} retained), newest {newest}",
                repository.references.len()
            );
        }
        println!();
    }
}

fn print_json_status(summary: &StatusSummary) -> Result<()> {
    let json = serde_json::to_string_pretty(summary)?;
    println!("{json}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use freightyard_core::{
        DiscoveredArtifacts, DiscoveredImageReference, ObjectMeta, WarehouseStatus,
    };
    use tempfile::TempDir;

    use super::*;

    fn discovered_warehouse(observed_generation: i64) -> Warehouse {
        let mut status = WarehouseStatus::default();
        status.record_discovery(
            observed_generation,
            DiscoveredArtifacts::new(vec![
                ImageDiscoveryResult::new("ghcr.io/acme/web", None).with_references(vec![
                    DiscoveredImageReference::new("v1.0.1").with_digest("sha256:a"),
                    DiscoveredImageReference::retained("v0.9.0"),
                ]),
                ImageDiscoveryResult::new("ghcr.io/acme/api", Some("linux/arm64".to_string())),
            ]),
        );
        Warehouse::new(ObjectMeta::new("team", "web").with_generation(2)).with_status(status)
    }

    #[test]
    fn test_no_discovery_returns_empty_summary() {
        let summary = summarize(&Warehouse::new(ObjectMeta::new("team", "web")));

        assert!(summary.repositories.is_empty());
        assert_eq!(summary.total_references, 0);
        assert!(summary.discovered_at.is_none());
        assert!(!summary.is_current());
    }

    #[test]
    fn test_summary_marks_retained_references() {
        let summary = summarize(&discovered_warehouse(2));

        assert!(summary.is_current());
        assert_eq!(summary.repositories.len(), 2);
        assert_eq!(summary.total_references, 2);
        assert_eq!(summary.retained_references, 1);
        assert!(!summary.repositories[0].references[0].retained);
        assert!(summary.repositories[0].references[1].retained);
        assert_eq!(summary.repositories[1].platform.as_deref(), Some("linux/arm64"));
    }

    #[test]
    fn test_stale_when_generation_moved() {
        assert!(!summarize(&discovered_warehouse(1)).is_current());
    }

    #[test]
    fn test_read_status_from_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("warehouse.json");
        std::fs::write(&path, serde_json::to_string(&discovered_warehouse(2)).unwrap()).unwrap();

        let summary = read_status(&path).unwrap();

        assert_eq!(summary.warehouse, "web");
        assert_eq!(summary.retained_references, 1);
    }

    #[test]
    fn test_json_uses_wire_names() {
        let json = serde_json::to_value(summarize(&discovered_warehouse(2))).unwrap();

        assert_eq!(json["repositories"][0]["repoURL"], "ghcr.io/acme/web");
        assert_eq!(json["retainedReferences"], 1);
        assert_eq!(json["repositories"][0]["references"][1]["retained"], true);
    }
}
