//! Discover command implementation.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;
use freightyard_controller::{
    CredentialEntry, DiscoveryConfig, ImageDiscoverer, InMemoryFreightIndex, StaticCredentialStore,
};
use freightyard_core::{Freight, Warehouse};
use tracing::info;

use super::{read_document, read_optional};

/// Arguments for the discover command.
#[derive(Args)]
pub struct DiscoverArgs {
    /// Warehouse document (YAML or JSON)
    #[arg(short, long, env = "FREIGHTYARD_WAREHOUSE")]
    pub warehouse: PathBuf,

    /// Freight documents used as the activity index
    #[arg(long, env = "FREIGHTYARD_FREIGHT")]
    pub freight: Option<PathBuf>,

    /// Registry credential entries
    #[arg(long, env = "FREIGHTYARD_CREDENTIALS")]
    pub credentials: Option<PathBuf>,

    /// Discovery configuration
    #[arg(short, long, env = "FREIGHTYARD_CONFIG")]
    pub config: Option<PathBuf>,

    /// Write the updated Warehouse here instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Output format (yaml, json)
    #[arg(short, long, default_value = "yaml")]
    pub format: DocumentFormat,
}

/// Serialization format for the updated Warehouse.
#[derive(Clone, Copy, Debug, Default, clap::ValueEnum)]
pub enum DocumentFormat {
    #[default]
    Yaml,
    Json,
}

/// Runs the discover command.
pub async fn run(args: &DiscoverArgs) -> Result<()> {
    let warehouse = execute(args).await?;
    let rendered = render(&warehouse, args.format)?;

    match &args.output {
        Some(path) => {
            std::fs::write(path, rendered)
                .with_context(|| format!("failed to write {}", path.display()))?;
            info!(path = %path.display(), "Wrote updated Warehouse");
        }
        None => print!("{rendered}"),
    }

    Ok(())
}

/// Loads the inputs, runs one pass and returns the Warehouse with the result
/// recorded in its status.
async fn execute(args: &DiscoverArgs) -> Result<Warehouse> {
    let mut warehouse: Warehouse = read_document(&args.warehouse)?;
    warehouse
        .validate()
        .with_context(|| format!("invalid Warehouse in {}", args.warehouse.display()))?;

    let config: DiscoveryConfig = read_optional(args.config.as_deref())?;
    let freight: Vec<Freight> = read_optional(args.freight.as_deref())?;
    let entries: Vec<CredentialEntry> = read_optional(args.credentials.as_deref())?;

    info!(
        namespace = %warehouse.namespace(),
        warehouse = %warehouse.name(),
        freight = freight.len(),
        credentials = entries.len(),
        "Running discovery pass"
    );

    let credentials = StaticCredentialStore::new(entries).context("invalid credential entries")?;
    let discoverer = ImageDiscoverer::from_config(
        &config,
        Arc::new(credentials),
        Arc::new(InMemoryFreightIndex::from_freight(freight)),
    );

    let artifacts = discoverer
        .discover(&warehouse)
        .await
        .with_context(|| format!("discovery failed for Warehouse {}", warehouse.name()))?;

    let generation = warehouse.metadata.generation;
    warehouse.status.record_discovery(generation, artifacts);
    Ok(warehouse)
}

fn render(warehouse: &Warehouse, format: DocumentFormat) -> Result<String> {
    Ok(match format {
        DocumentFormat::Yaml => serde_yaml::to_string(warehouse)?,
        DocumentFormat::Json => {
            let mut json = serde_json::to_string_pretty(warehouse)?;
            json.push('\n');
            json
        }
    })
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use tempfile::TempDir;

    use super::*;

    const WAREHOUSE: &str = r"
metadata:
  namespace: team
  name: web
  generation: 4
spec:
  subscriptions:
    - git:
        repoURL: https://github.com/acme/web.git
";

    fn args(dir: &Path, warehouse: &str) -> DiscoverArgs {
        let path = dir.join("warehouse.yaml");
        std::fs::write(&path, warehouse).unwrap();
        DiscoverArgs {
            warehouse: path,
            freight: None,
            credentials: None,
            config: None,
            output: Some(dir.join("out.json")),
            format: DocumentFormat::Json,
        }
    }

    #[tokio::test]
    async fn test_records_pass_in_status() {
        let temp_dir = TempDir::new().unwrap();
        let args = args(temp_dir.path(), WAREHOUSE);

        run(&args).await.unwrap();

        let written: Warehouse = read_document(&temp_dir.path().join("out.json")).unwrap();
        assert_eq!(written.status.observed_generation, 4);
        let artifacts = written.status.discovered_artifacts.unwrap();
        assert!(artifacts.images.is_empty());
        assert!(artifacts.discovered_at.is_some());
    }

    #[tokio::test]
    async fn test_rejects_invalid_warehouse() {
        let temp_dir = TempDir::new().unwrap();
        let args = args(temp_dir.path(), "metadata:\n  namespace: team\n  name: ''\n");

        let err = execute(&args).await.unwrap_err();
        assert!(err.to_string().contains("invalid Warehouse"));
    }

    #[tokio::test]
    async fn test_rejects_invalid_credential_pattern() {
        let temp_dir = TempDir::new().unwrap();
        let mut args = args(temp_dir.path(), WAREHOUSE);
        let credentials = temp_dir.path().join("credentials.yaml");
        std::fs::write(
            &credentials,
            r"
- namespace: team
  type: image
  repoURLPattern: '(unclosed'
  username: robot
  password: secret
",
        )
        .unwrap();
        args.credentials = Some(credentials);

        let err = execute(&args).await.unwrap_err();
        assert!(err.to_string().contains("invalid credential entries"));
    }

    #[test]
    fn test_render_formats() {
        let warehouse: Warehouse = serde_yaml::from_str(WAREHOUSE).unwrap();

        let json = render(&warehouse, DocumentFormat::Json).unwrap();
        let yaml = render(&warehouse, DocumentFormat::Yaml).unwrap();

        assert!(json.contains("\"repoURL\""));
        assert!(yaml.contains("repoURL: https://github.com/acme/web.git"));
    }
}
