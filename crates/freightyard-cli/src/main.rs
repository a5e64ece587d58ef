//! Freightyard CLI - runs image discovery passes over Warehouse documents.

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

use commands::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "freightyard=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Discover(args) => commands::discover::run(&args).await,
        Commands::Status(args) => commands::status::run(&args),
        Commands::Version => {
            println!("freightyard {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}
