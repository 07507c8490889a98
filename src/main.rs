use anyhow::Result;
use clap::Parser;
use tracing::info;

use scz::cli::{Cli, Commands};

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Compress(args) => {
            info!("Starting compression...");
            scz::compression::compress(&args)?;
            info!("Compression complete!");
        }
        Commands::Decompress(args) => {
            info!("Starting decompression...");
            scz::compression::decompress(&args)?;
            info!("Decompression complete!");
        }
    }

    Ok(())
}
