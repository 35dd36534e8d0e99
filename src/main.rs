use anyhow::{Context, Result};
use clap::Parser;
use core_runtime::logging::init_logging;
use track_enricher::cli::{self, Args};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(args.logging_config()).context("Failed to initialize logging")?;

    cli::run(&args).await?;
    Ok(())
}
