//! Girder CLI binary.

use anyhow::Result;
use girder::cli::Cli;
use tracing_subscriber::EnvFilter;

/// Main entry point for the girder CLI.
///
/// Uses the multi-threaded runtime: the fetch worker pool runs its page
/// requests concurrently.
#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing subscriber
    // Can be controlled via RUST_LOG environment variable
    // Example: RUST_LOG=girder=debug,girder_client=trace girder fetch ...
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("girder=info,girder_client=info")),
        )
        .with_target(false)
        .init();

    tracing::debug!("Starting girder CLI");

    let cli = Cli::parse_args();
    cli.execute().await?;

    tracing::debug!("Girder CLI completed successfully");
    Ok(())
}
