//! CLI argument parsing and command dispatch.
//!
//! One command for now: `fetch` runs a single refresh over a date window
//! and prints a colored hierarchy summary.
//!
//! # Example
//!
//! ```bash
//! girder fetch --start 2024-01-01 --end 2024-03-31 --workers 5
//! ```

mod summary;

use crate::cache::SnapshotCache;
use crate::config::{self, ApiCredentials, DEFAULT_REQUEST_TIMEOUT};
use crate::fetch::{CancelFlag, FetchOptions, DEFAULT_PAGE_SIZE, DEFAULT_WORKER_COUNT};
use crate::refresh;
use anyhow::Result;
use clap::{Parser, Subcommand};
use girder_client::HttpPageSource;
use std::sync::Arc;

/// Girder - hierarchy explorer for remote issue trackers
///
/// Fetches a project's issues over a date range, resolves the
/// Epic → Story/Task → Subtask hierarchy, and reports items that fail to
/// attach to it.
#[derive(Parser, Debug)]
#[command(name = "girder")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Fetch a date window and print the hierarchy summary
    ///
    /// Credentials come from the environment: API_BASE_URL, API_EMAIL,
    /// API_TOKEN, and PROJECT_KEY.
    Fetch(FetchArgs),
}

/// Arguments for the `fetch` command
#[derive(Parser, Debug, Clone)]
pub struct FetchArgs {
    /// First day of the range (inclusive), ISO date
    #[arg(long)]
    pub start: String,

    /// Last day of the range (inclusive), ISO date
    #[arg(long)]
    pub end: String,

    /// Number of concurrent fetch workers
    #[arg(long, default_value_t = DEFAULT_WORKER_COUNT)]
    pub workers: usize,

    /// Records requested per page
    #[arg(long, default_value_t = DEFAULT_PAGE_SIZE)]
    pub page_size: usize,
}

impl Cli {
    /// Parse command-line arguments.
    #[must_use]
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Execute the parsed command.
    ///
    /// # Errors
    ///
    /// Returns any configuration or run-level error from the refresh.
    pub async fn execute(self) -> Result<()> {
        match self.command {
            Commands::Fetch(args) => execute_fetch(args).await,
        }
    }
}

async fn execute_fetch(args: FetchArgs) -> Result<()> {
    let credentials = ApiCredentials::from_env()?;
    let window = config::parse_window(&args.start, &args.end)?;

    let source = HttpPageSource::new(
        credentials.base_url,
        credentials.email,
        credentials.token,
        credentials.project_key,
        DEFAULT_REQUEST_TIMEOUT,
    )?;

    let mut options = FetchOptions::new(window);
    options.worker_count = args.workers;
    options.page_size = args.page_size;

    let cache = SnapshotCache::new();
    let report = refresh::refresh(Arc::new(source), &cache, &options, CancelFlag::new()).await?;

    summary::print_report(&report);
    Ok(())
}
