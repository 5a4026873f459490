//! photark: incremental mirror of a hosted photo library into a storage bucket.
//!
//! Walks the library's paged listing, records every item in a local SQLite
//! catalog, and copies artifacts into the bucket through a verified
//! download-then-upload pipeline. Runs are time-boxed and resumable: all
//! state lives in the catalog, so repeated runs pick up wherever the last
//! one stopped.

#![warn(clippy::all)]

mod catalog;
mod cli;
mod config;
mod remote;
mod shutdown;
mod storage;
mod sync;
mod types;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use catalog::{CatalogStore, SqliteCatalog};
use cli::Command;
use config::SyncConfig;
use remote::CatalogReader;
use storage::{GcsObjectStore, ObjectStore};
use sync::{NoopTransfer, RealTransfer, RunOutcome, SyncOptions, TransferExecutor, TransferStrategy};

/// Run the sync command: one time-boxed pass over the remote listing.
async fn run_sync_command(args: cli::SyncArgs) -> anyhow::Result<()> {
    let config = SyncConfig::from_args(args)?;
    tracing::debug!(?config, "resolved configuration");
    tracing::info!(
        folder_style = config.folder_style.as_str(),
        run_minutes = config.run_duration.as_secs() / 60,
        "Starting photark sync"
    );

    if let Some(parent) = config.catalog_path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    let catalog: Arc<dyn CatalogStore> = Arc::new(
        SqliteCatalog::open(&config.catalog_path)
            .await
            .with_context(|| {
                format!("Failed to open catalog at {}", config.catalog_path.display())
            })?,
    );

    let mut reader = CatalogReader::new(
        config.access_token.clone(),
        config.page_size,
        config.list_pause,
        config.date_range,
    );

    let strategy: Box<dyn TransferStrategy> = if config.dry_run {
        tracing::info!("[DRY RUN] No artifacts will be copied");
        Box::new(NoopTransfer)
    } else {
        let store: Arc<dyn ObjectStore> = Arc::new(GcsObjectStore::new(
            config.bucket.clone(),
            config.storage_token.clone(),
        ));
        Box::new(RealTransfer::new(
            store,
            config.scratch_dir.clone(),
            config.min_artifact_bytes,
        ))
    };

    // A dry run moves no bytes, so there is nothing to pace
    let transfer_pause = if config.dry_run {
        Duration::ZERO
    } else {
        config.transfer_pause
    };
    let executor = TransferExecutor::new(
        strategy,
        catalog.clone(),
        config.folder_style,
        config.path_prefix.clone(),
        transfer_pause,
    );

    let options = SyncOptions {
        run_duration: config.run_duration,
        progress_interval: config.progress_interval,
        halt_on_error: config.halt_on_error,
    };

    let shutdown_token = shutdown::install_signal_handler();

    let report = sync::run_sync(&mut reader, catalog, &executor, &options, shutdown_token).await?;

    match report.outcome {
        RunOutcome::Exhausted => tracing::info!("Listing fully walked"),
        RunOutcome::DeadlineExpired => {
            tracing::info!("Run budget used up, run again to continue")
        }
        RunOutcome::Cancelled => tracing::info!("Run cancelled"),
    }

    println!();
    println!("Run summary:");
    println!("  Pages fetched:    {}", report.stats.pages_fetched);
    println!("  Items seen:       {}", report.stats.items_seen);
    println!("  New items:        {}", report.stats.items_new);
    println!("  Already present:  {}", report.stats.items_already_present);
    println!("  Transferred:      {}", report.stats.items_transferred);
    println!("  Failed:           {}", report.stats.items_failed);

    if report.stats.items_failed > 0 {
        anyhow::bail!("{} items failed to transfer", report.stats.items_failed);
    }

    Ok(())
}

/// Run the status command.
async fn run_status(args: cli::StatusArgs) -> anyhow::Result<()> {
    let db_path = config::expand_tilde(&args.catalog.catalog);

    if !db_path.exists() {
        println!("No catalog found at {}", db_path.display());
        println!("Run a sync first to create it.");
        return Ok(());
    }

    let catalog = SqliteCatalog::open(&db_path).await?;
    let summary = catalog.get_summary().await?;

    println!("Catalog: {}", db_path.display());
    println!();
    println!("Items:");
    println!("  Total:       {}", summary.total_items);
    println!("  Transferred: {}", summary.transferred);
    println!("  Pending:     {}", summary.pending);
    println!();
    println!("Indexed storage objects: {}", summary.indexed_objects);

    if let Some(started) = &summary.last_run_started {
        println!();
        println!(
            "Last run started:   {}",
            started.format("%Y-%m-%d %H:%M:%S UTC")
        );
    }
    if let Some(completed) = &summary.last_run_completed {
        println!(
            "Last run completed: {}",
            completed.format("%Y-%m-%d %H:%M:%S UTC")
        );
    }

    if args.runs > 0 {
        let runs = catalog.recent_runs(args.runs).await?;
        if !runs.is_empty() {
            println!();
            println!("Recent runs:");
            for run in runs {
                let state = if run.completed_at.is_none() {
                    "running"
                } else if run.stats.interrupted {
                    "interrupted"
                } else {
                    "completed"
                };
                println!(
                    "  #{:<4} {}  {:<11}  seen {:>5}  transferred {:>5}  failed {:>3}",
                    run.id,
                    run.started_at.format("%Y-%m-%d %H:%M:%S"),
                    state,
                    run.stats.items_seen,
                    run.stats.items_transferred,
                    run.stats.items_failed
                );
            }
        }
    }

    Ok(())
}

/// Run the index-storage command: snapshot the bucket listing into the catalog.
async fn run_index_storage(args: cli::IndexStorageArgs) -> anyhow::Result<()> {
    let db_path = config::expand_tilde(&args.catalog.catalog);
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    let catalog = SqliteCatalog::open(&db_path).await?;

    println!("Listing bucket {}...", args.storage.bucket);
    let store = GcsObjectStore::new(args.storage.bucket, args.storage.storage_token);
    let prefix = if args.prefix.is_empty() {
        None
    } else {
        Some(args.prefix.as_str())
    };
    let objects = store.list_objects(prefix).await?;

    let count = objects.len();
    let total_bytes: u64 = objects.iter().map(|o| o.size).sum();
    catalog.replace_storage_index(&objects).await?;

    println!("Indexed {} objects, {} bytes total.", count, total_bytes);

    Ok(())
}

/// Run the reset-catalog command.
async fn run_reset_catalog(args: cli::ResetCatalogArgs) -> anyhow::Result<()> {
    let db_path = config::expand_tilde(&args.catalog.catalog);

    if !db_path.exists() {
        println!("No catalog found at {}", db_path.display());
        return Ok(());
    }

    if !args.yes {
        println!("This will erase all sync state in:");
        println!("  {}", db_path.display());
        println!();
        println!("Objects already copied to the bucket are left alone, but the");
        println!("next run will transfer everything again.");
        print!("Are you sure? [y/N] ");
        use std::io::Write;
        std::io::stdout().flush()?;

        let mut input = String::new();
        std::io::stdin().read_line(&mut input)?;
        if !input.trim().eq_ignore_ascii_case("y") {
            println!("Cancelled.");
            return Ok(());
        }
    }

    let catalog = SqliteCatalog::open(&db_path).await?;
    let removed = catalog.clear().await?;
    println!("Catalog reset, {} item records removed.", removed);

    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = cli::Cli::parse();

    let filter = match cli.log_level {
        types::LogLevel::Debug => "debug",
        types::LogLevel::Info => "info",
        types::LogLevel::Warn => "warn",
        types::LogLevel::Error => "error",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .init();

    match cli.command {
        Command::Sync(args) => run_sync_command(args).await,
        Command::Status(args) => run_status(args).await,
        Command::IndexStorage(args) => run_index_storage(args).await,
        Command::ResetCatalog(args) => run_reset_catalog(args).await,
    }
}
