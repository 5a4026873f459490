//! Incremental sync runs.
//!
//! A run walks the remote listing page by page and, for every item, upserts
//! it into the catalog and transfers it to blob storage unless a previous
//! run already did. Runs are time-boxed: a wall-clock deadline is checked
//! after every item and before every page fetch, so repeated short runs
//! eventually drain the whole listing without any run overstaying its slot.
//! Nothing outside the catalog persists between runs; resumability comes
//! from the pending/transferred state alone.

mod error;
mod paths;
mod progress;
mod resolve;
mod transfer;

use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::catalog::{CatalogRecord, CatalogStore, RunStats, UpsertOutcome};
use crate::remote::{CatalogReader, RemoteItem};

pub use error::{SyncError, TransferError};
pub use progress::RunCounters;
pub use transfer::{NoopTransfer, RealTransfer, TransferExecutor, TransferStrategy};

use progress::ProgressReporter;

/// Run-level knobs consumed by the run loop. Listing and transfer pacing
/// live with the components that own those calls. Decoupled from CLI
/// parsing so the loop can be tested independently.
#[derive(Debug, Clone)]
pub struct SyncOptions {
    /// Wall-clock budget for the run.
    pub run_duration: Duration,
    /// Cadence of the background progress snapshot.
    pub progress_interval: Duration,
    /// Abort the run on the first failed item instead of continuing.
    pub halt_on_error: bool,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            run_duration: Duration::from_secs(60),
            progress_interval: Duration::from_secs(10),
            halt_on_error: false,
        }
    }
}

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// The listing was walked to the end.
    Exhausted,
    /// The wall-clock budget ran out first.
    DeadlineExpired,
    /// A shutdown signal arrived.
    Cancelled,
}

/// Final counters of a completed run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunReport {
    pub outcome: RunOutcome,
    pub stats: RunStats,
}

/// Everything one run carries between states: the deadline, the shared
/// counters, and the pagination cursor. Created at run start and dropped
/// at run end.
struct RunContext {
    deadline: Instant,
    counters: Arc<RunCounters>,
    cursor: Option<String>,
}

/// Execute one time-boxed sync run.
///
/// The run is recorded in the catalog's run history whichever way it ends;
/// a run-fatal error still persists the counters gathered so far before
/// propagating.
pub async fn run_sync(
    reader: &mut CatalogReader,
    catalog: Arc<dyn CatalogStore>,
    executor: &TransferExecutor,
    options: &SyncOptions,
    shutdown: CancellationToken,
) -> Result<RunReport, SyncError> {
    let run_id = catalog.start_sync_run().await?;

    let counters = Arc::new(RunCounters::default());
    let reporter = ProgressReporter::spawn(counters.clone(), options.progress_interval);

    let mut ctx = RunContext {
        deadline: Instant::now() + options.run_duration,
        counters,
        cursor: None,
    };

    let result = drive(reader, catalog.as_ref(), executor, options, &mut ctx, &shutdown).await;

    reporter.stop().await;

    let mut stats = ctx.counters.snapshot();
    stats.interrupted = result.is_err() || matches!(result, Ok(RunOutcome::Cancelled));

    match &result {
        Ok(_) => catalog.complete_sync_run(run_id, &stats).await?,
        Err(_) => {
            // The drive error is the one worth surfacing
            if let Err(e) = catalog.complete_sync_run(run_id, &stats).await {
                tracing::warn!("failed to record run completion: {e}");
            }
        }
    }

    let outcome = result?;
    Ok(RunReport { outcome, stats })
}

/// The `Paging`/`ItemLoop` state machine.
async fn drive(
    reader: &mut CatalogReader,
    catalog: &dyn CatalogStore,
    executor: &TransferExecutor,
    options: &SyncOptions,
    ctx: &mut RunContext,
    shutdown: &CancellationToken,
) -> Result<RunOutcome, SyncError> {
    loop {
        if shutdown.is_cancelled() {
            return Ok(RunOutcome::Cancelled);
        }
        if Instant::now() >= ctx.deadline {
            return Ok(RunOutcome::DeadlineExpired);
        }

        let page = reader.fetch_page(ctx.cursor.as_deref()).await?;
        ctx.counters.add_page();
        ctx.counters.add_seen(page.items.len() as u64);
        tracing::debug!(items = page.items.len(), "page fetched");

        for item in &page.items {
            process_item(catalog, executor, options, ctx, item).await?;

            if shutdown.is_cancelled() {
                return Ok(RunOutcome::Cancelled);
            }
            if Instant::now() >= ctx.deadline {
                return Ok(RunOutcome::DeadlineExpired);
            }
        }

        match page.next_cursor {
            Some(next) => ctx.cursor = Some(next),
            None => return Ok(RunOutcome::Exhausted),
        }
    }
}

/// One trip through the item loop: upsert, re-read, skip-or-transfer.
async fn process_item(
    catalog: &dyn CatalogStore,
    executor: &TransferExecutor,
    options: &SyncOptions,
    ctx: &RunContext,
    item: &RemoteItem,
) -> Result<(), SyncError> {
    let incoming = CatalogRecord::new_pending(
        item.id.clone(),
        item.filename.clone(),
        item.base_url.clone(),
        item.mime_type.clone(),
        item.created_at(),
    );

    if catalog.upsert_item(&incoming).await? == UpsertOutcome::Inserted {
        ctx.counters.add_new();
    }

    // Work from the committed record, not the incoming one: earlier runs may
    // have resolved a backup filename or already transferred this item.
    let mut record = catalog
        .get_item(&item.id)
        .await?
        .ok_or_else(|| SyncError::CatalogWrite {
            id: item.id.clone(),
        })?;

    if record.is_transferred() {
        ctx.counters.add_already_present();
        tracing::debug!(id = %record.id, "already transferred");
        return Ok(());
    }

    if record.backup_filename.is_none() {
        let resolved = match resolve::resolve_backup_name(catalog, &record).await {
            Ok(name) => name,
            // A catalog fault during lookup is run-fatal, not an item failure
            Err(TransferError::Catalog(e)) => return Err(SyncError::Catalog(e)),
            Err(e) => return fail_item(options, ctx, &record.id, e),
        };
        if resolved != record.filename {
            tracing::info!(id = %record.id, backup_filename = %resolved, "filename collision resolved");
        }
        catalog.set_backup_filename(&record.id, &resolved).await?;
        record.backup_filename = Some(resolved);
    }

    match executor.transfer(&record).await {
        Ok(_) => {
            ctx.counters.add_transferred();
            Ok(())
        }
        // A catalog fault mid-commit is never a per-item condition
        Err(TransferError::Catalog(e)) => Err(SyncError::Catalog(e)),
        Err(e) => fail_item(options, ctx, &record.id, e),
    }
}

fn fail_item(
    options: &SyncOptions,
    ctx: &RunContext,
    id: &str,
    error: TransferError,
) -> Result<(), SyncError> {
    ctx.counters.add_failed();
    if options.halt_on_error {
        return Err(SyncError::Item {
            id: id.to_string(),
            source: error,
        });
    }
    tracing::warn!(id = %id, "item failed, continuing: {error}");
    Ok(())
}
