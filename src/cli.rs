use clap::{Args, Parser, Subcommand};

use crate::types::{FolderStyle, LogLevel};

#[derive(Parser, Debug)]
#[command(name = "photark", about = "Mirror a hosted photo library into a storage bucket")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Log level
    #[arg(long, value_enum, default_value = "info", global = true)]
    pub log_level: LogLevel,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run one time-boxed sync pass
    Sync(SyncArgs),
    /// Print catalog totals and recent runs
    Status(StatusArgs),
    /// Rebuild the index of objects already in the bucket
    IndexStorage(IndexStorageArgs),
    /// Delete all catalog state
    ResetCatalog(ResetCatalogArgs),
}

#[derive(Args, Debug)]
pub struct CatalogArgs {
    /// Path to the catalog database
    #[arg(long, env = "PHOTARK_CATALOG", default_value = "~/.photark/catalog.db")]
    pub catalog: String,
}

#[derive(Args, Debug)]
pub struct RemoteArgs {
    /// OAuth access token for the media library API.
    /// WARNING: passing via --access-token is visible in process listings.
    /// Prefer the PHOTARK_ACCESS_TOKEN environment variable instead.
    #[arg(long, env = "PHOTARK_ACCESS_TOKEN", hide_env_values = true)]
    pub access_token: String,
}

#[derive(Args, Debug)]
pub struct StorageArgs {
    /// Destination bucket name
    #[arg(long, env = "PHOTARK_BUCKET")]
    pub bucket: String,

    /// OAuth access token for the storage API
    #[arg(long, env = "PHOTARK_STORAGE_TOKEN", hide_env_values = true)]
    pub storage_token: String,
}

#[derive(Args, Debug)]
pub struct SyncArgs {
    #[command(flatten)]
    pub catalog: CatalogArgs,

    #[command(flatten)]
    pub remote: RemoteArgs,

    #[command(flatten)]
    pub storage: StorageArgs,

    /// Object name prefix, prepended verbatim to every stored path
    #[arg(long, env = "PHOTARK_PREFIX", default_value = "")]
    pub prefix: String,

    /// Folder layout under the prefix
    #[arg(long, value_enum, default_value = "yearly")]
    pub folder_style: FolderStyle,

    /// Wall-clock budget for the run, in minutes
    #[arg(long, default_value_t = 1)]
    pub run_minutes: u64,

    /// Record what would transfer without touching storage
    #[arg(long)]
    pub dry_run: bool,

    /// Items per listing page
    #[arg(long, default_value_t = 100)]
    pub page_size: u32,

    /// Seconds between listing calls
    #[arg(long, default_value_t = 5)]
    pub list_pause: u64,

    /// Seconds between transfer attempts
    #[arg(long, default_value_t = 2)]
    pub transfer_pause: u64,

    /// Stop the run at the first failed item
    #[arg(long)]
    pub halt_on_error: bool,

    /// Only sync items created on or after this ISO date or interval (e.g., 2025-01-02 or 20d)
    #[arg(long)]
    pub created_after: Option<String>,

    /// Only sync items created on or before this ISO date or interval
    #[arg(long)]
    pub created_before: Option<String>,

    /// Directory for in-flight downloads
    #[arg(long, default_value = "~/.photark/scratch")]
    pub scratch_dir: String,

    /// Reject downloaded artifacts smaller than this many bytes
    #[arg(long, default_value_t = 1)]
    pub min_artifact_bytes: u64,

    /// Seconds between progress log lines
    #[arg(long, default_value_t = 10)]
    pub progress_interval: u64,
}

#[derive(Args, Debug)]
pub struct StatusArgs {
    #[command(flatten)]
    pub catalog: CatalogArgs,

    /// How many recent runs to list
    #[arg(long, default_value_t = 5)]
    pub runs: u32,
}

#[derive(Args, Debug)]
pub struct IndexStorageArgs {
    #[command(flatten)]
    pub catalog: CatalogArgs,

    #[command(flatten)]
    pub storage: StorageArgs,

    /// Only index objects under this prefix
    #[arg(long, env = "PHOTARK_PREFIX", default_value = "")]
    pub prefix: String,
}

#[derive(Args, Debug)]
pub struct ResetCatalogArgs {
    #[command(flatten)]
    pub catalog: CatalogArgs,

    /// Skip the confirmation prompt
    #[arg(long)]
    pub yes: bool,
}
