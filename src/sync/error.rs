use thiserror::Error;

use crate::catalog::CatalogError;
use crate::remote::RemoteError;
use crate::storage::StorageError;

/// Failure domains of a single item's transfer. Each step of the pipeline
/// maps to its own variant so run summaries can say which stage lost an item.
#[derive(Error, Debug)]
pub enum TransferError {
    #[error("item {id} has no creation time; cannot derive a dated destination")]
    MissingMetadata { id: String },
    #[error("download of {filename} returned status {status}")]
    Download { filename: String, status: u16 },
    #[error("download of {filename} failed: {source}")]
    DownloadTransport {
        filename: String,
        source: reqwest::Error,
    },
    #[error("downloaded artifact for {filename} is {size} bytes; refusing to upload")]
    Verification { filename: String, size: u64 },
    #[error("upload of {filename} failed: {source}")]
    Upload {
        filename: String,
        source: StorageError,
    },
    #[error("scratch I/O failed: {0}")]
    Scratch(#[from] std::io::Error),
    #[error(transparent)]
    Catalog(#[from] CatalogError),
}

/// Run-fatal failures. Per-item transfer errors only surface here when the
/// run is configured to halt on the first failed item.
#[derive(Error, Debug)]
pub enum SyncError {
    #[error(transparent)]
    Remote(#[from] RemoteError),
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error("catalog record {id} missing immediately after upsert")]
    CatalogWrite { id: String },
    #[error("item {id} failed: {source}")]
    Item { id: String, source: TransferError },
}
