use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use futures_util::StreamExt;
use reqwest::Client;
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;

use crate::catalog::{CatalogRecord, CatalogStore, StorageState};
use crate::storage::ObjectStore;
use crate::types::FolderStyle;

use super::error::TransferError;
use super::paths;

/// Marker appended to the source URL template to request the artifact at
/// original resolution.
const DOWNLOAD_PARAM: &str = "=d";

/// How an artifact actually moves to storage. Selected once at startup so
/// the run loop never branches on dry-run mode.
#[async_trait]
pub trait TransferStrategy: Send + Sync {
    /// Move the record's artifact to `destination` in the bucket, returning
    /// the number of bytes that traveled.
    async fn copy_object(
        &self,
        record: &CatalogRecord,
        destination: &str,
    ) -> Result<u64, TransferError>;
}

/// Download, verify, and upload for real.
pub struct RealTransfer {
    http: Client,
    store: Arc<dyn ObjectStore>,
    scratch_dir: PathBuf,
    /// Smallest artifact size accepted as a complete download.
    min_artifact_bytes: u64,
}

impl RealTransfer {
    pub fn new(store: Arc<dyn ObjectStore>, scratch_dir: PathBuf, min_artifact_bytes: u64) -> Self {
        Self {
            http: Client::new(),
            store,
            scratch_dir,
            min_artifact_bytes,
        }
    }

    async fn download_to_scratch(
        &self,
        record: &CatalogRecord,
        scratch_path: &Path,
    ) -> Result<u64, TransferError> {
        let url = format!("{}{DOWNLOAD_PARAM}", record.source_url);
        let filename = record.destination_filename().to_string();

        let response =
            self.http
                .get(&url)
                .send()
                .await
                .map_err(|source| TransferError::DownloadTransport {
                    filename: filename.clone(),
                    source,
                })?;

        if !response.status().is_success() {
            return Err(TransferError::Download {
                filename,
                status: response.status().as_u16(),
            });
        }

        fs::create_dir_all(&self.scratch_dir).await?;

        // Truncate any leftover from an interrupted earlier attempt
        let mut file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(scratch_path)
            .await?;

        let mut bytes_written: u64 = 0;
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|source| TransferError::DownloadTransport {
                filename: filename.clone(),
                source,
            })?;
            file.write_all(&chunk).await?;
            bytes_written += chunk.len() as u64;
        }
        file.flush().await?;
        drop(file);

        Ok(bytes_written)
    }
}

#[async_trait]
impl TransferStrategy for RealTransfer {
    async fn copy_object(
        &self,
        record: &CatalogRecord,
        destination: &str,
    ) -> Result<u64, TransferError> {
        let scratch_path = self.scratch_dir.join(paths::scratch_filename(&record.id));

        let bytes = self.download_to_scratch(record, &scratch_path).await?;

        if bytes < self.min_artifact_bytes {
            let _ = fs::remove_file(&scratch_path).await;
            return Err(TransferError::Verification {
                filename: record.destination_filename().to_string(),
                size: bytes,
            });
        }

        let upload_result = self.store.put_object(destination, &scratch_path).await;
        let _ = fs::remove_file(&scratch_path).await;
        upload_result.map_err(|source| TransferError::Upload {
            filename: record.destination_filename().to_string(),
            source,
        })?;

        Ok(bytes)
    }
}

/// Dry-run strategy: no download, no upload, just a log line.
pub struct NoopTransfer;

#[async_trait]
impl TransferStrategy for NoopTransfer {
    async fn copy_object(
        &self,
        record: &CatalogRecord,
        destination: &str,
    ) -> Result<u64, TransferError> {
        tracing::info!(
            "[DRY RUN] Would copy {} to {}",
            record.destination_filename(),
            destination
        );
        Ok(0)
    }
}

/// Runs the per-item transfer protocol: derive the destination path, move
/// the artifact via the configured strategy, then commit storage state.
///
/// The commit is the only action that marks a record transferred, and it
/// happens strictly after the strategy succeeds. A crash anywhere before
/// the commit leaves the record pending, so the next run picks it up again.
pub struct TransferExecutor {
    strategy: Box<dyn TransferStrategy>,
    catalog: Arc<dyn CatalogStore>,
    folder_style: FolderStyle,
    path_prefix: String,
    /// Pause after every attempt, bounding download throughput.
    pause: Duration,
}

impl TransferExecutor {
    pub fn new(
        strategy: Box<dyn TransferStrategy>,
        catalog: Arc<dyn CatalogStore>,
        folder_style: FolderStyle,
        path_prefix: String,
        pause: Duration,
    ) -> Self {
        Self {
            strategy,
            catalog,
            folder_style,
            path_prefix,
            pause,
        }
    }

    pub async fn transfer(&self, record: &CatalogRecord) -> Result<StorageState, TransferError> {
        let destination =
            paths::build_storage_path(record, self.folder_style, &self.path_prefix)?;

        let result = self.copy_and_commit(record, &destination).await;

        // The pause applies to every attempt, failed ones included
        if !self.pause.is_zero() {
            tokio::time::sleep(self.pause).await;
        }

        result
    }

    async fn copy_and_commit(
        &self,
        record: &CatalogRecord,
        destination: &str,
    ) -> Result<StorageState, TransferError> {
        let bytes = self.strategy.copy_object(record, destination).await?;

        let state = StorageState {
            uploaded_at: Utc::now(),
            stored_filename: record.destination_filename().to_string(),
            stored_path: destination.to_string(),
        };
        self.catalog.commit_storage(&record.id, &state).await?;

        tracing::debug!(
            id = %record.id,
            destination = %destination,
            bytes,
            "transfer committed"
        );

        Ok(state)
    }
}
