//! Types for the catalog module.

use chrono::{DateTime, Utc};

/// A catalog record mirroring one remote media item.
///
/// Keyed by the remote item's stable id. A record is "pending" until its
/// `storage` sub-state is present; that presence is the only signal that the
/// item has been transferred to the bucket.
#[derive(Debug, Clone)]
pub struct CatalogRecord {
    /// Stable id assigned by the remote library.
    pub id: String,
    /// Display filename as reported by the remote library. Not unique.
    pub filename: String,
    /// Collision-free destination filename. Assigned once, never changed.
    pub backup_filename: Option<String>,
    /// MIME type reported by the remote library.
    pub mime_type: Option<String>,
    /// Time-limited content URL. Refreshed on every sighting.
    pub source_url: String,
    /// Capture time from remote metadata. Absent when the remote item
    /// carries no usable creation time.
    pub created_at: Option<DateTime<Utc>>,
    /// Present only after a confirmed transfer.
    pub storage: Option<StorageState>,
    /// Timestamp of the last catalog write for this record.
    #[allow(dead_code)] // Mapped from the row for schema parity; the engine only writes it
    pub updated_at: DateTime<Utc>,
}

impl CatalogRecord {
    /// Build a fresh pending record from remote listing data.
    pub fn new_pending(
        id: String,
        filename: String,
        source_url: String,
        mime_type: Option<String>,
        created_at: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            id,
            filename,
            backup_filename: None,
            mime_type,
            source_url,
            created_at,
            storage: None,
            updated_at: Utc::now(),
        }
    }

    /// Whether this record has been transferred to the bucket.
    pub fn is_transferred(&self) -> bool {
        self.storage.is_some()
    }

    /// The filename this record occupies (or will occupy) in the bucket.
    ///
    /// Falls back to the display filename while collision resolution has not
    /// run yet.
    pub fn destination_filename(&self) -> &str {
        self.backup_filename.as_deref().unwrap_or(&self.filename)
    }
}

/// Storage sub-state recorded after a successful transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageState {
    /// When the upload was confirmed.
    pub uploaded_at: DateTime<Utc>,
    /// Destination filename at the time of transfer.
    pub stored_filename: String,
    /// Full object key the artifact was written to.
    pub stored_path: String,
}

/// Whether an upsert created a new record or refreshed an existing one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Inserted,
    Updated,
}

/// Final counters for one sync run, persisted into run history.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunStats {
    pub pages_fetched: u64,
    pub items_seen: u64,
    pub items_new: u64,
    pub items_already_present: u64,
    pub items_transferred: u64,
    pub items_failed: u64,
    /// True when the run was cut short by a shutdown signal or a fatal error.
    pub interrupted: bool,
}

/// One row of run history.
#[derive(Debug, Clone)]
pub struct RunRecord {
    pub id: i64,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub stats: RunStats,
}

/// Aggregate view of the catalog for status reporting.
#[derive(Debug, Clone)]
pub struct CatalogSummary {
    pub total_items: u64,
    pub transferred: u64,
    pub pending: u64,
    pub indexed_objects: u64,
    pub last_run_started: Option<DateTime<Utc>>,
    pub last_run_completed: Option<DateTime<Utc>>,
}
