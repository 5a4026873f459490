//! Catalog store trait and SQLite implementation.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use rusqlite::{Connection, OptionalExtension};

use crate::storage::StoredObject;

use super::error::CatalogError;
use super::schema;
use super::{CatalogRecord, CatalogSummary, RunRecord, RunStats, StorageState, UpsertOutcome};

/// Trait for catalog store operations.
///
/// This trait is object-safe and can be used with `Arc<dyn CatalogStore>` for
/// shared access across async tasks.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// Insert or update a record by id after seeing it in a listing page.
    ///
    /// Mirrored metadata (filename, mime type, source URL, creation time) is
    /// refreshed on every sighting; `backup_filename` and storage state are
    /// preserved. Idempotent: re-applying the same page reports `Updated`.
    async fn upsert_item(&self, record: &CatalogRecord) -> Result<UpsertOutcome, CatalogError>;

    /// Point read by remote id.
    async fn get_item(&self, id: &str) -> Result<Option<CatalogRecord>, CatalogError>;

    /// Commit a resolved backup filename for a record.
    async fn set_backup_filename(
        &self,
        id: &str,
        backup_filename: &str,
    ) -> Result<(), CatalogError>;

    /// Record a confirmed transfer. Marks the record as transferred.
    async fn commit_storage(&self, id: &str, storage: &StorageState) -> Result<(), CatalogError>;

    /// Find any other record (different id) with the same display filename.
    ///
    /// Returns the colliding record's id, if one exists.
    async fn find_filename_collision(
        &self,
        filename: &str,
        excluding_id: &str,
    ) -> Result<Option<String>, CatalogError>;

    /// Whether another record already claims `name` as its destination
    /// filename — either as a committed `backup_filename`, or as its display
    /// filename while still unresolved.
    async fn backup_name_in_use(
        &self,
        name: &str,
        excluding_id: &str,
    ) -> Result<bool, CatalogError>;

    /// Get a summary of the catalog state.
    async fn get_summary(&self) -> Result<CatalogSummary, CatalogError>;

    /// Start a new sync run and return its ID.
    async fn start_sync_run(&self) -> Result<i64, CatalogError>;

    /// Complete a sync run with its final counters.
    async fn complete_sync_run(&self, run_id: i64, stats: &RunStats) -> Result<(), CatalogError>;

    /// Most recent run rows, newest first.
    async fn recent_runs(&self, limit: u32) -> Result<Vec<RunRecord>, CatalogError>;

    /// Replace the storage-object index wholesale with a fresh listing.
    async fn replace_storage_index(&self, objects: &[StoredObject]) -> Result<(), CatalogError>;

    /// Delete every catalog record, indexed object, and run row.
    ///
    /// Administrative only; the sync engine never deletes. Returns the number
    /// of catalog records removed.
    async fn clear(&self) -> Result<u64, CatalogError>;
}

/// SQLite implementation of the catalog store.
pub struct SqliteCatalog {
    /// Wrapped in Mutex because rusqlite::Connection is not Sync. Guards are
    /// always dropped before any await point.
    conn: Mutex<Connection>,
    /// Path to the database file (for error messages).
    path: PathBuf,
}

impl std::fmt::Debug for SqliteCatalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteCatalog")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

impl SqliteCatalog {
    /// Open or create a catalog database at the given path.
    pub async fn open(path: &Path) -> Result<Self, CatalogError> {
        let path = path.to_path_buf();
        let path_clone = path.clone();

        let conn = tokio::task::spawn_blocking(move || {
            let conn = Connection::open(&path_clone).map_err(|e| CatalogError::Open {
                path: path_clone.clone(),
                source: e,
            })?;

            // Enable WAL mode for better concurrent read/write performance
            conn.pragma_update(None, "journal_mode", "WAL")
                .map_err(CatalogError::Migration)?;

            // Use NORMAL synchronous mode for better performance
            // (still safe with WAL mode)
            conn.pragma_update(None, "synchronous", "NORMAL")
                .map_err(CatalogError::Migration)?;

            // Run migrations
            schema::migrate(&conn)?;

            Ok::<_, CatalogError>(conn)
        })
        .await??;

        Ok(Self {
            conn: Mutex::new(conn),
            path,
        })
    }

    /// Open an in-memory catalog (for testing).
    #[cfg(test)]
    pub fn open_in_memory() -> Result<Self, CatalogError> {
        let conn = Connection::open_in_memory().map_err(|e| CatalogError::Open {
            path: PathBuf::from(":memory:"),
            source: e,
        })?;
        schema::migrate(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
            path: PathBuf::from(":memory:"),
        })
    }

    /// Get the path to the database file.
    #[cfg(test)]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl CatalogStore for SqliteCatalog {
    async fn upsert_item(&self, record: &CatalogRecord) -> Result<UpsertOutcome, CatalogError> {
        let updated_at = Utc::now().timestamp();

        let conn = self
            .conn
            .lock()
            .map_err(|e| CatalogError::Query(e.to_string()))?;

        let existed: bool = conn
            .query_row(
                "SELECT EXISTS(SELECT 1 FROM catalog_items WHERE id = ?1)",
                [&record.id],
                |row| row.get(0),
            )
            .map_err(CatalogError::query)?;

        // Preserve backup_filename and storage columns on conflict; only the
        // mirrored remote metadata is refreshed.
        conn.execute(
            r#"
            INSERT INTO catalog_items (id, filename, mime_type, source_url, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ON CONFLICT(id) DO UPDATE SET
                filename = excluded.filename,
                mime_type = excluded.mime_type,
                source_url = excluded.source_url,
                created_at = excluded.created_at,
                updated_at = excluded.updated_at
            "#,
            rusqlite::params![
                &record.id,
                &record.filename,
                &record.mime_type,
                &record.source_url,
                record.created_at.map(|dt| dt.timestamp()),
                updated_at,
            ],
        )
        .map_err(CatalogError::query)?;

        Ok(if existed {
            UpsertOutcome::Updated
        } else {
            UpsertOutcome::Inserted
        })
    }

    async fn get_item(&self, id: &str) -> Result<Option<CatalogRecord>, CatalogError> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| CatalogError::Query(e.to_string()))?;

        conn.query_row(
            "SELECT id, filename, backup_filename, mime_type, source_url, created_at, \
             uploaded_at, stored_filename, stored_path, updated_at \
             FROM catalog_items WHERE id = ?1",
            [id],
            row_to_record,
        )
        .optional()
        .map_err(CatalogError::query)
    }

    async fn set_backup_filename(
        &self,
        id: &str,
        backup_filename: &str,
    ) -> Result<(), CatalogError> {
        let updated_at = Utc::now().timestamp();

        let conn = self
            .conn
            .lock()
            .map_err(|e| CatalogError::Query(e.to_string()))?;

        conn.execute(
            "UPDATE catalog_items SET backup_filename = ?1, updated_at = ?2 WHERE id = ?3",
            rusqlite::params![backup_filename, updated_at, id],
        )
        .map_err(CatalogError::query)?;

        Ok(())
    }

    async fn commit_storage(&self, id: &str, storage: &StorageState) -> Result<(), CatalogError> {
        let updated_at = Utc::now().timestamp();

        let conn = self
            .conn
            .lock()
            .map_err(|e| CatalogError::Query(e.to_string()))?;

        conn.execute(
            "UPDATE catalog_items SET uploaded_at = ?1, stored_filename = ?2, stored_path = ?3, \
             updated_at = ?4 WHERE id = ?5",
            rusqlite::params![
                storage.uploaded_at.timestamp(),
                &storage.stored_filename,
                &storage.stored_path,
                updated_at,
                id,
            ],
        )
        .map_err(CatalogError::query)?;

        Ok(())
    }

    async fn find_filename_collision(
        &self,
        filename: &str,
        excluding_id: &str,
    ) -> Result<Option<String>, CatalogError> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| CatalogError::Query(e.to_string()))?;

        conn.query_row(
            "SELECT id FROM catalog_items WHERE filename = ?1 AND id != ?2 LIMIT 1",
            [filename, excluding_id],
            |row| row.get(0),
        )
        .optional()
        .map_err(CatalogError::query)
    }

    async fn backup_name_in_use(
        &self,
        name: &str,
        excluding_id: &str,
    ) -> Result<bool, CatalogError> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| CatalogError::Query(e.to_string()))?;

        conn.query_row(
            "SELECT EXISTS(\
                SELECT 1 FROM catalog_items \
                WHERE id != ?1 \
                  AND (backup_filename = ?2 \
                       OR (backup_filename IS NULL AND filename = ?2))\
             )",
            [excluding_id, name],
            |row| row.get(0),
        )
        .map_err(CatalogError::query)
    }

    async fn get_summary(&self) -> Result<CatalogSummary, CatalogError> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| CatalogError::Query(e.to_string()))?;

        let total_items: u64 = conn
            .query_row("SELECT COUNT(*) FROM catalog_items", [], |row| {
                row.get::<_, i64>(0)
            })
            .map_err(CatalogError::query)? as u64;

        let transferred: u64 = conn
            .query_row(
                "SELECT COUNT(*) FROM catalog_items WHERE uploaded_at IS NOT NULL",
                [],
                |row| row.get::<_, i64>(0),
            )
            .map_err(CatalogError::query)? as u64;

        let pending: u64 = conn
            .query_row(
                "SELECT COUNT(*) FROM catalog_items WHERE uploaded_at IS NULL",
                [],
                |row| row.get::<_, i64>(0),
            )
            .map_err(CatalogError::query)? as u64;

        let indexed_objects: u64 = conn
            .query_row("SELECT COUNT(*) FROM storage_objects", [], |row| {
                row.get::<_, i64>(0)
            })
            .map_err(CatalogError::query)? as u64;

        let last_run: Option<(Option<i64>, Option<i64>)> = conn
            .query_row(
                "SELECT started_at, completed_at FROM sync_runs ORDER BY id DESC LIMIT 1",
                [],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()
            .map_err(CatalogError::query)?;

        let (last_run_started, last_run_completed) = match last_run {
            Some((started, completed)) => (
                started.and_then(|ts| Utc.timestamp_opt(ts, 0).single()),
                completed.and_then(|ts| Utc.timestamp_opt(ts, 0).single()),
            ),
            None => (None, None),
        };

        Ok(CatalogSummary {
            total_items,
            transferred,
            pending,
            indexed_objects,
            last_run_started,
            last_run_completed,
        })
    }

    async fn start_sync_run(&self) -> Result<i64, CatalogError> {
        let started_at = Utc::now().timestamp();

        let conn = self
            .conn
            .lock()
            .map_err(|e| CatalogError::Query(e.to_string()))?;

        conn.execute(
            "INSERT INTO sync_runs (started_at) VALUES (?1)",
            [started_at],
        )
        .map_err(CatalogError::query)?;

        let id = conn.last_insert_rowid();
        Ok(id)
    }

    async fn complete_sync_run(&self, run_id: i64, stats: &RunStats) -> Result<(), CatalogError> {
        let completed_at = Utc::now().timestamp();
        let interrupted = if stats.interrupted { 1 } else { 0 };

        let conn = self
            .conn
            .lock()
            .map_err(|e| CatalogError::Query(e.to_string()))?;

        conn.execute(
            "UPDATE sync_runs SET completed_at = ?1, pages_fetched = ?2, items_seen = ?3, \
             items_new = ?4, items_already_present = ?5, items_transferred = ?6, \
             items_failed = ?7, interrupted = ?8 WHERE id = ?9",
            rusqlite::params![
                completed_at,
                stats.pages_fetched as i64,
                stats.items_seen as i64,
                stats.items_new as i64,
                stats.items_already_present as i64,
                stats.items_transferred as i64,
                stats.items_failed as i64,
                interrupted,
                run_id,
            ],
        )
        .map_err(CatalogError::query)?;

        Ok(())
    }

    async fn recent_runs(&self, limit: u32) -> Result<Vec<RunRecord>, CatalogError> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| CatalogError::Query(e.to_string()))?;

        let mut stmt = conn
            .prepare(
                "SELECT id, started_at, completed_at, pages_fetched, items_seen, items_new, \
                 items_already_present, items_transferred, items_failed, interrupted \
                 FROM sync_runs ORDER BY id DESC LIMIT ?1",
            )
            .map_err(CatalogError::query)?;

        let runs = stmt
            .query_map([limit], row_to_run_record)
            .map_err(CatalogError::query)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(CatalogError::query)?;

        Ok(runs)
    }

    async fn replace_storage_index(&self, objects: &[StoredObject]) -> Result<(), CatalogError> {
        let indexed_at = Utc::now().timestamp();

        let conn = self
            .conn
            .lock()
            .map_err(|e| CatalogError::Query(e.to_string()))?;

        // Use a transaction so a failed rebuild never leaves a half-empty index
        conn.execute("BEGIN TRANSACTION", [])
            .map_err(CatalogError::query)?;

        let result = (|| {
            conn.execute("DELETE FROM storage_objects", [])
                .map_err(CatalogError::query)?;

            let mut stmt = conn
                .prepare_cached(
                    "INSERT OR REPLACE INTO storage_objects \
                     (name, size, content_hash, created_at, indexed_at) \
                     VALUES (?1, ?2, ?3, ?4, ?5)",
                )
                .map_err(CatalogError::query)?;

            for object in objects {
                stmt.execute(rusqlite::params![
                    &object.name,
                    object.size as i64,
                    &object.content_hash,
                    object.created_at.map(|dt| dt.timestamp()),
                    indexed_at,
                ])
                .map_err(CatalogError::query)?;
            }

            Ok::<_, CatalogError>(())
        })();

        match result {
            Ok(()) => {
                conn.execute("COMMIT", []).map_err(CatalogError::query)?;
                Ok(())
            }
            Err(e) => {
                let _ = conn.execute("ROLLBACK", []);
                Err(e)
            }
        }
    }

    async fn clear(&self) -> Result<u64, CatalogError> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| CatalogError::Query(e.to_string()))?;

        conn.execute("BEGIN TRANSACTION", [])
            .map_err(CatalogError::query)?;

        let result = (|| {
            let removed = conn
                .execute("DELETE FROM catalog_items", [])
                .map_err(CatalogError::query)?;
            conn.execute("DELETE FROM storage_objects", [])
                .map_err(CatalogError::query)?;
            conn.execute("DELETE FROM sync_runs", [])
                .map_err(CatalogError::query)?;
            Ok::<_, CatalogError>(removed as u64)
        })();

        match result {
            Ok(removed) => {
                conn.execute("COMMIT", []).map_err(CatalogError::query)?;
                Ok(removed)
            }
            Err(e) => {
                let _ = conn.execute("ROLLBACK", []);
                Err(e)
            }
        }
    }
}

/// Convert a catalog_items row to a CatalogRecord.
fn row_to_record(row: &rusqlite::Row<'_>) -> rusqlite::Result<CatalogRecord> {
    let created_at_ts: Option<i64> = row.get(5)?;
    let uploaded_at_ts: Option<i64> = row.get(6)?;
    let stored_filename: Option<String> = row.get(7)?;
    let stored_path: Option<String> = row.get(8)?;
    let updated_at_ts: i64 = row.get(9)?;

    // The three storage columns are written in one UPDATE; treat anything
    // less than a full set as pending.
    let storage = match (uploaded_at_ts, stored_filename, stored_path) {
        (Some(ts), Some(stored_filename), Some(stored_path)) => Utc
            .timestamp_opt(ts, 0)
            .single()
            .map(|uploaded_at| StorageState {
                uploaded_at,
                stored_filename,
                stored_path,
            }),
        _ => None,
    };

    Ok(CatalogRecord {
        id: row.get(0)?,
        filename: row.get(1)?,
        backup_filename: row.get(2)?,
        mime_type: row.get(3)?,
        source_url: row.get(4)?,
        created_at: created_at_ts.and_then(|ts| Utc.timestamp_opt(ts, 0).single()),
        storage,
        updated_at: Utc
            .timestamp_opt(updated_at_ts, 0)
            .single()
            .unwrap_or(DateTime::UNIX_EPOCH),
    })
}

/// Convert a sync_runs row to a RunRecord.
fn row_to_run_record(row: &rusqlite::Row<'_>) -> rusqlite::Result<RunRecord> {
    let started_at_ts: i64 = row.get(1)?;
    let completed_at_ts: Option<i64> = row.get(2)?;
    let interrupted: i64 = row.get(9)?;

    Ok(RunRecord {
        id: row.get(0)?,
        started_at: Utc
            .timestamp_opt(started_at_ts, 0)
            .single()
            .unwrap_or(DateTime::UNIX_EPOCH),
        completed_at: completed_at_ts.and_then(|ts| Utc.timestamp_opt(ts, 0).single()),
        stats: RunStats {
            pages_fetched: row.get::<_, i64>(3)? as u64,
            items_seen: row.get::<_, i64>(4)? as u64,
            items_new: row.get::<_, i64>(5)? as u64,
            items_already_present: row.get::<_, i64>(6)? as u64,
            items_transferred: row.get::<_, i64>(7)? as u64,
            items_failed: row.get::<_, i64>(8)? as u64,
            interrupted: interrupted != 0,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn mem_catalog() -> SqliteCatalog {
        SqliteCatalog::open_in_memory().unwrap()
    }

    fn sample(id: &str, filename: &str) -> CatalogRecord {
        CatalogRecord::new_pending(
            id.to_string(),
            filename.to_string(),
            format!("https://media.example.com/{id}"),
            Some("image/jpeg".to_string()),
            Some(Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap()),
        )
    }

    fn storage_state(path: &str, name: &str) -> StorageState {
        StorageState {
            uploaded_at: Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap(),
            stored_filename: name.to_string(),
            stored_path: path.to_string(),
        }
    }

    #[tokio::test]
    async fn test_open_creates_db() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("catalog.db");
        let catalog = SqliteCatalog::open(&path).await.unwrap();
        assert!(path.exists());
        assert_eq!(catalog.path(), path);
    }

    #[tokio::test]
    async fn test_upsert_inserts_then_updates() {
        let catalog = mem_catalog();
        let record = sample("a1", "x.jpg");

        let first = catalog.upsert_item(&record).await.unwrap();
        assert_eq!(first, UpsertOutcome::Inserted);

        let second = catalog.upsert_item(&record).await.unwrap();
        assert_eq!(second, UpsertOutcome::Updated);

        let summary = catalog.get_summary().await.unwrap();
        assert_eq!(summary.total_items, 1);
    }

    #[tokio::test]
    async fn test_upsert_preserves_backup_and_storage() {
        let catalog = mem_catalog();
        let record = sample("a1", "x.jpg");
        catalog.upsert_item(&record).await.unwrap();
        catalog.set_backup_filename("a1", "x-renamed.jpg").await.unwrap();
        catalog
            .commit_storage("a1", &storage_state("photos/2020/x-renamed.jpg", "x-renamed.jpg"))
            .await
            .unwrap();

        // A later sighting must not regress either field
        catalog.upsert_item(&record).await.unwrap();

        let loaded = catalog.get_item("a1").await.unwrap().unwrap();
        assert_eq!(loaded.backup_filename.as_deref(), Some("x-renamed.jpg"));
        assert!(loaded.is_transferred());
    }

    #[tokio::test]
    async fn test_upsert_refreshes_source_url() {
        let catalog = mem_catalog();
        let mut record = sample("a1", "x.jpg");
        catalog.upsert_item(&record).await.unwrap();

        record.source_url = "https://media.example.com/a1-fresh".to_string();
        catalog.upsert_item(&record).await.unwrap();

        let loaded = catalog.get_item("a1").await.unwrap().unwrap();
        assert_eq!(loaded.source_url, "https://media.example.com/a1-fresh");
    }

    #[tokio::test]
    async fn test_get_item_missing_returns_none() {
        let catalog = mem_catalog();
        assert!(catalog.get_item("nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_get_item_round_trips_fields() {
        let catalog = mem_catalog();
        let record = sample("a1", "x.jpg");
        catalog.upsert_item(&record).await.unwrap();

        let loaded = catalog.get_item("a1").await.unwrap().unwrap();
        assert_eq!(loaded.id, "a1");
        assert_eq!(loaded.filename, "x.jpg");
        assert_eq!(loaded.mime_type.as_deref(), Some("image/jpeg"));
        assert_eq!(loaded.source_url, "https://media.example.com/a1");
        assert_eq!(loaded.created_at, record.created_at);
        assert!(loaded.backup_filename.is_none());
        assert!(loaded.storage.is_none());
    }

    #[tokio::test]
    async fn test_commit_storage_round_trip() {
        let catalog = mem_catalog();
        catalog.upsert_item(&sample("a1", "x.jpg")).await.unwrap();

        let state = storage_state("photos/2020/x.jpg", "x.jpg");
        catalog.commit_storage("a1", &state).await.unwrap();

        let loaded = catalog.get_item("a1").await.unwrap().unwrap();
        let storage = loaded.storage.unwrap();
        assert_eq!(storage.stored_filename, "x.jpg");
        assert_eq!(storage.stored_path, "photos/2020/x.jpg");
        assert_eq!(storage.uploaded_at, state.uploaded_at);
    }

    #[tokio::test]
    async fn test_filename_collision_excludes_self() {
        let catalog = mem_catalog();
        catalog.upsert_item(&sample("a1", "x.jpg")).await.unwrap();

        // A record never collides with itself
        let collision = catalog.find_filename_collision("x.jpg", "a1").await.unwrap();
        assert!(collision.is_none());

        catalog.upsert_item(&sample("a2", "x.jpg")).await.unwrap();
        let collision = catalog.find_filename_collision("x.jpg", "a2").await.unwrap();
        assert_eq!(collision.as_deref(), Some("a1"));
    }

    #[tokio::test]
    async fn test_backup_name_in_use_committed_names() {
        let catalog = mem_catalog();
        catalog.upsert_item(&sample("a1", "x.jpg")).await.unwrap();
        catalog.set_backup_filename("a1", "x-2020-01-01-000000.jpg").await.unwrap();

        assert!(catalog
            .backup_name_in_use("x-2020-01-01-000000.jpg", "a2")
            .await
            .unwrap());
        // The resolved record no longer claims its display filename
        assert!(!catalog.backup_name_in_use("x.jpg", "a2").await.unwrap());
    }

    #[tokio::test]
    async fn test_backup_name_in_use_unresolved_filenames() {
        let catalog = mem_catalog();
        catalog.upsert_item(&sample("a1", "x.jpg")).await.unwrap();

        // Unresolved records claim their display filename by default
        assert!(catalog.backup_name_in_use("x.jpg", "a2").await.unwrap());
        assert!(!catalog.backup_name_in_use("x.jpg", "a1").await.unwrap());
        assert!(!catalog.backup_name_in_use("y.jpg", "a2").await.unwrap());
    }

    #[tokio::test]
    async fn test_summary_counts() {
        let catalog = mem_catalog();
        catalog.upsert_item(&sample("a1", "x.jpg")).await.unwrap();
        catalog.upsert_item(&sample("a2", "y.jpg")).await.unwrap();
        catalog.upsert_item(&sample("a3", "z.jpg")).await.unwrap();
        catalog
            .commit_storage("a2", &storage_state("photos/2020/y.jpg", "y.jpg"))
            .await
            .unwrap();

        let summary = catalog.get_summary().await.unwrap();
        assert_eq!(summary.total_items, 3);
        assert_eq!(summary.transferred, 1);
        assert_eq!(summary.pending, 2);
        assert_eq!(summary.indexed_objects, 0);
    }

    #[tokio::test]
    async fn test_run_lifecycle() {
        let catalog = mem_catalog();
        let run_id = catalog.start_sync_run().await.unwrap();

        let stats = RunStats {
            pages_fetched: 2,
            items_seen: 150,
            items_new: 30,
            items_already_present: 118,
            items_transferred: 28,
            items_failed: 2,
            interrupted: false,
        };
        catalog.complete_sync_run(run_id, &stats).await.unwrap();

        let runs = catalog.recent_runs(5).await.unwrap();
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].id, run_id);
        assert!(runs[0].completed_at.is_some());
        assert_eq!(runs[0].stats, stats);

        let summary = catalog.get_summary().await.unwrap();
        assert!(summary.last_run_started.is_some());
        assert!(summary.last_run_completed.is_some());
    }

    #[tokio::test]
    async fn test_recent_runs_newest_first() {
        let catalog = mem_catalog();
        let first = catalog.start_sync_run().await.unwrap();
        let second = catalog.start_sync_run().await.unwrap();

        let runs = catalog.recent_runs(5).await.unwrap();
        assert_eq!(runs.len(), 2);
        assert_eq!(runs[0].id, second);
        assert_eq!(runs[1].id, first);

        let limited = catalog.recent_runs(1).await.unwrap();
        assert_eq!(limited.len(), 1);
        assert_eq!(limited[0].id, second);
    }

    #[tokio::test]
    async fn test_replace_storage_index_replaces() {
        let catalog = mem_catalog();

        let first = vec![
            StoredObject {
                name: "photos/2020/a.jpg".to_string(),
                size: 100,
                content_hash: Some("aGFzaA==".to_string()),
                created_at: Some(Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap()),
            },
            StoredObject {
                name: "photos/2020/b.jpg".to_string(),
                size: 200,
                content_hash: None,
                created_at: None,
            },
        ];
        catalog.replace_storage_index(&first).await.unwrap();
        assert_eq!(catalog.get_summary().await.unwrap().indexed_objects, 2);

        // A rebuild replaces, never accumulates
        let second = vec![StoredObject {
            name: "photos/2021/c.jpg".to_string(),
            size: 300,
            content_hash: None,
            created_at: None,
        }];
        catalog.replace_storage_index(&second).await.unwrap();
        assert_eq!(catalog.get_summary().await.unwrap().indexed_objects, 1);
    }

    #[tokio::test]
    async fn test_clear_removes_everything() {
        let catalog = mem_catalog();
        catalog.upsert_item(&sample("a1", "x.jpg")).await.unwrap();
        catalog.upsert_item(&sample("a2", "y.jpg")).await.unwrap();
        catalog.start_sync_run().await.unwrap();
        catalog
            .replace_storage_index(&[StoredObject {
                name: "photos/a.jpg".to_string(),
                size: 1,
                content_hash: None,
                created_at: None,
            }])
            .await
            .unwrap();

        let removed = catalog.clear().await.unwrap();
        assert_eq!(removed, 2);

        let summary = catalog.get_summary().await.unwrap();
        assert_eq!(summary.total_items, 0);
        assert_eq!(summary.indexed_objects, 0);
        assert!(summary.last_run_started.is_none());
    }
}
