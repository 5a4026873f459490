//! Catalog schema definitions and migrations.

use rusqlite::Connection;

use super::error::CatalogError;

/// Current schema version. Increment when making schema changes.
pub const SCHEMA_VERSION: i32 = 1;

/// Schema DDL for version 1.
const SCHEMA_V1: &str = r#"
CREATE TABLE IF NOT EXISTS catalog_items (
    id TEXT PRIMARY KEY,
    filename TEXT NOT NULL,
    backup_filename TEXT,
    mime_type TEXT,
    source_url TEXT NOT NULL,
    created_at INTEGER,
    uploaded_at INTEGER,
    stored_filename TEXT,
    stored_path TEXT,
    updated_at INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_items_filename ON catalog_items(filename);
CREATE INDEX IF NOT EXISTS idx_items_backup_filename ON catalog_items(backup_filename);
CREATE INDEX IF NOT EXISTS idx_items_uploaded_at ON catalog_items(uploaded_at);

CREATE TABLE IF NOT EXISTS sync_runs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    started_at INTEGER NOT NULL,
    completed_at INTEGER,
    pages_fetched INTEGER DEFAULT 0,
    items_seen INTEGER DEFAULT 0,
    items_new INTEGER DEFAULT 0,
    items_already_present INTEGER DEFAULT 0,
    items_transferred INTEGER DEFAULT 0,
    items_failed INTEGER DEFAULT 0,
    interrupted INTEGER DEFAULT 0
);

CREATE TABLE IF NOT EXISTS storage_objects (
    name TEXT PRIMARY KEY,
    size INTEGER NOT NULL,
    content_hash TEXT,
    created_at INTEGER,
    indexed_at INTEGER NOT NULL
);
"#;

/// Get the current schema version from the database.
pub(crate) fn get_schema_version(conn: &Connection) -> Result<i32, CatalogError> {
    let version: i32 = conn.pragma_query_value(None, "user_version", |row| row.get(0))?;
    Ok(version)
}

/// Set the schema version in the database.
fn set_schema_version(conn: &Connection, version: i32) -> Result<(), CatalogError> {
    conn.pragma_update(None, "user_version", version)?;
    Ok(())
}

/// Initialize or migrate the catalog schema.
///
/// This function is idempotent and safe to call on both new and existing databases.
pub(crate) fn migrate(conn: &Connection) -> Result<(), CatalogError> {
    let current_version = get_schema_version(conn)?;

    if current_version > SCHEMA_VERSION {
        return Err(CatalogError::UnsupportedSchemaVersion {
            found: current_version,
            expected: SCHEMA_VERSION,
        });
    }

    if current_version == 0 {
        // Fresh database — apply full schema
        conn.execute_batch(SCHEMA_V1)?;
        set_schema_version(conn, SCHEMA_VERSION)?;
        tracing::debug!("Initialized catalog schema at version {}", SCHEMA_VERSION);
    } else if current_version < SCHEMA_VERSION {
        // Run incremental migrations
        for version in (current_version + 1)..=SCHEMA_VERSION {
            migrate_to_version(conn, version)?;
        }
    }

    Ok(())
}

/// Apply migration for a specific version.
fn migrate_to_version(conn: &Connection, version: i32) -> Result<(), CatalogError> {
    // Future migrations go here, e.g.:
    // match version {
    //     2 => { conn.execute_batch("ALTER TABLE catalog_items ADD COLUMN new_field TEXT")?; }
    //     _ => {}
    // }
    // For now, version 1 just applies the base schema
    if version != SCHEMA_VERSION {
        tracing::warn!(
            "Unexpected schema version {}, applying base schema",
            version
        );
    }
    conn.execute_batch(SCHEMA_V1)?;
    set_schema_version(conn, version)?;
    tracing::info!("Migrated catalog to schema version {}", version);
    Ok(())
}
