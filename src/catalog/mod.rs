//! Local catalog persistence.
//!
//! Tracks every remote item ever seen, its resolved backup filename, and
//! whether it has been transferred to object storage. The absence or
//! presence of storage state is the only signal the sync engine consults
//! when deciding whether to transfer an item, which is what makes runs
//! resumable: a new run re-walks the listing and skips whatever a previous
//! run already committed.

mod db;
mod error;
mod schema;
mod types;

pub use db::{CatalogStore, SqliteCatalog};
pub use error::CatalogError;
pub use types::{
    CatalogRecord, CatalogSummary, RunRecord, RunStats, StorageState, UpsertOutcome,
};
