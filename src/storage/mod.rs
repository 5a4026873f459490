//! Destination blob storage.

mod client;
mod error;

pub use client::{GcsObjectStore, ObjectStore, StoredObject};
pub use error::StorageError;
