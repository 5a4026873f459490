//! Remote media catalog listing.

mod client;
mod error;
mod types;

pub use client::CatalogReader;
pub use error::RemoteError;
pub use types::{CatalogPage, DateRange, RemoteItem};
