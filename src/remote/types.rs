use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;

/// One media item as returned by the remote catalog listing.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteItem {
    pub id: String,
    pub filename: String,
    /// URL template for fetching the artifact. Short-lived: the remote
    /// service rotates these, so every sighting refreshes the stored copy.
    pub base_url: String,
    #[serde(default)]
    pub mime_type: Option<String>,
    #[serde(default)]
    media_metadata: Option<MediaMetadata>,
}

/// Nested metadata blob; only the creation time is consumed, via
/// `RemoteItem::created_at`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MediaMetadata {
    #[serde(default)]
    creation_time: Option<String>,
}

impl RemoteItem {
    /// Creation timestamp parsed from remote metadata, if present and valid.
    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        self.media_metadata
            .as_ref()
            .and_then(|m| m.creation_time.as_deref())
            .and_then(|raw| DateTime::parse_from_rfc3339(raw).ok())
            .map(|dt| dt.with_timezone(&Utc))
    }
}

/// One page of the remote listing, in remote order.
#[derive(Debug)]
pub struct CatalogPage {
    pub items: Vec<RemoteItem>,
    /// Opaque cursor for the next page; `None` when the listing is exhausted.
    pub next_cursor: Option<String>,
}

/// Inclusive creation-date window for a filtered listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub after: NaiveDate,
    pub before: NaiveDate,
}

/// Wire shape shared by the list and search endpoints.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct ListMediaItemsResponse {
    #[serde(default)]
    pub media_items: Vec<RemoteItem>,
    #[serde(default)]
    pub next_page_token: Option<String>,
}
