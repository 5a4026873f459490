use chrono::{DateTime, Utc};

use crate::catalog::CatalogRecord;
use crate::types::FolderStyle;

use super::error::TransferError;

/// Derive the destination path for a record.
///
/// `prefix` is concatenated verbatim, so callers that want a folder-like
/// prefix must include the trailing separator themselves. The dated styles
/// need the record's creation time; `flat` works without it.
pub fn build_storage_path(
    record: &CatalogRecord,
    style: FolderStyle,
    prefix: &str,
) -> Result<String, TransferError> {
    let name = record.destination_filename();
    match style {
        FolderStyle::Flat => Ok(format!("{prefix}{name}")),
        FolderStyle::Yearly => {
            let created = require_created_at(record)?;
            Ok(format!("{prefix}{}/{name}", created.format("%Y")))
        }
        FolderStyle::Monthly => {
            let created = require_created_at(record)?;
            Ok(format!(
                "{prefix}{}/{}/{name}",
                created.format("%Y"),
                created.format("%m")
            ))
        }
    }
}

fn require_created_at(record: &CatalogRecord) -> Result<DateTime<Utc>, TransferError> {
    record.created_at.ok_or_else(|| TransferError::MissingMetadata {
        id: record.id.clone(),
    })
}

/// Insert a creation timestamp before the file extension.
///
/// For example, `"photo.jpg"` taken 2020-03-15 10:30:00 UTC becomes
/// `"photo-2020-03-15-103000.jpg"`.
pub fn stamp_filename(filename: &str, created: &DateTime<Utc>) -> String {
    let stamp = created.format("%Y-%m-%d-%H%M%S").to_string();
    match filename.rfind('.') {
        Some(dot) => {
            let (stem, ext) = filename.split_at(dot);
            format!("{stem}-{stamp}{ext}")
        }
        None => format!("{filename}-{stamp}"),
    }
}

/// Append an integer disambiguation suffix before the file extension.
///
/// For example, `"photo-2020-03-15-103000.jpg"` with counter 2 becomes
/// `"photo-2020-03-15-103000-2.jpg"`.
pub fn numbered_filename(filename: &str, counter: u32) -> String {
    match filename.rfind('.') {
        Some(dot) => {
            let (stem, ext) = filename.split_at(dot);
            format!("{stem}-{counter}{ext}")
        }
        None => format!("{filename}-{counter}"),
    }
}

/// Scratch-file name for an in-flight download, derived from the remote id.
/// Replaces non-alphanumeric characters with underscores so ids containing
/// `/` or `=` stay valid filenames.
pub fn scratch_filename(id: &str) -> String {
    let safe: String = id
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    format!("{safe}.part")
}
