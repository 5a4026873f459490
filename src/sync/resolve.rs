use crate::catalog::{CatalogRecord, CatalogStore};

use super::error::TransferError;
use super::paths;

/// Resolve the destination filename for a record.
///
/// Read-only with respect to the catalog; the caller commits the result.
/// A committed `backup_filename` is returned as-is, so re-resolving an
/// already-resolved record always yields the same name. Otherwise the
/// record keeps its display filename unless another record collides with
/// it, in which case a creation-timestamped name is derived, with an
/// integer suffix appended as long as the candidate is still claimed by
/// some other record. The counter only grows and the claim set is finite,
/// so the search terminates.
pub async fn resolve_backup_name(
    catalog: &dyn CatalogStore,
    record: &CatalogRecord,
) -> Result<String, TransferError> {
    if let Some(resolved) = &record.backup_filename {
        return Ok(resolved.clone());
    }

    if catalog
        .find_filename_collision(&record.filename, &record.id)
        .await?
        .is_none()
    {
        return Ok(record.filename.clone());
    }

    let created = record
        .created_at
        .ok_or_else(|| TransferError::MissingMetadata {
            id: record.id.clone(),
        })?;

    let stamped = paths::stamp_filename(&record.filename, &created);
    let mut candidate = stamped.clone();
    let mut counter = 0u32;
    while catalog.backup_name_in_use(&candidate, &record.id).await? {
        counter += 1;
        candidate = paths::numbered_filename(&stamped, counter);
    }
    Ok(candidate)
}
