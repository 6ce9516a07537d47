use tracing::{info, warn};

use mediaplan_catalog::{Catalog, VolumeQuery};
use mediaplan_types::{VolStatus, Volume};

use crate::error::Result;

/// Reset a volume for reuse: status `Recycle`, counters and write times
/// cleared. The storage daemon relabels it on first mount.
pub fn recycle_volume(catalog: &dyn Catalog, volume: &mut Volume) -> Result<()> {
    let mut updated = volume.clone();
    reset_for_reuse(&mut updated);
    catalog.update_volume(&updated)?;
    info!(volume = %updated.name, recycle_count = updated.recycle_count, "recycled volume");
    *volume = updated;
    Ok(())
}

pub(crate) fn reset_for_reuse(volume: &mut Volume) {
    volume.status = VolStatus::Recycle;
    volume.vol_bytes = 0;
    volume.vol_jobs = 0;
    volume.vol_files = 0;
    volume.first_written = None;
    volume.last_written = None;
    volume.recycle_count += 1;
}

/// Find the oldest purged volume matching `query` and recycle it.
pub fn recycle_oldest_purged_volume(
    catalog: &dyn Catalog,
    query: &VolumeQuery<'_>,
) -> Result<Option<Volume>> {
    let Some(mut volume) = catalog.find_oldest_purged_volume(query)? else {
        return Ok(None);
    };
    recycle_volume(catalog, &mut volume)?;
    Ok(Some(volume))
}

/// Mark a volume no longer referenced by any job as `Purged`.
///
/// A volume with a recycle pool other than its own moves into that pool and
/// takes its defaults. Returns `true` when the volume ends up purged.
pub fn mark_volume_purged(catalog: &dyn Catalog, volume: &mut Volume) -> Result<bool> {
    if volume.status == VolStatus::Purged {
        return Ok(true);
    }
    let Some(updated) = purged_record(catalog, volume)? else {
        return Ok(false);
    };
    catalog.update_volume(&updated)?;
    info!(volume = %updated.name, "volume marked as Purged");
    *volume = updated;
    Ok(true)
}

/// The record `volume` becomes once purged, or `None` when its status cannot
/// be purged. Nothing is written.
pub(crate) fn purged_record(catalog: &dyn Catalog, volume: &Volume) -> Result<Option<Volume>> {
    if !matches!(
        volume.status,
        VolStatus::Append | VolStatus::Full | VolStatus::Used | VolStatus::Error
    ) {
        return Ok(None);
    }

    let mut updated = volume.clone();
    updated.status = VolStatus::Purged;
    if let Some(target) = updated.recycle_pool_id.filter(|&id| id != updated.pool_id) {
        match catalog.get_pool(target)? {
            Some(pool) => {
                updated.apply_pool_defaults(&pool);
                info!(volume = %updated.name, pool = %pool.name, "moving purged volume to recycle pool");
            }
            None => {
                warn!(volume = %updated.name, recycle_pool_id = %target, "recycle pool not found, volume stays in its pool");
            }
        }
    }
    Ok(Some(updated))
}
