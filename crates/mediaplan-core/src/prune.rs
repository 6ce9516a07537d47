use chrono::{DateTime, Utc};
use tracing::{debug, info};

use mediaplan_catalog::Catalog;
use mediaplan_types::{Pool, VolStatus, Volume};

use crate::error::Result;
use crate::recycle::purged_record;

/// Prune every eligible volume of `pool`, including volumes of other pools
/// that name `pool` as their recycle pool. Returns the number of volumes
/// that ended up purged.
pub fn prune_volumes(catalog: &dyn Catalog, pool: &Pool, now: DateTime<Utc>) -> Result<usize> {
    let candidates: Vec<Volume> = catalog
        .list_volumes(None)?
        .into_iter()
        .filter(|v| v.pool_id == pool.pool_id || v.recycle_pool_id == Some(pool.pool_id))
        .filter(|v| v.enabled && v.recycle)
        .collect();

    let mut purged = 0usize;
    for mut volume in candidates {
        if prune_volume(catalog, &mut volume, now, 0)? {
            purged += 1;
        }
    }
    if purged > 0 {
        info!(pool = %pool.name, purged, "pruned volumes");
    }
    Ok(purged)
}

/// Drop the job records of a `Full`/`Used` volume once its retention has run
/// out (`slack_secs` early), then mark it purged.
///
/// Returns `true` when the volume ends up purged.
pub fn prune_volume(
    catalog: &dyn Catalog,
    volume: &mut Volume,
    now: DateTime<Utc>,
    slack_secs: u64,
) -> Result<bool> {
    if !volume.recycle || !matches!(volume.status, VolStatus::Full | VolStatus::Used) {
        return Ok(false);
    }
    if !volume.retention_elapsed(now, slack_secs) {
        debug!(volume = %volume.name, "volume retention has not expired");
        return Ok(false);
    }
    purge_volume(catalog, volume)
}

/// Delete every job on the volume regardless of retention, then mark it purged.
///
/// Deleting the jobs and storing the purged volume is one catalog call.
pub fn purge_volume(catalog: &dyn Catalog, volume: &mut Volume) -> Result<bool> {
    let jobs = catalog.jobs_on_volume(volume.media_id)?;
    let Some(updated) = purged_record(catalog, volume)? else {
        if !jobs.is_empty() {
            let removed = catalog.delete_job_records(&jobs)?;
            debug!(volume = %volume.name, removed, "deleted job records on volume");
        }
        return Ok(volume.status == VolStatus::Purged);
    };

    let removed = catalog.purge_job_records(&jobs, &updated)?;
    info!(volume = %updated.name, removed, "volume marked as Purged");
    *volume = updated;
    Ok(true)
}
