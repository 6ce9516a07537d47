use chrono::{DateTime, Utc};
use tracing::{debug, info};

use mediaplan_catalog::Catalog;
use mediaplan_types::{Pool, VolStatus, Volume};

use crate::error::Result;

/// Re-classify an `Append` volume that has crossed one of its limits.
///
/// Only volumes that have been written by at least one job are examined.
/// Returns `true` when the status changed; the catalog record is updated
/// before `volume` is, so a failed update leaves both untouched.
pub fn check_expired(
    catalog: &dyn Catalog,
    pool: &Pool,
    volume: &mut Volume,
    now: DateTime<Utc>,
) -> Result<bool> {
    if volume.status != VolStatus::Append || volume.vol_jobs == 0 {
        return Ok(false);
    }

    let Some((status, reason)) = expiry(pool, volume, now) else {
        debug!(volume = %volume.name, "volume has not expired");
        return Ok(false);
    };

    let mut updated = volume.clone();
    updated.status = status;
    catalog.update_volume(&updated)?;
    info!(volume = %volume.name, status = %status, "{reason}, marking volume as {status}");
    *volume = updated;
    Ok(true)
}

/// First limit the volume has reached, checked in priority order.
fn expiry(pool: &Pool, volume: &Volume, now: DateTime<Utc>) -> Option<(VolStatus, String)> {
    if volume.max_vol_bytes > 0 && volume.vol_bytes >= volume.max_vol_bytes {
        return Some((
            VolStatus::Full,
            format!("max volume bytes {} reached", volume.max_vol_bytes),
        ));
    }
    if pool.use_volume_once && volume.vol_bytes > 0 {
        return Some((VolStatus::Used, "volume used once".into()));
    }
    if volume.max_vol_jobs > 0 && volume.vol_jobs >= volume.max_vol_jobs {
        return Some((
            VolStatus::Used,
            format!("max volume jobs {} reached", volume.max_vol_jobs),
        ));
    }
    if volume.max_vol_files > 0 && volume.vol_files >= volume.max_vol_files {
        return Some((
            VolStatus::Used,
            format!("max volume files {} reached", volume.max_vol_files),
        ));
    }
    if volume.use_duration_elapsed(now) {
        return Some((
            VolStatus::Used,
            format!(
                "volume use duration of {}s elapsed",
                volume.vol_use_duration_secs
            ),
        ));
    }
    None
}
