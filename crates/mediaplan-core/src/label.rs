use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use mediaplan_catalog::Catalog;
use mediaplan_types::{MediaId, Pool, Volume};

use crate::error::Result;

const MAX_NAME_PROBES: u32 = 100;

/// Create a new `Append` volume named `<label_format><NNNN>` in `pool`.
///
/// Returns `None` when the pool has no label format, is at `max_vols`, or no
/// free name was found.
pub fn label_new_volume(
    catalog: &dyn Catalog,
    pool: &Pool,
    media_type: &str,
    storage: &str,
    now: DateTime<Utc>,
) -> Result<Option<Volume>> {
    let Some(format) = pool.label_format.as_deref() else {
        debug!(pool = %pool.name, "pool has no label format, not creating a volume");
        return Ok(None);
    };

    let count = catalog.count_pool_volumes(pool.pool_id)?;
    if pool.max_vols > 0 && count >= pool.max_vols {
        warn!(pool = %pool.name, max_vols = pool.max_vols, "pool is full, cannot create a volume");
        return Ok(None);
    }

    for n in (count + 1)..=(count + MAX_NAME_PROBES) {
        let name = format!("{format}{n:04}");
        if catalog.get_volume(&name)?.is_some() {
            continue;
        }
        let mut volume = Volume::new(MediaId(0), &name, media_type, pool.pool_id);
        volume.apply_pool_defaults(pool);
        volume.storage = Some(storage.to_string());
        volume.label_date = Some(now);
        let created = catalog.create_volume(volume)?;
        info!(volume = %created.name, pool = %pool.name, "created new volume");
        return Ok(Some(created));
    }

    warn!(pool = %pool.name, format, "no free volume name found");
    Ok(None)
}
