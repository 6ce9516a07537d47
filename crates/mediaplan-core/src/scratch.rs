use std::sync::{Mutex, PoisonError};

use tracing::{debug, info};

use mediaplan_catalog::{Catalog, VolumeQuery};
use mediaplan_types::{MediaId, Pool, Volume};

use crate::error::{MediaError, Result};
use crate::recycle::reset_for_reuse;

/// Pool name used when the target pool does not reference a scratch pool.
pub const DEFAULT_SCRATCH_POOL: &str = "Scratch";

/// Only one job at a time may take a volume out of a scratch pool.
static SCRATCH_LOCK: Mutex<()> = Mutex::new(());

#[derive(Debug, Clone, Copy)]
pub struct ScratchRequest<'a> {
    /// Destination pool.
    pub pool: &'a Pool,
    pub media_type: &'a str,
    /// Storage or autochanger group the volume must be loaded in.
    pub storage: &'a str,
    pub in_changer: bool,
    pub exclude: &'a [MediaId],
}

/// Take one volume from the scratch pool and reassign it to `req.pool`.
///
/// The volume keeps its status and recycle pool; everything else comes from
/// the destination pool's defaults. Every failure to find a volume is a
/// `NotFound` error.
pub fn pull_from_scratch(catalog: &dyn Catalog, req: &ScratchRequest<'_>) -> Result<Volume> {
    let _guard = SCRATCH_LOCK.lock().unwrap_or_else(PoisonError::into_inner);

    let scratch = resolve_scratch_pool(catalog, req.pool)?;
    let query = VolumeQuery::new(scratch.pool_id, req.media_type)
        .in_changer(req.in_changer.then_some(req.storage))
        .excluding(req.exclude);

    let mut volume = find_scratch_volume(catalog, &query)?.ok_or_else(|| {
        MediaError::NotFound(format!(
            "no usable volume in scratch pool '{}' for media type '{}'",
            scratch.name, req.media_type
        ))
    })?;

    let count = catalog.count_pool_volumes(req.pool.pool_id)?;
    if req.pool.max_vols > 0 && count >= req.pool.max_vols {
        return Err(MediaError::NotFound(format!(
            "pool '{}' already holds its maximum of {} volumes",
            req.pool.name, req.pool.max_vols
        )));
    }

    let status = volume.status;
    let recycle_pool_id = volume.recycle_pool_id;
    volume.apply_pool_defaults(req.pool);
    volume.status = status;
    volume.recycle_pool_id = recycle_pool_id;
    if volume.storage.is_none() {
        volume.storage = Some(req.storage.to_string());
    }
    catalog.update_volume(&volume)?;

    info!(
        volume = %volume.name,
        from = %scratch.name,
        to = %req.pool.name,
        "using volume from Scratch pool"
    );
    Ok(volume)
}

fn resolve_scratch_pool(catalog: &dyn Catalog, target: &Pool) -> Result<Pool> {
    let scratch = match target.scratch_pool_id {
        Some(id) => catalog.get_pool(id)?,
        None => catalog.find_pool(DEFAULT_SCRATCH_POOL)?,
    };
    match scratch {
        Some(pool) if pool.pool_id != target.pool_id => Ok(pool),
        Some(_) => Err(MediaError::NotFound(format!(
            "pool '{}' is its own scratch pool",
            target.name
        ))),
        None => Err(MediaError::NotFound(format!(
            "no scratch pool for pool '{}'",
            target.name
        ))),
    }
}

/// Append volumes first, then recycled ones, then the oldest purged volume.
/// A purged volume is reset in memory; the caller persists it with the move.
fn find_scratch_volume(catalog: &dyn Catalog, query: &VolumeQuery<'_>) -> Result<Option<Volume>> {
    if let Some(volume) = catalog.find_next_append_volume(query)? {
        return Ok(Some(volume));
    }
    if let Some(volume) = catalog.find_recycled_volume(query)? {
        return Ok(Some(volume));
    }
    let Some(mut volume) = catalog.find_oldest_purged_volume(query)? else {
        return Ok(None);
    };
    debug!(volume = %volume.name, "recycling purged scratch volume");
    reset_for_reuse(&mut volume);
    Ok(Some(volume))
}
