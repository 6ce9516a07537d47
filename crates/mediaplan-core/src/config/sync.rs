use tracing::{debug, info};

use mediaplan_catalog::Catalog;
use mediaplan_types::{Pool, PoolId};

use super::types::DirectorConfig;
use crate::error::{MediaError, Result};

/// Create or update catalog pool records from the configured pool resources.
///
/// Returns the pool records as stored, in config order.
pub fn sync_pools(catalog: &dyn Catalog, config: &DirectorConfig) -> Result<Vec<Pool>> {
    let mut synced = Vec::with_capacity(config.pools.len());

    for pool_config in &config.pools {
        let existing = catalog.find_pool(&pool_config.name)?;
        let mut pool = existing
            .clone()
            .unwrap_or_else(|| Pool::new(PoolId(0), &pool_config.name));
        pool_config.apply_to(&mut pool, &config.catalog.name)?;
        let pool = match existing {
            Some(_) => {
                catalog.update_pool(&pool)?;
                debug!(pool = %pool.name, "updated pool record");
                pool
            }
            None => {
                let created = catalog.create_pool(pool)?;
                info!(pool = %created.name, pool_id = %created.pool_id, "created pool record");
                created
            }
        };
        synced.push(pool);
    }

    // Pool references need every pool to have an id first.
    let ids: Vec<(String, PoolId)> = synced.iter().map(|p| (p.name.clone(), p.pool_id)).collect();
    let lookup = |name: Option<&str>| -> Result<Option<PoolId>> {
        let Some(name) = name else {
            return Ok(None);
        };
        ids.iter()
            .find(|(n, _)| n == name)
            .map(|(_, id)| Some(*id))
            .ok_or_else(|| MediaError::Config(format!("unknown pool '{name}'")))
    };
    for pool in &mut synced {
        let Some(pool_config) = config.pool(&pool.name) else {
            continue;
        };
        pool.scratch_pool_id = lookup(pool_config.scratch_pool.as_deref())?;
        pool.recycle_pool_id = lookup(pool_config.recycle_pool.as_deref())?;
        catalog.update_pool(pool)?;
    }

    Ok(synced)
}
