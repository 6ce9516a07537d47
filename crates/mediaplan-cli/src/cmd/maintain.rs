use std::collections::HashMap;
use std::error::Error;

use chrono::Utc;

use mediaplan_catalog::Catalog;
use mediaplan_core::expire::check_expired;
use mediaplan_core::prune::prune_volumes;
use mediaplan_types::{Pool, PoolId, VolStatus};

use crate::dispatch::Session;

pub(crate) fn run_expire(session: &Session, pool: Option<&str>) -> Result<(), Box<dyn Error>> {
    let catalog = &session.catalog;
    let pool_id = pool.map(|name| session.pool(name)).transpose()?.map(|p| p.pool_id);
    let now = Utc::now();

    let mut pools: HashMap<PoolId, Pool> = HashMap::new();
    let mut changed = 0usize;
    for mut volume in catalog.list_volumes(pool_id)? {
        if volume.status != VolStatus::Append {
            continue;
        }
        if !pools.contains_key(&volume.pool_id) {
            let Some(record) = catalog.get_pool(volume.pool_id)? else {
                tracing::warn!(volume = %volume.name, pool_id = %volume.pool_id, "volume references a missing pool");
                continue;
            };
            pools.insert(volume.pool_id, record);
        }
        let Some(record) = pools.get(&volume.pool_id) else {
            continue;
        };
        if check_expired(catalog, record, &mut volume, now)? {
            println!("{:<20} Append -> {}", volume.name, volume.status);
            changed += 1;
        }
    }
    session.save()?;
    println!("{changed} volumes changed status");
    Ok(())
}

pub(crate) fn run_prune(session: &Session, pool: Option<&str>) -> Result<(), Box<dyn Error>> {
    let pools: Vec<Pool> = match pool {
        Some(name) => vec![session.pool(name)?],
        None => {
            let mut all = Vec::new();
            for pool_config in &session.config.pools {
                if let Some(record) = session.catalog.find_pool(&pool_config.name)? {
                    all.push(record);
                }
            }
            all
        }
    };

    let now = Utc::now();
    let mut total = 0usize;
    for pool in &pools {
        let purged = prune_volumes(&session.catalog, pool, now)?;
        if purged > 0 {
            println!("{:<20} {purged} volumes purged", pool.name);
        }
        total += purged;
    }
    session.save()?;
    println!("Pruned {total} volumes in {} pools", pools.len());
    Ok(())
}
