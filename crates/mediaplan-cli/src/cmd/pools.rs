use std::collections::HashMap;
use std::error::Error;

use comfy_table::Cell;

use mediaplan_catalog::Catalog;
use mediaplan_core::config;
use mediaplan_types::{PoolId, Volume};

use crate::dispatch::Session;
use crate::format::format_bytes;
use crate::table::CliTableTheme;

pub(crate) fn run_sync_pools(session: &Session) -> Result<(), Box<dyn Error>> {
    let pools = config::sync_pools(&session.catalog, &session.config)?;
    session.save()?;

    let names: HashMap<PoolId, &str> = pools.iter().map(|p| (p.pool_id, p.name.as_str())).collect();
    let name_of = |id: Option<PoolId>| {
        id.and_then(|id| names.get(&id).copied())
            .unwrap_or("-")
            .to_string()
    };

    let theme = CliTableTheme::detect();
    let mut table = theme.new_data_table(&[
        "Pool", "Id", "Type", "Max vols", "Max bytes", "Retention", "Scratch", "Recycle",
    ]);
    for pool in &pools {
        table.add_row(vec![
            Cell::new(&pool.name),
            Cell::new(pool.pool_id),
            Cell::new(format!("{:?}", pool.pool_type).to_lowercase()),
            Cell::new(pool.max_vols),
            Cell::new(format_bytes(pool.max_vol_bytes)),
            Cell::new(format!("{}d", pool.vol_retention_secs / 86_400)),
            Cell::new(name_of(pool.scratch_pool_id)),
            Cell::new(name_of(pool.recycle_pool_id)),
        ]);
    }
    println!("{table}");
    println!();
    println!("Synced {} pools", pools.len());
    Ok(())
}

pub(crate) fn run_volumes(
    session: &Session,
    pool: Option<&str>,
    json: bool,
) -> Result<(), Box<dyn Error>> {
    let pool_id = pool.map(|name| session.pool(name)).transpose()?.map(|p| p.pool_id);
    let volumes = session.catalog.list_volumes(pool_id)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&volumes)?);
        return Ok(());
    }
    if volumes.is_empty() {
        println!("No volumes found.");
        return Ok(());
    }

    let theme = CliTableTheme::detect();
    let table = theme.volume_table(&volumes, |v| pool_name(session, v));
    println!("{table}");
    Ok(())
}

pub(crate) fn pool_name(session: &Session, volume: &Volume) -> String {
    session
        .catalog
        .get_pool(volume.pool_id)
        .ok()
        .flatten()
        .map(|p| p.name)
        .unwrap_or_else(|| volume.pool_id.to_string())
}
