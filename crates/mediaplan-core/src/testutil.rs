use chrono::{DateTime, Duration, TimeZone, Utc};

use mediaplan_catalog::{Catalog, MemoryCatalog};
use mediaplan_types::{JobId, JobMediaEntry, JobRecord, MediaId, Pool, PoolId, PoolType, Volume};

use crate::config::StorageConfig;

pub const MEDIA_TYPE: &str = "File";

/// Fixed "now" so retention and duration arithmetic is reproducible.
pub fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
}

pub fn days_ago(days: i64) -> DateTime<Utc> {
    now() - Duration::days(days)
}

pub fn file_storage() -> StorageConfig {
    StorageConfig {
        name: "File1".into(),
        device: "FileStorage".into(),
        media_type: MEDIA_TYPE.into(),
        autochanger: None,
    }
}

pub fn changer_storage(group: &str) -> StorageConfig {
    StorageConfig {
        name: format!("{group}-Drive0"),
        device: "Drive-0".into(),
        media_type: MEDIA_TYPE.into(),
        autochanger: Some(group.into()),
    }
}

/// Create a pool named `name`; `tweak` adjusts it before it is stored.
pub fn add_pool(catalog: &MemoryCatalog, name: &str, tweak: impl FnOnce(&mut Pool)) -> Pool {
    let mut pool = Pool::new(PoolId(0), name);
    tweak(&mut pool);
    catalog.create_pool(pool).unwrap()
}

pub fn add_scratch_pool(catalog: &MemoryCatalog) -> Pool {
    add_pool(catalog, "Scratch", |p| p.pool_type = PoolType::Scratch)
}

/// Create a volume in `pool` with the pool defaults applied.
pub fn add_volume(
    catalog: &MemoryCatalog,
    pool: &Pool,
    name: &str,
    tweak: impl FnOnce(&mut Volume),
) -> Volume {
    let mut volume = Volume::new(MediaId(0), name, MEDIA_TYPE, pool.pool_id);
    volume.apply_pool_defaults(pool);
    tweak(&mut volume);
    catalog.create_volume(volume).unwrap()
}

pub fn volume(catalog: &MemoryCatalog, name: &str) -> Volume {
    catalog.get_volume(name).unwrap().unwrap()
}

pub fn add_job(catalog: &MemoryCatalog, job_id: u32, job_files: u32) {
    catalog
        .insert_job(JobRecord {
            job_id: JobId(job_id),
            name: format!("Backup{job_id}"),
            vol_session_id: job_id,
            vol_session_time: 1_700_000_000,
            job_files,
            pool_id: None,
            end_time: Some(days_ago(1)),
        })
        .unwrap();
}

/// Record that `job_id` wrote file indexes `first..=last` to `volume`.
pub fn add_job_media(catalog: &MemoryCatalog, job_id: u32, volume: &Volume, first: i32, last: i32) {
    catalog
        .insert_job_media(JobMediaEntry {
            job_id: JobId(job_id),
            media_id: volume.media_id,
            volume_name: volume.name.clone(),
            storage: "File1".into(),
            media_type: volume.media_type.clone(),
            first_index: first,
            last_index: last,
            start_addr: 0,
            end_addr: 1_000,
            slot: 0,
            in_changer: false,
        })
        .unwrap();
}

pub fn job_media_entry(job_id: u32, volume: &str, first: i32, last: i32) -> JobMediaEntry {
    JobMediaEntry {
        job_id: JobId(job_id),
        media_id: MediaId(0),
        volume_name: volume.into(),
        storage: "File1".into(),
        media_type: MEDIA_TYPE.into(),
        first_index: first,
        last_index: last,
        start_addr: 0,
        end_addr: 0,
        slot: 0,
        in_changer: false,
    }
}
