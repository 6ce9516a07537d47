use std::sync::Barrier;

use mediaplan_catalog::{AllocationState, Catalog, MemoryCatalog, VolumeQuery};
use mediaplan_types::error::{ErrorKind, MediaError, Result};
use mediaplan_types::{JobId, JobMediaEntry, JobRecord, MediaId, Pool, PoolId, VolStatus, Volume};

use crate::expire::check_expired;
use crate::select::{AppendRequest, MediaAllocator, VolumeCheck, MAX_SELECTION_ATTEMPTS};
use crate::testutil::*;

#[test]
fn selects_only_append_volume() {
    let catalog = MemoryCatalog::new();
    let pool = add_pool(&catalog, "Default", |_| {});
    add_volume(&catalog, &pool, "Vol-0001", |_| {});
    let storage = file_storage();
    let allocator = MediaAllocator::new(&catalog);
    let mut job = allocator.start_job(JobId(1));

    let req = AppendRequest::new("Default", &storage, 1).at(now());
    let vol = job.select_for_append(&req).unwrap();
    assert_eq!(vol.name, "Vol-0001");
    assert_eq!(job.exclusion().volume_for(1), Some(vol.media_id));
}

#[test]
fn unknown_pool_is_not_found() {
    let catalog = MemoryCatalog::new();
    let storage = file_storage();
    let allocator = MediaAllocator::new(&catalog);
    let mut job = allocator.start_job(JobId(1));
    let err = job
        .select_for_append(&AppendRequest::new("Nope", &storage, 1).at(now()))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[test]
fn prefers_most_recently_written_append_volume() {
    let catalog = MemoryCatalog::new();
    let pool = add_pool(&catalog, "Default", |_| {});
    add_volume(&catalog, &pool, "Old", |v| {
        v.vol_jobs = 1;
        v.last_written = Some(days_ago(5));
    });
    add_volume(&catalog, &pool, "Recent", |v| {
        v.vol_jobs = 1;
        v.last_written = Some(days_ago(1));
    });
    let storage = file_storage();
    let allocator = MediaAllocator::new(&catalog);
    let mut job = allocator.start_job(JobId(1));
    let vol = job
        .select_for_append(&AppendRequest::new("Default", &storage, 1).at(now()))
        .unwrap();
    assert_eq!(vol.name, "Recent");
}

#[test]
fn second_request_in_same_job_skips_excluded_volume() {
    let catalog = MemoryCatalog::new();
    let pool = add_pool(&catalog, "Default", |_| {});
    add_volume(&catalog, &pool, "Vol-0001", |_| {});
    let storage = file_storage();
    let allocator = MediaAllocator::new(&catalog);
    let mut job = allocator.start_job(JobId(1));

    let first = job
        .select_for_append(&AppendRequest::new("Default", &storage, 1).at(now()).create(false))
        .unwrap();
    assert_eq!(first.name, "Vol-0001");

    let err = job
        .select_for_append(&AppendRequest::new("Default", &storage, 2).at(now()).create(false))
        .unwrap_err();
    assert!(matches!(err, MediaError::NoAppendableVolume { .. }));
}

#[test]
fn second_request_falls_through_to_labelling() {
    let catalog = MemoryCatalog::new();
    let pool = add_pool(&catalog, "Default", |p| p.label_format = Some("Vol-".into()));
    add_volume(&catalog, &pool, "Vol-0001", |_| {});
    let storage = file_storage();
    let allocator = MediaAllocator::new(&catalog);
    let mut job = allocator.start_job(JobId(1));

    job.select_for_append(&AppendRequest::new("Default", &storage, 1).at(now()))
        .unwrap();
    let second = job
        .select_for_append(&AppendRequest::new("Default", &storage, 2).at(now()))
        .unwrap();
    assert_eq!(second.name, "Vol-0002");
    assert_eq!(second.status, VolStatus::Append);
    assert_eq!(second.storage.as_deref(), Some("File1"));
    assert_eq!(second.label_date, Some(now()));
    assert_eq!(job.exclusion().len(), 2);
}

#[test]
fn concurrent_jobs_never_share_a_volume() {
    let catalog = MemoryCatalog::new();
    let pool = add_pool(&catalog, "Default", |_| {});
    add_volume(&catalog, &pool, "Vol-0001", |_| {});
    let storage = file_storage();
    let allocator = MediaAllocator::new(&catalog);
    let barrier = Barrier::new(2);

    let results: Vec<Result<Volume>> = std::thread::scope(|s| {
        let handles: Vec<_> = [JobId(1), JobId(2)]
            .into_iter()
            .map(|job_id| {
                let (allocator, storage, barrier) = (&allocator, &storage, &barrier);
                s.spawn(move || {
                    let mut job = allocator.start_job(job_id);
                    barrier.wait();
                    let result = job.select_for_append(
                        &AppendRequest::new("Default", storage, 1)
                            .at(now())
                            .create(false),
                    );
                    // Keep the reservation until both jobs have selected.
                    barrier.wait();
                    result
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    let won: Vec<&Volume> = results.iter().filter_map(|r| r.as_ref().ok()).collect();
    assert_eq!(won.len(), 1);
    assert_eq!(won[0].name, "Vol-0001");
    let lost = results.iter().find_map(|r| r.as_ref().err()).unwrap();
    assert!(lost.is_not_found());
}

#[test]
fn separate_allocators_share_reservations() {
    let catalog = MemoryCatalog::new();
    let pool = add_pool(&catalog, "Default", |_| {});
    let vol = add_volume(&catalog, &pool, "Vol-0001", |_| {});
    let storage = file_storage();
    let req = AppendRequest::new("Default", &storage, 1).at(now()).create(false);

    let first = MediaAllocator::new(&catalog);
    let second = MediaAllocator::new(&catalog);
    let mut job1 = first.start_job(JobId(1));
    let mut job2 = second.start_job(JobId(2));

    assert_eq!(job1.select_for_append(&req).unwrap().name, "Vol-0001");
    let err = job2.select_for_append(&req).unwrap_err();
    assert!(matches!(err, MediaError::NoAppendableVolume { .. }), "{err}");
    assert_eq!(second.reserved_by(vol.media_id), Some(JobId(1)));

    drop(job1);
    assert_eq!(job2.select_for_append(&req).unwrap().name, "Vol-0001");
}

#[test]
fn reservation_released_when_session_ends() {
    let catalog = MemoryCatalog::new();
    let pool = add_pool(&catalog, "Default", |_| {});
    let vol = add_volume(&catalog, &pool, "Vol-0001", |_| {});
    let storage = file_storage();
    let allocator = MediaAllocator::new(&catalog);
    let req = AppendRequest::new("Default", &storage, 1).at(now()).create(false);

    {
        let mut job = allocator.start_job(JobId(1));
        job.select_for_append(&req).unwrap();
        assert_eq!(allocator.reserved_by(vol.media_id), Some(JobId(1)));
        let mut other = allocator.start_job(JobId(2));
        assert!(other.select_for_append(&req).is_err());
    }

    assert_eq!(allocator.reserved_by(vol.media_id), None);
    let mut job = allocator.start_job(JobId(3));
    assert_eq!(job.select_for_append(&req).unwrap().name, "Vol-0001");
}

#[test]
fn max_vol_jobs_scenario() {
    let catalog = MemoryCatalog::new();
    let pool = add_pool(&catalog, "Default", |p| {
        p.max_vol_jobs = 1;
        p.vol_retention_secs = 365 * 86_400;
    });
    add_volume(&catalog, &pool, "Vol-0001", |_| {});
    let storage = file_storage();
    let allocator = MediaAllocator::new(&catalog);

    {
        let mut job = allocator.start_job(JobId(1));
        let vol = job
            .select_for_append(&AppendRequest::new("Default", &storage, 1).at(now()))
            .unwrap();
        assert_eq!(vol.name, "Vol-0001");
    }

    // The job wrote to the volume.
    let mut vol = volume(&catalog, "Vol-0001");
    vol.vol_jobs = 1;
    vol.vol_bytes = 4096;
    vol.first_written = Some(now());
    vol.last_written = Some(now());
    catalog.update_volume(&vol).unwrap();

    assert!(check_expired(&catalog, &pool, &mut vol, now()).unwrap());
    assert_eq!(vol.status, VolStatus::Used);

    let mut job = allocator.start_job(JobId(2));
    let err = job
        .select_for_append(&AppendRequest::new("Default", &storage, 1).at(now()).create(false))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[test]
fn expired_candidate_is_reclassified_and_skipped() {
    let catalog = MemoryCatalog::new();
    let pool = add_pool(&catalog, "Default", |p| p.max_vol_jobs = 1);
    add_volume(&catalog, &pool, "Full", |v| {
        v.vol_jobs = 1;
        v.vol_bytes = 10;
        v.last_written = Some(days_ago(1));
    });
    add_volume(&catalog, &pool, "Fresh", |_| {});
    let storage = file_storage();
    let allocator = MediaAllocator::new(&catalog);
    let mut job = allocator.start_job(JobId(1));

    let vol = job
        .select_for_append(&AppendRequest::new("Default", &storage, 1).at(now()))
        .unwrap();
    assert_eq!(vol.name, "Fresh");
    assert_eq!(volume(&catalog, "Full").status, VolStatus::Used);
}

#[test]
fn recycled_then_purged_volumes_are_reclaimed() {
    let catalog = MemoryCatalog::new();
    let pool = add_pool(&catalog, "Default", |_| {});
    add_volume(&catalog, &pool, "Purged", |v| v.status = VolStatus::Purged);
    add_volume(&catalog, &pool, "Recycled", |v| v.status = VolStatus::Recycle);
    let storage = file_storage();
    let allocator = MediaAllocator::new(&catalog);
    let mut job = allocator.start_job(JobId(1));
    let req = AppendRequest::new("Default", &storage, 1).at(now()).create(false);

    assert_eq!(job.select_for_append(&req).unwrap().name, "Recycled");
    let second = job.select_for_append(&AppendRequest { index: 2, ..req }).unwrap();
    assert_eq!(second.name, "Purged");
    assert_eq!(second.status, VolStatus::Recycle);
    assert_eq!(second.recycle_count, 1);
}

#[test]
fn pruning_reclaims_expired_full_volume() {
    let catalog = MemoryCatalog::new();
    let pool = add_pool(&catalog, "Default", |p| p.vol_retention_secs = 86_400);
    let full = add_volume(&catalog, &pool, "Vol-0001", |v| {
        v.status = VolStatus::Full;
        v.vol_jobs = 1;
        v.last_written = Some(days_ago(3));
    });
    add_job(&catalog, 10, 5);
    add_job_media(&catalog, 10, &full, 1, 5);
    let storage = file_storage();
    let allocator = MediaAllocator::new(&catalog);
    let mut job = allocator.start_job(JobId(1));

    let no_prune = AppendRequest::new("Default", &storage, 1)
        .at(now())
        .create(false)
        .prune(false);
    assert!(job.select_for_append(&no_prune).is_err());

    let vol = job.select_for_append(&no_prune.prune(true)).unwrap();
    assert_eq!(vol.name, "Vol-0001");
    assert_eq!(vol.status, VolStatus::Recycle);
    assert!(catalog.get_job(JobId(10)).unwrap().is_none());
}

#[test]
fn changer_volumes_preferred_then_restriction_dropped() {
    let catalog = MemoryCatalog::new();
    let pool = add_pool(&catalog, "Default", |_| {});
    add_volume(&catalog, &pool, "Shelf", |v| {
        v.storage = Some("Changer".into());
        v.last_written = Some(days_ago(1));
    });
    add_volume(&catalog, &pool, "Loaded", |v| {
        v.storage = Some("Changer".into());
        v.in_changer = true;
        v.slot = 3;
        v.last_written = Some(days_ago(9));
    });
    let storage = changer_storage("Changer");
    let allocator = MediaAllocator::new(&catalog);
    let mut job = allocator.start_job(JobId(1));
    let req = AppendRequest::new("Default", &storage, 1).at(now()).create(false);

    assert_eq!(job.select_for_append(&req).unwrap().name, "Loaded");
    let next = job.select_for_append(&AppendRequest { index: 2, ..req }).unwrap();
    assert_eq!(next.name, "Shelf");
}

#[test]
fn pulls_from_scratch_before_labelling() {
    let catalog = MemoryCatalog::new();
    let scratch = add_scratch_pool(&catalog);
    let pool = add_pool(&catalog, "Default", |p| {
        p.label_format = Some("Vol-".into());
        p.max_vol_jobs = 4;
    });
    add_volume(&catalog, &scratch, "Scratch-01", |_| {});
    let storage = file_storage();
    let allocator = MediaAllocator::new(&catalog);
    let mut job = allocator.start_job(JobId(1));

    let vol = job
        .select_for_append(&AppendRequest::new("Default", &storage, 1).at(now()))
        .unwrap();
    assert_eq!(vol.name, "Scratch-01");
    assert_eq!(vol.pool_id, pool.pool_id);
    assert_eq!(vol.max_vol_jobs, 4);
}

#[test]
fn purges_oldest_volume_as_last_resort() {
    let catalog = MemoryCatalog::new();
    let pool = add_pool(&catalog, "Default", |p| {
        p.purge_oldest_volume = true;
        p.vol_retention_secs = 365 * 86_400;
    });
    let oldest = add_volume(&catalog, &pool, "Oldest", |v| {
        v.status = VolStatus::Full;
        v.last_written = Some(days_ago(20));
    });
    add_volume(&catalog, &pool, "Newer", |v| {
        v.status = VolStatus::Used;
        v.last_written = Some(days_ago(2));
    });
    add_job(&catalog, 7, 3);
    add_job_media(&catalog, 7, &oldest, 1, 3);
    let storage = file_storage();
    let allocator = MediaAllocator::new(&catalog);
    let mut job = allocator.start_job(JobId(1));

    let vol = job
        .select_for_append(&AppendRequest::new("Default", &storage, 1).at(now()))
        .unwrap();
    assert_eq!(vol.name, "Oldest");
    assert_eq!(vol.status, VolStatus::Recycle);
    assert!(catalog.jobs_on_volume(oldest.media_id).unwrap().is_empty());
    assert_eq!(volume(&catalog, "Newer").status, VolStatus::Used);
}

#[test]
fn recycle_oldest_respects_retention() {
    let catalog = MemoryCatalog::new();
    let pool = add_pool(&catalog, "Default", |p| {
        p.recycle_oldest_volume = true;
        p.auto_prune = false;
        p.vol_retention_secs = 30 * 86_400;
    });
    add_volume(&catalog, &pool, "Vol-0001", |v| {
        v.status = VolStatus::Full;
        v.last_written = Some(days_ago(10));
    });
    let storage = file_storage();
    let allocator = MediaAllocator::new(&catalog);
    let mut job = allocator.start_job(JobId(1));
    let req = AppendRequest::new("Default", &storage, 1).create(false);

    assert!(job.select_for_append(&req.at(now())).is_err());
    let vol = job.select_for_append(&req.at(days_ago(-30))).unwrap();
    assert_eq!(vol.name, "Vol-0001");
}

/// Accepts every update but never stores it, so an expired volume keeps
/// coming back as the best candidate.
struct StuckCatalog(MemoryCatalog);

impl Catalog for StuckCatalog {
    fn find_next_append_volume(&self, query: &VolumeQuery<'_>) -> Result<Option<Volume>> {
        self.0.find_next_append_volume(query)
    }
    fn find_recycled_volume(&self, query: &VolumeQuery<'_>) -> Result<Option<Volume>> {
        self.0.find_recycled_volume(query)
    }
    fn find_oldest_purged_volume(&self, query: &VolumeQuery<'_>) -> Result<Option<Volume>> {
        self.0.find_oldest_purged_volume(query)
    }
    fn find_oldest_volume(&self, query: &VolumeQuery<'_>) -> Result<Option<Volume>> {
        self.0.find_oldest_volume(query)
    }
    fn get_volume(&self, name: &str) -> Result<Option<Volume>> {
        self.0.get_volume(name)
    }
    fn list_volumes(&self, pool_id: Option<PoolId>) -> Result<Vec<Volume>> {
        self.0.list_volumes(pool_id)
    }
    fn create_volume(&self, volume: Volume) -> Result<Volume> {
        self.0.create_volume(volume)
    }
    fn update_volume(&self, _volume: &Volume) -> Result<()> {
        Ok(())
    }
    fn get_pool(&self, pool_id: PoolId) -> Result<Option<Pool>> {
        self.0.get_pool(pool_id)
    }
    fn find_pool(&self, name: &str) -> Result<Option<Pool>> {
        self.0.find_pool(name)
    }
    fn create_pool(&self, pool: Pool) -> Result<Pool> {
        self.0.create_pool(pool)
    }
    fn update_pool(&self, pool: &Pool) -> Result<()> {
        self.0.update_pool(pool)
    }
    fn count_pool_volumes(&self, pool_id: PoolId) -> Result<u32> {
        self.0.count_pool_volumes(pool_id)
    }
    fn get_job(&self, job_id: JobId) -> Result<Option<JobRecord>> {
        self.0.get_job(job_id)
    }
    fn job_media_entries(&self, job_id: JobId) -> Result<Vec<JobMediaEntry>> {
        self.0.job_media_entries(job_id)
    }
    fn jobs_on_volume(&self, media_id: MediaId) -> Result<Vec<JobId>> {
        self.0.jobs_on_volume(media_id)
    }
    fn delete_job_records(&self, job_ids: &[JobId]) -> Result<usize> {
        self.0.delete_job_records(job_ids)
    }
    fn purge_job_records(&self, job_ids: &[JobId], _volume: &Volume) -> Result<usize> {
        self.0.delete_job_records(job_ids)
    }
    fn allocation(&self) -> &AllocationState {
        self.0.allocation()
    }
}

#[test]
fn selection_loop_is_bounded() {
    let inner = MemoryCatalog::new();
    let pool = add_pool(&inner, "Default", |p| p.max_vol_jobs = 1);
    add_volume(&inner, &pool, "Vol-0001", |v| v.vol_jobs = 1);
    let catalog = StuckCatalog(inner);
    let storage = file_storage();
    let allocator = MediaAllocator::new(&catalog);
    let mut job = allocator.start_job(JobId(1));

    let err = job
        .select_for_append(&AppendRequest::new("Default", &storage, 1).at(now()))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Logic);
    assert!(err.to_string().contains(&MAX_SELECTION_ATTEMPTS.to_string()));
    assert!(job.exclusion().is_empty());
}

#[test]
fn current_volume_accepted_while_appendable() {
    let catalog = MemoryCatalog::new();
    let pool = add_pool(&catalog, "Default", |_| {});
    add_volume(&catalog, &pool, "Vol-0001", |_| {});
    let storage = file_storage();
    let allocator = MediaAllocator::new(&catalog);
    let mut job = allocator.start_job(JobId(1));
    let req = AppendRequest::new("Default", &storage, 1).at(now());

    let check = job.check_volume_for_append("Vol-0001", &req).unwrap();
    assert!(matches!(check, VolumeCheck::Usable(ref v) if v.name == "Vol-0001"));
}

#[test]
fn current_volume_rejections() {
    let catalog = MemoryCatalog::new();
    let pool = add_pool(&catalog, "Default", |_| {});
    let other = add_pool(&catalog, "Other", |_| {});
    add_volume(&catalog, &pool, "Full", |v| v.status = VolStatus::Full);
    add_volume(&catalog, &pool, "Off", |v| v.enabled = false);
    add_volume(&catalog, &other, "Elsewhere", |_| {});
    let storage = file_storage();
    let allocator = MediaAllocator::new(&catalog);
    let mut job = allocator.start_job(JobId(1));
    let req = AppendRequest::new("Default", &storage, 1).at(now());

    for name in ["Full", "Off", "Elsewhere", "Missing"] {
        let check = job.check_volume_for_append(name, &req).unwrap();
        assert!(
            matches!(check, VolumeCheck::Rejected { ref reason } if reason.contains(name)),
            "{name}: {check:?}"
        );
    }
}

#[test]
fn current_full_volume_recycled_when_pool_allows() {
    let catalog = MemoryCatalog::new();
    let pool = add_pool(&catalog, "Default", |p| {
        p.recycle_current_volume = true;
        p.vol_retention_secs = 86_400;
    });
    add_volume(&catalog, &pool, "Vol-0001", |v| {
        v.status = VolStatus::Used;
        v.vol_jobs = 3;
        // Expires 30 seconds from now, inside the one-minute slack.
        v.last_written = Some(now() - chrono::Duration::seconds(86_400 - 30));
    });
    let storage = file_storage();
    let allocator = MediaAllocator::new(&catalog);
    let mut job = allocator.start_job(JobId(1));

    let check = job
        .check_volume_for_append("Vol-0001", &AppendRequest::new("Default", &storage, 1).at(now()))
        .unwrap();
    let VolumeCheck::Usable(vol) = check else {
        panic!("expected volume to be recycled");
    };
    assert_eq!(vol.status, VolStatus::Recycle);
    assert_eq!(vol.vol_jobs, 0);
}

#[test]
fn current_volume_reserved_by_other_job_is_rejected() {
    let catalog = MemoryCatalog::new();
    let pool = add_pool(&catalog, "Default", |_| {});
    add_volume(&catalog, &pool, "Vol-0001", |_| {});
    let storage = file_storage();
    let allocator = MediaAllocator::new(&catalog);
    let req = AppendRequest::new("Default", &storage, 1).at(now());

    let mut first = allocator.start_job(JobId(1));
    first.select_for_append(&req).unwrap();
    let mut second = allocator.start_job(JobId(2));
    let check = second.check_volume_for_append("Vol-0001", &req).unwrap();
    assert!(matches!(check, VolumeCheck::Rejected { ref reason } if reason.contains("JobId 1")));
}
