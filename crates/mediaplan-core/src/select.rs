use chrono::{DateTime, Utc};
use tracing::{debug, error, info, warn};

use mediaplan_catalog::{Catalog, VolumeQuery};
use mediaplan_types::{JobId, MediaId, Pool, VolStatus, Volume};

use crate::config::StorageConfig;
use crate::error::{MediaError, Result};
use crate::exclusion::ExclusionList;
use crate::expire::check_expired;
use crate::label::label_new_volume;
use crate::prune::{prune_volume, prune_volumes, purge_volume};
use crate::recycle::{recycle_oldest_purged_volume, recycle_volume};
use crate::scratch::{pull_from_scratch, ScratchRequest};

/// Upper bound on candidates rejected by the expiration check in one call.
pub const MAX_SELECTION_ATTEMPTS: u32 = 200;

/// Early expiry allowed when recycling the volume already mounted.
pub const CURRENT_VOLUME_SLACK_SECS: u64 = 60;

/// Parameters of one append-volume request.
#[derive(Debug, Clone, Copy)]
pub struct AppendRequest<'a> {
    pub pool: &'a str,
    pub storage: &'a StorageConfig,
    /// 1 for the first volume of the job, 2 for the next one it spans to, ...
    pub index: u32,
    /// Allow scratch pulls and labelling new volumes.
    pub create: bool,
    /// Allow pruning expired volumes of the pool.
    pub prune: bool,
    pub now: DateTime<Utc>,
}

impl<'a> AppendRequest<'a> {
    pub fn new(pool: &'a str, storage: &'a StorageConfig, index: u32) -> Self {
        Self {
            pool,
            storage,
            index,
            create: true,
            prune: true,
            now: Utc::now(),
        }
    }

    pub fn create(mut self, create: bool) -> Self {
        self.create = create;
        self
    }

    pub fn prune(mut self, prune: bool) -> Self {
        self.prune = prune;
        self
    }

    pub fn at(mut self, now: DateTime<Utc>) -> Self {
        self.now = now;
        self
    }
}

/// Outcome of checking the volume a job already has mounted.
#[derive(Debug, Clone, PartialEq)]
pub enum VolumeCheck {
    Usable(Volume),
    Rejected { reason: String },
}

impl VolumeCheck {
    fn rejected(reason: impl Into<String>) -> Self {
        VolumeCheck::Rejected {
            reason: reason.into(),
        }
    }
}

/// Chooses append volumes on one catalog. Each job opens a [`JobSession`],
/// which keeps the volumes it was handed reserved until it is dropped.
///
/// The catalog lock and the reservations live in the catalog's
/// [`AllocationState`](mediaplan_catalog::AllocationState), so allocators
/// built over the same catalog exclude each other.
pub struct MediaAllocator<'c> {
    catalog: &'c dyn Catalog,
}

impl<'c> MediaAllocator<'c> {
    pub fn new(catalog: &'c dyn Catalog) -> Self {
        Self { catalog }
    }

    pub fn catalog(&self) -> &'c dyn Catalog {
        self.catalog
    }

    /// Start allocating for `job_id`.
    pub fn start_job(&self, job_id: JobId) -> JobSession<'_, 'c> {
        debug!(%job_id, "starting volume session");
        JobSession {
            allocator: self,
            job_id,
            exclusion: ExclusionList::new(),
        }
    }

    /// Job currently holding `media_id`, if any.
    pub fn reserved_by(&self, media_id: MediaId) -> Option<JobId> {
        self.catalog.allocation().reserved_by(media_id)
    }
}

/// One job's view of the allocator.
pub struct JobSession<'a, 'c> {
    allocator: &'a MediaAllocator<'c>,
    job_id: JobId,
    exclusion: ExclusionList,
}

impl JobSession<'_, '_> {
    pub fn job_id(&self) -> JobId {
        self.job_id
    }

    pub fn exclusion(&self) -> &ExclusionList {
        &self.exclusion
    }

    /// Find, reclaim or create a volume `req.storage` can append to.
    ///
    /// The returned volume is recorded in this job's exclusion list and is
    /// invisible to other jobs until the session ends. Running out of
    /// candidates is `NoAppendableVolume`; looping past
    /// [`MAX_SELECTION_ATTEMPTS`] is a `Logic` error.
    pub fn select_for_append(&mut self, req: &AppendRequest<'_>) -> Result<Volume> {
        let catalog = self.allocator.catalog;
        let _guard = catalog.allocation().lock();

        let pool = find_pool(catalog, req.pool)?;
        let mut exclude: Vec<MediaId> = self.exclusion.ids().collect();
        exclude.extend(catalog.allocation().held_by_others(self.job_id));

        let mut in_changer = req.storage.autochanger.is_some();
        for attempt in 1..=MAX_SELECTION_ATTEMPTS {
            let Some(mut volume) = self.find_candidate(&pool, req, &mut in_changer, &exclude)?
            else {
                info!(job_id = %self.job_id, pool = %pool.name, storage = %req.storage.name, "no appendable volume");
                return Err(MediaError::NoAppendableVolume {
                    pool: pool.name.clone(),
                    storage: req.storage.name.clone(),
                });
            };

            if check_expired(catalog, &pool, &mut volume, req.now)? {
                debug!(volume = %volume.name, attempt, "candidate expired, searching again");
                continue;
            }

            self.accept(req.index, &volume);
            info!(
                job_id = %self.job_id,
                volume = %volume.name,
                index = req.index,
                status = %volume.status,
                "selected volume for append"
            );
            return Ok(volume);
        }

        error!(
            job_id = %self.job_id,
            pool = %pool.name,
            attempts = MAX_SELECTION_ATTEMPTS,
            "volume selection did not settle"
        );
        Err(MediaError::Logic(format!(
            "volume selection for pool '{}' gave up after {MAX_SELECTION_ATTEMPTS} attempts",
            pool.name
        )))
    }

    /// Decide whether the job may keep writing to `volume_name`.
    ///
    /// A purged volume, or a full one whose retention ran out when the pool
    /// recycles the current volume, is recycled in place and accepted.
    pub fn check_volume_for_append(
        &mut self,
        volume_name: &str,
        req: &AppendRequest<'_>,
    ) -> Result<VolumeCheck> {
        let catalog = self.allocator.catalog;
        let _guard = catalog.allocation().lock();

        let pool = find_pool(catalog, req.pool)?;
        let Some(mut volume) = catalog.get_volume(volume_name)? else {
            return Ok(VolumeCheck::rejected(format!(
                "volume '{volume_name}' is not in the catalog"
            )));
        };
        if volume.pool_id != pool.pool_id {
            return Ok(VolumeCheck::rejected(format!(
                "volume '{volume_name}' is not in pool '{}'",
                pool.name
            )));
        }
        if !volume.enabled {
            return Ok(VolumeCheck::rejected(format!(
                "volume '{volume_name}' is disabled"
            )));
        }
        if volume.media_type != req.storage.media_type {
            return Ok(VolumeCheck::rejected(format!(
                "volume '{volume_name}' has media type '{}', storage wants '{}'",
                volume.media_type, req.storage.media_type
            )));
        }
        match catalog.allocation().reserved_by(volume.media_id) {
            Some(owner) if owner != self.job_id => {
                return Ok(VolumeCheck::rejected(format!(
                    "volume '{volume_name}' is in use by JobId {owner}"
                )));
            }
            _ => {}
        }

        check_expired(catalog, &pool, &mut volume, req.now)?;

        match volume.status {
            VolStatus::Append | VolStatus::Recycle => {}
            VolStatus::Purged => recycle_volume(catalog, &mut volume)?,
            VolStatus::Full | VolStatus::Used if pool.recycle_current_volume => {
                if !prune_volume(catalog, &mut volume, req.now, CURRENT_VOLUME_SLACK_SECS)? {
                    return Ok(VolumeCheck::rejected(format!(
                        "volume '{volume_name}' is {} and its retention has not expired",
                        volume.status
                    )));
                }
                if volume.pool_id != pool.pool_id {
                    return Ok(VolumeCheck::rejected(format!(
                        "volume '{volume_name}' was moved to its recycle pool"
                    )));
                }
                recycle_volume(catalog, &mut volume)?;
            }
            status => {
                return Ok(VolumeCheck::rejected(format!(
                    "volume '{volume_name}' has status {status}"
                )));
            }
        }

        self.accept(req.index, &volume);
        Ok(VolumeCheck::Usable(volume))
    }

    fn accept(&mut self, index: u32, volume: &Volume) {
        self.exclusion.record(index, volume.media_id);
        self.allocator
            .catalog
            .allocation()
            .reserve(volume.media_id, self.job_id);
    }

    /// Steps 1 to 8 of the fallback chain. Clears `in_changer` when the
    /// changer-restricted pass comes up empty.
    fn find_candidate(
        &self,
        pool: &Pool,
        req: &AppendRequest<'_>,
        in_changer: &mut bool,
        exclude: &[MediaId],
    ) -> Result<Option<Volume>> {
        let catalog = self.allocator.catalog;
        let media_type = req.storage.media_type.as_str();
        let group = req.storage.group();

        loop {
            let query = VolumeQuery::new(pool.pool_id, media_type)
                .in_changer(in_changer.then_some(group))
                .excluding(exclude);

            if let Some(volume) = catalog.find_next_append_volume(&query)? {
                return Ok(Some(volume));
            }
            if let Some(volume) = catalog.find_recycled_volume(&query)? {
                return Ok(Some(volume));
            }
            if let Some(volume) = recycle_oldest_purged_volume(catalog, &query)? {
                return Ok(Some(volume));
            }
            if req.prune && pool.auto_prune {
                prune_volumes(catalog, pool, req.now)?;
                if let Some(volume) = recycle_oldest_purged_volume(catalog, &query)? {
                    return Ok(Some(volume));
                }
            }
            if req.create {
                let scratch = ScratchRequest {
                    pool,
                    media_type,
                    storage: group,
                    in_changer: *in_changer,
                    exclude,
                };
                match pull_from_scratch(catalog, &scratch) {
                    Ok(volume) => return Ok(Some(volume)),
                    Err(e) if e.is_not_found() => debug!(pool = %pool.name, "{e}"),
                    Err(e) => return Err(e),
                }
            }
            if !*in_changer {
                break;
            }
            debug!(pool = %pool.name, changer = group, "nothing in the changer, searching all volumes");
            *in_changer = false;
        }

        let query = VolumeQuery::new(pool.pool_id, media_type).excluding(exclude);

        if req.create {
            if let Some(volume) = label_new_volume(catalog, pool, media_type, group, req.now)? {
                return Ok(Some(volume));
            }
        }

        if !(pool.purge_oldest_volume || pool.recycle_oldest_volume) {
            return Ok(None);
        }
        let Some(mut oldest) = catalog.find_oldest_volume(&query)? else {
            return Ok(None);
        };
        let purged = if pool.purge_oldest_volume && req.create {
            info!(volume = %oldest.name, pool = %pool.name, "purging oldest volume");
            purge_volume(catalog, &mut oldest)?
        } else if pool.recycle_oldest_volume {
            prune_volume(catalog, &mut oldest, req.now, 0)?
        } else {
            false
        };
        if !purged {
            return Ok(None);
        }
        if oldest.pool_id != pool.pool_id {
            warn!(volume = %oldest.name, "oldest volume moved to its recycle pool");
            return Ok(None);
        }
        recycle_volume(catalog, &mut oldest)?;
        Ok(Some(oldest))
    }
}

impl Drop for JobSession<'_, '_> {
    fn drop(&mut self) {
        if !self.exclusion.is_empty() {
            debug!(job_id = %self.job_id, volumes = self.exclusion.len(), "releasing volumes");
        }
        self.allocator.catalog.allocation().release(self.job_id);
    }
}

fn find_pool(catalog: &dyn Catalog, name: &str) -> Result<Pool> {
    catalog
        .find_pool(name)?
        .ok_or_else(|| MediaError::NotFound(format!("pool '{name}' not found in catalog")))
}
