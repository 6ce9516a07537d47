use std::cmp::Ordering;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use tracing::debug;

use mediaplan_types::error::{MediaError, Result};
use mediaplan_types::{
    JobId, JobMediaEntry, JobRecord, MediaId, Pool, PoolId, VolStatus, Volume,
};

use crate::snapshot::CatalogSnapshot;
use crate::{AllocationState, Catalog, VolumeQuery};

/// In-process catalog. Thread-safe via Mutex; every trait call is one
/// critical section, so each call is atomic with respect to the others.
pub struct MemoryCatalog {
    state: Mutex<CatalogSnapshot>,
    allocation: AllocationState,
}

impl MemoryCatalog {
    pub fn new() -> Self {
        Self::from_snapshot(CatalogSnapshot::default())
    }

    pub fn from_snapshot(snapshot: CatalogSnapshot) -> Self {
        Self {
            state: Mutex::new(snapshot),
            allocation: AllocationState::new(),
        }
    }

    pub fn load(path: &Path) -> Result<Self> {
        Ok(Self::from_snapshot(CatalogSnapshot::load(path)?))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        self.snapshot()?.save(path)
    }

    pub fn snapshot(&self) -> Result<CatalogSnapshot> {
        Ok(self.lock()?.clone())
    }

    /// Insert a volume keeping its `media_id` (fixtures and imports).
    pub fn insert_volume(&self, volume: Volume) -> Result<()> {
        let mut state = self.lock()?;
        if state
            .volumes
            .iter()
            .any(|v| v.media_id == volume.media_id || v.name == volume.name)
        {
            return Err(MediaError::Catalog(format!(
                "volume '{}' already exists",
                volume.name
            )));
        }
        state.volumes.push(volume);
        Ok(())
    }

    pub fn insert_job(&self, job: JobRecord) -> Result<()> {
        let mut state = self.lock()?;
        state.jobs.retain(|j| j.job_id != job.job_id);
        state.jobs.push(job);
        Ok(())
    }

    pub fn insert_job_media(&self, entry: JobMediaEntry) -> Result<()> {
        self.lock()?.job_media.push(entry);
        Ok(())
    }

    fn lock(&self) -> Result<MutexGuard<'_, CatalogSnapshot>> {
        self.state
            .lock()
            .map_err(|_| MediaError::Catalog("catalog state poisoned".into()))
    }

    fn pick(
        &self,
        query: &VolumeQuery<'_>,
        status: impl Fn(&Volume) -> bool,
        order: impl Fn(&Volume, &Volume) -> Ordering,
    ) -> Result<Option<Volume>> {
        let state = self.lock()?;
        Ok(state
            .volumes
            .iter()
            .filter(|v| query.admits(v) && status(v))
            .min_by(|a, b| order(a, b))
            .cloned())
    }
}

impl Default for MemoryCatalog {
    fn default() -> Self {
        Self::new()
    }
}

/// Most recently written first, never-written last, then by id.
fn newest_first(a: &Volume, b: &Volume) -> Ordering {
    match (a.last_written, b.last_written) {
        (Some(x), Some(y)) => y.cmp(&x),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
    .then(a.media_id.cmp(&b.media_id))
}

/// Never-written first, then least recently written, then by id.
fn oldest_first(a: &Volume, b: &Volume) -> Ordering {
    a.last_written
        .cmp(&b.last_written)
        .then(a.media_id.cmp(&b.media_id))
}

impl Catalog for MemoryCatalog {
    fn find_next_append_volume(&self, query: &VolumeQuery<'_>) -> Result<Option<Volume>> {
        self.pick(query, |v| v.status == VolStatus::Append, newest_first)
    }

    fn find_recycled_volume(&self, query: &VolumeQuery<'_>) -> Result<Option<Volume>> {
        self.pick(query, |v| v.status == VolStatus::Recycle, oldest_first)
    }

    fn find_oldest_purged_volume(&self, query: &VolumeQuery<'_>) -> Result<Option<Volume>> {
        self.pick(
            query,
            |v| v.status == VolStatus::Purged && v.recycle,
            oldest_first,
        )
    }

    fn find_oldest_volume(&self, query: &VolumeQuery<'_>) -> Result<Option<Volume>> {
        self.pick(query, |v| v.status.is_reclaimable(), oldest_first)
    }

    fn get_volume(&self, name: &str) -> Result<Option<Volume>> {
        Ok(self.lock()?.volumes.iter().find(|v| v.name == name).cloned())
    }

    fn list_volumes(&self, pool_id: Option<PoolId>) -> Result<Vec<Volume>> {
        let state = self.lock()?;
        let mut out: Vec<Volume> = state
            .volumes
            .iter()
            .filter(|v| pool_id.is_none_or(|p| v.pool_id == p))
            .cloned()
            .collect();
        out.sort_by_key(|v| v.media_id);
        Ok(out)
    }

    fn create_volume(&self, mut volume: Volume) -> Result<Volume> {
        let mut state = self.lock()?;
        if state.volumes.iter().any(|v| v.name == volume.name) {
            return Err(MediaError::Catalog(format!(
                "volume '{}' already exists",
                volume.name
            )));
        }
        let next = state
            .volumes
            .iter()
            .map(|v| v.media_id.0)
            .max()
            .unwrap_or(0)
            + 1;
        volume.media_id = MediaId(next);
        debug!(volume = %volume.name, media_id = next, "created volume record");
        state.volumes.push(volume.clone());
        Ok(volume)
    }

    fn update_volume(&self, volume: &Volume) -> Result<()> {
        store_volume(&mut *self.lock()?, volume)
    }

    fn get_pool(&self, pool_id: PoolId) -> Result<Option<Pool>> {
        Ok(self
            .lock()?
            .pools
            .iter()
            .find(|p| p.pool_id == pool_id)
            .cloned())
    }

    fn find_pool(&self, name: &str) -> Result<Option<Pool>> {
        Ok(self.lock()?.pools.iter().find(|p| p.name == name).cloned())
    }

    fn create_pool(&self, mut pool: Pool) -> Result<Pool> {
        let mut state = self.lock()?;
        if state.pools.iter().any(|p| p.name == pool.name) {
            return Err(MediaError::Catalog(format!(
                "pool '{}' already exists",
                pool.name
            )));
        }
        let next = state.pools.iter().map(|p| p.pool_id.0).max().unwrap_or(0) + 1;
        pool.pool_id = PoolId(next);
        state.pools.push(pool.clone());
        Ok(pool)
    }

    fn update_pool(&self, pool: &Pool) -> Result<()> {
        let mut state = self.lock()?;
        let slot = state
            .pools
            .iter_mut()
            .find(|p| p.pool_id == pool.pool_id)
            .ok_or_else(|| {
                MediaError::Catalog(format!("no pool record with PoolId {}", pool.pool_id))
            })?;
        *slot = pool.clone();
        Ok(())
    }

    fn count_pool_volumes(&self, pool_id: PoolId) -> Result<u32> {
        let state = self.lock()?;
        let n = state.volumes.iter().filter(|v| v.pool_id == pool_id).count();
        Ok(u32::try_from(n).unwrap_or(u32::MAX))
    }

    fn get_job(&self, job_id: JobId) -> Result<Option<JobRecord>> {
        Ok(self
            .lock()?
            .jobs
            .iter()
            .find(|j| j.job_id == job_id)
            .cloned())
    }

    fn job_media_entries(&self, job_id: JobId) -> Result<Vec<JobMediaEntry>> {
        // Vec order is insertion order, which is write order.
        Ok(self
            .lock()?
            .job_media
            .iter()
            .filter(|e| e.job_id == job_id)
            .cloned()
            .collect())
    }

    fn jobs_on_volume(&self, media_id: MediaId) -> Result<Vec<JobId>> {
        let state = self.lock()?;
        let mut jobs: Vec<JobId> = state
            .job_media
            .iter()
            .filter(|e| e.media_id == media_id)
            .map(|e| e.job_id)
            .collect();
        jobs.sort();
        jobs.dedup();
        Ok(jobs)
    }

    fn delete_job_records(&self, job_ids: &[JobId]) -> Result<usize> {
        let mut state = self.lock()?;
        let before = state.jobs.len();
        state.jobs.retain(|j| !job_ids.contains(&j.job_id));
        state.job_media.retain(|e| !job_ids.contains(&e.job_id));
        let removed = before - state.jobs.len();
        debug!(removed, requested = job_ids.len(), "deleted job records");
        Ok(removed)
    }

    fn purge_job_records(&self, job_ids: &[JobId], volume: &Volume) -> Result<usize> {
        let mut state = self.lock()?;
        store_volume(&mut state, volume)?;
        let before = state.jobs.len();
        state.jobs.retain(|j| !job_ids.contains(&j.job_id));
        state.job_media.retain(|e| !job_ids.contains(&e.job_id));
        let removed = before - state.jobs.len();
        debug!(volume = %volume.name, removed, "purged job records");
        Ok(removed)
    }

    fn allocation(&self) -> &AllocationState {
        &self.allocation
    }
}

/// Replace the record with the same `media_id`, leaving `state` untouched on error.
fn store_volume(state: &mut CatalogSnapshot, volume: &Volume) -> Result<()> {
    if state
        .volumes
        .iter()
        .any(|v| v.name == volume.name && v.media_id != volume.media_id)
    {
        return Err(MediaError::Catalog(format!(
            "volume name '{}' is taken by another record",
            volume.name
        )));
    }
    let slot = state
        .volumes
        .iter_mut()
        .find(|v| v.media_id == volume.media_id)
        .ok_or_else(|| {
            MediaError::Catalog(format!("no volume record with MediaId {}", volume.media_id))
        })?;
    *slot = volume.clone();
    Ok(())
}
