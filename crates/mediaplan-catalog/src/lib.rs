pub mod allocation;
pub mod memory;
pub mod snapshot;

pub use allocation::AllocationState;
pub use memory::MemoryCatalog;
pub use snapshot::CatalogSnapshot;

use mediaplan_types::error::Result;
use mediaplan_types::{JobId, JobMediaEntry, JobRecord, MediaId, Pool, PoolId, Volume};

/// Filter shared by all volume lookups.
#[derive(Debug, Clone, Copy)]
pub struct VolumeQuery<'a> {
    pub pool_id: PoolId,
    pub media_type: &'a str,
    /// Only volumes loaded in this autochanger group.
    pub changer: Option<&'a str>,
    /// Volumes that must not be returned.
    pub exclude: &'a [MediaId],
}

impl<'a> VolumeQuery<'a> {
    pub fn new(pool_id: PoolId, media_type: &'a str) -> Self {
        Self {
            pool_id,
            media_type,
            changer: None,
            exclude: &[],
        }
    }

    pub fn in_changer(mut self, group: Option<&'a str>) -> Self {
        self.changer = group;
        self
    }

    pub fn excluding(mut self, exclude: &'a [MediaId]) -> Self {
        self.exclude = exclude;
        self
    }

    /// Pool, media type, enabled flag, changer and exclusion checks.
    pub fn admits(&self, volume: &Volume) -> bool {
        if volume.pool_id != self.pool_id
            || volume.media_type != self.media_type
            || !volume.enabled
            || self.exclude.contains(&volume.media_id)
        {
            return false;
        }
        match self.changer {
            Some(group) => volume.in_changer && volume.storage.as_deref() == Some(group),
            None => true,
        }
    }
}

/// Catalog operations used by volume selection and restore planning.
///
/// Every method is atomic: a failed call leaves the stored records untouched.
pub trait Catalog: Send + Sync {
    /// Appendable volume, most recently written first.
    fn find_next_append_volume(&self, query: &VolumeQuery<'_>) -> Result<Option<Volume>>;

    /// Volume already in `Recycle` status, least recently written first.
    fn find_recycled_volume(&self, query: &VolumeQuery<'_>) -> Result<Option<Volume>>;

    /// Oldest `Purged` volume that has its `Recycle` flag set.
    fn find_oldest_purged_volume(&self, query: &VolumeQuery<'_>) -> Result<Option<Volume>>;

    /// Oldest volume in any reclaimable status, regardless of append-eligibility.
    fn find_oldest_volume(&self, query: &VolumeQuery<'_>) -> Result<Option<Volume>>;

    fn get_volume(&self, name: &str) -> Result<Option<Volume>>;

    /// All volumes, or only those of one pool.
    fn list_volumes(&self, pool_id: Option<PoolId>) -> Result<Vec<Volume>>;

    /// Insert a new volume. The `media_id` of the template is ignored.
    fn create_volume(&self, volume: Volume) -> Result<Volume>;

    /// Replace the stored record with the same `media_id`.
    fn update_volume(&self, volume: &Volume) -> Result<()>;

    fn get_pool(&self, pool_id: PoolId) -> Result<Option<Pool>>;

    fn find_pool(&self, name: &str) -> Result<Option<Pool>>;

    /// Insert a new pool. The `pool_id` of the template is ignored.
    fn create_pool(&self, pool: Pool) -> Result<Pool>;

    fn update_pool(&self, pool: &Pool) -> Result<()>;

    fn count_pool_volumes(&self, pool_id: PoolId) -> Result<u32>;

    fn get_job(&self, job_id: JobId) -> Result<Option<JobRecord>>;

    /// Job-media records of one job in write order.
    fn job_media_entries(&self, job_id: JobId) -> Result<Vec<JobMediaEntry>>;

    fn jobs_on_volume(&self, media_id: MediaId) -> Result<Vec<JobId>>;

    /// Delete the jobs and their job-media records in one batch.
    /// Returns the number of job records removed.
    fn delete_job_records(&self, job_ids: &[JobId]) -> Result<usize>;

    /// Delete the jobs and store `volume` as one operation. When the volume
    /// cannot be stored no job record is deleted.
    fn purge_job_records(&self, job_ids: &[JobId], volume: &Volume) -> Result<usize>;

    /// Lock and reservations shared by every allocator using this catalog.
    fn allocation(&self) -> &AllocationState;
}
