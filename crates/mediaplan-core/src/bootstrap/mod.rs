mod manifest;
mod scan;

use std::collections::BTreeMap;

use tracing::{debug, info};

use mediaplan_catalog::Catalog;
use mediaplan_types::{JobId, JobMediaEntry};

use crate::error::{MediaError, Result};
use crate::interval::IntervalSet;

pub use self::manifest::{
    build_manifest, BootstrapStanza, DeviceLookup, NoDevices, RequiredVolume, RestoreManifest,
};
pub use self::scan::{Scan, ScanItem};

/// Everything selected from one job.
#[derive(Debug, Clone)]
pub struct RestoreSet {
    pub job_id: JobId,
    pub vol_session_id: u32,
    pub vol_session_time: u32,
    /// Volume usage of the job in write order.
    pub job_media: Vec<JobMediaEntry>,
    pub file_regex: Option<String>,
    pub files: IntervalSet,
    resolved: bool,
}

impl RestoreSet {
    pub fn new(job_id: JobId) -> Self {
        Self {
            job_id,
            vol_session_id: 0,
            vol_session_time: 0,
            job_media: Vec::new(),
            file_regex: None,
            files: IntervalSet::new(),
            resolved: false,
        }
    }

    /// Whether session identifiers and volume usage have been loaded.
    pub fn is_resolved(&self) -> bool {
        self.resolved
    }
}

/// Selections of one restore request, keyed by JobId.
#[derive(Debug, Clone, Default)]
pub struct RestoreContext {
    sets: BTreeMap<JobId, RestoreSet>,
}

impl RestoreContext {
    pub fn new() -> Self {
        Self::default()
    }

    fn set_mut(&mut self, job_id: JobId) -> &mut RestoreSet {
        self.sets
            .entry(job_id)
            .or_insert_with(|| RestoreSet::new(job_id))
    }

    pub fn add_file(&mut self, job_id: JobId, findex: i32) {
        self.set_mut(job_id).files.insert(findex);
    }

    pub fn add_file_range(&mut self, job_id: JobId, first: i32, last: i32) {
        self.set_mut(job_id).files.insert_range(first, last);
    }

    /// Select every file of the job.
    pub fn add_all(&mut self, job_id: JobId) {
        self.set_mut(job_id).files.insert_all();
    }

    pub fn set_file_regex(&mut self, job_id: JobId, regex: &str) {
        self.set_mut(job_id).file_regex = Some(regex.to_string());
    }

    pub fn get(&self, job_id: JobId) -> Option<&RestoreSet> {
        self.sets.get(&job_id)
    }

    pub fn job_ids(&self) -> impl Iterator<Item = JobId> + '_ {
        self.sets.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.sets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }

    /// Lazily walk every selected range, job by job in ascending JobId and
    /// volume by volume in write order. Unresolved sets are skipped.
    pub fn scan(&self) -> Scan<'_> {
        Scan::new(self.sets.values())
    }

    /// Sets in the requested order; ascending JobId when `order` is empty.
    /// Repeated ids are visited once. Every job with selected files must be
    /// listed.
    fn ordered(&self, order: &[JobId]) -> Result<Vec<&RestoreSet>> {
        if order.is_empty() {
            return Ok(self.sets.values().collect());
        }
        let mut out: Vec<&RestoreSet> = Vec::with_capacity(order.len());
        for &job_id in order {
            if out.iter().any(|s| s.job_id == job_id) {
                continue;
            }
            let set = self.sets.get(&job_id).ok_or_else(|| MediaError::UnresolvedJob {
                job_id,
                reason: "no files were selected from this job".into(),
            })?;
            out.push(set);
        }
        if let Some(left_out) = self
            .sets
            .values()
            .find(|set| !set.files.is_empty() && !order.contains(&set.job_id))
        {
            return Err(MediaError::UnresolvedJob {
                job_id: left_out.job_id,
                reason: "files were selected but the job is missing from the read order".into(),
            });
        }
        Ok(out)
    }
}

/// Load session identifiers and volume usage for every set.
///
/// Any job that cannot be resolved fails the whole pass with an error naming
/// the JobId. A job that wrote no files is kept but contributes nothing.
pub fn complete_restore_sets(ctx: &mut RestoreContext, catalog: &dyn Catalog) -> Result<()> {
    for set in ctx.sets.values_mut() {
        let job_id = set.job_id;
        let unresolved = |reason: String| MediaError::UnresolvedJob { job_id, reason };

        let job = catalog
            .get_job(job_id)
            .map_err(|e| unresolved(e.to_string()))?
            .ok_or_else(|| unresolved("job record not found".into()))?;
        set.vol_session_id = job.vol_session_id;
        set.vol_session_time = job.vol_session_time;

        if job.job_files == 0 {
            info!(%job_id, "job has no files, skipping");
            set.job_media.clear();
            set.resolved = true;
            continue;
        }

        let entries = catalog
            .job_media_entries(job_id)
            .map_err(|e| unresolved(e.to_string()))?;
        if entries.is_empty() {
            return Err(unresolved("no volume usage recorded for this job".into()));
        }
        if let Some(bad) = entries.iter().find(|e| e.first_index > e.last_index) {
            return Err(unresolved(format!(
                "volume '{}' records file indexes {}-{} in reverse",
                bad.volume_name, bad.first_index, bad.last_index
            )));
        }
        debug!(%job_id, volumes = entries.len(), "resolved restore set");
        set.job_media = entries;
        set.resolved = true;
    }
    Ok(())
}
