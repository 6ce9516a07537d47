use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use mediaplan_types::{JobId, MediaId};

/// Coordination state shared by every allocator working on one catalog:
/// the lock serialising read-then-update sequences, and the volumes
/// currently handed to running jobs.
#[derive(Debug, Default)]
pub struct AllocationState {
    db_lock: Mutex<()>,
    reservations: Mutex<HashMap<MediaId, JobId>>,
}

impl AllocationState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hold while reading candidates and writing the chosen one back.
    pub fn lock(&self) -> MutexGuard<'_, ()> {
        self.db_lock.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn reserve(&self, media_id: MediaId, job_id: JobId) {
        self.reservations().insert(media_id, job_id);
    }

    /// Job currently holding `media_id`, if any.
    pub fn reserved_by(&self, media_id: MediaId) -> Option<JobId> {
        self.reservations().get(&media_id).copied()
    }

    /// Volumes reserved by any job other than `job_id`.
    pub fn held_by_others(&self, job_id: JobId) -> Vec<MediaId> {
        self.reservations()
            .iter()
            .filter(|&(_, &owner)| owner != job_id)
            .map(|(&id, _)| id)
            .collect()
    }

    pub fn release(&self, job_id: JobId) {
        self.reservations().retain(|_, owner| *owner != job_id);
    }

    fn reservations(&self) -> MutexGuard<'_, HashMap<MediaId, JobId>> {
        self.reservations
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}
