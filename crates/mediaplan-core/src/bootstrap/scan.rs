use std::collections::btree_map;
use std::{slice, vec};

use serde::Serialize;

use mediaplan_types::{JobId, JobMediaEntry};

use super::RestoreSet;
use crate::interval::FileRange;

/// One selected range on one volume.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ScanItem<'a> {
    pub job_id: JobId,
    pub volume: &'a str,
    pub range: FileRange,
}

/// Iterator returned by [`RestoreContext::scan`](super::RestoreContext::scan).
///
/// Cloning yields an independent iterator from the same position.
#[derive(Debug, Clone)]
pub struct Scan<'a> {
    sets: btree_map::Values<'a, JobId, RestoreSet>,
    set: Option<&'a RestoreSet>,
    entries: slice::Iter<'a, JobMediaEntry>,
    entry: Option<&'a JobMediaEntry>,
    pending: vec::IntoIter<FileRange>,
}

impl<'a> Scan<'a> {
    pub(super) fn new(sets: btree_map::Values<'a, JobId, RestoreSet>) -> Self {
        Self {
            sets,
            set: None,
            entries: [].iter(),
            entry: None,
            pending: Vec::new().into_iter(),
        }
    }
}

impl<'a> Iterator for Scan<'a> {
    type Item = ScanItem<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(range) = self.pending.next() {
                return Some(ScanItem {
                    job_id: self.set?.job_id,
                    volume: &self.entry?.volume_name,
                    range,
                });
            }
            if let Some(entry) = self.entries.next() {
                let set = self.set?;
                self.entry = Some(entry);
                self.pending = set
                    .files
                    .intersect(entry.first_index, entry.last_index)
                    .into_iter();
                continue;
            }
            let set = self.sets.find(|s| s.is_resolved())?;
            self.set = Some(set);
            self.entries = set.job_media.iter();
        }
    }
}
