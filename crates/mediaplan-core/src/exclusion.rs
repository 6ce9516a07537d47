use mediaplan_types::MediaId;

/// Volumes already handed to one job, tagged with the sequence index of
/// the request that chose them. Append-only for the life of the job.
#[derive(Debug, Clone, Default)]
pub struct ExclusionList {
    entries: Vec<(u32, MediaId)>,
}

impl ExclusionList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, index: u32, media_id: MediaId) {
        if !self.contains(media_id) {
            self.entries.push((index, media_id));
        }
    }

    pub fn contains(&self, media_id: MediaId) -> bool {
        self.entries.iter().any(|&(_, id)| id == media_id)
    }

    /// The volume chosen for sequence index `index`, if any.
    pub fn volume_for(&self, index: u32) -> Option<MediaId> {
        self.entries
            .iter()
            .find(|&&(i, _)| i == index)
            .map(|&(_, id)| id)
    }

    pub fn ids(&self) -> impl Iterator<Item = MediaId> + '_ {
        self.entries.iter().map(|&(_, id)| id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
