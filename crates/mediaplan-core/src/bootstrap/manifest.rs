use std::fmt;

use serde::Serialize;
use tracing::debug;

use mediaplan_types::JobId;

use super::RestoreContext;
use crate::error::{MediaError, Result};
use crate::interval::FileRange;

/// Resolves a storage name to the device the storage daemon should read from.
pub trait DeviceLookup {
    fn device_for(&self, storage: &str) -> Option<String>;
}

impl<F> DeviceLookup for F
where
    F: Fn(&str) -> Option<String>,
{
    fn device_for(&self, storage: &str) -> Option<String> {
        self(storage)
    }
}

/// Omits the `Device=` line from every stanza.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoDevices;

impl DeviceLookup for NoDevices {
    fn device_for(&self, _storage: &str) -> Option<String> {
        None
    }
}

/// One volume block of the bootstrap.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BootstrapStanza {
    pub job_id: JobId,
    pub storage: String,
    pub volume: String,
    pub media_type: String,
    pub file_regex: Option<String>,
    pub device: Option<String>,
    pub slot: i32,
    pub in_changer: bool,
    pub vol_session_id: u32,
    pub vol_session_time: u32,
    pub start_addr: u64,
    pub end_addr: u64,
    pub file_ranges: Vec<FileRange>,
    /// Files selected in this block.
    pub count: u64,
}

impl fmt::Display for BootstrapStanza {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Storage=\"{}\"", self.storage)?;
        writeln!(f, "Volume=\"{}\"", self.volume)?;
        writeln!(f, "MediaType=\"{}\"", self.media_type)?;
        if let Some(regex) = &self.file_regex {
            writeln!(f, "FileRegex={regex}")?;
        }
        if let Some(device) = &self.device {
            writeln!(f, "Device=\"{device}\"")?;
        }
        if self.slot > 0 {
            writeln!(f, "Slot={}", self.slot)?;
        }
        writeln!(f, "VolSessionId={}", self.vol_session_id)?;
        writeln!(f, "VolSessionTime={}", self.vol_session_time)?;
        writeln!(f, "VolAddr={}-{}", self.start_addr, self.end_addr)?;
        for range in &self.file_ranges {
            writeln!(f, "FileIndex={range}")?;
        }
        writeln!(f, "Count={}", self.count)
    }
}

/// A volume the restore needs mounted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RequiredVolume {
    pub volume: String,
    pub storage: String,
    pub media_type: String,
    pub in_changer: bool,
}

/// Rendered restore plan: stanzas in read order plus the number of distinct
/// files selected.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RestoreManifest {
    pub stanzas: Vec<BootstrapStanza>,
    pub file_count: u64,
}

impl RestoreManifest {
    pub fn is_empty(&self) -> bool {
        self.stanzas.is_empty()
    }

    /// Volumes in the order they are read, each listed once.
    pub fn required_volumes(&self) -> Vec<RequiredVolume> {
        let mut out: Vec<RequiredVolume> = Vec::new();
        for stanza in &self.stanzas {
            if out.iter().any(|v| v.volume == stanza.volume) {
                continue;
            }
            out.push(RequiredVolume {
                volume: stanza.volume.clone(),
                storage: stanza.storage.clone(),
                media_type: stanza.media_type.clone(),
                in_changer: stanza.in_changer,
            });
        }
        out
    }
}

impl fmt::Display for RestoreManifest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.stanzas.iter().try_for_each(|s| write!(f, "{s}"))
    }
}

/// Turn resolved restore sets into a bootstrap.
///
/// Jobs are visited in `order` (ascending JobId when empty) and volumes in
/// write order. A file split across two volumes of the same job appears in
/// both blocks but is counted once in `file_count`.
pub fn build_manifest(
    ctx: &RestoreContext,
    order: &[JobId],
    devices: &dyn DeviceLookup,
) -> Result<RestoreManifest> {
    let mut manifest = RestoreManifest::default();

    for set in ctx.ordered(order)? {
        if !set.is_resolved() {
            return Err(MediaError::Logic(format!(
                "JobId {} has not been resolved against the catalog",
                set.job_id
            )));
        }

        let mut previous_last: Option<i32> = None;
        for entry in &set.job_media {
            let ranges = set.files.intersect(entry.first_index, entry.last_index);
            let (Some(head), Some(tail)) = (ranges.first(), ranges.last()) else {
                continue;
            };

            let count: u64 = ranges.iter().map(FileRange::len).sum();
            manifest.file_count += count;
            if previous_last == Some(entry.first_index) && head.first == entry.first_index {
                manifest.file_count -= 1;
            }
            previous_last = Some(tail.last);

            manifest.stanzas.push(BootstrapStanza {
                job_id: set.job_id,
                storage: entry.storage.clone(),
                volume: entry.volume_name.clone(),
                media_type: entry.media_type.clone(),
                file_regex: set.file_regex.clone(),
                device: devices.device_for(&entry.storage),
                slot: entry.slot,
                in_changer: entry.in_changer,
                vol_session_id: set.vol_session_id,
                vol_session_time: set.vol_session_time,
                start_addr: entry.start_addr,
                end_addr: entry.end_addr,
                file_ranges: ranges,
                count,
            });
        }
    }

    debug!(
        stanzas = manifest.stanzas.len(),
        files = manifest.file_count,
        "built bootstrap manifest"
    );
    Ok(manifest)
}
