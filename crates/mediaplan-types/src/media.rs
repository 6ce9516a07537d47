use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{JobId, MediaId, PoolId};

/// Catalog status of a volume.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VolStatus {
    Append,
    Full,
    Used,
    Error,
    Purged,
    Recycle,
    Archive,
    Cleaning,
}

impl VolStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            VolStatus::Append => "Append",
            VolStatus::Full => "Full",
            VolStatus::Used => "Used",
            VolStatus::Error => "Error",
            VolStatus::Purged => "Purged",
            VolStatus::Recycle => "Recycle",
            VolStatus::Archive => "Archive",
            VolStatus::Cleaning => "Cleaning",
        }
    }

    /// Statuses a volume may hold while still being a candidate for
    /// "oldest volume" reclamation.
    pub fn is_reclaimable(self) -> bool {
        matches!(
            self,
            VolStatus::Append
                | VolStatus::Full
                | VolStatus::Used
                | VolStatus::Recycle
                | VolStatus::Purged
        )
    }
}

impl fmt::Display for VolStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VolStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "append" => Ok(VolStatus::Append),
            "full" => Ok(VolStatus::Full),
            "used" => Ok(VolStatus::Used),
            "error" => Ok(VolStatus::Error),
            "purged" => Ok(VolStatus::Purged),
            "recycle" => Ok(VolStatus::Recycle),
            "archive" => Ok(VolStatus::Archive),
            "cleaning" => Ok(VolStatus::Cleaning),
            other => Err(format!("unknown volume status: '{other}'")),
        }
    }
}

fn default_true() -> bool {
    true
}

/// A named, append-only media segment tracked in the catalog.
///
/// Limits of zero mean "unlimited".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Volume {
    pub media_id: MediaId,
    pub name: String,
    pub media_type: String,
    pub pool_id: PoolId,
    pub status: VolStatus,
    /// Storage device, or autochanger group, the volume is attached to.
    #[serde(default)]
    pub storage: Option<String>,
    #[serde(default)]
    pub in_changer: bool,
    #[serde(default)]
    pub slot: i32,
    #[serde(default)]
    pub vol_bytes: u64,
    #[serde(default)]
    pub vol_jobs: u32,
    #[serde(default)]
    pub vol_files: u32,
    #[serde(default)]
    pub max_vol_bytes: u64,
    #[serde(default)]
    pub max_vol_jobs: u32,
    #[serde(default)]
    pub max_vol_files: u32,
    #[serde(default)]
    pub vol_use_duration_secs: u64,
    #[serde(default)]
    pub vol_retention_secs: u64,
    #[serde(default)]
    pub first_written: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_written: Option<DateTime<Utc>>,
    #[serde(default)]
    pub label_date: Option<DateTime<Utc>>,
    /// May this volume ever be reclaimed.
    #[serde(default = "default_true")]
    pub recycle: bool,
    /// Disabled or archived volumes are never auto-selected.
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub recycle_pool_id: Option<PoolId>,
    #[serde(default)]
    pub recycle_count: u32,
}

impl Volume {
    /// A fresh, empty `Append` volume with no limits.
    pub fn new(media_id: MediaId, name: &str, media_type: &str, pool_id: PoolId) -> Self {
        Self {
            media_id,
            name: name.to_string(),
            media_type: media_type.to_string(),
            pool_id,
            status: VolStatus::Append,
            storage: None,
            in_changer: false,
            slot: 0,
            vol_bytes: 0,
            vol_jobs: 0,
            vol_files: 0,
            max_vol_bytes: 0,
            max_vol_jobs: 0,
            max_vol_files: 0,
            vol_use_duration_secs: 0,
            vol_retention_secs: 0,
            first_written: None,
            last_written: None,
            label_date: None,
            recycle: true,
            enabled: true,
            recycle_pool_id: None,
            recycle_count: 0,
        }
    }

    /// Copy the pool's volume defaults onto this record. Status is left alone.
    pub fn apply_pool_defaults(&mut self, pool: &Pool) {
        self.pool_id = pool.pool_id;
        self.recycle = pool.recycle;
        self.max_vol_bytes = pool.max_vol_bytes;
        self.max_vol_jobs = pool.max_vol_jobs;
        self.max_vol_files = pool.max_vol_files;
        self.vol_use_duration_secs = pool.vol_use_duration_secs;
        self.vol_retention_secs = pool.vol_retention_secs;
        self.recycle_pool_id = pool.recycle_pool_id;
    }

    /// True once any size, job or file limit has been reached.
    pub fn limits_reached(&self) -> bool {
        (self.max_vol_bytes > 0 && self.vol_bytes >= self.max_vol_bytes)
            || (self.max_vol_jobs > 0 && self.vol_jobs >= self.max_vol_jobs)
            || (self.max_vol_files > 0 && self.vol_files >= self.max_vol_files)
    }

    /// Whether `VolUseDuration` has run out since the first write.
    pub fn use_duration_elapsed(&self, now: DateTime<Utc>) -> bool {
        if self.vol_use_duration_secs == 0 {
            return false;
        }
        let Some(first) = self.first_written else {
            return false;
        };
        now.signed_duration_since(first) >= seconds(self.vol_use_duration_secs)
    }

    /// Whether `VolRetention` has run out since the last write, allowing
    /// `slack_secs` of early expiry.
    pub fn retention_elapsed(&self, now: DateTime<Utc>, slack_secs: u64) -> bool {
        let Some(last) = self.last_written else {
            return true;
        };
        let Some(expires) = last.checked_add_signed(seconds(self.vol_retention_secs)) else {
            return false;
        };
        now.checked_add_signed(seconds(slack_secs))
            .is_none_or(|limit| expires <= limit)
    }
}

fn seconds(secs: u64) -> Duration {
    Duration::seconds(secs.min(i64::MAX as u64 / 1_000) as i64)
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PoolType {
    #[default]
    Backup,
    Scratch,
}

/// Allocation policy container for a class of jobs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pool {
    pub pool_id: PoolId,
    pub name: String,
    #[serde(default)]
    pub pool_type: PoolType,
    /// Maximum number of volumes (0 = unlimited).
    #[serde(default)]
    pub max_vols: u32,
    #[serde(default)]
    pub label_format: Option<String>,
    #[serde(default)]
    pub use_volume_once: bool,
    #[serde(default)]
    pub purge_oldest_volume: bool,
    #[serde(default)]
    pub recycle_oldest_volume: bool,
    #[serde(default)]
    pub recycle_current_volume: bool,
    /// Default `Recycle` flag for volumes entering the pool.
    #[serde(default = "default_true")]
    pub recycle: bool,
    #[serde(default = "default_true")]
    pub auto_prune: bool,
    #[serde(default)]
    pub max_vol_bytes: u64,
    #[serde(default)]
    pub max_vol_jobs: u32,
    #[serde(default)]
    pub max_vol_files: u32,
    #[serde(default)]
    pub vol_use_duration_secs: u64,
    #[serde(default)]
    pub vol_retention_secs: u64,
    #[serde(default)]
    pub scratch_pool_id: Option<PoolId>,
    #[serde(default)]
    pub recycle_pool_id: Option<PoolId>,
    /// Name of the catalog the pool is defined in.
    #[serde(default)]
    pub catalog: Option<String>,
}

impl Pool {
    pub fn new(pool_id: PoolId, name: &str) -> Self {
        Self {
            pool_id,
            name: name.to_string(),
            pool_type: PoolType::Backup,
            max_vols: 0,
            label_format: None,
            use_volume_once: false,
            purge_oldest_volume: false,
            recycle_oldest_volume: false,
            recycle_current_volume: false,
            recycle: true,
            auto_prune: true,
            max_vol_bytes: 0,
            max_vol_jobs: 0,
            max_vol_files: 0,
            vol_use_duration_secs: 0,
            vol_retention_secs: 0,
            scratch_pool_id: None,
            recycle_pool_id: None,
            catalog: None,
        }
    }
}

/// One (job, volume) pairing written while the job appended to the volume.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobMediaEntry {
    pub job_id: JobId,
    pub media_id: MediaId,
    pub volume_name: String,
    pub storage: String,
    pub media_type: String,
    pub first_index: i32,
    pub last_index: i32,
    #[serde(default)]
    pub start_addr: u64,
    #[serde(default)]
    pub end_addr: u64,
    #[serde(default)]
    pub slot: i32,
    #[serde(default)]
    pub in_changer: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobRecord {
    pub job_id: JobId,
    pub name: String,
    pub vol_session_id: u32,
    pub vol_session_time: u32,
    #[serde(default)]
    pub job_files: u32,
    #[serde(default)]
    pub pool_id: Option<PoolId>,
    #[serde(default)]
    pub end_time: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_parse_is_case_insensitive() {
        assert_eq!("append".parse::<VolStatus>().unwrap(), VolStatus::Append);
        assert_eq!("Purged".parse::<VolStatus>().unwrap(), VolStatus::Purged);
        assert!("Busy".parse::<VolStatus>().is_err());
        assert_eq!(VolStatus::Recycle.to_string(), "Recycle");
    }

    #[test]
    fn limits_reached_ignores_unset_limits() {
        let mut vol = Volume::new(MediaId(1), "Vol-0001", "File", PoolId(1));
        vol.vol_bytes = 10_000;
        vol.vol_jobs = 40;
        assert!(!vol.limits_reached());
        vol.max_vol_jobs = 40;
        assert!(vol.limits_reached());
    }

    #[test]
    fn use_duration_needs_first_write() {
        let now = Utc::now();
        let mut vol = Volume::new(MediaId(1), "Vol-0001", "File", PoolId(1));
        vol.vol_use_duration_secs = 3600;
        assert!(!vol.use_duration_elapsed(now));
        vol.first_written = Some(now - Duration::hours(2));
        assert!(vol.use_duration_elapsed(now));
        vol.first_written = Some(now - Duration::minutes(10));
        assert!(!vol.use_duration_elapsed(now));
    }

    #[test]
    fn retention_slack_allows_close_calls() {
        let now = Utc::now();
        let mut vol = Volume::new(MediaId(1), "Vol-0001", "File", PoolId(1));
        vol.vol_retention_secs = 86_400;
        vol.last_written = Some(now - Duration::seconds(86_400 - 30));
        assert!(!vol.retention_elapsed(now, 0));
        assert!(vol.retention_elapsed(now, 60));
    }

    #[test]
    fn pool_defaults_leave_status_alone() {
        let mut pool = Pool::new(PoolId(7), "Weekly");
        pool.max_vol_jobs = 3;
        pool.recycle = false;
        pool.recycle_pool_id = Some(PoolId(9));
        let mut vol = Volume::new(MediaId(1), "Vol-0001", "File", PoolId(1));
        vol.status = VolStatus::Recycle;
        vol.apply_pool_defaults(&pool);
        assert_eq!(vol.pool_id, PoolId(7));
        assert_eq!(vol.max_vol_jobs, 3);
        assert!(!vol.recycle);
        assert_eq!(vol.recycle_pool_id, Some(PoolId(9)));
        assert_eq!(vol.status, VolStatus::Recycle);
    }

    #[test]
    fn volume_yaml_fills_defaults() {
        let yaml = "media_id: 3\nname: Vol-0003\nmedia_type: File\npool_id: 1\nstatus: Full\n";
        let vol: Volume = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(vol.status, VolStatus::Full);
        assert!(vol.enabled);
        assert!(vol.recycle);
        assert_eq!(vol.max_vol_bytes, 0);
    }
}
