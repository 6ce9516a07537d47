use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use mediaplan_types::{Pool, PoolType};

use super::defaults::*;
use crate::bootstrap::DeviceLookup;
use crate::error::Result;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirectorConfig {
    pub catalog: CatalogConfig,
    #[serde(default)]
    pub storages: Vec<StorageConfig>,
    #[serde(default)]
    pub pools: Vec<PoolConfig>,
}

impl DirectorConfig {
    pub fn storage(&self, name: &str) -> Option<&StorageConfig> {
        self.storages.iter().find(|s| s.name == name)
    }

    pub fn pool(&self, name: &str) -> Option<&PoolConfig> {
        self.pools.iter().find(|p| p.name == name)
    }
}

impl DeviceLookup for DirectorConfig {
    fn device_for(&self, storage: &str) -> Option<String> {
        self.storage(storage).map(|s| s.device.clone())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogConfig {
    /// YAML catalog file. Relative paths are resolved against the config file.
    pub path: PathBuf,
    #[serde(default = "default_catalog_name")]
    pub name: String,
}

/// A storage resource: one device, or one drive of an autochanger.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub name: String,
    pub device: String,
    pub media_type: String,
    /// Autochanger group shared by storages that see the same media.
    #[serde(default)]
    pub autochanger: Option<String>,
}

impl StorageConfig {
    /// Group id stamped on volumes written through this storage.
    pub fn group(&self) -> &str {
        self.autochanger.as_deref().unwrap_or(&self.name)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolConfig {
    pub name: String,
    #[serde(default)]
    pub pool_type: PoolType,
    /// Maximum volumes in the pool (0 = unlimited).
    #[serde(default)]
    pub max_volumes: u32,
    /// Prefix for automatically labelled volumes, e.g. "Vol-".
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
    #[serde(default = "default_true")]
    pub recycle: bool,
    #[serde(default = "default_true")]
    pub auto_prune: bool,
    /// e.g. "50G"
    #[serde(default)]
    pub max_volume_bytes: Option<String>,
    #[serde(default)]
    pub max_volume_jobs: u32,
    #[serde(default)]
    pub max_volume_files: u32,
    #[serde(default)]
    pub volume_use_duration: Option<String>,
    #[serde(default = "default_volume_retention")]
    pub volume_retention: String,
    #[serde(default)]
    pub scratch_pool: Option<String>,
    #[serde(default)]
    pub recycle_pool: Option<String>,
}

impl PoolConfig {
    /// Copy the policy onto a catalog pool record. Pool references are
    /// resolved separately once every pool has an id.
    pub fn apply_to(&self, pool: &mut Pool, catalog_name: &str) -> Result<()> {
        pool.name = self.name.clone();
        pool.pool_type = self.pool_type;
        pool.max_vols = self.max_volumes;
        pool.label_format = self.label_format.clone().filter(|f| !f.is_empty());
        pool.use_volume_once = self.use_volume_once;
        pool.purge_oldest_volume = self.purge_oldest_volume;
        pool.recycle_oldest_volume = self.recycle_oldest_volume;
        pool.recycle_current_volume = self.recycle_current_volume;
        pool.recycle = self.recycle;
        pool.auto_prune = self.auto_prune;
        pool.max_vol_bytes = self
            .max_volume_bytes
            .as_deref()
            .map(parse_size)
            .transpose()?
            .unwrap_or(0);
        pool.max_vol_jobs = self.max_volume_jobs;
        pool.max_vol_files = self.max_volume_files;
        pool.vol_use_duration_secs = self
            .volume_use_duration
            .as_deref()
            .map(parse_human_duration)
            .transpose()?
            .unwrap_or(0);
        pool.vol_retention_secs = parse_human_duration(&self.volume_retention)?;
        pool.catalog = Some(catalog_name.to_string());
        Ok(())
    }
}
