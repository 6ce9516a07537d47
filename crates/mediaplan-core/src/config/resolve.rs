use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};

use tracing::debug;

use super::defaults::{parse_human_duration, parse_size};
use super::types::DirectorConfig;
use crate::error::{MediaError, Result};

/// Where the active config file came from.
#[derive(Debug, Clone)]
pub enum ConfigSource {
    /// Explicitly passed via `--config`.
    CliArg(PathBuf),
    /// Set via the `MEDIAPLAN_CONFIG` env var.
    EnvVar(PathBuf),
    /// Found by searching standard locations.
    SearchOrder { path: PathBuf, level: &'static str },
}

impl ConfigSource {
    pub fn path(&self) -> &Path {
        match self {
            ConfigSource::CliArg(p) => p,
            ConfigSource::EnvVar(p) => p,
            ConfigSource::SearchOrder { path, .. } => path,
        }
    }
}

impl fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigSource::CliArg(p) => write!(f, "{} (--config)", p.display()),
            ConfigSource::EnvVar(p) => write!(f, "{} (MEDIAPLAN_CONFIG)", p.display()),
            ConfigSource::SearchOrder { path, level } => {
                write!(f, "{} ({})", path.display(), level)
            }
        }
    }
}

/// Returns search locations in priority order.
pub fn default_config_search_paths() -> Vec<(PathBuf, &'static str)> {
    vec![
        (PathBuf::from("mediaplan.yaml"), "project"),
        (PathBuf::from("/etc/mediaplan/mediaplan.yaml"), "system"),
    ]
}

/// Resolve which config file to use.
///
/// Priority: CLI arg > `MEDIAPLAN_CONFIG` env var > first existing file from search paths.
pub fn resolve_config_path(cli_config: Option<&str>) -> Option<ConfigSource> {
    if let Some(path) = cli_config {
        return Some(ConfigSource::CliArg(PathBuf::from(path)));
    }

    if let Ok(val) = std::env::var("MEDIAPLAN_CONFIG") {
        if !val.is_empty() {
            return Some(ConfigSource::EnvVar(PathBuf::from(val)));
        }
    }

    default_config_search_paths()
        .into_iter()
        .find(|(path, _)| path.exists())
        .map(|(path, level)| ConfigSource::SearchOrder { path, level })
}

/// Load, validate and normalise a config file.
pub fn load_config(path: &Path) -> Result<DirectorConfig> {
    let contents = std::fs::read_to_string(path)
        .map_err(|e| MediaError::Config(format!("cannot read '{}': {e}", path.display())))?;
    let mut config: DirectorConfig = serde_yaml::from_str(&contents)
        .map_err(|e| MediaError::Config(format!("invalid config '{}': {e}", path.display())))?;

    validate(&config)?;

    if config.catalog.path.is_relative() {
        if let Some(dir) = path.parent() {
            config.catalog.path = dir.join(&config.catalog.path);
        }
    }
    debug!(catalog = %config.catalog.path.display(), "config loaded");
    Ok(config)
}

pub(super) fn validate(config: &DirectorConfig) -> Result<()> {
    if config.storages.is_empty() {
        return Err(MediaError::Config("'storages:' must not be empty".into()));
    }
    if config.pools.is_empty() {
        return Err(MediaError::Config("'pools:' must not be empty".into()));
    }

    let mut seen = HashSet::new();
    for storage in &config.storages {
        if !seen.insert(storage.name.as_str()) {
            return Err(MediaError::Config(format!(
                "duplicate storage name: '{}'",
                storage.name
            )));
        }
        if storage.media_type.is_empty() {
            return Err(MediaError::Config(format!(
                "storage '{}' has an empty media_type",
                storage.name
            )));
        }
    }

    let pool_names: HashSet<&str> = config.pools.iter().map(|p| p.name.as_str()).collect();
    if pool_names.len() != config.pools.len() {
        return Err(MediaError::Config("duplicate pool name".into()));
    }

    for pool in &config.pools {
        let refs = [
            ("scratch_pool", pool.scratch_pool.as_deref()),
            ("recycle_pool", pool.recycle_pool.as_deref()),
        ];
        for (field, target) in refs {
            if let Some(target) = target {
                if !pool_names.contains(target) {
                    return Err(MediaError::Config(format!(
                        "pool '{}': {field} '{target}' is not a configured pool",
                        pool.name
                    )));
                }
            }
        }
        let context = |e: MediaError| MediaError::Config(format!("pool '{}': {e}", pool.name));
        if let Some(size) = &pool.max_volume_bytes {
            parse_size(size).map_err(context)?;
        }
        if let Some(d) = &pool.volume_use_duration {
            parse_human_duration(d).map_err(context)?;
        }
        parse_human_duration(&pool.volume_retention).map_err(context)?;
    }
    Ok(())
}
