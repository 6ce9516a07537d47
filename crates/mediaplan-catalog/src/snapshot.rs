use std::io::Write;
use std::path::Path;

use serde::{Deserialize, Serialize};

use mediaplan_types::error::{MediaError, Result};
use mediaplan_types::{JobMediaEntry, JobRecord, Pool, Volume};

/// Complete catalog contents, as persisted between CLI runs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CatalogSnapshot {
    #[serde(default)]
    pub pools: Vec<Pool>,
    #[serde(default)]
    pub volumes: Vec<Volume>,
    #[serde(default)]
    pub jobs: Vec<JobRecord>,
    #[serde(default)]
    pub job_media: Vec<JobMediaEntry>,
}

impl CatalogSnapshot {
    /// Read a YAML snapshot. A missing file yields an empty catalog.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => return Err(e.into()),
        };
        serde_yaml::from_str(&contents).map_err(|e| {
            MediaError::Catalog(format!("invalid catalog file '{}': {e}", path.display()))
        })
    }

    /// Write the snapshot atomically (temp file in the same directory, then rename).
    pub fn save(&self, path: &Path) -> Result<()> {
        let data = serde_yaml::to_string(self)
            .map_err(|e| MediaError::Catalog(format!("catalog serialize: {e}")))?;
        let dir = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        tmp.write_all(data.as_bytes())?;
        tmp.persist(path).map_err(|e| e.error)?;
        Ok(())
    }
}
