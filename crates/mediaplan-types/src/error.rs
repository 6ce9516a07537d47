use thiserror::Error;

use crate::ids::JobId;

pub type Result<T> = std::result::Result<T, MediaError>;

/// Coarse classification callers use to decide between waiting, failing the
/// job, or treating the failure as a defect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    Catalog,
    Logic,
    Config,
    Io,
}

#[derive(Debug, Error)]
pub enum MediaError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("no appendable volume available in pool '{pool}' for storage '{storage}'")]
    NoAppendableVolume { pool: String, storage: String },

    #[error("catalog error: {0}")]
    Catalog(String),

    #[error("cannot resolve JobId {job_id}: {reason}")]
    UnresolvedJob { job_id: JobId, reason: String },

    #[error("internal logic error: {0}")]
    Logic(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl MediaError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            MediaError::NotFound(_) | MediaError::NoAppendableVolume { .. } => ErrorKind::NotFound,
            MediaError::Catalog(_) | MediaError::UnresolvedJob { .. } => ErrorKind::Catalog,
            MediaError::Logic(_) => ErrorKind::Logic,
            MediaError::Config(_) => ErrorKind::Config,
            MediaError::Io(_) => ErrorKind::Io,
        }
    }

    /// True when the caller may wait for an operator or retry later.
    pub fn is_not_found(&self) -> bool {
        self.kind() == ErrorKind::NotFound
    }
}
