pub mod error;
pub mod ids;
pub mod media;

pub use ids::{JobId, MediaId, PoolId};
pub use media::{JobMediaEntry, JobRecord, Pool, PoolType, VolStatus, Volume};
