mod defaults;
mod resolve;
mod sync;
mod types;

pub use self::defaults::{parse_human_duration, parse_size};
pub use self::resolve::{
    default_config_search_paths, load_config, resolve_config_path, ConfigSource,
};
pub use self::sync::sync_pools;
pub use self::types::*;
