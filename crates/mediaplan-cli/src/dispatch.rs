use std::error::Error;
use std::path::Path;

use mediaplan_catalog::{Catalog, MemoryCatalog};
use mediaplan_core::config::{self, DirectorConfig, StorageConfig};
use mediaplan_types::Pool;

use crate::cli::Commands;
use crate::cmd;

/// Loaded configuration plus the catalog it points at.
pub(crate) struct Session {
    pub config: DirectorConfig,
    pub catalog: MemoryCatalog,
}

impl Session {
    pub(crate) fn open(config_path: &Path) -> Result<Self, Box<dyn Error>> {
        let config = config::load_config(config_path)?;
        let catalog = MemoryCatalog::load(&config.catalog.path)?;
        tracing::debug!(catalog = %config.catalog.path.display(), "catalog opened");
        Ok(Self { config, catalog })
    }

    /// Write the catalog back to `catalog.path`.
    pub(crate) fn save(&self) -> Result<(), Box<dyn Error>> {
        self.catalog.save(&self.config.catalog.path)?;
        Ok(())
    }

    pub(crate) fn storage(&self, name: &str) -> Result<&StorageConfig, Box<dyn Error>> {
        self.config
            .storage(name)
            .ok_or_else(|| format!("storage '{name}' is not configured").into())
    }

    pub(crate) fn pool(&self, name: &str) -> Result<Pool, Box<dyn Error>> {
        self.catalog.find_pool(name)?.ok_or_else(|| {
            format!("pool '{name}' is not in the catalog (run `mediaplan sync-pools`)").into()
        })
    }
}

pub(crate) fn dispatch_command(command: &Commands, session: &Session) -> Result<(), Box<dyn Error>> {
    match command {
        Commands::SyncPools => cmd::pools::run_sync_pools(session),
        Commands::Volumes { pool, json } => {
            cmd::pools::run_volumes(session, pool.as_deref(), *json)
        }
        Commands::Select {
            pool,
            storage,
            job,
            count,
            no_create,
            no_prune,
            json,
        } => cmd::select::run_select(
            session,
            &cmd::select::SelectArgs {
                pool,
                storage,
                job: *job,
                count: *count,
                create: !*no_create,
                prune: !*no_prune,
                json: *json,
            },
        ),
        Commands::Scratch {
            pool,
            storage,
            in_changer,
        } => cmd::select::run_scratch(session, pool, storage, *in_changer),
        Commands::Expire { pool } => cmd::maintain::run_expire(session, pool.as_deref()),
        Commands::CheckVolume {
            volume,
            pool,
            storage,
            job,
        } => cmd::select::run_check_volume(session, volume, pool, storage, *job),
        Commands::Prune { pool } => cmd::maintain::run_prune(session, pool.as_deref()),
        Commands::Bootstrap {
            selections,
            jobs,
            regex,
            output,
            json,
        } => cmd::restore::run_bootstrap(
            session,
            selections,
            jobs,
            regex.as_deref(),
            output.as_deref(),
            *json,
        ),
        Commands::Scan { selections, json } => cmd::restore::run_scan(session, selections, *json),
    }
}
