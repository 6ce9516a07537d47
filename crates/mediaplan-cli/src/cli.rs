use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "mediaplan",
    version,
    about = "Append-volume allocation and restore bootstraps for a backup director",
    after_help = "\
Configuration file lookup order:
  1. --config <path>                  (explicit flag)
  2. $MEDIAPLAN_CONFIG                (environment variable)
  3. ./mediaplan.yaml                 (project)
  4. /etc/mediaplan/mediaplan.yaml    (system)

The catalog is a YAML file named by `catalog.path` in the configuration.
Commands that change volumes write it back when they finish."
)]
pub(crate) struct Cli {
    /// Path to configuration file (overrides MEDIAPLAN_CONFIG and default search)
    #[arg(short, long)]
    pub config: Option<String>,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub(crate) enum Commands {
    /// Create or update catalog pools from the configuration
    SyncPools,

    /// List catalog volumes
    Volumes {
        /// Only volumes of this pool
        #[arg(short, long)]
        pool: Option<String>,

        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Choose volumes a backup job can append to
    Select {
        #[arg(short, long)]
        pool: String,

        /// Storage resource the job writes through
        #[arg(short, long)]
        storage: String,

        /// JobId the volumes are reserved for
        #[arg(short, long, default_value_t = 1)]
        job: u32,

        /// Number of volumes the job will span
        #[arg(short = 'n', long, default_value_t = 1)]
        count: u32,

        /// Do not pull from the scratch pool or label new volumes
        #[arg(long)]
        no_create: bool,

        /// Do not prune expired volumes
        #[arg(long)]
        no_prune: bool,

        #[arg(long)]
        json: bool,
    },

    /// Move one volume from the scratch pool into a pool
    Scratch {
        #[arg(short, long)]
        pool: String,

        #[arg(short, long)]
        storage: String,

        /// Only take volumes loaded in the storage's autochanger
        #[arg(long)]
        in_changer: bool,
    },

    /// Mark Append volumes that reached a limit as Full or Used
    Expire {
        #[arg(short, long)]
        pool: Option<String>,
    },

    /// Check whether a job may keep appending to a mounted volume
    CheckVolume {
        /// Volume name
        volume: String,

        #[arg(short, long)]
        pool: String,

        #[arg(short, long)]
        storage: String,

        #[arg(short, long, default_value_t = 1)]
        job: u32,
    },

    /// Purge volumes whose retention has expired
    Prune {
        /// Pool to prune (all pools when omitted)
        #[arg(short, long)]
        pool: Option<String>,
    },

    /// Build a restore bootstrap
    Bootstrap {
        /// Files to restore as JOBID:RANGES, e.g. 5:100-150 or 7:all
        #[arg(short = 's', long = "select", required = true)]
        selections: Vec<String>,

        /// Order in which jobs are read (default: ascending JobId)
        #[arg(long, value_delimiter = ',')]
        jobs: Vec<u32>,

        /// File-name regex applied by the storage daemon
        #[arg(long)]
        regex: Option<String>,

        /// Write the bootstrap to this file instead of stdout
        #[arg(short, long)]
        output: Option<String>,

        #[arg(long)]
        json: bool,
    },

    /// List selected file ranges volume by volume without writing a bootstrap
    Scan {
        #[arg(short = 's', long = "select", required = true)]
        selections: Vec<String>,

        #[arg(long)]
        json: bool,
    },
}
