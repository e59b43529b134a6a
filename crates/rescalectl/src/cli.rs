//! CLI structure and command definitions

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Command-line access to the Rescale HPC platform
#[derive(Parser, Debug)]
#[command(name = "rescalectl")]
#[command(version, about = "Command-line access to the Rescale HPC platform")]
#[command(long_about = "
Command-line access to the Rescale HPC platform

Credentials come from ~/.config/rescale/apiconfig, one TOML table per profile:

    [default]
    apikey = \"...\"
    apiurl = \"https://platform.rescale.com/api/v3/\"

RESCALE_API_KEY and RESCALE_API_URL override the profile values.

EXAMPLES:
    rescalectl jobs running
    rescalectl jobs wait kJbOw --status Completed
    rescalectl jobs download kJbOw --dir results/
    rescalectl files search input.zip --newest
    rescalectl storage create scratch --size-mb 5000 --submit
")]
pub struct Cli {
    /// Profile to use for this command
    #[arg(long, short, global = true, env = "RESCALE_PROFILE")]
    pub profile: Option<String>,

    /// Path to alternate configuration file
    #[arg(long, global = true, env = "RESCALE_CONFIG_FILE")]
    pub config_file: Option<PathBuf>,

    /// Give up waiting after this many seconds
    #[arg(long, global = true)]
    pub timeout: Option<u64>,

    /// Enable verbose logging
    #[arg(long, short, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Inspect and control jobs
    #[command(subcommand, visible_alias = "job")]
    Jobs(JobCommands),

    /// Upload, download and search cloud files
    #[command(subcommand, visible_alias = "file")]
    Files(FileCommands),

    /// Inspect compute clusters
    #[command(subcommand, visible_alias = "cluster")]
    Clusters(ClusterCommands),

    /// Manage persistent storage devices
    #[command(subcommand)]
    Storage(StorageCommands),

    /// List available hardware core types
    Coretypes,
}

#[derive(Subcommand, Debug)]
pub enum JobCommands {
    /// List running jobs
    Running,

    /// Show a job
    Get { id: String },

    /// Show a job's status history, newest first
    Statuses {
        id: String,
        /// Show only the latest status
        #[arg(long)]
        latest: bool,
    },

    /// Block until the job reaches a status
    Wait {
        id: String,
        /// Status to wait for
        #[arg(long, default_value = "Completed")]
        status: String,
        /// Also wait for the job's clusters to stop
        #[arg(long)]
        clusters: bool,
    },

    /// List the job's files
    Files {
        id: String,
        /// Only the first file whose name matches
        #[arg(long)]
        name: Option<String>,
    },

    /// Download every file of the job
    Download {
        id: String,
        /// Directory to download into
        #[arg(long, default_value = ".")]
        dir: PathBuf,
    },

    /// Print the job's user log
    Logs { id: String },

    /// Print SSH targets announced in the job log
    Connection { id: String },

    /// Collect server load metrics
    Metrics {
        id: String,
        /// Sampling period in seconds
        #[arg(long, default_value_t = 300)]
        period: u32,
    },

    /// Submit a created job
    Submit { id: String },

    /// Delete a job
    Delete { id: String },
}

#[derive(Subcommand, Debug)]
pub enum FileCommands {
    /// Search files by name, newest first
    Search {
        name: String,
        /// Only the newest match
        #[arg(long)]
        newest: bool,
    },

    /// Upload a local file
    Upload { path: PathBuf },

    /// Download a file
    Download {
        id: String,
        /// Target path (defaults to the file's name)
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
}

#[derive(Subcommand, Debug)]
pub enum ClusterCommands {
    /// List running clusters
    Running,

    /// Show a cluster's status
    Status {
        id: String,
        /// Show the whole history
        #[arg(long)]
        all: bool,
    },
}

#[derive(Subcommand, Debug)]
pub enum StorageCommands {
    /// Create a storage device
    Create {
        name: String,
        #[arg(long, default_value_t = 1000)]
        size_mb: u64,
        /// Hours the device stays up
        #[arg(long, default_value_t = 4)]
        walltime: u32,
        /// Submit the device after creating it
        #[arg(long)]
        submit: bool,
    },

    /// Block until a storage device has started
    Wait { id: String },

    /// Attach a storage device to a job
    Connect {
        id: String,
        #[arg(long)]
        job: String,
        /// Paths on the device to copy into the job
        #[arg(long = "path")]
        paths: Vec<String>,
    },

    /// Upload a local or cloud file onto a storage device
    Upload {
        id: String,
        /// Destination path on the device
        dest: String,
        /// Local file to upload
        #[arg(long, conflicts_with = "file_id", required_unless_present = "file_id")]
        local: Option<PathBuf>,
        /// Existing cloud file to transfer
        #[arg(long)]
        file_id: Option<String>,
    },
}
