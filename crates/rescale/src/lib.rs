//! # rescale
//!
//! Async client for the Rescale HPC platform REST API.
//!
//! The crate is organised in layers:
//!
//! - [`config`] resolves an API key and base URL from a profile file and the
//!   `RESCALE_API_KEY` / `RESCALE_API_URL` environment variables
//! - [`transport`] issues authenticated requests with bounded, fixed-delay retry
//! - [`pagination`] walks cursor-paginated list endpoints as a lazy stream
//! - [`resources`] wraps files, jobs, clusters and storage devices
//! - [`progress`] polls the server until an asynchronous change is observed
//!
//! Every resource carries the [`RescaleClient`] it was created with; there is
//! no global configuration.
//!
//! ```no_run
//! use futures::TryStreamExt;
//! use rescale::{Job, RescaleClient};
//!
//! # async fn run() -> rescale::Result<()> {
//! let client = RescaleClient::from_profile(None)?;
//! let job = Job::fetch(&client, "kJbOw").await?;
//! job.wait_for_completed().await?;
//!
//! let mut files = job.get_files();
//! while let Some(file) = files.try_next().await? {
//!     file.download(None).await?;
//! }
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod pagination;
pub mod progress;
pub mod resources;
pub mod sleep;
pub mod ssh;
pub mod transport;

pub use client::RescaleClient;
pub use config::{ClientSettings, Config, ConfigError, Credentials, PollConfig, RetryConfig};
pub use error::{RescaleError, Result};
pub use pagination::{Paginator, RecordStream};
pub use progress::{PollEvent, Poller, ProgressCallback};
pub use resources::{
    Cluster, CoreType, DownloadReport, File, Job, LogEntry, Resource, ResourceId, StatusHistory,
    StatusRecord, StorageDevice, StorageDeviceDefinition,
};
pub use sleep::{SharedSleeper, Sleeper, TokioSleeper};
pub use transport::Transport;
