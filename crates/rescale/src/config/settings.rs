//! Tunable client behaviour
//!
//! Retry budget, retry delay, page size and polling intervals. Every value has
//! a default matching the platform's historical client, and any of them can be
//! overridden per profile in the config file:
//!
//! ```toml
//! [default]
//! apikey = "..."
//!
//! [default.client]
//! page_size = 50
//!
//! [default.client.retry]
//! max_attempts = 3
//! delay_secs = 5
//! ```

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Settings shared by every request issued through a client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientSettings {
    /// Retry configuration for ordinary requests
    #[serde(default)]
    pub retry: RetryConfig,

    /// Polling configuration for long-running waits
    #[serde(default)]
    pub poll: PollConfig,

    /// Number of records requested per page on list endpoints
    #[serde(default = "default_page_size")]
    pub page_size: u32,

    /// Attempt budget used when creating jobs, clusters and storage devices
    #[serde(default = "default_create_attempts")]
    pub create_attempts: u32,

    /// Per-request timeout in seconds; unset means no timeout
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_timeout_secs: Option<u64>,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            retry: RetryConfig::default(),
            poll: PollConfig::default(),
            page_size: default_page_size(),
            create_attempts: default_create_attempts(),
            request_timeout_secs: None,
        }
    }
}

impl ClientSettings {
    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }
}

/// Fixed-delay retry configuration.
///
/// There is intentionally no backoff or jitter: every failed attempt waits
/// exactly `delay_secs` before the next one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Total attempts per request, including the first one
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Delay between attempts in seconds
    #[serde(default = "default_delay_secs")]
    pub delay_secs: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            delay_secs: default_delay_secs(),
        }
    }
}

impl RetryConfig {
    pub fn delay(&self) -> Duration {
        Duration::from_secs(self.delay_secs)
    }
}

/// Polling configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PollConfig {
    /// Interval between status polls (jobs, clusters, storage devices)
    #[serde(default = "default_status_interval")]
    pub status_interval_secs: u64,

    /// Interval between polls of async metrics tasks
    #[serde(default = "default_task_interval")]
    pub task_interval_secs: u64,

    /// Give up after this many seconds; unset waits forever
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            status_interval_secs: default_status_interval(),
            task_interval_secs: default_task_interval(),
            timeout_secs: None,
        }
    }
}

impl PollConfig {
    pub fn status_interval(&self) -> Duration {
        Duration::from_secs(self.status_interval_secs)
    }

    pub fn task_interval(&self) -> Duration {
        Duration::from_secs(self.task_interval_secs)
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

// Default value functions for serde
fn default_page_size() -> u32 {
    100
}

fn default_create_attempts() -> u32 {
    3
}

fn default_max_attempts() -> u32 {
    1
}

fn default_delay_secs() -> u64 {
    30
}

fn default_status_interval() -> u64 {
    30
}

fn default_task_interval() -> u64 {
    10
}
