//! Server load metrics for a job
//!
//! Metrics are produced asynchronously: the load endpoint hands out one task
//! token per result page, and each token is polled at `tasks/{token}/` until
//! the server marks it ready.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;

use super::status::{StatusRecord, names};
use crate::error::{RescaleError, Result};

/// Default sampling period in seconds
pub const DEFAULT_PERIOD: u32 = 300;

/// Time range covered by a metrics request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricsWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl MetricsWindow {
    /// Derive the window from a job's status history.
    ///
    /// The window starts at the earliest status date. It ends at the latest
    /// status date when the job has completed, and at `now` otherwise.
    pub fn from_statuses(statuses: &[StatusRecord], now: DateTime<Utc>) -> Result<Self> {
        let dates = statuses.iter().filter_map(|s| s.status_date);
        let start = dates.clone().min().ok_or_else(|| {
            RescaleError::Protocol("job has no dated status records".to_string())
        })?;

        let end = if statuses.iter().any(|s| s.is(names::COMPLETED)) {
            dates.max().unwrap_or(start)
        } else {
            now
        };

        Ok(Self { start, end })
    }

    /// Whole hours covered by the window, rounded up
    pub fn offset_hours(&self) -> i64 {
        let seconds = (self.end - self.start).num_seconds().max(0);
        (seconds + 3599) / 3600
    }
}

/// Response of `jobs/{id}/servers/load/`
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct LoadTask {
    pub token: String,
    #[serde(rename = "totalPages", default = "one")]
    pub total_pages: u32,
}

fn one() -> u32 {
    1
}

/// Response of `tasks/{token}/`
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct TaskState {
    #[serde(default)]
    pub ready: bool,
    #[serde(default)]
    pub result: Option<Vec<Value>>,
}

pub(crate) fn load_path(job_path: &str, offset: i64, period: u32, page: Option<u32>) -> String {
    let mut path = format!(
        "{}servers/load/?offset={}&period={}",
        job_path, offset, period
    );
    if let Some(page) = page {
        path.push_str(&format!("&p={}", page));
    }
    path
}
