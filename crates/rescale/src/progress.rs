//! Polling for asynchronous remote state changes
//!
//! Jobs, clusters, storage devices and metrics tasks change state on the
//! server long after the request that triggered the change returns. The
//! [`Poller`] repeatedly runs a check, and sleeps a fixed interval whenever
//! the check reports "not yet", until the check produces a value.
//!
//! Waiting is unbounded unless a timeout is configured. Dropping the future
//! returned by [`Poller::poll_until`] cancels the wait. Errors returned by the
//! check (for example a request whose retry budget is exhausted) end the loop
//! immediately; there is no separate poll-level retry.

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info};

use crate::config::PollConfig;
use crate::error::{RescaleError, Result};
use crate::sleep::{SharedSleeper, default_sleeper};

/// Progress events emitted during a wait
#[derive(Debug, Clone, PartialEq)]
pub enum PollEvent {
    /// The wait has begun
    Started { label: String },
    /// A check came back negative; the poller is about to sleep
    Polling {
        label: String,
        attempt: u32,
        elapsed: Duration,
    },
    /// The check produced a value
    Satisfied {
        label: String,
        attempts: u32,
        elapsed: Duration,
    },
}

/// Callback type for progress updates
///
/// The CLI uses this to report what it is waiting for.
pub type ProgressCallback = Arc<dyn Fn(PollEvent) + Send + Sync>;

/// Fixed-interval polling loop with optional timeout
#[derive(Clone)]
pub struct Poller {
    interval: Duration,
    timeout: Option<Duration>,
    sleeper: SharedSleeper,
    on_progress: Option<ProgressCallback>,
}

impl std::fmt::Debug for Poller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Poller")
            .field("interval", &self.interval)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl Poller {
    /// Unbounded poller sleeping `interval` between checks
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            timeout: None,
            sleeper: default_sleeper(),
            on_progress: None,
        }
    }

    /// Poller for status transitions, configured from `config`
    pub fn for_status(config: &PollConfig) -> Self {
        Self::new(config.status_interval()).with_timeout(config.timeout())
    }

    /// Poller for async metrics tasks, configured from `config`
    pub fn for_tasks(config: &PollConfig) -> Self {
        Self::new(config.task_interval()).with_timeout(config.timeout())
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_sleeper(mut self, sleeper: SharedSleeper) -> Self {
        self.sleeper = sleeper;
        self
    }

    pub fn with_progress(mut self, on_progress: Option<ProgressCallback>) -> Self {
        self.on_progress = on_progress;
        self
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Run `check` until it yields `Some(value)`.
    ///
    /// `check` runs immediately, then once per interval. With a timeout set
    /// the whole wait is bounded, including a check that is still in flight
    /// and the sleep between checks, and fails with
    /// [`RescaleError::PollTimeout`] once the budget is spent.
    pub async fn poll_until<T, F, Fut>(&self, label: &str, check: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<Option<T>>>,
    {
        let start = Instant::now();
        self.emit(PollEvent::Started {
            label: label.to_string(),
        });
        info!("Waiting for {}", label);

        let waiting = self.run_checks(label, start, check);
        match self.timeout {
            Some(timeout) => tokio::time::timeout(timeout, waiting)
                .await
                .unwrap_or_else(|_| Err(timed_out(label, timeout))),
            None => waiting.await,
        }
    }

    async fn run_checks<T, F, Fut>(&self, label: &str, start: Instant, mut check: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<Option<T>>>,
    {
        let mut attempt = 0;
        loop {
            attempt += 1;
            if let Some(value) = check().await? {
                let elapsed = start.elapsed();
                info!("Done waiting for {} after {} check(s)", label, attempt);
                self.emit(PollEvent::Satisfied {
                    label: label.to_string(),
                    attempts: attempt,
                    elapsed,
                });
                return Ok(value);
            }

            let elapsed = start.elapsed();
            let delay = match self.timeout {
                Some(timeout) if elapsed >= timeout => return Err(timed_out(label, timeout)),
                Some(timeout) => self.interval.min(timeout - elapsed),
                None => self.interval,
            };

            debug!(
                "Still waiting for {} (check {}, {:.0}s elapsed)",
                label,
                attempt,
                elapsed.as_secs_f64()
            );
            self.emit(PollEvent::Polling {
                label: label.to_string(),
                attempt,
                elapsed,
            });
            self.sleeper.sleep(delay).await;
        }
    }

    fn emit(&self, event: PollEvent) {
        if let Some(cb) = &self.on_progress {
            cb(event);
        }
    }
}

fn timed_out(label: &str, timeout: Duration) -> RescaleError {
    RescaleError::PollTimeout {
        label: label.to_string(),
        timeout,
    }
}
