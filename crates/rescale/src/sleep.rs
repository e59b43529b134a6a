//! Pluggable delay used by retries and polling loops
//!
//! Production code sleeps on the tokio timer. Tests swap in an implementation
//! that records each requested delay and returns immediately.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

/// Something that can wait for a given duration
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// Sleeps on the tokio timer
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Shared handle to a sleeper
pub type SharedSleeper = Arc<dyn Sleeper>;

pub(crate) fn default_sleeper() -> SharedSleeper {
    Arc::new(TokioSleeper)
}
