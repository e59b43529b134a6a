//! Client handle shared by every resource
//!
//! A [`RescaleClient`] bundles the transport, the paginator settings and the
//! polling configuration. It is cheap to clone, and every resource keeps its
//! own clone, so there is no process-wide configuration.

use reqwest::Method;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tracing::debug;

use crate::config::{ClientSettings, Config, Credentials};
use crate::error::Result;
use crate::pagination::{Paginator, RecordStream};
use crate::progress::{Poller, ProgressCallback};
use crate::sleep::{SharedSleeper, default_sleeper};
use crate::transport::Transport;

/// Authenticated handle to the Rescale API
#[derive(Clone)]
pub struct RescaleClient {
    transport: Transport,
    settings: Arc<ClientSettings>,
    sleeper: SharedSleeper,
    on_progress: Option<ProgressCallback>,
}

impl std::fmt::Debug for RescaleClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RescaleClient")
            .field("transport", &self.transport)
            .field("settings", &self.settings)
            .finish()
    }
}

impl RescaleClient {
    /// Create a client from resolved credentials and settings
    pub fn new(credentials: Credentials, settings: ClientSettings) -> Result<Self> {
        let transport = Transport::new(credentials, &settings)?;
        Ok(Self::with_transport(transport, settings))
    }

    /// Create a client around an existing transport
    pub fn with_transport(transport: Transport, settings: ClientSettings) -> Self {
        Self {
            transport,
            settings: Arc::new(settings),
            sleeper: default_sleeper(),
            on_progress: None,
        }
    }

    /// Create a client for `profile` from the standard config file and the
    /// process environment
    pub fn from_profile(profile: Option<&str>) -> Result<Self> {
        let config = Config::load()?;
        Self::from_config(&config, profile)
    }

    /// Create a client for `profile` from an already loaded config
    pub fn from_config(config: &Config, profile: Option<&str>) -> Result<Self> {
        let credentials = config.resolve_credentials(profile, |var| std::env::var(var).ok())?;
        let settings = config.settings_for(profile);
        debug!("Creating Rescale client with {:?}", credentials);
        Self::new(credentials, settings)
    }

    /// Replace the sleeper used for retry delays and polling intervals
    pub fn with_sleeper(mut self, sleeper: SharedSleeper) -> Self {
        self.transport = self.transport.with_sleeper(sleeper.clone());
        self.sleeper = sleeper;
        self
    }

    /// Receive progress events from every wait issued through this client
    pub fn with_progress(mut self, on_progress: ProgressCallback) -> Self {
        self.on_progress = Some(on_progress);
        self
    }

    pub fn transport(&self) -> &Transport {
        &self.transport
    }

    pub fn settings(&self) -> &ClientSettings {
        &self.settings
    }

    /// Attempt budget for ordinary requests
    pub fn attempts(&self) -> u32 {
        self.settings.retry.max_attempts
    }

    /// Attempt budget for create requests
    pub fn create_attempts(&self) -> u32 {
        self.settings.create_attempts
    }

    pub fn paginator(&self) -> Paginator {
        Paginator::new(
            self.transport.clone(),
            self.settings.page_size,
            self.attempts(),
        )
    }

    /// Stream every record of a list endpoint
    pub fn list<T>(&self, path: &str) -> RecordStream<T>
    where
        T: DeserializeOwned + Send + 'static,
    {
        self.paginator().list(path)
    }

    /// Poller for job, cluster and storage device status changes
    pub fn status_poller(&self) -> Poller {
        Poller::for_status(&self.settings.poll)
            .with_sleeper(self.sleeper.clone())
            .with_progress(self.on_progress.clone())
    }

    /// Poller for async metrics tasks
    pub fn task_poller(&self) -> Poller {
        Poller::for_tasks(&self.settings.poll)
            .with_sleeper(self.sleeper.clone())
            .with_progress(self.on_progress.clone())
    }

    pub(crate) async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        self.transport.get_json(path, self.attempts()).await
    }

    pub(crate) async fn post_json<T, B>(&self, path: &str, body: &B, attempts: u32) -> Result<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let body = serde_json::to_value(body)?;
        self.transport
            .send_json(Method::POST, path, body, attempts)
            .await
    }

    pub(crate) async fn execute<B>(&self, method: Method, path: &str, body: Option<&B>) -> Result<()>
    where
        B: Serialize + ?Sized,
    {
        let body = body.map(serde_json::to_value).transpose()?;
        self.transport
            .execute(method, path, body, self.attempts())
            .await
    }
}
