//! Jobs: lifecycle, logs, files, metrics and waits

use chrono::Utc;
use futures::TryStreamExt;
use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashSet;
use tracing::{debug, info};

use super::metrics::{LoadTask, MetricsWindow, TaskState, load_path};
use super::status::{StatusRecord, names};
use super::{Cluster, File, Resource, ResourceId, Snapshot, StorageDevice};
use crate::client::RescaleClient;
use crate::error::{RescaleError, Result};
use crate::pagination::RecordStream;
use crate::ssh::parse_connection;

/// Typed view of a job representation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobData {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// One entry of a job's user log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    #[serde(default)]
    pub message: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A job on the platform
#[derive(Debug, Clone)]
pub struct Job {
    client: RescaleClient,
    snapshot: Snapshot<JobData>,
}

impl Resource for Job {
    type Data = JobData;
    const COLLECTION: &'static str = "jobs/";

    fn from_parts(client: RescaleClient, snapshot: Snapshot<JobData>) -> Self {
        Self { client, snapshot }
    }

    fn client(&self) -> &RescaleClient {
        &self.client
    }

    fn snapshot(&self) -> &Snapshot<JobData> {
        &self.snapshot
    }

    fn snapshot_mut(&mut self) -> &mut Snapshot<JobData> {
        &mut self.snapshot
    }
}

impl From<&Job> for ResourceId {
    fn from(job: &Job) -> Self {
        job.id().clone()
    }
}

impl Job {
    pub async fn fetch(client: &RescaleClient, id: impl Into<ResourceId>) -> Result<Self> {
        super::fetch(client, &id.into()).await
    }

    /// Create a job from a definition (`POST jobs/`). The job is not submitted.
    pub async fn create<B>(client: &RescaleClient, definition: &B) -> Result<Self>
    where
        B: Serialize + ?Sized,
    {
        let job: Job = super::create(client, definition).await?;
        info!("Created job {}", job.id());
        Ok(job)
    }

    /// Jobs that are currently running
    pub fn list_running(client: &RescaleClient) -> RecordStream<Job> {
        super::list(client, "jobs/?t=1")
    }

    pub fn name(&self) -> Option<&str> {
        self.snapshot.data().name.as_deref()
    }

    pub fn data(&self) -> &JobData {
        self.snapshot.data()
    }

    pub async fn refresh(&mut self) -> Result<()> {
        super::refresh(self).await
    }

    pub async fn submit(&self) -> Result<()> {
        info!("Submitting job {}", self.id());
        self.client
            .execute::<Value>(Method::POST, &format!("{}submit/", self.path()), None)
            .await
    }

    /// Delete the job on the server, consuming the local handle
    pub async fn delete(self) -> Result<()> {
        info!("Deleting job {}", self.id());
        self.client
            .execute::<Value>(Method::DELETE, &self.path(), None)
            .await
    }

    /// Status history, newest first as served
    pub fn get_statuses(&self) -> RecordStream<StatusRecord> {
        self.client.list(&format!("{}statuses/", self.path()))
    }

    /// Most recent status, or `None` for a job with no history yet
    pub async fn get_latest_status(&self) -> Result<Option<StatusRecord>> {
        self.get_statuses().try_next().await
    }

    /// Output and input files attached to the job
    pub fn get_files(&self) -> RecordStream<File> {
        super::list(&self.client, &format!("{}files/", self.path()))
    }

    /// First job file whose name matches `name`
    pub async fn get_file(&self, name: &str) -> Result<Option<File>> {
        let query = url::form_urlencoded::Serializer::new(String::new())
            .append_pair("search", name)
            .finish();
        let mut files: RecordStream<File> =
            super::list(&self.client, &format!("{}files/?{}", self.path(), query));
        files.try_next().await
    }

    /// User-visible log entries
    pub async fn userlogs(&self) -> Result<Vec<LogEntry>> {
        let body: Value = self
            .client
            .get_json(&format!("{}logs/?limit=10000", self.path()))
            .await?;
        let entries = match body {
            Value::Array(items) => items,
            Value::Object(mut obj) => match obj.remove("results") {
                Some(Value::Array(items)) => items,
                _ => {
                    return Err(RescaleError::Protocol(
                        "log response has no 'results' list".to_string(),
                    ));
                }
            },
            other => {
                return Err(RescaleError::Protocol(format!(
                    "unexpected log response: {}",
                    other
                )));
            }
        };
        entries
            .into_iter()
            .map(|entry| serde_json::from_value(entry).map_err(RescaleError::from))
            .collect()
    }

    /// Distinct SSH targets announced in the job log
    pub async fn connection_info(&self) -> Result<HashSet<String>> {
        Ok(self
            .userlogs()
            .await?
            .iter()
            .filter_map(|entry| parse_connection(&entry.message))
            .collect())
    }

    /// Clusters the job runs on. Records may carry only an id; use
    /// [`Cluster::refresh`] to load the full representation.
    pub fn get_clusters(&self) -> RecordStream<Cluster> {
        super::list(&self.client, &format!("{}clusters/", self.path()))
    }

    /// Storage devices connected to the job
    pub fn get_storage_devices(&self) -> RecordStream<StorageDevice> {
        super::list(&self.client, &format!("{}storage-devices/", self.path()))
    }

    /// Collect server load samples over the job's lifetime.
    ///
    /// `period` is the sampling period in seconds. Each result page is an
    /// async task on the server; tasks are awaited one after another with the
    /// client's task poller.
    pub async fn get_all_metrics(&self, period: u32) -> Result<Vec<Value>> {
        let statuses: Vec<StatusRecord> = self.get_statuses().try_collect().await?;
        let window = MetricsWindow::from_statuses(&statuses, Utc::now())?;
        let offset = window.offset_hours();
        let job_path = self.path();

        let first: LoadTask = self
            .client
            .get_json(&load_path(&job_path, offset, period, None))
            .await?;
        info!(
            "Fetching {} page(s) of metrics for job {}",
            first.total_pages,
            self.id()
        );

        let mut tokens = vec![first.token];
        for page in 1..first.total_pages {
            let task: LoadTask = self
                .client
                .get_json(&load_path(&job_path, offset, period, Some(page)))
                .await?;
            tokens.push(task.token);
        }

        let poller = self.client.task_poller();
        let mut results = Vec::new();
        for token in tokens {
            let client = &self.client;
            let task = token.as_str();
            let samples = poller
                .poll_until(&format!("metrics task {}", task), move || {
                    task_result(client, task)
                })
                .await?;
            debug!("Metrics task {} returned {} sample(s)", token, samples.len());
            results.extend(samples);
        }
        Ok(results)
    }

    /// Wait until the latest status equals `target` and return that record.
    ///
    /// Only the latest status is compared, so intermediate statuses that pass
    /// between checks are never observed.
    pub async fn wait_for_status(&self, target: &str) -> Result<StatusRecord> {
        self.client
            .status_poller()
            .poll_until(&format!("job {} to be {}", self.id(), target), move || {
                self.latest_status_if(target)
            })
            .await
    }

    async fn latest_status_if(&self, target: &str) -> Result<Option<StatusRecord>> {
        Ok(self
            .get_latest_status()
            .await?
            .filter(|status| status.is(target)))
    }

    pub async fn wait_for_executing(&self) -> Result<StatusRecord> {
        self.wait_for_status(names::EXECUTING).await
    }

    pub async fn wait_for_completed(&self) -> Result<StatusRecord> {
        self.wait_for_status(names::COMPLETED).await
    }

    /// Wait until every cluster of the job reports completion.
    ///
    /// The cluster set is re-read on every check. A job without clusters
    /// counts as done.
    pub async fn wait_for_clusters_completed(&self) -> Result<Vec<Cluster>> {
        self.client
            .status_poller()
            .poll_until(&format!("clusters of job {} to stop", self.id()), move || {
                self.clusters_if_completed()
            })
            .await
    }

    async fn clusters_if_completed(&self) -> Result<Option<Vec<Cluster>>> {
        let clusters: Vec<Cluster> = self.get_clusters().try_collect().await?;
        for cluster in &clusters {
            if !cluster.is_completed().await? {
                return Ok(None);
            }
        }
        Ok(Some(clusters))
    }
}

/// Samples of a finished metrics task, or `None` while it is still running
async fn task_result(client: &RescaleClient, token: &str) -> Result<Option<Vec<Value>>> {
    let state: TaskState = client.get_json(&format!("tasks/{}/", token)).await?;
    Ok(state.ready.then(|| state.result.unwrap_or_default()))
}
