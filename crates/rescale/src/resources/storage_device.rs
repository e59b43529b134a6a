//! Persistent storage devices attached to jobs

use futures::TryStreamExt;
use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use std::path::Path;
use tracing::info;

use super::status::{StatusHistory, StatusRecord, names};
use super::{File, Job, Resource, ResourceId, Snapshot};
use crate::client::RescaleClient;
use crate::error::Result;
use crate::pagination::RecordStream;

/// Request body for [`StorageDevice::create`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageDeviceDefinition {
    pub name: String,
    pub storage_size_mb: u64,
    /// Hours the device stays up
    pub walltime: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cores_per_slot: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub core_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub run_low_priority: Option<bool>,
}

impl StorageDeviceDefinition {
    /// 1000 MB for 4 hours
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            storage_size_mb: 1000,
            walltime: 4,
            cores_per_slot: None,
            core_type: None,
            run_low_priority: None,
        }
    }

    pub fn with_size_mb(mut self, size: u64) -> Self {
        self.storage_size_mb = size;
        self
    }

    pub fn with_walltime(mut self, hours: u32) -> Self {
        self.walltime = hours;
        self
    }

    pub fn with_core_type(mut self, code: impl Into<String>, cores_per_slot: u32) -> Self {
        self.core_type = Some(code.into());
        self.cores_per_slot = Some(cores_per_slot);
        self
    }

    pub fn with_low_priority(mut self, low_priority: bool) -> Self {
        self.run_low_priority = Some(low_priority);
        self
    }
}

/// Typed view of a storage device representation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageDeviceData {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(rename = "sshConnection", default)]
    pub ssh_connection: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone)]
pub struct StorageDevice {
    client: RescaleClient,
    snapshot: Snapshot<StorageDeviceData>,
}

impl Resource for StorageDevice {
    type Data = StorageDeviceData;
    const COLLECTION: &'static str = "storage-devices/";

    fn from_parts(client: RescaleClient, snapshot: Snapshot<StorageDeviceData>) -> Self {
        Self { client, snapshot }
    }

    fn client(&self) -> &RescaleClient {
        &self.client
    }

    fn snapshot(&self) -> &Snapshot<StorageDeviceData> {
        &self.snapshot
    }

    fn snapshot_mut(&mut self) -> &mut Snapshot<StorageDeviceData> {
        &mut self.snapshot
    }
}

impl StorageDevice {
    pub async fn fetch(client: &RescaleClient, id: impl Into<ResourceId>) -> Result<Self> {
        super::fetch(client, &id.into()).await
    }

    pub async fn create<B>(client: &RescaleClient, definition: &B) -> Result<Self>
    where
        B: Serialize + ?Sized,
    {
        let device: StorageDevice = super::create(client, definition).await?;
        info!("Created storage device {}", device.id());
        Ok(device)
    }

    pub fn data(&self) -> &StorageDeviceData {
        self.snapshot.data()
    }

    /// SSH target published once the device has started
    pub fn ssh_connection(&self) -> Option<&str> {
        self.snapshot.data().ssh_connection.as_deref()
    }

    pub async fn refresh(&mut self) -> Result<()> {
        super::refresh(self).await
    }

    pub async fn submit(&self) -> Result<()> {
        info!("Submitting storage device {}", self.id());
        self.client
            .execute::<Value>(Method::POST, &format!("{}submit/", self.path()), None)
            .await
    }

    pub fn get_statuses(&self) -> RecordStream<StatusRecord> {
        self.client.list(&format!("{}statuses/", self.path()))
    }

    /// Wait until any status record says `Started`, then reload the device
    /// so fields such as the SSH connection are current.
    pub async fn wait_for_started(&mut self) -> Result<()> {
        let label = format!("storage device {} to start", self.id());
        let device = &*self;
        device
            .client
            .status_poller()
            .poll_until(&label, move || device.started())
            .await?;
        self.refresh().await
    }

    async fn started(&self) -> Result<Option<()>> {
        let statuses: Vec<StatusRecord> = self.get_statuses().try_collect().await?;
        Ok(statuses.contains_status(names::STARTED).then_some(()))
    }

    /// Attach the device to `job`
    pub async fn connect_to_job(&self, job: &Job) -> Result<()> {
        info!("Connecting storage device {} to job {}", self.id(), job.id());
        let body = json!({"storage_device": {"id": self.id()}});
        self.client
            .execute(Method::POST, &format!("{}storage-devices/", job.path()), Some(&body))
            .await
    }

    /// Attach the device to `job` and copy `paths` from the device into the
    /// job's working directory
    pub async fn copy_files_to_job(&self, job: &Job, paths: &[String]) -> Result<()> {
        info!(
            "Copying {} path(s) from storage device {} to job {}",
            paths.len(),
            self.id(),
            job.id()
        );
        let body = json!({
            "storage_device": {"id": self.id()},
            "file_paths": paths,
        });
        self.client
            .execute(Method::POST, &format!("{}storage-devices/", job.path()), Some(&body))
            .await
    }

    /// Transfer an existing cloud file onto the device at `dest_path`
    pub async fn upload_cloud_file(
        &self,
        file: impl Into<ResourceId>,
        dest_path: &str,
    ) -> Result<()> {
        let file_id = file.into();
        info!(
            "Transferring file {} to {}:{}",
            file_id,
            self.id(),
            dest_path
        );
        let body = json!({"file": {"id": file_id}, "path": dest_path});
        self.client
            .execute(Method::POST, &format!("{}file-downloads/", self.path()), Some(&body))
            .await
    }

    /// Upload a local file to cloud storage, then transfer it onto the device
    pub async fn upload_local_file(
        &self,
        local_path: impl AsRef<Path>,
        dest_path: &str,
    ) -> Result<File> {
        let file = File::upload(&self.client, local_path).await?;
        self.upload_cloud_file(&file, dest_path).await?;
        Ok(file)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_definition_defaults() {
        let def = StorageDeviceDefinition::new("scratch");
        assert_eq!(
            serde_json::to_value(&def).unwrap(),
            json!({"name": "scratch", "storage_size_mb": 1000, "walltime": 4})
        );
    }

    #[test]
    fn test_definition_options() {
        let def = StorageDeviceDefinition::new("hps")
            .with_size_mb(50_000)
            .with_walltime(24)
            .with_core_type("hps-3", 18)
            .with_low_priority(false);
        let value = serde_json::to_value(&def).unwrap();
        assert_eq!(value["core_type"], "hps-3");
        assert_eq!(value["cores_per_slot"], 18);
        assert_eq!(value["run_low_priority"], false);
    }
}
