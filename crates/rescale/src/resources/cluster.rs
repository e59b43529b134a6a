use futures::TryStreamExt;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::status::{StatusRecord, names};
use super::{Resource, ResourceId, Snapshot};
use crate::client::RescaleClient;
use crate::error::Result;
use crate::pagination::RecordStream;

/// Typed view of a cluster representation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterData {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A compute cluster
#[derive(Debug, Clone)]
pub struct Cluster {
    client: RescaleClient,
    snapshot: Snapshot<ClusterData>,
}

impl Resource for Cluster {
    type Data = ClusterData;
    const COLLECTION: &'static str = "clusters/";

    fn from_parts(client: RescaleClient, snapshot: Snapshot<ClusterData>) -> Self {
        Self { client, snapshot }
    }

    fn client(&self) -> &RescaleClient {
        &self.client
    }

    fn snapshot(&self) -> &Snapshot<ClusterData> {
        &self.snapshot
    }

    fn snapshot_mut(&mut self) -> &mut Snapshot<ClusterData> {
        &mut self.snapshot
    }
}

impl Cluster {
    pub async fn fetch(client: &RescaleClient, id: impl Into<ResourceId>) -> Result<Self> {
        super::fetch(client, &id.into()).await
    }

    pub async fn create<B>(client: &RescaleClient, definition: &B) -> Result<Self>
    where
        B: Serialize + ?Sized,
    {
        super::create(client, definition).await
    }

    pub fn list_running(client: &RescaleClient) -> RecordStream<Cluster> {
        super::list(client, Self::COLLECTION)
    }

    pub fn data(&self) -> &ClusterData {
        self.snapshot.data()
    }

    pub async fn refresh(&mut self) -> Result<()> {
        super::refresh(self).await
    }

    pub fn get_statuses(&self) -> RecordStream<StatusRecord> {
        self.client.list(&format!("{}statuses/", self.path()))
    }

    pub async fn get_latest_status(&self) -> Result<Option<StatusRecord>> {
        self.get_statuses().try_next().await
    }

    /// True once any status record says `Stopped`. A cluster with no
    /// history is not completed.
    pub async fn is_completed(&self) -> Result<bool> {
        let mut statuses = self.get_statuses();
        while let Some(status) = statuses.try_next().await? {
            if status.is(names::STOPPED) {
                return Ok(true);
            }
        }
        Ok(false)
    }
}
