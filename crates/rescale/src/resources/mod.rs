//! Typed handles for Rescale platform resources
//!
//! Every resource keeps a clone of the [`RescaleClient`] that produced it and
//! a [`Snapshot`] of the last server representation it saw. Snapshots are
//! replaced wholesale on [`Resource::populate`]; fields missing from a newer
//! representation do not survive from an older one.

pub mod cluster;
pub mod core_types;
pub mod file;
pub mod id;
pub mod job;
pub mod metrics;
pub mod status;
pub mod storage_device;

pub use cluster::Cluster;
pub use core_types::CoreType;
pub use file::{DOWNLOAD_CHUNK_SIZE, DownloadReport, File};
pub use id::ResourceId;
pub use job::{Job, LogEntry};
pub use status::{StatusHistory, StatusRecord};
pub use storage_device::{StorageDevice, StorageDeviceDefinition};

use futures::StreamExt;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::client::RescaleClient;
use crate::error::{RescaleError, Result};
use crate::pagination::RecordStream;

/// Last known server representation of a resource
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot<D> {
    id: ResourceId,
    data: D,
    raw: Value,
}

impl<D: DeserializeOwned> Snapshot<D> {
    /// Decode a representation. The `id` field is mandatory.
    pub fn from_value(raw: Value) -> Result<Self> {
        let id = match raw.get("id") {
            Some(id) => ResourceId::deserialize(id)?,
            None => {
                return Err(RescaleError::Protocol(format!(
                    "resource representation has no 'id': {}",
                    raw
                )));
            }
        };
        let data = D::deserialize(&raw)?;
        Ok(Self { id, data, raw })
    }
}

impl<D> Snapshot<D> {
    pub fn id(&self) -> &ResourceId {
        &self.id
    }

    pub fn data(&self) -> &D {
        &self.data
    }

    /// The representation exactly as the server sent it
    pub fn raw(&self) -> &Value {
        &self.raw
    }
}

/// Shared contract of every remote resource
pub trait Resource: Sized + Send + 'static {
    /// Typed view of the representation
    type Data: DeserializeOwned + Send;

    /// Collection path relative to the API base, with trailing slash
    const COLLECTION: &'static str;

    fn from_parts(client: RescaleClient, snapshot: Snapshot<Self::Data>) -> Self;

    fn client(&self) -> &RescaleClient;

    fn snapshot(&self) -> &Snapshot<Self::Data>;

    fn snapshot_mut(&mut self) -> &mut Snapshot<Self::Data>;

    fn id(&self) -> &ResourceId {
        self.snapshot().id()
    }

    fn raw(&self) -> &Value {
        self.snapshot().raw()
    }

    /// Path of this resource relative to the API base
    fn path(&self) -> String {
        format!("{}{}/", Self::COLLECTION, self.id())
    }

    /// Replace the snapshot with `value`
    fn populate(&mut self, value: Value) -> Result<()> {
        *self.snapshot_mut() = Snapshot::from_value(value)?;
        Ok(())
    }

    /// Wrap a representation obtained elsewhere, without a request
    fn from_snapshot(client: RescaleClient, value: Value) -> Result<Self> {
        Ok(Self::from_parts(client, Snapshot::from_value(value)?))
    }
}

pub(crate) async fn fetch<R: Resource>(client: &RescaleClient, id: &ResourceId) -> Result<R> {
    let value: Value = client
        .get_json(&format!("{}{}/", R::COLLECTION, id))
        .await?;
    R::from_snapshot(client.clone(), value)
}

pub(crate) async fn create<R, B>(client: &RescaleClient, definition: &B) -> Result<R>
where
    R: Resource,
    B: Serialize + ?Sized,
{
    let value: Value = client
        .post_json(R::COLLECTION, definition, client.create_attempts())
        .await?;
    R::from_snapshot(client.clone(), value)
}

pub(crate) async fn refresh<R: Resource>(resource: &mut R) -> Result<()> {
    let value: Value = resource.client().get_json(&resource.path()).await?;
    resource.populate(value)
}

/// Stream a list endpoint as resources bound to `client`
pub(crate) fn list<R: Resource>(client: &RescaleClient, path: &str) -> RecordStream<R> {
    let owner = client.clone();
    client
        .list::<Value>(path)
        .map(move |record| record.and_then(|value| R::from_snapshot(owner.clone(), value)))
        .boxed()
}
