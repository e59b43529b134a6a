//! Cloud files: upload, download and search

use futures::TryStreamExt;
use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tracing::{debug, info, warn};

use super::{Resource, ResourceId, Snapshot};
use crate::client::RescaleClient;
use crate::error::{RescaleError, Result};
use crate::pagination::RecordStream;
use crate::transport::{RequestBody, decode};

/// Size of each write when saving downloaded content
pub const DOWNLOAD_CHUNK_SIZE: usize = 8192;

/// Typed view of a file representation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileData {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub path: Option<String>,
    #[serde(rename = "decryptedSize", default)]
    pub decrypted_size: Option<u64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Outcome of [`File::download`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DownloadReport {
    pub bytes: u64,
    /// Number of writes to the local file, each [`DOWNLOAD_CHUNK_SIZE`]
    /// bytes except possibly the last. Network reads are sized by the HTTP
    /// layer and are not counted.
    pub chunks: u64,
}

/// A file stored on the platform
#[derive(Debug, Clone)]
pub struct File {
    client: RescaleClient,
    snapshot: Snapshot<FileData>,
    local_name: Option<String>,
}

impl Resource for File {
    type Data = FileData;
    const COLLECTION: &'static str = "files/";

    fn from_parts(client: RescaleClient, snapshot: Snapshot<FileData>) -> Self {
        Self {
            client,
            snapshot,
            local_name: None,
        }
    }

    fn client(&self) -> &RescaleClient {
        &self.client
    }

    fn snapshot(&self) -> &Snapshot<FileData> {
        &self.snapshot
    }

    fn snapshot_mut(&mut self) -> &mut Snapshot<FileData> {
        &mut self.snapshot
    }
}

impl From<&File> for ResourceId {
    fn from(file: &File) -> Self {
        file.id().clone()
    }
}

impl File {
    pub async fn fetch(client: &RescaleClient, id: impl Into<ResourceId>) -> Result<Self> {
        super::fetch(client, &id.into()).await
    }

    /// Upload a local file with a multipart `PUT files/contents/`.
    ///
    /// The local file name is kept on the returned handle in case the
    /// response does not carry one.
    pub async fn upload(client: &RescaleClient, path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| {
                RescaleError::io(
                    path,
                    std::io::Error::new(std::io::ErrorKind::InvalidInput, "path has no file name"),
                )
            })?;
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| RescaleError::io(path, e))?;

        info!("Uploading {} ({} bytes)", path.display(), bytes.len());
        let body = RequestBody::Multipart {
            field: "file".to_string(),
            file_name: file_name.clone(),
            bytes,
        };
        let response = client
            .transport()
            .request(
                Method::PUT,
                "files/contents/",
                Some(&body),
                client.create_attempts(),
            )
            .await?;
        let value: Value = decode(response).await?;

        let mut file = Self::from_snapshot(client.clone(), value)?;
        file.local_name = Some(file_name);
        Ok(file)
    }

    /// Server-side name, falling back to the name the file was uploaded from
    pub fn name(&self) -> Option<&str> {
        self.snapshot
            .data()
            .name
            .as_deref()
            .or(self.local_name.as_deref())
    }

    /// [`File::name`] reduced to its final path component, for use as a
    /// local file name.
    ///
    /// Fails with [`RescaleError::Protocol`] when the file has no name or the
    /// name has no final component (`..`, `/`).
    pub fn local_file_name(&self) -> Result<&str> {
        let name = self.name().ok_or_else(|| {
            RescaleError::Protocol(format!("file {} has no name to download to", self.id()))
        })?;
        Path::new(name)
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| {
                RescaleError::Protocol(format!(
                    "file {} has no usable local name: {:?}",
                    self.id(),
                    name
                ))
            })
    }

    pub fn data(&self) -> &FileData {
        self.snapshot.data()
    }

    pub async fn refresh(&mut self) -> Result<()> {
        super::refresh(self).await
    }

    /// Stream the file contents to `target`, or to [`File::name`] in the
    /// working directory.
    ///
    /// Content is written to `<target>.part` and renamed over `target` once
    /// complete, so an interrupted download never leaves a truncated file at
    /// the final path.
    pub async fn download(&self, target: Option<&Path>) -> Result<DownloadReport> {
        let target = match target {
            Some(path) => path.to_path_buf(),
            None => PathBuf::from(self.local_file_name()?),
        };
        let partial = partial_path(&target);

        let url = format!("{}contents/", self.path());
        let response = self
            .client
            .transport()
            .request(Method::GET, &url, None, self.client.attempts())
            .await?;

        match write_body(response, &partial).await {
            Ok(report) => {
                tokio::fs::rename(&partial, &target)
                    .await
                    .map_err(|e| RescaleError::io(&target, e))?;
                info!(
                    "Downloaded {} to {} ({} bytes)",
                    self.id(),
                    target.display(),
                    report.bytes
                );
                Ok(report)
            }
            Err(err) => {
                if let Err(cleanup) = tokio::fs::remove_file(&partial).await {
                    warn!("Could not remove {}: {}", partial.display(), cleanup);
                }
                Err(err)
            }
        }
    }

    /// Files whose name matches `name`, newest first
    pub fn search(client: &RescaleClient, name: &str) -> RecordStream<File> {
        let query = url::form_urlencoded::Serializer::new(String::new())
            .append_pair("search", name)
            .finish();
        super::list(client, &format!("{}?{}", Self::COLLECTION, query))
    }

    /// Most recent file matching `name`, fetching only the first page
    pub async fn get_newest_by_name(client: &RescaleClient, name: &str) -> Result<Option<File>> {
        Self::search(client, name).try_next().await
    }
}

fn partial_path(target: &Path) -> PathBuf {
    let mut name = target.as_os_str().to_owned();
    name.push(".part");
    PathBuf::from(name)
}

async fn write_body(mut response: reqwest::Response, partial: &Path) -> Result<DownloadReport> {
    let out = tokio::fs::File::create(partial)
        .await
        .map_err(|e| RescaleError::io(partial, e))?;
    let mut writer = ChunkWriter::new(out, DOWNLOAD_CHUNK_SIZE);

    while let Some(bytes) = response.chunk().await? {
        writer
            .push(&bytes)
            .await
            .map_err(|e| RescaleError::io(partial, e))?;
    }

    let report = writer
        .finish()
        .await
        .map_err(|e| RescaleError::io(partial, e))?;
    debug!("Wrote {} chunk(s) to {}", report.chunks, partial.display());
    Ok(report)
}

/// Re-blocks an incoming byte stream into fixed-size writes
struct ChunkWriter<W> {
    inner: W,
    chunk_size: usize,
    buffer: Vec<u8>,
    report: DownloadReport,
}

impl<W: AsyncWrite + Unpin> ChunkWriter<W> {
    fn new(inner: W, chunk_size: usize) -> Self {
        Self {
            inner,
            chunk_size,
            buffer: Vec::with_capacity(chunk_size),
            report: DownloadReport {
                bytes: 0,
                chunks: 0,
            },
        }
    }

    async fn push(&mut self, bytes: &[u8]) -> std::io::Result<()> {
        self.buffer.extend_from_slice(bytes);
        while self.buffer.len() >= self.chunk_size {
            let rest = self.buffer.split_off(self.chunk_size);
            let chunk = std::mem::replace(&mut self.buffer, rest);
            self.write(&chunk).await?;
        }
        Ok(())
    }

    async fn finish(mut self) -> std::io::Result<DownloadReport> {
        if !self.buffer.is_empty() {
            let chunk = std::mem::take(&mut self.buffer);
            self.write(&chunk).await?;
        }
        self.inner.flush().await?;
        Ok(self.report)
    }

    async fn write(&mut self, chunk: &[u8]) -> std::io::Result<()> {
        self.inner.write_all(chunk).await?;
        self.report.bytes += chunk.len() as u64;
        self.report.chunks += 1;
        Ok(())
    }
}
