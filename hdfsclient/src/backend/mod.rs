//! Transports to the remote namespace service.
//!
//! Submodules:
//! - `memory`: in-process namespace, used for tests and embedding
//! - `localfs`: a directory on the local filesystem
//! - `webhdfs`: the WebHDFS REST gateway of an HDFS NameNode
//!
//! A [`NameService`] only moves bytes and metadata; the namespace and stream
//! layers above it own the caller-facing semantics (mkdir idempotence, empty
//! directory checks, buffering). Implementations must report failures through
//! [`crate::Error`] and never signal errors with sentinel values.

pub mod localfs;
pub mod memory;
pub mod webhdfs;

#[cfg(test)]
pub(crate) mod testing;

use std::fmt::Debug;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};

use crate::config::{ClientConfig, Endpoint};
use crate::error::Result;
use crate::status::{Permission, PathStatus};

pub use localfs::LocalFsService;
pub use memory::MemoryService;
pub use webhdfs::WebHdfsService;

/// Parameters of a file creation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CreateOptions {
    /// Truncate an existing file instead of failing.
    pub overwrite: bool,
    pub replication: u16,
    pub block_size: u64,
    pub permission: Permission,
}

/// Client side of a remote namespace service. All paths are normalized and
/// absolute.
#[async_trait]
pub trait NameService: Debug + Send + Sync {
    /// Short transport name used in logs.
    fn scheme(&self) -> &'static str;

    /// Verifies the service is reachable. Called once per new connection.
    async fn probe(&self) -> Result<()>;

    async fn status(&self, path: &str) -> Result<PathStatus>;

    /// Children of a directory, in no particular order.
    async fn list(&self, path: &str) -> Result<Vec<PathStatus>>;

    /// Creates `path` and its missing ancestors.
    async fn mkdirs(&self, path: &str) -> Result<()>;

    async fn rename(&self, src: &str, dst: &str) -> Result<()>;

    /// Returns `false` when nothing was deleted.
    async fn delete(&self, path: &str, recursive: bool) -> Result<bool>;

    /// `None` leaves the corresponding timestamp unchanged.
    async fn set_times(
        &self,
        path: &str,
        atime: Option<DateTime<Utc>>,
        mtime: Option<DateTime<Utc>>,
    ) -> Result<()>;

    /// Creates an empty file, creating missing parent directories.
    async fn create(&self, path: &str, opts: &CreateOptions) -> Result<()>;

    /// Appends `data` to an existing file; visible to readers on return.
    async fn append(&self, path: &str, data: Bytes) -> Result<()>;

    /// Reads at most `len` bytes at `offset`. May return fewer bytes than
    /// requested; returns an empty buffer only at or past end of file.
    async fn read(&self, path: &str, offset: u64, len: usize) -> Result<Bytes>;
}

/// Instantiates the transport serving `endpoint`.
pub fn build(endpoint: &Endpoint, config: &ClientConfig) -> Result<Arc<dyn NameService>> {
    Ok(match endpoint {
        Endpoint::WebHdfs { url } => Arc::new(WebHdfsService::new(url, config)?),
        Endpoint::Local { root } => Arc::new(LocalFsService::new(root)),
        Endpoint::Memory { .. } => Arc::new(MemoryService::new()),
    })
}
