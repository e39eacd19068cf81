//! Fault-injecting transport shared by unit tests.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};

use super::{CreateOptions, MemoryService, NameService};
use crate::error::{Error, Result};
use crate::status::PathStatus;

/// Memory namespace that counts transport reads and fails appends and reads
/// on demand: always while `fail` is set, or once a per-operation budget of
/// successful calls runs out.
#[derive(Debug)]
pub(crate) struct Flaky {
    inner: MemoryService,
    pub(crate) fail: AtomicBool,
    pub(crate) reads: AtomicUsize,
    appends_left: AtomicUsize,
    reads_left: AtomicUsize,
}

impl Flaky {
    pub(crate) fn new() -> Self {
        Self {
            inner: MemoryService::new(),
            fail: AtomicBool::new(false),
            reads: AtomicUsize::new(0),
            appends_left: AtomicUsize::new(usize::MAX),
            reads_left: AtomicUsize::new(usize::MAX),
        }
    }

    /// Lets `n` more appends through, then fails every later one.
    pub(crate) fn fail_appends_after(&self, n: usize) {
        self.appends_left.store(n, Ordering::SeqCst);
    }

    /// Lets `n` more reads through, then fails every later one.
    pub(crate) fn fail_reads_after(&self, n: usize) {
        self.reads_left.store(n, Ordering::SeqCst);
    }

    fn check(&self, budget: &AtomicUsize) -> Result<()> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(Error::io("injected failure"));
        }
        budget
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
            .map(|_| ())
            .map_err(|_| Error::io("injected failure"))
    }
}

#[async_trait]
impl NameService for Flaky {
    fn scheme(&self) -> &'static str {
        "flaky"
    }
    async fn probe(&self) -> Result<()> {
        Ok(())
    }
    async fn status(&self, path: &str) -> Result<PathStatus> {
        self.inner.status(path).await
    }
    async fn list(&self, path: &str) -> Result<Vec<PathStatus>> {
        self.inner.list(path).await
    }
    async fn mkdirs(&self, path: &str) -> Result<()> {
        self.inner.mkdirs(path).await
    }
    async fn rename(&self, src: &str, dst: &str) -> Result<()> {
        self.inner.rename(src, dst).await
    }
    async fn delete(&self, path: &str, recursive: bool) -> Result<bool> {
        self.inner.delete(path, recursive).await
    }
    async fn set_times(
        &self,
        path: &str,
        atime: Option<DateTime<Utc>>,
        mtime: Option<DateTime<Utc>>,
    ) -> Result<()> {
        self.inner.set_times(path, atime, mtime).await
    }
    async fn create(&self, path: &str, opts: &CreateOptions) -> Result<()> {
        self.inner.create(path, opts).await
    }
    async fn append(&self, path: &str, data: Bytes) -> Result<()> {
        self.check(&self.appends_left)?;
        self.inner.append(path, data).await
    }
    async fn read(&self, path: &str, offset: u64, len: usize) -> Result<Bytes> {
        self.check(&self.reads_left)?;
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.inner.read(path, offset, len).await
    }
}
