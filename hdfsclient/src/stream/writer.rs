//! Write side of a file handle: a write-behind buffer drained by appends.

use bytes::{Bytes, BytesMut};

use crate::conn::Session;
use crate::error::Result;

#[derive(Debug)]
pub(crate) struct StreamWriter {
    buffer_size: usize,
    pending: BytesMut,
    /// Bytes accepted since open, flushed or not.
    accepted: u64,
}

impl StreamWriter {
    pub(crate) fn new(buffer_size: usize) -> Self {
        let buffer_size = buffer_size.max(1);
        Self {
            buffer_size,
            pending: BytesMut::with_capacity(buffer_size),
            accepted: 0,
        }
    }

    pub(crate) fn accepted(&self) -> u64 {
        self.accepted
    }

    pub(crate) fn pending(&self) -> usize {
        self.pending.len()
    }

    /// Accepted bytes the transport has acknowledged.
    pub(crate) fn durable(&self) -> u64 {
        self.accepted - self.pending.len() as u64
    }

    /// Accepts all of `data` or none of it. Buffered bytes are drained first
    /// when `data` does not fit; writes of a full buffer or more go straight
    /// to the transport.
    pub(crate) async fn write(&mut self, session: &Session, path: &str, data: &[u8]) -> Result<usize> {
        if data.is_empty() {
            return Ok(0);
        }
        if self.pending.len() + data.len() > self.buffer_size {
            self.flush(session, path).await?;
        }
        if data.len() >= self.buffer_size {
            append(session, path, Bytes::copy_from_slice(data)).await?;
        } else {
            self.pending.extend_from_slice(data);
        }
        self.accepted += data.len() as u64;
        Ok(data.len())
    }

    /// Sends buffered bytes. On failure they stay buffered for a retry.
    pub(crate) async fn flush(&mut self, session: &Session, path: &str) -> Result<()> {
        if self.pending.is_empty() {
            return Ok(());
        }
        let chunk = Bytes::copy_from_slice(&self.pending);
        append(session, path, chunk).await?;
        self.pending.clear();
        Ok(())
    }
}

async fn append(session: &Session, path: &str, data: Bytes) -> Result<()> {
    let svc = session.service()?;
    session
        .timed("append", path, svc.append(path, data))
        .await
}
