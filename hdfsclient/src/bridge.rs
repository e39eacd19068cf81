//! Copies between the remote namespace and the local filesystem.
//!
//! Transfers stream in bounded chunks through a [`FileHandle`], so memory
//! use does not depend on file size. An interrupted transfer reports how
//! many bytes made it across via [`Error::Partial`]; the partially written
//! destination is left in place.
//!
//! [`FileHandle`]: crate::FileHandle

use std::path::Path;

use tokio::fs;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tracing::info;

use crate::conn::Session;
use crate::error::{Error, Result};
use crate::stream::OpenOptions;

/// Policy for [`Session::get_with`] and [`Session::put_with`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TransferOptions {
    /// Replace an existing destination. When `false` an existing destination
    /// fails the transfer with `AlreadyExists` before any byte moves.
    pub overwrite: bool,
    /// Bytes per chunk; zero means the configured `transfer_chunk_size`.
    pub chunk_size: usize,
}

impl Default for TransferOptions {
    fn default() -> Self {
        Self {
            overwrite: true,
            chunk_size: 0,
        }
    }
}

fn local_err(e: std::io::Error, path: &Path) -> Error {
    Error::from_io(e, &path.display().to_string())
}

impl Session {
    /// Downloads `remote` to `local`, replacing `local` if it exists.
    pub async fn get(&self, remote: &str, local: impl AsRef<Path>) -> Result<u64> {
        self.get_with(remote, local, &TransferOptions::default())
            .await
    }

    /// Downloads `remote` to `local`. Returns the number of bytes copied.
    pub async fn get_with(
        &self,
        remote: &str,
        local: impl AsRef<Path>,
        opts: &TransferOptions,
    ) -> Result<u64> {
        let local = local.as_ref();
        let chunk = self.chunk_size(opts);

        let st = self.stat(remote).await?;
        if st.is_dir() {
            return Err(Error::IsADirectory(st.path));
        }
        if !opts.overwrite && fs::try_exists(local).await.map_err(|e| local_err(e, local))? {
            return Err(Error::AlreadyExists(local.display().to_string()));
        }

        let mut src = self
            .open_with(
                remote,
                "r",
                &OpenOptions {
                    buffer_size: chunk,
                    ..Default::default()
                },
            )
            .await?;
        let mut dst = fs::File::create(local)
            .await
            .map_err(|e| local_err(e, local))?;

        let mut copied = 0u64;
        loop {
            let data = match src.read(Some(chunk)).await {
                Ok(data) => data,
                Err(e) => {
                    // keep what already arrived on disk
                    dst.flush()
                        .await
                        .map_err(|e| local_err(e, local).after(copied))?;
                    return Err(e.after(copied));
                }
            };
            if data.is_empty() {
                break;
            }
            dst.write_all(&data)
                .await
                .map_err(|e| local_err(e, local).after(copied))?;
            copied += data.len() as u64;
        }
        dst.flush()
            .await
            .map_err(|e| local_err(e, local).after(copied))?;
        src.close().await?;

        info!(remote = %src.path(), local = %local.display(), bytes = copied, "get finished");
        Ok(copied)
    }

    /// Uploads `local` to `remote`, replacing `remote` if it exists.
    pub async fn put(&self, local: impl AsRef<Path>, remote: &str) -> Result<u64> {
        self.put_with(local, remote, &TransferOptions::default())
            .await
    }

    /// Uploads `local` to `remote`. Returns the number of bytes copied.
    pub async fn put_with(
        &self,
        local: impl AsRef<Path>,
        remote: &str,
        opts: &TransferOptions,
    ) -> Result<u64> {
        let local = local.as_ref();
        let chunk = self.chunk_size(opts);

        let mut src = fs::File::open(local)
            .await
            .map_err(|e| local_err(e, local))?;
        let meta = src.metadata().await.map_err(|e| local_err(e, local))?;
        if meta.is_dir() {
            return Err(Error::IsADirectory(local.display().to_string()));
        }
        if !opts.overwrite && self.exists(remote).await? {
            return Err(Error::AlreadyExists(remote.to_string()));
        }

        let mut dst = self
            .open_with(
                remote,
                "w",
                &OpenOptions {
                    buffer_size: chunk,
                    ..Default::default()
                },
            )
            .await?;

        // failures report what the transport acknowledged, not what the
        // handle buffered
        let mut buf = vec![0u8; chunk];
        let mut copied = 0u64;
        loop {
            let n = src
                .read(&mut buf)
                .await
                .map_err(|e| local_err(e, local).after(dst.durable_len()))?;
            if n == 0 {
                break;
            }
            dst.write(&buf[..n])
                .await
                .map_err(|e| e.after(dst.durable_len()))?;
            copied += n as u64;
        }
        dst.close().await.map_err(|e| e.after(dst.durable_len()))?;

        info!(local = %local.display(), remote = %dst.path(), bytes = copied, "put finished");
        Ok(copied)
    }

    fn chunk_size(&self, opts: &TransferOptions) -> usize {
        if opts.chunk_size > 0 {
            opts.chunk_size
        } else {
            self.config().transfer_chunk_size.max(1)
        }
    }
}
