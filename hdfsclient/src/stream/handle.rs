use std::fmt;
use std::str::FromStr;

use bytes::Bytes;
use tracing::{debug, warn};

use super::reader::StreamReader;
use super::writer::StreamWriter;
use crate::backend::CreateOptions;
use crate::conn::Session;
use crate::error::{Error, Result};
use crate::path;
use crate::status::Permission;

/// Direction of a file handle. A handle never reads and writes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OpenMode {
    Read,
    /// Create or truncate, then append sequentially.
    Write,
}

impl FromStr for OpenMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "r" => Ok(OpenMode::Read),
            "w" => Ok(OpenMode::Write),
            "a" => Err(Error::Unsupported("append mode is not supported".into())),
            other => Err(Error::InvalidArgument(format!(
                "open mode must be \"r\" or \"w\", got {other:?}"
            ))),
        }
    }
}

impl fmt::Display for OpenMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            OpenMode::Read => "r",
            OpenMode::Write => "w",
        })
    }
}

/// Optional open parameters. Zero means the session's configured default.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct OpenOptions {
    /// Read-ahead or write-behind buffer size in bytes.
    pub buffer_size: usize,
    /// Replication of a file created by a write handle.
    pub replication: u16,
    /// Block size of a file created by a write handle.
    pub block_size: u64,
}

enum Stream {
    Read(StreamReader),
    Write(StreamWriter),
}

/// An open stream over one remote file.
///
/// Read handles see the file length as of `open`. Write handles append at
/// the end of the file they created and cannot seek. After [`close`] every
/// operation fails with `ClosedHandle`.
///
/// [`close`]: FileHandle::close
pub struct FileHandle {
    session: Session,
    path: String,
    mode: OpenMode,
    offset: u64,
    /// `None` once closed.
    stream: Option<Stream>,
}

impl fmt::Debug for FileHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileHandle")
            .field("session", &self.session.id())
            .field("path", &self.path)
            .field("mode", &self.mode)
            .field("offset", &self.offset)
            .field("open", &self.is_open())
            .finish()
    }
}

impl Session {
    /// Opens `path` with mode `"r"` or `"w"`.
    pub async fn open(&self, path: &str, mode: &str) -> Result<FileHandle> {
        self.open_with(path, mode, &OpenOptions::default()).await
    }

    pub async fn open_with(&self, path: &str, mode: &str, opts: &OpenOptions) -> Result<FileHandle> {
        let mode: OpenMode = mode.parse()?;
        let p = path::normalize(path)?;
        let svc = self.service()?;
        let config = self.config();
        let buffer_size = if opts.buffer_size > 0 {
            opts.buffer_size
        } else {
            config.buffer_size
        };

        let stream = match mode {
            OpenMode::Read => {
                let st = self.timed("stat", &p, svc.status(&p)).await?;
                if st.is_dir() {
                    return Err(Error::IsADirectory(p));
                }
                Stream::Read(StreamReader::new(
                    st.size,
                    buffer_size,
                    config.transfer_chunk_size,
                ))
            }
            OpenMode::Write => {
                let create = CreateOptions {
                    overwrite: true,
                    replication: if opts.replication > 0 {
                        opts.replication
                    } else {
                        config.replication
                    },
                    block_size: if opts.block_size > 0 {
                        opts.block_size
                    } else {
                        config.block_size
                    },
                    permission: Permission::DEFAULT_FILE,
                };
                self.timed("create", &p, svc.create(&p, &create)).await?;
                Stream::Write(StreamWriter::new(buffer_size))
            }
        };

        self.acquire_handle()?;
        debug!(session = self.id(), path = %p, %mode, "file opened");
        Ok(FileHandle {
            session: self.clone(),
            path: p,
            mode,
            offset: 0,
            stream: Some(stream),
        })
    }
}

impl FileHandle {
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn mode(&self) -> OpenMode {
        self.mode
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn is_open(&self) -> bool {
        self.stream.is_some()
    }

    /// Visible length of a read handle, or bytes written so far.
    pub fn len(&self) -> Result<u64> {
        match self.stream()? {
            Stream::Read(r) => Ok(r.len()),
            Stream::Write(w) => Ok(w.accepted()),
        }
    }

    pub fn is_empty(&self) -> Result<bool> {
        self.len().map(|n| n == 0)
    }

    /// Reads up to `n` bytes at the current offset, or to end of file when
    /// `n` is `None`, and advances the offset by the bytes returned. Short
    /// only at end of file. A failed read leaves the offset untouched.
    pub async fn read(&mut self, n: Option<usize>) -> Result<Bytes> {
        let offset = self.offset;
        let data = self.read_inner(offset, n).await?;
        self.offset += data.len() as u64;
        Ok(data)
    }

    /// Positional read; the handle offset does not move.
    pub async fn pread(&mut self, offset: u64, n: Option<usize>) -> Result<Bytes> {
        self.read_inner(offset, n).await
    }

    async fn read_inner(&mut self, offset: u64, n: Option<usize>) -> Result<Bytes> {
        let Self {
            session,
            path,
            stream,
            ..
        } = self;
        let reader = match stream {
            Some(Stream::Read(r)) => r,
            Some(Stream::Write(_)) => {
                return Err(Error::Unsupported(format!("{path}: handle is write-only")));
            }
            None => return Err(Error::ClosedHandle(path.clone())),
        };
        let want = n.unwrap_or_else(|| reader.len().saturating_sub(offset) as usize);
        reader.read_at(session, path, offset, want).await
    }

    /// Writes all of `data` at the end of the file. Bytes may stay buffered
    /// until [`flush`](Self::flush) or [`close`](Self::close).
    pub async fn write(&mut self, data: &[u8]) -> Result<usize> {
        let Self {
            session,
            path,
            stream,
            offset,
            ..
        } = self;
        let writer = match stream {
            Some(Stream::Write(w)) => w,
            Some(Stream::Read(_)) => {
                return Err(Error::Unsupported(format!("{path}: handle is read-only")));
            }
            None => return Err(Error::ClosedHandle(path.clone())),
        };
        let n = writer.write(session, path, data).await?;
        *offset += n as u64;
        Ok(n)
    }

    /// Makes buffered bytes visible to readers. No-op when nothing is
    /// buffered.
    pub async fn flush(&mut self) -> Result<()> {
        let Self {
            session,
            path,
            stream,
            ..
        } = self;
        match stream {
            Some(Stream::Write(w)) => w.flush(session, path).await,
            Some(Stream::Read(_)) => Err(Error::Unsupported(format!(
                "{path}: flush on a read-only handle"
            ))),
            None => Err(Error::ClosedHandle(path.clone())),
        }
    }

    /// Moves the offset of a read handle. Offsets past the end are allowed
    /// and read as empty.
    pub fn seek(&mut self, offset: u64) -> Result<()> {
        if matches!(self.stream()?, Stream::Write(_)) {
            return Err(Error::Unsupported(format!(
                "{}: seek on a write handle",
                self.path
            )));
        }
        self.offset = offset;
        Ok(())
    }

    pub fn tell(&self) -> Result<u64> {
        self.stream()?;
        Ok(self.offset)
    }

    /// Flushes pending writes and closes the handle. If the flush fails the
    /// error is returned and the handle stays open.
    pub async fn close(&mut self) -> Result<()> {
        if self.stream.is_none() {
            return Err(Error::ClosedHandle(self.path.clone()));
        }
        if self.mode == OpenMode::Write {
            self.flush().await?;
        }
        self.stream = None;
        self.session.release_handle();
        debug!(session = self.session.id(), path = %self.path, offset = self.offset, "file closed");
        Ok(())
    }

    /// Bytes of a write handle that reached the transport. Zero for read
    /// handles and closed handles.
    pub(crate) fn durable_len(&self) -> u64 {
        match &self.stream {
            Some(Stream::Write(w)) => w.durable(),
            _ => 0,
        }
    }

    fn stream(&self) -> Result<&Stream> {
        self.stream
            .as_ref()
            .ok_or_else(|| Error::ClosedHandle(self.path.clone()))
    }
}

impl Drop for FileHandle {
    fn drop(&mut self) {
        let Some(stream) = self.stream.take() else {
            return;
        };
        if let Stream::Write(w) = &stream {
            if w.pending() > 0 {
                warn!(
                    path = %self.path,
                    bytes = w.pending(),
                    "file handle dropped without close; unflushed bytes discarded"
                );
            }
        }
        self.session.release_handle();
    }
}
