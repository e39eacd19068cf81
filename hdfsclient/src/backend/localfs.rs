//! Local directory backend: the remote namespace is mapped under `root`.
//! This is what an empty host connects to, mirroring libhdfs' local mode.

use std::fs::{FileTimes, Metadata};
use std::io::SeekFrom;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use tokio::{
    fs,
    io::{AsyncReadExt, AsyncSeekExt, AsyncWriteExt},
};

use super::{CreateOptions, NameService};
use crate::error::{Error, Result};
use crate::path;
use crate::status::{FileKind, PathStatus, Permission};

#[derive(Debug)]
pub struct LocalFsService {
    root: PathBuf,
}

impl LocalFsService {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    fn path_for(&self, p: &str) -> PathBuf {
        self.root.join(p.trim_start_matches('/'))
    }

    fn to_status(p: &str, meta: &Metadata) -> PathStatus {
        let kind = if meta.is_dir() {
            FileKind::Directory
        } else {
            FileKind::File
        };
        let time = |t: std::io::Result<SystemTime>| t.map(DateTime::<Utc>::from).unwrap_or_default();
        let (permission, owner, group) = ownership(meta);
        PathStatus {
            path: p.to_string(),
            name: path::file_name(p).to_string(),
            kind,
            size: if meta.is_dir() { 0 } else { meta.len() },
            modified: time(meta.modified()),
            accessed: time(meta.accessed()),
            permission,
            replication: if meta.is_dir() { 0 } else { 1 },
            block_size: 0,
            owner,
            group,
        }
    }
}

#[cfg(unix)]
fn ownership(meta: &Metadata) -> (Permission, String, String) {
    use std::os::unix::fs::MetadataExt;
    (
        Permission((meta.mode() & 0o7777) as u16),
        meta.uid().to_string(),
        meta.gid().to_string(),
    )
}

#[cfg(not(unix))]
fn ownership(meta: &Metadata) -> (Permission, String, String) {
    let permission = if meta.is_dir() {
        Permission::DEFAULT_DIR
    } else {
        Permission::DEFAULT_FILE
    };
    (permission, String::new(), String::new())
}

#[async_trait]
impl NameService for LocalFsService {
    fn scheme(&self) -> &'static str {
        "file"
    }

    async fn probe(&self) -> Result<()> {
        let meta = fs::metadata(&self.root)
            .await
            .map_err(|e| Error::from_io(e, &self.root.display().to_string()))?;
        if !meta.is_dir() {
            return Err(Error::NotADirectory(self.root.display().to_string()));
        }
        Ok(())
    }

    async fn status(&self, p: &str) -> Result<PathStatus> {
        let meta = fs::metadata(self.path_for(p))
            .await
            .map_err(|e| match Error::from_io(e, p) {
                // a file in the middle of the path
                Error::NotADirectory(p) => Error::NotFound(p),
                other => other,
            })?;
        Ok(Self::to_status(p, &meta))
    }

    async fn list(&self, p: &str) -> Result<Vec<PathStatus>> {
        let mut rd = fs::read_dir(self.path_for(p))
            .await
            .map_err(|e| Error::from_io(e, p))?;
        let mut out = Vec::new();
        while let Some(entry) = rd.next_entry().await.map_err(|e| Error::from_io(e, p))? {
            let name = entry.file_name().to_string_lossy().into_owned();
            let child = path::join(p, &name);
            let meta = entry
                .metadata()
                .await
                .map_err(|e| Error::from_io(e, &child))?;
            out.push(Self::to_status(&child, &meta));
        }
        Ok(out)
    }

    async fn mkdirs(&self, p: &str) -> Result<()> {
        let target = self.path_for(p);
        match fs::create_dir_all(&target).await {
            Ok(()) => Ok(()),
            Err(e) => match fs::metadata(&target).await {
                Ok(meta) if meta.is_file() => Err(Error::AlreadyExists(p.to_string())),
                _ => Err(Error::from_io(e, p)),
            },
        }
    }

    async fn rename(&self, src: &str, dst: &str) -> Result<()> {
        let to = self.path_for(dst);
        // std::fs::rename replaces an existing target; HDFS does not.
        if fs::try_exists(&to).await.map_err(|e| Error::from_io(e, dst))? {
            return Err(Error::AlreadyExists(dst.to_string()));
        }
        fs::rename(self.path_for(src), to)
            .await
            .map_err(|e| Error::from_io(e, src))
    }

    async fn delete(&self, p: &str, recursive: bool) -> Result<bool> {
        if p == "/" {
            return Err(Error::InvalidArgument("cannot delete /".into()));
        }
        let target = self.path_for(p);
        let meta = match fs::symlink_metadata(&target).await {
            Ok(meta) => meta,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(false),
            Err(e) => return Err(Error::from_io(e, p)),
        };
        let res = if !meta.is_dir() {
            fs::remove_file(&target).await
        } else if recursive {
            fs::remove_dir_all(&target).await
        } else {
            fs::remove_dir(&target).await
        };
        res.map_err(|e| Error::from_io(e, p))?;
        Ok(true)
    }

    async fn set_times(
        &self,
        p: &str,
        atime: Option<DateTime<Utc>>,
        mtime: Option<DateTime<Utc>>,
    ) -> Result<()> {
        let target = self.path_for(p);
        let owned = p.to_string();
        tokio::task::spawn_blocking(move || {
            let file = std::fs::File::open(&target).map_err(|e| Error::from_io(e, &owned))?;
            let mut times = FileTimes::new();
            if let Some(t) = atime {
                times = times.set_accessed(t.into());
            }
            if let Some(t) = mtime {
                times = times.set_modified(t.into());
            }
            file.set_times(times).map_err(|e| Error::from_io(e, &owned))
        })
        .await
        .map_err(|e| Error::io(format!("set_times task failed: {e}")))?
    }

    async fn create(&self, p: &str, opts: &CreateOptions) -> Result<()> {
        let target = self.path_for(p);
        if let Some(dir) = target.parent() {
            fs::create_dir_all(dir).await.map_err(|e| Error::from_io(e, p))?;
        }
        if let Ok(meta) = fs::metadata(&target).await {
            if meta.is_dir() {
                return Err(Error::IsADirectory(p.to_string()));
            }
            if !opts.overwrite {
                return Err(Error::AlreadyExists(p.to_string()));
            }
        }
        let f = fs::File::create(&target)
            .await
            .map_err(|e| Error::from_io(e, p))?;
        f.sync_all().await.map_err(|e| Error::from_io(e, p))
    }

    async fn append(&self, p: &str, data: Bytes) -> Result<()> {
        let mut f = fs::OpenOptions::new()
            .append(true)
            .open(self.path_for(p))
            .await
            .map_err(|e| Error::from_io(e, p))?;
        f.write_all(&data).await.map_err(|e| Error::from_io(e, p))?;
        f.flush().await.map_err(|e| Error::from_io(e, p))
    }

    async fn read(&self, p: &str, offset: u64, len: usize) -> Result<Bytes> {
        let mut f = fs::File::open(self.path_for(p))
            .await
            .map_err(|e| Error::from_io(e, p))?;
        if f.metadata().await.map_err(|e| Error::from_io(e, p))?.is_dir() {
            return Err(Error::IsADirectory(p.to_string()));
        }
        f.seek(SeekFrom::Start(offset))
            .await
            .map_err(|e| Error::from_io(e, p))?;
        let mut buf = vec![0u8; len];
        let n = f.read(&mut buf).await.map_err(|e| Error::from_io(e, p))?;
        buf.truncate(n);
        Ok(Bytes::from(buf))
    }
}
