//! Metadata operations on a live [`Session`].
//!
//! Paths are normalized before they reach the transport. The checks that
//! give these calls uniform behavior across transports (mkdir idempotence,
//! listing a file, deleting a non-empty directory, rename targets) run here.

use chrono::{DateTime, Utc};

use crate::conn::Session;
use crate::error::{Error, Result};
use crate::path;
use crate::status::{DirectoryListing, PathStatus};

impl Session {
    /// Whether `path` exists. Only connectivity and session failures are
    /// errors.
    pub async fn exists(&self, path: &str) -> Result<bool> {
        match self.stat(path).await {
            Ok(_) => Ok(true),
            Err(Error::NotFound(_)) | Err(Error::NotADirectory(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    pub async fn stat(&self, path: &str) -> Result<PathStatus> {
        let p = path::normalize(path)?;
        let svc = self.service()?;
        self.timed("stat", &p, svc.status(&p)).await
    }

    /// `mkdir -p`. Succeeds when the directory already exists; fails with
    /// `AlreadyExists` when a file occupies `path`.
    pub async fn mkdir(&self, path: &str) -> Result<bool> {
        let p = path::normalize(path)?;
        let svc = self.service()?;
        match self.timed("stat", &p, svc.status(&p)).await {
            Ok(st) if st.is_dir() => return Ok(true),
            Ok(_) => return Err(Error::AlreadyExists(p)),
            Err(Error::NotFound(_)) => {}
            Err(e) => return Err(e),
        }
        self.timed("mkdirs", &p, svc.mkdirs(&p)).await?;
        Ok(true)
    }

    /// Children of a directory, sorted by name.
    pub async fn listdir(&self, path: &str) -> Result<DirectoryListing> {
        let p = path::normalize(path)?;
        let svc = self.service()?;
        let st = self.timed("stat", &p, svc.status(&p)).await?;
        if !st.is_dir() {
            return Err(Error::NotADirectory(p));
        }
        let mut entries = self.timed("list", &p, svc.list(&p)).await?;
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }

    /// Moves `src` to `dst`. The destination must not exist and its parent
    /// must be an existing directory.
    pub async fn rename(&self, src: &str, dst: &str) -> Result<bool> {
        let src = path::normalize(src)?;
        let dst = path::normalize(dst)?;
        let svc = self.service()?;

        self.timed("stat", &src, svc.status(&src)).await?;
        if src == dst {
            return Ok(true);
        }
        if src == "/" || path::is_within(&dst, &src) {
            return Err(Error::InvalidArgument(format!(
                "cannot move {src} into itself ({dst})"
            )));
        }
        match self.timed("stat", &dst, svc.status(&dst)).await {
            Ok(_) => return Err(Error::AlreadyExists(dst)),
            Err(Error::NotFound(_)) => {}
            Err(e) => return Err(e),
        }
        if let Some((parent, _)) = path::split_dir_file(&dst) {
            let st = self.timed("stat", parent, svc.status(parent)).await?;
            if !st.is_dir() {
                return Err(Error::NotADirectory(parent.to_string()));
            }
        }
        self.timed("rename", &src, svc.rename(&src, &dst)).await?;
        Ok(true)
    }

    /// Removes `path`. Returns `false` when there was nothing to delete.
    /// A non-empty directory needs `recursive`.
    pub async fn delete(&self, path: &str, recursive: bool) -> Result<bool> {
        let p = path::normalize(path)?;
        if p == "/" {
            return Err(Error::InvalidArgument("refusing to delete /".into()));
        }
        let svc = self.service()?;
        let st = match self.timed("stat", &p, svc.status(&p)).await {
            Ok(st) => st,
            Err(Error::NotFound(_)) => return Ok(false),
            Err(e) => return Err(e),
        };
        if st.is_dir() && !recursive {
            let children = self.timed("list", &p, svc.list(&p)).await?;
            if !children.is_empty() {
                return Err(Error::DirectoryNotEmpty(p));
            }
        }
        self.timed("delete", &p, svc.delete(&p, recursive)).await
    }

    /// Sets access and modification times; `None` leaves a time unchanged.
    pub async fn utime(
        &self,
        path: &str,
        atime: Option<DateTime<Utc>>,
        mtime: Option<DateTime<Utc>>,
    ) -> Result<()> {
        let p = path::normalize(path)?;
        let svc = self.service()?;
        self.timed("set_times", &p, svc.set_times(&p, atime, mtime))
            .await
    }
}

#[cfg(test)]
mod tests {
    use crate::config::ClientConfig;
    use crate::{ConnectionManager, ErrorKind, Session};

    async fn session() -> (ConnectionManager, Session) {
        let mgr = ConnectionManager::new(ClientConfig::default());
        let s = mgr.connect("memory://ns", 0).await.unwrap();
        (mgr, s)
    }

    async fn touch(s: &Session, p: &str, data: &[u8]) {
        let mut fh = s.open(p, "w").await.unwrap();
        fh.write(data).await.unwrap();
        fh.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_exists_and_stat_on_missing() {
        let (_m, s) = session().await;
        assert!(!s.exists("/nope").await.unwrap());
        assert_eq!(
            s.stat("/nope").await.unwrap_err().kind(),
            ErrorKind::NotFound
        );
        touch(&s, "/f", b"x").await;
        // a path below a file does not exist either
        assert!(!s.exists("/f/below").await.unwrap());
        assert!(s.exists("/f").await.unwrap());
    }

    #[tokio::test]
    async fn test_mkdir_idempotent_and_file_conflict() {
        let (_m, s) = session().await;
        assert!(s.mkdir("/a/b/c").await.unwrap());
        assert!(s.mkdir("/a/b/c").await.unwrap());
        assert!(s.mkdir("/a//b/./c/").await.unwrap());
        assert!(s.stat("/a/b").await.unwrap().is_dir());

        touch(&s, "/a/file", b"").await;
        assert_eq!(
            s.mkdir("/a/file").await.unwrap_err().kind(),
            ErrorKind::AlreadyExists
        );
        assert_eq!(
            s.mkdir("relative").await.unwrap_err().kind(),
            ErrorKind::InvalidArgument
        );
    }

    #[tokio::test]
    async fn test_listdir() {
        let (_m, s) = session().await;
        s.mkdir("/d/sub").await.unwrap();
        touch(&s, "/d/b.txt", b"12").await;
        touch(&s, "/d/a.txt", b"1").await;

        let names: Vec<_> = s
            .listdir("/d")
            .await
            .unwrap()
            .into_iter()
            .map(|st| (st.name, st.size))
            .collect();
        assert_eq!(
            names,
            vec![
                ("a.txt".to_string(), 1),
                ("b.txt".to_string(), 2),
                ("sub".to_string(), 0)
            ]
        );
        assert_eq!(
            s.listdir("/d/a.txt").await.unwrap_err().kind(),
            ErrorKind::NotADirectory
        );
        assert_eq!(
            s.listdir("/missing").await.unwrap_err().kind(),
            ErrorKind::NotFound
        );
    }

    #[tokio::test]
    async fn test_rename_rules() {
        let (_m, s) = session().await;
        touch(&s, "/src", b"data").await;
        touch(&s, "/taken", b"").await;
        s.mkdir("/dir").await.unwrap();

        assert!(s.rename("/src", "/dir/moved").await.unwrap());
        assert!(!s.exists("/src").await.unwrap());
        assert_eq!(s.stat("/dir/moved").await.unwrap().size, 4);

        let kind = |r: crate::Result<bool>| r.unwrap_err().kind();
        assert_eq!(kind(s.rename("/gone", "/x").await), ErrorKind::NotFound);
        assert_eq!(
            kind(s.rename("/dir/moved", "/taken").await),
            ErrorKind::AlreadyExists
        );
        assert_eq!(
            kind(s.rename("/dir/moved", "/no/such/dir").await),
            ErrorKind::NotFound
        );
        assert_eq!(
            kind(s.rename("/dir", "/dir/inner").await),
            ErrorKind::InvalidArgument
        );
        assert_eq!(
            kind(s.rename("/dir/moved", "/taken/x").await),
            ErrorKind::NotADirectory
        );
    }

    #[tokio::test]
    async fn test_delete_rules() {
        let (_m, s) = session().await;
        touch(&s, "/d/f", b"x").await;
        assert_eq!(
            s.delete("/d", false).await.unwrap_err().kind(),
            ErrorKind::DirectoryNotEmpty
        );
        assert!(s.delete("/d", true).await.unwrap());
        assert!(!s.exists("/d").await.unwrap());
        assert!(!s.delete("/d", true).await.unwrap());

        s.mkdir("/empty").await.unwrap();
        assert!(s.delete("/empty", false).await.unwrap());
        assert_eq!(
            s.delete("/", true).await.unwrap_err().kind(),
            ErrorKind::InvalidArgument
        );
    }

    #[tokio::test]
    async fn test_utime() {
        let (_m, s) = session().await;
        touch(&s, "/t", b"").await;
        let at = chrono::DateTime::from_timestamp(1_600_000_000, 0).unwrap();
        let mt = chrono::DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        s.utime("/t", Some(at), Some(mt)).await.unwrap();
        let st = s.stat("/t").await.unwrap();
        assert_eq!(st.accessed, at);
        assert_eq!(st.modified, mt);

        s.utime("/t", None, Some(at)).await.unwrap();
        let st = s.stat("/t").await.unwrap();
        assert_eq!(st.accessed, at);
        assert_eq!(st.modified, at);

        assert_eq!(
            s.utime("/none", None, None).await.unwrap_err().kind(),
            ErrorKind::NotFound
        );
    }
}
