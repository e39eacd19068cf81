//! In-process namespace. Nodes live in an inode table with per-directory
//! child maps; file contents are kept in memory. Reads stop at the end of
//! the block that contains the requested offset, the way a DataNode serves
//! one block per request, so the stream engine's short-read handling is
//! exercised without a cluster.

use std::collections::HashMap;
use std::fmt;
use std::sync::Mutex;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};

use super::{CreateOptions, NameService};
use crate::error::{Error, Result};
use crate::path;
use crate::status::{FileKind, PathStatus, Permission};

const ROOT_INO: u64 = 1;
const OWNER: &str = "hdfs";
const GROUP: &str = "supergroup";

struct INode {
    kind: FileKind,
    name: String,
    parent: Option<u64>,
    children: HashMap<String, u64>,
    data: Vec<u8>,
    modified: DateTime<Utc>,
    accessed: DateTime<Utc>,
    permission: Permission,
    replication: u16,
    block_size: u64,
}

impl INode {
    fn dir(name: String, parent: Option<u64>) -> Self {
        let now = Utc::now();
        Self {
            kind: FileKind::Directory,
            name,
            parent,
            children: HashMap::new(),
            data: Vec::new(),
            modified: now,
            accessed: now,
            permission: Permission::DEFAULT_DIR,
            replication: 0,
            block_size: 0,
        }
    }

    fn file(name: String, parent: Option<u64>, opts: &CreateOptions) -> Self {
        let now = Utc::now();
        Self {
            kind: FileKind::File,
            name,
            parent,
            children: HashMap::new(),
            data: Vec::new(),
            modified: now,
            accessed: now,
            permission: opts.permission,
            replication: opts.replication,
            block_size: opts.block_size,
        }
    }
}

struct Namespace {
    nodes: HashMap<u64, INode>,
    next_ino: u64,
}

impl Namespace {
    fn new() -> Self {
        let mut nodes = HashMap::new();
        nodes.insert(ROOT_INO, INode::dir(String::new(), None));
        Self {
            nodes,
            next_ino: ROOT_INO + 1,
        }
    }

    fn node(&self, ino: u64) -> Result<&INode> {
        self.nodes
            .get(&ino)
            .ok_or_else(|| Error::io(format!("dangling inode {ino}")))
    }

    fn node_mut(&mut self, ino: u64) -> Result<&mut INode> {
        self.nodes
            .get_mut(&ino)
            .ok_or_else(|| Error::io(format!("dangling inode {ino}")))
    }

    fn lookup(&self, p: &str) -> Option<u64> {
        let mut cur = ROOT_INO;
        for part in p.split('/').filter(|s| !s.is_empty()) {
            cur = *self.nodes.get(&cur)?.children.get(part)?;
        }
        Some(cur)
    }

    fn resolve(&self, p: &str) -> Result<u64> {
        self.lookup(p).ok_or_else(|| Error::NotFound(p.to_string()))
    }

    fn alloc(&mut self, parent: u64, node: INode) -> Result<u64> {
        let ino = self.next_ino;
        self.next_ino += 1;
        let name = node.name.clone();
        self.nodes.insert(ino, node);
        let dir = self.node_mut(parent)?;
        dir.children.insert(name, ino);
        dir.modified = Utc::now();
        Ok(ino)
    }

    /// mkdir -p: a file at the last component is `AlreadyExists`, a file
    /// anywhere above it is `NotADirectory`.
    fn mkdirs(&mut self, p: &str) -> Result<u64> {
        let mut cur = ROOT_INO;
        let mut cur_path = String::from("/");
        let parts: Vec<&str> = p.split('/').filter(|s| !s.is_empty()).collect();
        for (i, part) in parts.iter().enumerate() {
            cur_path = path::join(&cur_path, part);
            let existing = self.node(cur)?.children.get(*part).copied();
            cur = match existing {
                Some(ino) if self.node(ino)?.kind == FileKind::Directory => ino,
                Some(_) if i + 1 == parts.len() => return Err(Error::AlreadyExists(cur_path)),
                Some(_) => return Err(Error::NotADirectory(cur_path)),
                None => self.alloc(cur, INode::dir(part.to_string(), Some(cur)))?,
            };
        }
        Ok(cur)
    }

    fn status(&self, ino: u64, p: &str) -> Result<PathStatus> {
        let node = self.node(ino)?;
        Ok(PathStatus {
            path: p.to_string(),
            name: node.name.clone(),
            kind: node.kind,
            size: node.data.len() as u64,
            modified: node.modified,
            accessed: node.accessed,
            permission: node.permission,
            replication: node.replication,
            block_size: node.block_size,
            owner: OWNER.to_string(),
            group: GROUP.to_string(),
        })
    }

    fn remove_subtree(&mut self, ino: u64) {
        if let Some(node) = self.nodes.remove(&ino) {
            for child in node.children.into_values() {
                self.remove_subtree(child);
            }
        }
    }
}

/// Namespace held entirely in process memory.
pub struct MemoryService {
    ns: Mutex<Namespace>,
}

impl fmt::Debug for MemoryService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let nodes = self.ns.lock().map(|ns| ns.nodes.len()).unwrap_or(0);
        f.debug_struct("MemoryService")
            .field("nodes", &nodes)
            .finish()
    }
}

impl Default for MemoryService {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryService {
    pub fn new() -> Self {
        Self {
            ns: Mutex::new(Namespace::new()),
        }
    }
}

#[async_trait]
impl NameService for MemoryService {
    fn scheme(&self) -> &'static str {
        "memory"
    }

    async fn probe(&self) -> Result<()> {
        Ok(())
    }

    async fn status(&self, p: &str) -> Result<PathStatus> {
        let ns = self.ns.lock().unwrap();
        let ino = ns.resolve(p)?;
        ns.status(ino, p)
    }

    async fn list(&self, p: &str) -> Result<Vec<PathStatus>> {
        let ns = self.ns.lock().unwrap();
        let node = ns.node(ns.resolve(p)?)?;
        if node.kind != FileKind::Directory {
            return Err(Error::NotADirectory(p.to_string()));
        }
        node.children
            .iter()
            .map(|(name, &ino)| ns.status(ino, &path::join(p, name)))
            .collect()
    }

    async fn mkdirs(&self, p: &str) -> Result<()> {
        self.ns.lock().unwrap().mkdirs(p).map(|_| ())
    }

    async fn rename(&self, src: &str, dst: &str) -> Result<()> {
        let (dst_dir, dst_name) = path::split_dir_file(dst)
            .ok_or_else(|| Error::InvalidArgument("cannot rename onto /".into()))?;
        if src == "/" {
            return Err(Error::InvalidArgument("cannot rename /".into()));
        }
        if path::is_within(dst, src) {
            return Err(Error::InvalidArgument(format!(
                "cannot move {src} into itself ({dst})"
            )));
        }
        let mut ns = self.ns.lock().unwrap();
        let ino = ns.resolve(src)?;
        if ns.lookup(dst).is_some() {
            return Err(Error::AlreadyExists(dst.to_string()));
        }
        let new_parent = ns.resolve(dst_dir)?;
        if ns.node(new_parent)?.kind != FileKind::Directory {
            return Err(Error::NotADirectory(dst_dir.to_string()));
        }

        let (old_parent, old_name) = {
            let node = ns.node(ino)?;
            (node.parent, node.name.clone())
        };
        if let Some(parent) = old_parent {
            let p = ns.node_mut(parent)?;
            p.children.remove(&old_name);
            p.modified = Utc::now();
        }
        {
            let node = ns.node_mut(ino)?;
            node.parent = Some(new_parent);
            node.name = dst_name.to_string();
        }
        let p = ns.node_mut(new_parent)?;
        p.children.insert(dst_name.to_string(), ino);
        p.modified = Utc::now();
        Ok(())
    }

    async fn delete(&self, p: &str, recursive: bool) -> Result<bool> {
        if p == "/" {
            return Err(Error::InvalidArgument("cannot delete /".into()));
        }
        let mut ns = self.ns.lock().unwrap();
        let Some(ino) = ns.lookup(p) else {
            return Ok(false);
        };
        let (parent, name) = {
            let node = ns.node(ino)?;
            if !recursive && !node.children.is_empty() {
                return Err(Error::DirectoryNotEmpty(p.to_string()));
            }
            (node.parent, node.name.clone())
        };
        if let Some(parent) = parent {
            let dir = ns.node_mut(parent)?;
            dir.children.remove(&name);
            dir.modified = Utc::now();
        }
        ns.remove_subtree(ino);
        Ok(true)
    }

    async fn set_times(
        &self,
        p: &str,
        atime: Option<DateTime<Utc>>,
        mtime: Option<DateTime<Utc>>,
    ) -> Result<()> {
        let mut ns = self.ns.lock().unwrap();
        let ino = ns.resolve(p)?;
        let node = ns.node_mut(ino)?;
        if let Some(t) = atime {
            node.accessed = t;
        }
        if let Some(t) = mtime {
            node.modified = t;
        }
        Ok(())
    }

    async fn create(&self, p: &str, opts: &CreateOptions) -> Result<()> {
        let (dir, name) = path::split_dir_file(p).ok_or_else(|| Error::IsADirectory(p.into()))?;
        let mut ns = self.ns.lock().unwrap();
        let parent = ns.mkdirs(dir).map_err(|e| match e {
            Error::AlreadyExists(at) => Error::NotADirectory(at),
            other => other,
        })?;
        let existing = ns.node(parent)?.children.get(name).copied();
        match existing {
            Some(ino) => {
                let node = ns.node_mut(ino)?;
                if node.kind == FileKind::Directory {
                    return Err(Error::IsADirectory(p.to_string()));
                }
                if !opts.overwrite {
                    return Err(Error::AlreadyExists(p.to_string()));
                }
                node.data.clear();
                node.modified = Utc::now();
                node.permission = opts.permission;
                node.replication = opts.replication;
                node.block_size = opts.block_size;
            }
            None => {
                ns.alloc(parent, INode::file(name.to_string(), Some(parent), opts))?;
            }
        }
        Ok(())
    }

    async fn append(&self, p: &str, data: Bytes) -> Result<()> {
        let mut ns = self.ns.lock().unwrap();
        let ino = ns.resolve(p)?;
        let node = ns.node_mut(ino)?;
        if node.kind == FileKind::Directory {
            return Err(Error::IsADirectory(p.to_string()));
        }
        node.data.extend_from_slice(&data);
        node.modified = Utc::now();
        Ok(())
    }

    async fn read(&self, p: &str, offset: u64, len: usize) -> Result<Bytes> {
        let mut ns = self.ns.lock().unwrap();
        let ino = ns.resolve(p)?;
        let node = ns.node_mut(ino)?;
        if node.kind == FileKind::Directory {
            return Err(Error::IsADirectory(p.to_string()));
        }
        node.accessed = Utc::now();
        let size = node.data.len() as u64;
        if offset >= size || len == 0 {
            return Ok(Bytes::new());
        }
        let block = node.block_size.max(1);
        let block_end = (offset / block + 1).saturating_mul(block);
        let end = offset.saturating_add(len as u64).min(block_end).min(size);
        Ok(Bytes::copy_from_slice(
            &node.data[offset as usize..end as usize],
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;

    fn opts(block_size: u64) -> CreateOptions {
        CreateOptions {
            overwrite: true,
            replication: 3,
            block_size,
            permission: Permission::DEFAULT_FILE,
        }
    }

    #[tokio::test]
    async fn test_reads_stop_at_block_boundary() {
        let svc = MemoryService::new();
        svc.create("/d/f", &opts(4)).await.unwrap();
        svc.append("/d/f", Bytes::from_static(b"0123456789")).await.unwrap();

        assert_eq!(&svc.read("/d/f", 0, 100).await.unwrap()[..], b"0123");
        assert_eq!(&svc.read("/d/f", 2, 100).await.unwrap()[..], b"23");
        assert_eq!(&svc.read("/d/f", 8, 100).await.unwrap()[..], b"89");
        assert!(svc.read("/d/f", 10, 100).await.unwrap().is_empty());
        assert!(svc.read("/d/f", 1 << 40, 1).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_mkdirs_through_file_fails() {
        let svc = MemoryService::new();
        svc.create("/a/f", &opts(16)).await.unwrap();
        let err = svc.mkdirs("/a/f").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AlreadyExists);
        let err = svc.mkdirs("/a/f/g").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotADirectory);
        let err = svc.create("/a/f/g", &opts(16)).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotADirectory);
    }

    #[tokio::test]
    async fn test_rename_moves_subtree() {
        let svc = MemoryService::new();
        svc.mkdirs("/x/y").await.unwrap();
        svc.create("/x/y/f", &opts(16)).await.unwrap();
        svc.mkdirs("/z").await.unwrap();

        svc.rename("/x/y", "/z/w").await.unwrap();
        assert!(svc.status("/x/y").await.is_err());
        assert!(svc.status("/z/w/f").await.unwrap().is_file());
        assert_eq!(svc.status("/z/w").await.unwrap().name, "w");

        let err = svc.rename("/z", "/z/w/inner").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
        let err = svc.rename("/nope", "/q").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_delete_respects_recursive_flag() {
        let svc = MemoryService::new();
        svc.create("/d/e/f", &opts(16)).await.unwrap();
        let err = svc.delete("/d", false).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DirectoryNotEmpty);
        assert!(svc.delete("/d", true).await.unwrap());
        assert!(!svc.delete("/d", true).await.unwrap());
        assert!(svc.list("/").await.unwrap().is_empty());
    }
}
