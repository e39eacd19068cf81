//! Metadata snapshots returned by `stat` and `listdir`.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum FileKind {
    File,
    Directory,
}

/// POSIX-style permission bits (`0o755` and friends).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Permission(pub u16);

impl Permission {
    pub const DEFAULT_FILE: Permission = Permission(0o644);
    pub const DEFAULT_DIR: Permission = Permission(0o755);

    /// Parses the octal form used on the wire, e.g. `"755"`.
    pub fn from_octal(s: &str) -> Result<Self> {
        u16::from_str_radix(s, 8)
            .ok()
            .filter(|bits| *bits <= 0o7777)
            .map(Permission)
            .ok_or_else(|| Error::InvalidArgument(format!("bad permission: {s:?}")))
    }

    pub fn bits(self) -> u16 {
        self.0
    }
}

impl fmt::Display for Permission {
    /// Renders `rwxr-xr-x`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const FLAGS: [(u16, char); 9] = [
            (0o400, 'r'),
            (0o200, 'w'),
            (0o100, 'x'),
            (0o040, 'r'),
            (0o020, 'w'),
            (0o010, 'x'),
            (0o004, 'r'),
            (0o002, 'w'),
            (0o001, 'x'),
        ];
        for (bit, c) in FLAGS {
            let c = if self.0 & bit != 0 { c } else { '-' };
            write!(f, "{c}")?;
        }
        Ok(())
    }
}

/// Point-in-time metadata of one path. Never updated after creation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathStatus {
    /// Absolute remote path.
    pub path: String,
    /// Last path component, empty for `/`.
    pub name: String,
    pub kind: FileKind,
    /// Length in bytes; 0 for directories.
    pub size: u64,
    pub modified: DateTime<Utc>,
    pub accessed: DateTime<Utc>,
    pub permission: Permission,
    /// Replication factor; 0 for directories.
    pub replication: u16,
    pub block_size: u64,
    pub owner: String,
    pub group: String,
}

impl PathStatus {
    pub fn is_dir(&self) -> bool {
        self.kind == FileKind::Directory
    }

    pub fn is_file(&self) -> bool {
        self.kind == FileKind::File
    }
}

/// Children of a directory; `listdir` sorts them by name.
pub type DirectoryListing = Vec<PathStatus>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_permission_octal_and_display() {
        let p = Permission::from_octal("755").unwrap();
        assert_eq!(p.bits(), 0o755);
        assert_eq!(p.to_string(), "rwxr-xr-x");
        assert_eq!(Permission::DEFAULT_FILE.to_string(), "rw-r--r--");
        assert!(Permission::from_octal("9").is_err());
        assert!(Permission::from_octal("").is_err());
        assert!(Permission::from_octal("17777").is_err());
    }
}
