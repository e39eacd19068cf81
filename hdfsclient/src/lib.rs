// Library crate for hdfsclient: an async client for HDFS-compatible namespaces.
// Entry point is `ConnectionManager::connect`; everything else hangs off the
// returned `Session`.

pub mod backend;
pub mod bridge;
pub mod config;
pub mod conn;
pub mod error;
pub mod namespace;
pub mod path;
pub mod status;
pub mod stream;

pub use bridge::TransferOptions;
pub use config::{ClientConfig, Endpoint};
pub use conn::{ConnectionManager, Session};
pub use error::{Error, ErrorKind, Result};
pub use status::{DirectoryListing, FileKind, PathStatus, Permission};
pub use stream::{FileHandle, OpenMode, OpenOptions};
