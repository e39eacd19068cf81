//! Client configuration and endpoint resolution.
//!
//! Configuration is layered: built-in defaults, then a YAML file, then
//! environment overrides. `connect("default", 0)` resolves through
//! [`ClientConfig::default_fs`]; an empty host means the local filesystem.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use reqwest::Url;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

pub const DEFAULT_HOST: &str = "default";
pub const DEFAULT_WEBHDFS_PORT: u16 = 9870;

/// Names the YAML config file to load.
pub const CONF_ENV: &str = "HDFS_CLIENT_CONF";
pub const DEFAULT_FS_ENV: &str = "HDFS_DEFAULT_FS";
pub const USER_ENV: &str = "HDFS_USER";
pub const DELEGATION_ENV: &str = "HDFS_DELEGATION";
pub const TIMEOUT_ENV: &str = "HDFS_TIMEOUT_SECS";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Ambient filesystem URI, e.g. `webhdfs://namenode:9870`.
    pub default_fs: Option<String>,
    /// Sent as `user.name` on WebHDFS requests.
    pub user: Option<String>,
    /// Delegation token; takes precedence over `user`.
    pub delegation: Option<String>,
    /// Upper bound for any single remote call.
    pub timeout_secs: u64,
    pub connect_timeout_secs: u64,
    /// Read-ahead and write-behind buffer per handle.
    pub buffer_size: usize,
    pub replication: u16,
    pub block_size: u64,
    /// Chunk size used by `get`/`put`.
    pub transfer_chunk_size: usize,
    /// Root of the local filesystem used for `connect("", 0)`.
    pub local_root: PathBuf,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            default_fs: None,
            user: None,
            delegation: None,
            timeout_secs: 30,
            connect_timeout_secs: 10,
            buffer_size: 64 * 1024,
            replication: 3,
            block_size: 128 * 1024 * 1024,
            transfer_chunk_size: 4 * 1024 * 1024,
            local_root: PathBuf::from("/"),
        }
    }
}

impl ClientConfig {
    /// Loads the ambient configuration from the process environment.
    pub fn load() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`ClientConfig::load`] with a custom variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = match lookup(CONF_ENV) {
            Some(path) => Self::from_file(path)?,
            None => match Self::user_config_path() {
                Some(path) if path.is_file() => Self::from_file(path)?,
                _ => Self::default(),
            },
        };

        if let Some(fs) = lookup(DEFAULT_FS_ENV) {
            config.default_fs = Some(fs);
        }
        if let Some(user) = lookup(USER_ENV) {
            config.user = Some(user);
        }
        if let Some(token) = lookup(DELEGATION_ENV) {
            config.delegation = Some(token);
        }
        if let Some(secs) = lookup(TIMEOUT_ENV) {
            config.timeout_secs = secs.trim().parse().map_err(|_| {
                Error::InvalidArgument(format!("{TIMEOUT_ENV} is not a number: {secs:?}"))
            })?;
        }
        Ok(config)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| Error::from_io(e, &path.display().to_string()))?;
        serde_yaml::from_str(&text)
            .map_err(|e| Error::InvalidArgument(format!("{}: {e}", path.display())))
    }

    fn user_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("hdfsclient").join("config.yaml"))
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    /// Maps the `(host, port)` pair given to `connect` onto an endpoint.
    pub fn resolve(&self, host: &str, port: u16) -> Result<Endpoint> {
        match host {
            DEFAULT_HOST => {
                let fs = self.default_fs.as_deref().ok_or_else(|| Error::Connection {
                    endpoint: DEFAULT_HOST.to_string(),
                    reason: format!("no default filesystem configured (set {DEFAULT_FS_ENV})"),
                })?;
                self.parse_uri(fs, port)
            }
            "" => Ok(Endpoint::Local {
                root: self.local_root.clone(),
            }),
            h if h.contains("://") => self.parse_uri(h, port),
            h => {
                let port = if port == 0 { DEFAULT_WEBHDFS_PORT } else { port };
                let url = format!("http://{h}:{port}");
                Url::parse(&url).map_err(|e| Error::Connection {
                    endpoint: url.clone(),
                    reason: e.to_string(),
                })?;
                Ok(Endpoint::WebHdfs { url })
            }
        }
    }

    fn parse_uri(&self, uri: &str, port: u16) -> Result<Endpoint> {
        let bad = |reason: String| Error::Connection {
            endpoint: uri.to_string(),
            reason,
        };
        let url = Url::parse(uri).map_err(|e| bad(e.to_string()))?;
        let web = |scheme: &str| -> Result<Endpoint> {
            let host = url
                .host_str()
                .ok_or_else(|| bad("missing host".to_string()))?;
            let port = if port != 0 {
                port
            } else {
                url.port().unwrap_or(DEFAULT_WEBHDFS_PORT)
            };
            Ok(Endpoint::WebHdfs {
                url: format!("{scheme}://{host}:{port}"),
            })
        };
        match url.scheme() {
            "webhdfs" | "http" => web("http"),
            "swebhdfs" | "https" => web("https"),
            "file" => {
                let root = match url.path() {
                    "" | "/" => self.local_root.clone(),
                    p => PathBuf::from(p),
                };
                Ok(Endpoint::Local { root })
            }
            "memory" => Ok(Endpoint::Memory {
                name: url.host_str().unwrap_or(DEFAULT_HOST).to_string(),
            }),
            other => Err(bad(format!("unsupported scheme {other:?}"))),
        }
    }
}

/// A resolved remote namespace endpoint.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Endpoint {
    /// WebHDFS REST gateway, e.g. `http://namenode:9870`.
    WebHdfs { url: String },
    /// A directory on the local filesystem.
    Local { root: PathBuf },
    /// An in-process namespace, shared by name.
    Memory { name: String },
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Endpoint::WebHdfs { url } => write!(f, "{url}"),
            Endpoint::Local { root } => write!(f, "file://{}", root.display()),
            Endpoint::Memory { name } => write!(f, "memory://{name}"),
        }
    }
}
