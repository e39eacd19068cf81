//! WebHDFS transport: the REST gateway exposed by HDFS NameNodes.
//!
//! Data-carrying operations are two-step. CREATE and APPEND ask the NameNode
//! for a DataNode location (`noredirect=true` returns it as JSON, older
//! servers answer with a 307) and then send the bytes there. OPEN follows the
//! 307 to the DataNode by hand because redirects are disabled on the client.

mod error;
mod message;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use reqwest::header::{CONTENT_TYPE, LOCATION};
use reqwest::{Client, RequestBuilder, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use tracing::debug;

use self::error::parse_error;
use self::message::{BooleanResp, FileStatusWrapper, FileStatusesWrapper, LocationResponse};
use super::{CreateOptions, NameService};
use crate::config::ClientConfig;
use crate::error::{Error, Result};
use crate::status::PathStatus;

#[derive(Debug, Clone)]
pub struct WebHdfsService {
    endpoint: String,
    /// `delegation=<token>` or `user.name=<user>`, appended to every request.
    auth: Option<(&'static str, String)>,
    client: Client,
}

impl WebHdfsService {
    pub fn new(endpoint: &str, config: &ClientConfig) -> Result<Self> {
        // a zero duration means unbounded, which reqwest expresses by omission
        let mut builder = Client::builder().redirect(reqwest::redirect::Policy::none());
        if !config.connect_timeout().is_zero() {
            builder = builder.connect_timeout(config.connect_timeout());
        }
        if !config.timeout().is_zero() {
            builder = builder.timeout(config.timeout());
        }
        let client = builder
            .build()
            .map_err(|e| Error::Connection {
                endpoint: endpoint.to_string(),
                reason: e.to_string(),
            })?;
        let auth = match (&config.delegation, &config.user) {
            (Some(token), _) => Some(("delegation", token.clone())),
            (None, Some(user)) => Some(("user.name", user.clone())),
            (None, None) => None,
        };
        Ok(Self {
            endpoint: endpoint.trim_end_matches('/').to_string(),
            auth,
            client,
        })
    }

    fn url(&self, path: &str, op: &str, params: &[(&str, String)]) -> Result<Url> {
        let mut url = Url::parse(&self.endpoint).map_err(|e| Error::Connection {
            endpoint: self.endpoint.clone(),
            reason: e.to_string(),
        })?;
        {
            let mut segs = url.path_segments_mut().map_err(|_| Error::Connection {
                endpoint: self.endpoint.clone(),
                reason: "endpoint cannot carry a path".to_string(),
            })?;
            segs.pop_if_empty().push("webhdfs").push("v1");
            if path == "/" {
                segs.push("");
            } else {
                segs.extend(path.split('/').filter(|s| !s.is_empty()));
            }
        }
        {
            let mut q = url.query_pairs_mut();
            q.append_pair("op", op);
            for (k, v) in params {
                q.append_pair(k, v);
            }
            if let Some((k, v)) = &self.auth {
                q.append_pair(k, v);
            }
        }
        Ok(url)
    }

    fn transport_error(&self, e: reqwest::Error, path: &str) -> Error {
        if e.is_timeout() {
            Error::Timeout(format!("{path}: {e}"))
        } else if e.is_connect() {
            Error::Connection {
                endpoint: self.endpoint.clone(),
                reason: e.to_string(),
            }
        } else {
            Error::io(format!("{path}: {e}"))
        }
    }

    /// Sends `req`, turning non-success statuses into errors. Redirects are
    /// returned as-is for the caller to follow.
    async fn send(&self, req: RequestBuilder, path: &str) -> Result<Response> {
        let resp = req.send().await.map_err(|e| self.transport_error(e, path))?;
        let status = resp.status();
        if status.is_success() || status.is_redirection() {
            return Ok(resp);
        }
        let body = match resp.text().await {
            Ok(body) => body,
            Err(e) => {
                debug!(%status, path, error = %e, "webhdfs error body unreadable");
                String::new()
            }
        };
        debug!(%status, path, "webhdfs request failed");
        Err(parse_error(status, &body, path))
    }

    async fn body(&self, resp: Response, path: &str) -> Result<Bytes> {
        resp.bytes()
            .await
            .map_err(|e| self.transport_error(e, path))
    }

    async fn json<T: DeserializeOwned>(&self, resp: Response, path: &str) -> Result<T> {
        let bytes = self.body(resp, path).await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    async fn boolean(&self, req: RequestBuilder, path: &str) -> Result<bool> {
        let resp = self.send(req, path).await?;
        Ok(self.json::<BooleanResp>(resp, path).await?.boolean)
    }

    /// DataNode address handed out by the NameNode, or `None` when the
    /// server already completed the operation itself.
    async fn location(&self, resp: Response, path: &str) -> Result<Option<String>> {
        if resp.status().is_redirection() {
            let loc = resp
                .headers()
                .get(LOCATION)
                .and_then(|v| v.to_str().ok())
                .ok_or_else(|| Error::io(format!("{path}: redirect without location")))?;
            return Ok(Some(loc.to_string()));
        }
        if resp.status() == StatusCode::CREATED {
            return Ok(None);
        }
        Ok(Some(self.json::<LocationResponse>(resp, path).await?.location))
    }
}

#[async_trait]
impl NameService for WebHdfsService {
    fn scheme(&self) -> &'static str {
        "webhdfs"
    }

    async fn probe(&self) -> Result<()> {
        self.status("/").await.map(|_| ())
    }

    async fn status(&self, path: &str) -> Result<PathStatus> {
        let url = self.url(path, "GETFILESTATUS", &[])?;
        debug!(%url, "webhdfs stat");
        let resp = self.send(self.client.get(url), path).await?;
        let wrapper: FileStatusWrapper = self.json(resp, path).await?;
        Ok(wrapper.file_status.into_status(path))
    }

    async fn list(&self, path: &str) -> Result<Vec<PathStatus>> {
        let url = self.url(path, "LISTSTATUS", &[])?;
        let resp = self.send(self.client.get(url), path).await?;
        let wrapper: FileStatusesWrapper = self.json(resp, path).await?;
        Ok(wrapper
            .file_statuses
            .file_status
            .into_iter()
            .map(|s| s.into_status(path))
            .collect())
    }

    async fn mkdirs(&self, path: &str) -> Result<()> {
        let url = self.url(path, "MKDIRS", &[])?;
        if self.boolean(self.client.put(url), path).await? {
            Ok(())
        } else {
            Err(Error::io(format!("{path}: MKDIRS returned false")))
        }
    }

    async fn rename(&self, src: &str, dst: &str) -> Result<()> {
        let url = self.url(src, "RENAME", &[("destination", dst.to_string())])?;
        if self.boolean(self.client.put(url), src).await? {
            Ok(())
        } else {
            Err(Error::io(format!("RENAME {src} -> {dst} returned false")))
        }
    }

    async fn delete(&self, path: &str, recursive: bool) -> Result<bool> {
        let url = self.url(path, "DELETE", &[("recursive", recursive.to_string())])?;
        self.boolean(self.client.delete(url), path).await
    }

    async fn set_times(
        &self,
        path: &str,
        atime: Option<DateTime<Utc>>,
        mtime: Option<DateTime<Utc>>,
    ) -> Result<()> {
        let ms = |t: Option<DateTime<Utc>>| t.map_or(-1, |t| t.timestamp_millis()).to_string();
        let url = self.url(
            path,
            "SETTIMES",
            &[("accesstime", ms(atime)), ("modificationtime", ms(mtime))],
        )?;
        self.send(self.client.put(url), path).await.map(|_| ())
    }

    async fn create(&self, path: &str, opts: &CreateOptions) -> Result<()> {
        let mut params = vec![
            ("overwrite", opts.overwrite.to_string()),
            ("permission", format!("{:o}", opts.permission.bits())),
            ("noredirect", "true".to_string()),
        ];
        if opts.replication > 0 {
            params.push(("replication", opts.replication.to_string()));
        }
        if opts.block_size > 0 {
            params.push(("blocksize", opts.block_size.to_string()));
        }
        let url = self.url(path, "CREATE", &params)?;
        let resp = self.send(self.client.put(url), path).await?;
        if let Some(location) = self.location(resp, path).await? {
            debug!(path, %location, "webhdfs create on datanode");
            let req = self
                .client
                .put(location)
                .header(CONTENT_TYPE, "application/octet-stream")
                .body(Bytes::new());
            self.send(req, path).await?;
        }
        Ok(())
    }

    async fn append(&self, path: &str, data: Bytes) -> Result<()> {
        let url = self.url(path, "APPEND", &[("noredirect", "true".to_string())])?;
        let resp = self.send(self.client.post(url), path).await?;
        let Some(location) = self.location(resp, path).await? else {
            return Err(Error::io(format!("{path}: APPEND did not return a location")));
        };
        debug!(path, %location, len = data.len(), "webhdfs append on datanode");
        let req = self
            .client
            .post(location)
            .header(CONTENT_TYPE, "application/octet-stream")
            .body(data);
        self.send(req, path).await.map(|_| ())
    }

    async fn read(&self, path: &str, offset: u64, len: usize) -> Result<Bytes> {
        if len == 0 {
            return Ok(Bytes::new());
        }
        let url = self.url(
            path,
            "OPEN",
            &[("offset", offset.to_string()), ("length", len.to_string())],
        )?;
        let mut resp = self.send(self.client.get(url), path).await?;
        if resp.status().is_redirection() {
            let location = resp
                .headers()
                .get(LOCATION)
                .and_then(|v| v.to_str().ok())
                .ok_or_else(|| Error::io(format!("{path}: redirect without location")))?
                .to_string();
            resp = self.send(self.client.get(location), path).await?;
        }
        let bytes = self.body(resp, path).await?;
        Ok(if bytes.len() > len {
            bytes.slice(..len)
        } else {
            bytes
        })
    }
}
