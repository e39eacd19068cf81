use std::fmt;
use std::future::Future;
use std::sync::{Arc, Mutex, Weak};

use tokio::time::timeout;
use tracing::{debug, info, warn};

use super::manager::Shared;
use crate::backend::NameService;
use crate::config::ClientConfig;
use crate::error::{Error, Result};

#[derive(Default)]
struct SessionState {
    closed: bool,
    open_handles: usize,
}

struct SessionInner {
    id: u64,
    endpoint: String,
    /// Pool entry to release on disconnect; `None` for attached transports.
    pool_key: Option<String>,
    service: Arc<dyn NameService>,
    config: ClientConfig,
    state: Mutex<SessionState>,
    manager: Weak<Shared>,
}

impl SessionInner {
    fn release(&self) {
        if let (Some(key), Some(shared)) = (&self.pool_key, self.manager.upgrade()) {
            shared.release(key);
        }
    }
}

impl Drop for SessionInner {
    fn drop(&mut self) {
        let closed = self.state.get_mut().map(|s| s.closed).unwrap_or(true);
        if !closed {
            warn!(session = self.id, endpoint = %self.endpoint, "session dropped without disconnect");
            self.release();
        }
    }
}

/// A live connection to one namespace endpoint.
///
/// Cloning is cheap and yields another reference to the same session, so a
/// session can be shared across tasks. Namespace operations, `open` and the
/// local transfers are methods on this type.
#[derive(Clone)]
pub struct Session {
    inner: Arc<SessionInner>,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.inner.id)
            .field("endpoint", &self.inner.endpoint)
            .field("open", &self.is_open())
            .finish()
    }
}

impl Session {
    pub(super) fn new(
        id: u64,
        endpoint: String,
        pool_key: Option<String>,
        service: Arc<dyn NameService>,
        config: ClientConfig,
        manager: Weak<Shared>,
    ) -> Self {
        Self {
            inner: Arc::new(SessionInner {
                id,
                endpoint,
                pool_key,
                service,
                config,
                state: Mutex::new(SessionState::default()),
                manager,
            }),
        }
    }

    /// Opaque token identifying this session within its manager.
    pub fn id(&self) -> u64 {
        self.inner.id
    }

    pub fn endpoint(&self) -> &str {
        &self.inner.endpoint
    }

    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    pub fn is_open(&self) -> bool {
        !self.inner.state.lock().unwrap().closed
    }

    /// Number of file handles opened through this session and not yet closed.
    pub fn open_handles(&self) -> usize {
        self.inner.state.lock().unwrap().open_handles
    }

    /// Closes the session. Fails with `InvalidSession` when already closed or
    /// while file handles derived from it are still open.
    pub fn disconnect(&self) -> Result<()> {
        {
            let mut state = self.inner.state.lock().unwrap();
            if state.closed {
                return Err(Error::InvalidSession(format!(
                    "session {} is already disconnected",
                    self.inner.id
                )));
            }
            if state.open_handles > 0 {
                return Err(Error::InvalidSession(format!(
                    "session {} still has {} open file handle(s)",
                    self.inner.id, state.open_handles
                )));
            }
            state.closed = true;
        }
        self.inner.release();
        info!(session = self.inner.id, endpoint = %self.inner.endpoint, "disconnected");
        Ok(())
    }

    pub(super) fn is_managed_by(&self, shared: &Arc<Shared>) -> bool {
        std::ptr::eq(self.inner.manager.as_ptr(), Arc::as_ptr(shared))
    }

    /// The transport, if the session is still live.
    pub(crate) fn service(&self) -> Result<Arc<dyn NameService>> {
        if !self.is_open() {
            return Err(self.closed_error());
        }
        Ok(self.inner.service.clone())
    }

    /// Runs one remote call under the configured per-call timeout.
    pub(crate) async fn timed<T, F>(&self, op: &'static str, path: &str, fut: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        debug!(session = self.inner.id, op, path, "remote call");
        let limit = self.inner.config.timeout();
        if limit.is_zero() {
            return fut.await;
        }
        match timeout(limit, fut).await {
            Ok(res) => res,
            Err(_) => Err(Error::Timeout(format!("{op} {path} after {limit:?}"))),
        }
    }

    /// Registers a new file handle; refused once the session is closed.
    pub(crate) fn acquire_handle(&self) -> Result<()> {
        let mut state = self.inner.state.lock().unwrap();
        if state.closed {
            return Err(self.closed_error());
        }
        state.open_handles += 1;
        Ok(())
    }

    pub(crate) fn release_handle(&self) {
        let mut state = self.inner.state.lock().unwrap();
        state.open_handles = state.open_handles.saturating_sub(1);
    }

    fn closed_error(&self) -> Error {
        Error::InvalidSession(format!("session {} is disconnected", self.inner.id))
    }
}
