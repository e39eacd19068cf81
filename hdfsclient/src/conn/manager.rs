use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use tokio::time::timeout;
use tracing::{debug, info};

use super::session::Session;
use crate::backend::{self, NameService};
use crate::config::ClientConfig;
use crate::error::{Error, Result};

struct Pooled {
    service: Arc<dyn NameService>,
    refs: usize,
}

pub(crate) struct Shared {
    config: ClientConfig,
    /// Live transports keyed by resolved endpoint. An entry exists while at
    /// least one session over it has not been released.
    pool: Mutex<HashMap<String, Pooled>>,
    next_id: AtomicU64,
}

impl Shared {
    /// Drops one session reference; the transport goes away with the last.
    pub(crate) fn release(&self, key: &str) {
        let mut pool = self.pool.lock().unwrap();
        let Some(entry) = pool.get_mut(key) else {
            return;
        };
        entry.refs = entry.refs.saturating_sub(1);
        if entry.refs == 0 {
            pool.remove(key);
            debug!(endpoint = key, "transport released");
        }
    }
}

/// Hands out [`Session`]s. Sessions to the same endpoint share one transport
/// (HTTP client, local root, in-memory namespace) and reference-count it.
#[derive(Clone)]
pub struct ConnectionManager {
    shared: Arc<Shared>,
}

impl std::fmt::Debug for ConnectionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let endpoints: Vec<String> = self.shared.pool.lock().unwrap().keys().cloned().collect();
        f.debug_struct("ConnectionManager")
            .field("endpoints", &endpoints)
            .finish()
    }
}

impl ConnectionManager {
    pub fn new(config: ClientConfig) -> Self {
        Self {
            shared: Arc::new(Shared {
                config,
                pool: Mutex::new(HashMap::new()),
                next_id: AtomicU64::new(1),
            }),
        }
    }

    /// Manager configured from the ambient environment.
    pub fn from_env() -> Result<Self> {
        Ok(Self::new(ClientConfig::load()?))
    }

    pub fn config(&self) -> &ClientConfig {
        &self.shared.config
    }

    /// Opens a session. `("default", 0)` uses the configured default
    /// filesystem and `("", 0)` the local one; see [`ClientConfig::resolve`].
    pub async fn connect(&self, host: &str, port: u16) -> Result<Session> {
        let endpoint = self.shared.config.resolve(host, port)?;
        let key = endpoint.to_string();

        let service = match self.checkout(&key) {
            Some(service) => service,
            None => {
                let service = backend::build(&endpoint, &self.shared.config)?;
                self.probe(&key, service.as_ref()).await?;
                self.checkin(&key, service)
            }
        };

        let id = self.shared.next_id.fetch_add(1, Ordering::Relaxed);
        info!(session = id, endpoint = %key, scheme = service.scheme(), "connected");
        Ok(Session::new(
            id,
            key.clone(),
            Some(key),
            service,
            self.shared.config.clone(),
            Arc::downgrade(&self.shared),
        ))
    }

    /// Opens a session over a caller-supplied transport. The transport is
    /// not pooled; `label` only names it in logs and errors.
    pub async fn attach(&self, label: &str, service: Arc<dyn NameService>) -> Result<Session> {
        self.probe(label, service.as_ref()).await?;
        let id = self.shared.next_id.fetch_add(1, Ordering::Relaxed);
        info!(session = id, endpoint = label, scheme = service.scheme(), "attached");
        Ok(Session::new(
            id,
            label.to_string(),
            None,
            service,
            self.shared.config.clone(),
            Arc::downgrade(&self.shared),
        ))
    }

    /// Closes `session`. Fails with `InvalidSession` if it is already closed,
    /// still has open file handles, or belongs to another manager.
    pub fn disconnect(&self, session: &Session) -> Result<()> {
        if !session.is_managed_by(&self.shared) {
            return Err(Error::InvalidSession(format!(
                "session {} belongs to another connection manager",
                session.id()
            )));
        }
        session.disconnect()
    }

    /// Number of distinct transports currently alive.
    pub fn active_endpoints(&self) -> usize {
        self.shared.pool.lock().unwrap().len()
    }

    fn checkout(&self, key: &str) -> Option<Arc<dyn NameService>> {
        let mut pool = self.shared.pool.lock().unwrap();
        pool.get_mut(key).map(|entry| {
            entry.refs += 1;
            entry.service.clone()
        })
    }

    /// Registers a freshly probed transport. If another task won the race to
    /// the same endpoint, its transport is shared and ours is dropped.
    fn checkin(&self, key: &str, service: Arc<dyn NameService>) -> Arc<dyn NameService> {
        let mut pool = self.shared.pool.lock().unwrap();
        let entry = pool
            .entry(key.to_string())
            .or_insert(Pooled { service, refs: 0 });
        entry.refs += 1;
        entry.service.clone()
    }

    async fn probe(&self, endpoint: &str, service: &dyn NameService) -> Result<()> {
        let limit = self.shared.config.connect_timeout();
        let outcome = if limit.is_zero() {
            Ok(service.probe().await)
        } else {
            timeout(limit, service.probe()).await
        };
        match outcome {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(Error::Connection {
                endpoint: endpoint.to_string(),
                reason: e.to_string(),
            }),
            Err(_) => Err(Error::Connection {
                endpoint: endpoint.to_string(),
                reason: format!("no answer within {limit:?}"),
            }),
        }
    }

    #[cfg(test)]
    pub(crate) fn refs(&self, key: &str) -> usize {
        self.shared
            .pool
            .lock()
            .unwrap()
            .get(key)
            .map_or(0, |e| e.refs)
    }
}
