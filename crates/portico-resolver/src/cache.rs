//! ConnectionCache - one live connection per service name

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{OnceCell, RwLock};
use tracing::debug;

use portico_core::GatewayResult;

use crate::connection::ServiceConnection;
use crate::resolver::Resolver;

type Entry = Arc<OnceCell<Arc<ServiceConnection>>>;

/// Lazily populated map from service name to its single live connection.
///
/// Locking discipline: the map lock is only held for map operations,
/// never across a resolution await, so `get`/`invalidate` on different
/// names proceed independently. Concurrent first-time `get`s on one name
/// race into the same per-name `OnceCell`: exactly one caller resolves,
/// the rest await the cell and observe the winner's connection.
pub struct ConnectionCache {
    resolver: Resolver,
    entries: RwLock<HashMap<String, Entry>>,
}

impl ConnectionCache {
    pub fn new(resolver: Resolver) -> Self {
        Self {
            resolver,
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Return the cached connection for `name`, resolving and storing
    /// one first if absent.
    ///
    /// A failed resolution leaves the entry unset, so the next `get`
    /// resolves again; there is no negative caching and no retry here.
    pub async fn get(&self, name: &str) -> GatewayResult<Arc<ServiceConnection>> {
        let cell = {
            let entries = self.entries.read().await;
            entries.get(name).cloned()
        };

        let cell = match cell {
            Some(cell) => cell,
            None => {
                let mut entries = self.entries.write().await;
                entries
                    .entry(name.to_string())
                    .or_insert_with(|| Arc::new(OnceCell::new()))
                    .clone()
            }
        };

        let connection = cell
            .get_or_try_init(|| async {
                let connection = self.resolver.resolve(name).await?;
                debug!(service = %name, endpoint = %connection.endpoint(), "Opened downstream connection");
                Ok(Arc::new(connection))
            })
            .await?;

        Ok(Arc::clone(connection))
    }

    /// Drop the cached connection for `name`. The next `get` re-resolves.
    ///
    /// Called after a downstream failure so a stale connection is never
    /// reused without re-resolution.
    pub async fn invalidate(&self, name: &str) {
        if self.entries.write().await.remove(name).is_some() {
            debug!(service = %name, "Invalidated cached connection");
        }
    }
}
