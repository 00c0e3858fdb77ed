//! Resolver - one lookup, one selection, one fresh connection

use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use portico_core::{
    FirstHealthy, GatewayError, GatewayResult, InstanceSelector, ServiceRegistry,
};

use crate::connection::{ConnectionConfig, ServiceConnection};

/// Timeouts the resolver operates under.
#[derive(Debug, Clone, Copy)]
pub struct ResolverConfig {
    /// Bound on a single registry lookup
    pub lookup_timeout: Duration,
    /// Timeouts handed to opened connections
    pub connection: ConnectionConfig,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            lookup_timeout: Duration::from_secs(5),
            connection: ConnectionConfig::default(),
        }
    }
}

/// Resolves a logical service name to an open connection.
///
/// Performs a bounded health-filtered lookup, picks an instance through
/// the [`InstanceSelector`] seam (first-healthy by default), and opens a
/// new connection. The resolver never caches; that is the
/// [`ConnectionCache`]'s job, layered above.
///
/// [`ConnectionCache`]: crate::ConnectionCache
pub struct Resolver {
    registry: Arc<dyn ServiceRegistry>,
    selector: Arc<dyn InstanceSelector>,
    config: ResolverConfig,
}

impl Resolver {
    /// Resolver with default timeouts and first-healthy selection
    pub fn new(registry: Arc<dyn ServiceRegistry>) -> Self {
        Self::with_config(registry, ResolverConfig::default())
    }

    /// Resolver with custom timeouts
    pub fn with_config(registry: Arc<dyn ServiceRegistry>, config: ResolverConfig) -> Self {
        Self {
            registry,
            selector: Arc::new(FirstHealthy),
            config,
        }
    }

    /// Swap the selection strategy. Extension point only; the shipped
    /// behavior is first-healthy.
    pub fn with_selector(mut self, selector: Arc<dyn InstanceSelector>) -> Self {
        self.selector = selector;
        self
    }

    /// Resolve `name` to a fresh connection.
    ///
    /// Fails with [`GatewayError::NoHealthyInstance`] when the registry
    /// reports zero passing instances, and [`GatewayError::Timeout`]
    /// when the lookup itself exceeds its bound.
    pub async fn resolve(&self, name: &str) -> GatewayResult<ServiceConnection> {
        let records = tokio::time::timeout(
            self.config.lookup_timeout,
            self.registry.lookup_healthy(name),
        )
        .await
        .map_err(|_| GatewayError::Timeout)??;

        let record = self
            .selector
            .select(&records)
            .ok_or_else(|| GatewayError::NoHealthyInstance(name.to_string()))?;

        debug!(service = %name, endpoint = %record.endpoint(), "Resolved service instance");

        ServiceConnection::open(record, &self.config.connection)
    }
}
