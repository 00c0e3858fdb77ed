//! ServiceRegistry trait - the seam between the gateway and its registry
//!
//! The gateway depends on exactly three registry operations: registering
//! itself at startup, health-filtered lookup by service name, and
//! deregistration at shutdown. Anything implementing this trait (the
//! Consul client, the in-memory test registry) can back the resolver.

use async_trait::async_trait;

use crate::error::GatewayResult;
use crate::record::{HealthCheckSpec, ServiceRecord};

/// A service registration request.
#[derive(Debug, Clone)]
pub struct Registration {
    /// Unique instance id (distinct from the logical name so several
    /// instances of one service can coexist)
    pub id: String,
    /// Logical service name others look the instance up by
    pub name: String,
    /// Advertised host or IP
    pub address: String,
    /// Advertised port
    pub port: u16,
    /// How the registry should probe this instance
    pub check: HealthCheckSpec,
}

/// External service registry (Consul-like).
#[async_trait]
pub trait ServiceRegistry: Send + Sync {
    /// Register an instance. Idempotent: re-registering the same id
    /// replaces the previous registration. Side effect: the registry
    /// begins probing `registration.check.target` at the given interval.
    ///
    /// Fails with [`GatewayError::Registration`] when the registry is
    /// unreachable or rejects the request.
    ///
    /// [`GatewayError::Registration`]: crate::GatewayError::Registration
    async fn register(&self, registration: &Registration) -> GatewayResult<()>;

    /// Return the instances of `name` currently marked passing.
    ///
    /// An empty vec is a normal answer (nothing healthy right now), not
    /// an error; [`GatewayError::Lookup`] is reserved for the registry
    /// itself being unreachable.
    ///
    /// [`GatewayError::Lookup`]: crate::GatewayError::Lookup
    async fn lookup_healthy(&self, name: &str) -> GatewayResult<Vec<ServiceRecord>>;

    /// Remove an instance registration by id.
    ///
    /// Call sites treat this as best-effort and log failures instead of
    /// propagating them; the registry's own critical-expiry is the
    /// backstop for instances that never deregister.
    async fn deregister(&self, id: &str) -> GatewayResult<()>;
}
