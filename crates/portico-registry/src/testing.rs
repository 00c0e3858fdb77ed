//! Test utilities for portico-registry
//!
//! Provides an in-memory [`ServiceRegistry`] so the resolver and gateway
//! can be exercised without a running Consul agent.
//!
//! [`ServiceRegistry`]: portico_core::ServiceRegistry

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use portico_core::{GatewayError, GatewayResult, Registration, ServiceRecord, ServiceRegistry};

#[derive(Debug, Clone)]
struct RegisteredInstance {
    name: String,
    address: String,
    port: u16,
    /// Passing state as the registry would track it. Fresh registrations
    /// start critical: health is unknown until the first probe completes.
    passing: bool,
}

/// In-memory service registry for tests.
///
/// Mirrors the observable behavior the gateway relies on: registrations
/// start critical until marked passing, `lookup_healthy` filters on the
/// passing flag, and lookups are counted so tests can assert on
/// resolution coalescing.
#[derive(Default, Clone)]
pub struct InMemoryRegistry {
    instances: Arc<Mutex<HashMap<String, RegisteredInstance>>>,
    lookups: Arc<AtomicUsize>,
    /// When set, lookups fail as if the registry were unreachable.
    unreachable: Arc<Mutex<bool>>,
}

impl InMemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an instance and immediately mark it passing.
    /// Shorthand for the common test setup.
    pub fn register_passing(&self, id: &str, name: &str, address: &str, port: u16) {
        self.instances.lock().insert(
            id.to_string(),
            RegisteredInstance {
                name: name.to_string(),
                address: address.to_string(),
                port,
                passing: true,
            },
        );
    }

    /// Flip an instance to passing, as a successful health probe would.
    pub fn mark_passing(&self, id: &str) {
        if let Some(instance) = self.instances.lock().get_mut(id) {
            instance.passing = true;
        }
    }

    /// Flip an instance to critical, as a failed health probe would.
    pub fn mark_critical(&self, id: &str) {
        if let Some(instance) = self.instances.lock().get_mut(id) {
            instance.passing = false;
        }
    }

    /// Simulate the registry going down (or coming back).
    pub fn set_unreachable(&self, unreachable: bool) {
        *self.unreachable.lock() = unreachable;
    }

    /// Number of `lookup_healthy` calls served so far.
    pub fn lookup_count(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ServiceRegistry for InMemoryRegistry {
    async fn register(&self, registration: &Registration) -> GatewayResult<()> {
        if *self.unreachable.lock() {
            return Err(GatewayError::Registration(
                "registry unreachable".to_string(),
            ));
        }

        let mut instances = self.instances.lock();
        // Idempotent: re-registering an id keeps its probe state instead
        // of bouncing an already-passing instance back to critical.
        let passing = instances
            .get(&registration.id)
            .map(|existing| existing.passing)
            .unwrap_or(false);

        instances.insert(
            registration.id.clone(),
            RegisteredInstance {
                name: registration.name.clone(),
                address: registration.address.clone(),
                port: registration.port,
                passing,
            },
        );
        Ok(())
    }

    async fn lookup_healthy(&self, name: &str) -> GatewayResult<Vec<ServiceRecord>> {
        self.lookups.fetch_add(1, Ordering::SeqCst);

        if *self.unreachable.lock() {
            return Err(GatewayError::Lookup("registry unreachable".to_string()));
        }

        let records = self
            .instances
            .lock()
            .values()
            .filter(|instance| instance.name == name && instance.passing)
            .map(|instance| ServiceRecord {
                name: instance.name.clone(),
                address: instance.address.clone(),
                port: instance.port,
                healthy: true,
            })
            .collect();

        Ok(records)
    }

    async fn deregister(&self, id: &str) -> GatewayResult<()> {
        self.instances.lock().remove(id);
        Ok(())
    }
}
