//! portico-registry - Consul registry client
//!
//! Implements [`ServiceRegistry`] against the Consul agent HTTP API:
//! registration with an HTTP health check, health-filtered lookup, and
//! deregistration. The `testing` module provides an in-memory registry
//! for exercising the resolver and gateway without a Consul agent.
//!
//! [`ServiceRegistry`]: portico_core::ServiceRegistry

pub mod client;
pub mod testing;

pub use client::ConsulRegistry;
pub use testing::InMemoryRegistry;
