//! portico-core - Core traits and types for the Portico gateway
//!
//! This crate provides the fundamental abstractions shared by the registry
//! client, the resolver, and the gateway HTTP layer: the service records
//! produced by health-filtered lookups, the `ServiceRegistry` trait that
//! any registry backend implements, and the common error taxonomy.

pub mod error;
pub mod record;
pub mod registry;
pub mod select;

pub use error::{GatewayError, GatewayResult};
pub use record::{HealthCheckSpec, ServiceRecord};
pub use registry::{Registration, ServiceRegistry};
pub use select::{FirstHealthy, InstanceSelector};
