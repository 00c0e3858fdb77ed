//! Service instance records and health-check specifications

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// A single service instance as reported by the registry.
///
/// Records are transient: produced by a health-filtered lookup, consumed
/// by the resolver, never persisted by the gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceRecord {
    /// Logical service name (e.g. "users-service")
    pub name: String,
    /// Host or IP the instance is reachable at
    pub address: String,
    /// Port the instance listens on
    pub port: u16,
    /// Whether the registry currently marks the instance passing
    pub healthy: bool,
}

impl ServiceRecord {
    /// The instance endpoint as a base URL string
    pub fn endpoint(&self) -> String {
        format!("http://{}:{}", self.address, self.port)
    }
}

/// How the registry should probe a registered service.
///
/// The registry polls `target` every `interval`; a probe slower than
/// `timeout` counts as failing, and an instance critical for longer than
/// `deregister_after` is expired by the registry itself. That expiry is
/// the backstop that makes best-effort deregistration acceptable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HealthCheckSpec {
    /// URL the registry probes (e.g. "http://10.0.0.1:8080/health")
    pub target: String,
    /// Probe interval
    pub interval: Duration,
    /// Per-probe timeout
    pub timeout: Duration,
    /// How long an instance may stay critical before the registry drops it
    pub deregister_after: Duration,
}

impl HealthCheckSpec {
    /// A spec probing `target` with the default cadence (10s interval,
    /// 2s probe timeout, 60s critical expiry).
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            interval: Duration::from_secs(10),
            timeout: Duration::from_secs(2),
            deregister_after: Duration::from_secs(60),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_formats_address_and_port() {
        let record = ServiceRecord {
            name: "users-service".to_string(),
            address: "10.0.0.1".to_string(),
            port: 9001,
            healthy: true,
        };
        assert_eq!(record.endpoint(), "http://10.0.0.1:9001");
    }
}
