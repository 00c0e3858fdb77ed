//! Consul HTTP client implementation

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};
use url::Url;

use portico_core::{GatewayError, GatewayResult, Registration, ServiceRecord, ServiceRegistry};

/// Default request timeout
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);
/// Default connection timeout
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(2);

/// Render a duration the way the Consul API expects ("10s", "250ms").
fn consul_duration(d: Duration) -> String {
    if d.subsec_millis() > 0 {
        format!("{}ms", d.as_millis())
    } else {
        format!("{}s", d.as_secs())
    }
}

// =========================================================================
// Consul wire types
// =========================================================================

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct AgentServiceRegistration<'a> {
    #[serde(rename = "ID")]
    id: &'a str,
    name: &'a str,
    address: &'a str,
    port: u16,
    check: AgentServiceCheck,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct AgentServiceCheck {
    #[serde(rename = "HTTP")]
    http: String,
    interval: String,
    timeout: String,
    deregister_critical_service_after: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct HealthEntry {
    node: HealthNode,
    service: HealthService,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct HealthNode {
    #[serde(default)]
    address: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct HealthService {
    service: String,
    #[serde(default)]
    address: String,
    port: u16,
}

/// Consul registry client
///
/// Talks to a Consul agent over its HTTP API. The gateway depends on
/// three operations only: `PUT /v1/agent/service/register`,
/// `GET /v1/health/service/{name}?passing=true`, and
/// `PUT /v1/agent/service/deregister/{id}`.
#[derive(Debug, Clone)]
pub struct ConsulRegistry {
    client: Client,
    base_url: Url,
}

impl ConsulRegistry {
    /// Create a new registry client
    ///
    /// # Arguments
    /// * `base_url` - Base URL of the Consul agent (e.g., "http://localhost:8500")
    pub fn new(base_url: &str) -> GatewayResult<Self> {
        Self::with_config(base_url, DEFAULT_TIMEOUT, DEFAULT_CONNECT_TIMEOUT)
    }

    /// Create a new registry client with custom timeouts
    pub fn with_config(
        base_url: &str,
        timeout: Duration,
        connect_timeout: Duration,
    ) -> GatewayResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(connect_timeout)
            .build()
            .map_err(|e| GatewayError::Internal(format!("Failed to build HTTP client: {}", e)))?;

        let base_url = Url::parse(base_url)
            .map_err(|e| GatewayError::Internal(format!("Invalid registry URL: {}", e)))?;

        Ok(Self { client, base_url })
    }

    /// Get the base URL
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Read the response body for an error message, falling back to the
    /// bare status code when the body is empty or unreadable.
    async fn error_text(response: reqwest::Response) -> String {
        let status = response.status();
        match response.text().await {
            Ok(body) if !body.is_empty() => format!("HTTP {}: {}", status.as_u16(), body.trim()),
            _ => format!("HTTP {}", status.as_u16()),
        }
    }
}

#[async_trait]
impl ServiceRegistry for ConsulRegistry {
    #[instrument(skip(self, registration), fields(id = %registration.id, name = %registration.name))]
    async fn register(&self, registration: &Registration) -> GatewayResult<()> {
        let url = self
            .base_url
            .join("/v1/agent/service/register")
            .map_err(|e| GatewayError::Registration(e.to_string()))?;

        let body = AgentServiceRegistration {
            id: &registration.id,
            name: &registration.name,
            address: &registration.address,
            port: registration.port,
            check: AgentServiceCheck {
                http: registration.check.target.clone(),
                interval: consul_duration(registration.check.interval),
                timeout: consul_duration(registration.check.timeout),
                deregister_critical_service_after: consul_duration(
                    registration.check.deregister_after,
                ),
            },
        };

        debug!(url = %url, "Registering service instance");

        let response = self
            .client
            .put(url)
            .json(&body)
            .send()
            .await
            .map_err(|e| GatewayError::Registration(e.to_string()))?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(GatewayError::Registration(Self::error_text(response).await))
        }
    }

    #[instrument(skip(self))]
    async fn lookup_healthy(&self, name: &str) -> GatewayResult<Vec<ServiceRecord>> {
        let mut url = self
            .base_url
            .join(&format!("/v1/health/service/{}", name))
            .map_err(|e| GatewayError::Lookup(e.to_string()))?;
        url.set_query(Some("passing=true"));

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| GatewayError::Lookup(e.to_string()))?;

        if !response.status().is_success() {
            return Err(GatewayError::Lookup(Self::error_text(response).await));
        }

        let entries: Vec<HealthEntry> = response
            .json()
            .await
            .map_err(|e| GatewayError::Lookup(format!("Failed to parse health response: {}", e)))?;

        let records = entries
            .into_iter()
            .map(|entry| {
                // Consul leaves Service.Address empty when the instance
                // inherits the node address.
                let address = if entry.service.address.is_empty() {
                    entry.node.address
                } else {
                    entry.service.address
                };
                ServiceRecord {
                    name: entry.service.service,
                    address,
                    port: entry.service.port,
                    healthy: true,
                }
            })
            .collect();

        Ok(records)
    }

    #[instrument(skip(self))]
    async fn deregister(&self, id: &str) -> GatewayResult<()> {
        let url = self
            .base_url
            .join(&format!("/v1/agent/service/deregister/{}", id))
            .map_err(|e| GatewayError::Internal(e.to_string()))?;

        let response = self
            .client
            .put(url)
            .send()
            .await
            .map_err(|e| GatewayError::Internal(e.to_string()))?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(GatewayError::Internal(Self::error_text(response).await))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use portico_core::HealthCheckSpec;

    #[test]
    fn durations_render_in_consul_notation() {
        assert_eq!(consul_duration(Duration::from_secs(10)), "10s");
        assert_eq!(consul_duration(Duration::from_millis(250)), "250ms");
    }

    #[test]
    fn registration_body_uses_consul_field_names() {
        let registration = Registration {
            id: "portico-gateway-1".to_string(),
            name: "portico-gateway".to_string(),
            address: "10.0.0.5".to_string(),
            port: 8080,
            check: HealthCheckSpec::new("http://10.0.0.5:8080/health"),
        };

        let body = AgentServiceRegistration {
            id: &registration.id,
            name: &registration.name,
            address: &registration.address,
            port: registration.port,
            check: AgentServiceCheck {
                http: registration.check.target.clone(),
                interval: consul_duration(registration.check.interval),
                timeout: consul_duration(registration.check.timeout),
                deregister_critical_service_after: consul_duration(
                    registration.check.deregister_after,
                ),
            },
        };

        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["ID"], "portico-gateway-1");
        assert_eq!(json["Name"], "portico-gateway");
        assert_eq!(json["Port"], 8080);
        assert_eq!(json["Check"]["HTTP"], "http://10.0.0.5:8080/health");
        assert_eq!(json["Check"]["Interval"], "10s");
        assert_eq!(json["Check"]["DeregisterCriticalServiceAfter"], "60s");
    }

    #[test]
    fn health_entry_falls_back_to_node_address() {
        let raw = r#"[{
            "Node": {"Address": "10.0.0.1"},
            "Service": {"Service": "users-service", "Address": "", "Port": 9001}
        }]"#;
        let entries: Vec<HealthEntry> = serde_json::from_str(raw).unwrap();
        let entry = &entries[0];
        assert_eq!(entry.service.service, "users-service");
        assert!(entry.service.address.is_empty());
        assert_eq!(entry.node.address, "10.0.0.1");
    }

    #[test]
    fn invalid_base_url_is_rejected() {
        assert!(ConsulRegistry::new("not a url").is_err());
    }
}
