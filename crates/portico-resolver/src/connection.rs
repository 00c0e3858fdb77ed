//! ServiceConnection - an open transport handle to one resolved instance

use std::time::Duration;

use bytes::Bytes;
use http::header::CONTENT_TYPE;
use http::{HeaderValue, Method, StatusCode};
use reqwest::Client;
use url::Url;

use portico_core::{GatewayError, GatewayResult, ServiceRecord};

/// Timeouts applied to every call made through a connection.
#[derive(Debug, Clone, Copy)]
pub struct ConnectionConfig {
    /// TCP connect timeout
    pub connect_timeout: Duration,
    /// Whole-request timeout
    pub request_timeout: Duration,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(2),
            request_timeout: Duration::from_secs(10),
        }
    }
}

/// A downstream response carried back through the gateway unchanged.
#[derive(Debug)]
pub struct DownstreamResponse {
    pub status: StatusCode,
    pub content_type: Option<HeaderValue>,
    pub body: Bytes,
}

/// An open transport handle pinned to one resolved `address:port`.
///
/// Owned exclusively by the [`ConnectionCache`]; dropping it (on
/// invalidation) closes the pooled sockets behind it.
///
/// [`ConnectionCache`]: crate::ConnectionCache
#[derive(Debug)]
pub struct ServiceConnection {
    service: String,
    endpoint: Url,
    client: Client,
}

impl ServiceConnection {
    /// Open a connection to the instance in `record`.
    pub fn open(record: &ServiceRecord, config: &ConnectionConfig) -> GatewayResult<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .connect_timeout(config.connect_timeout)
            .build()
            .map_err(|e| GatewayError::Internal(format!("Failed to build HTTP client: {}", e)))?;

        let endpoint = Url::parse(&record.endpoint()).map_err(|e| {
            GatewayError::Internal(format!(
                "Resolved instance has unusable address {}:{}: {}",
                record.address, record.port, e
            ))
        })?;

        Ok(Self {
            service: record.name.clone(),
            endpoint,
            client,
        })
    }

    /// Logical service name this connection belongs to
    pub fn service(&self) -> &str {
        &self.service
    }

    /// Base URL of the resolved instance
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    fn map_transport_error(&self, err: reqwest::Error) -> GatewayError {
        if err.is_timeout() {
            GatewayError::Timeout
        } else {
            GatewayError::Downstream(format!("{}: {}", self.service, err))
        }
    }

    /// Issue a request and return the raw downstream response.
    ///
    /// Error responses (4xx/5xx) are not errors here: direct routes pass
    /// them through to the caller 1:1. Only transport failures and
    /// timeouts surface as `Err`.
    pub async fn send(
        &self,
        method: Method,
        path: &str,
        content_type: Option<HeaderValue>,
        body: Option<Bytes>,
    ) -> GatewayResult<DownstreamResponse> {
        let url = self
            .endpoint
            .join(path)
            .map_err(|e| GatewayError::InvalidRequest(format!("Bad forward path {}: {}", path, e)))?;

        let mut request = self.client.request(method, url);
        if let Some(value) = content_type {
            request = request.header(CONTENT_TYPE, value);
        }
        if let Some(bytes) = body {
            request = request.body(bytes);
        }

        let response = request
            .send()
            .await
            .map_err(|e| self.map_transport_error(e))?;

        let status = response.status();
        let content_type = response.headers().get(CONTENT_TYPE).cloned();
        let body = response
            .bytes()
            .await
            .map_err(|e| self.map_transport_error(e))?;

        Ok(DownstreamResponse {
            status,
            content_type,
            body,
        })
    }

    /// GET `path` and parse the body as JSON, treating any non-success
    /// status as a downstream failure. Used by composite aggregation,
    /// where an application error must fail the entry.
    pub async fn get_json(&self, path: &str) -> GatewayResult<serde_json::Value> {
        let response = self.send(Method::GET, path, None, None).await?;

        if !response.status.is_success() {
            let detail = String::from_utf8_lossy(&response.body);
            let detail = detail.trim();
            return Err(GatewayError::Downstream(if detail.is_empty() {
                format!("{} returned HTTP {}", self.service, response.status.as_u16())
            } else {
                format!(
                    "{} returned HTTP {}: {}",
                    self.service,
                    response.status.as_u16(),
                    detail
                )
            }));
        }

        serde_json::from_slice(&response.body).map_err(|e| {
            GatewayError::Downstream(format!("{} returned invalid JSON: {}", self.service, e))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> ServiceRecord {
        ServiceRecord {
            name: "users-service".to_string(),
            address: "127.0.0.1".to_string(),
            port: 9001,
            healthy: true,
        }
    }

    #[test]
    fn open_pins_the_resolved_endpoint() {
        let conn = ServiceConnection::open(&record(), &ConnectionConfig::default()).unwrap();
        assert_eq!(conn.endpoint().as_str(), "http://127.0.0.1:9001/");
        assert_eq!(conn.service(), "users-service");
    }

    #[test]
    fn forward_paths_keep_their_query() {
        let conn = ServiceConnection::open(&record(), &ConnectionConfig::default()).unwrap();
        let url = conn.endpoint().join("/products?owner=42").unwrap();
        assert_eq!(url.path(), "/products");
        assert_eq!(url.query(), Some("owner=42"));
    }
}
