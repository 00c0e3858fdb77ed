//! Gateway daemon configuration
//!
//! Fully data-driven: bind address, registry location, advertised
//! endpoint and health-check cadence, timeouts, and the route table all
//! come from one TOML file. Every field has a default so a bare
//! `porticod` starts against a local Consul agent.

use serde::{Deserialize, Serialize};

use portico_gateway::{CompositeRoute, DirectRoute};

/// Complete daemon configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// HTTP server settings
    #[serde(default)]
    pub server: ServerConfig,

    /// Registry connection and self-registration settings
    #[serde(default)]
    pub registry: RegistryConfig,

    /// Resolution and downstream-call timeouts
    #[serde(default)]
    pub timeouts: TimeoutConfig,

    /// Direct routes (path prefix -> one service)
    #[serde(default)]
    pub routes: Vec<DirectRoute>,

    /// Composite routes (path prefix -> concurrent fan-out)
    #[serde(default)]
    pub composites: Vec<CompositeRoute>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind address
    #[serde(default = "default_bind")]
    pub bind: String,

    /// Listen port
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_bind() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            port: default_port(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// Base URL of the Consul agent
    #[serde(default = "default_registry_url")]
    pub url: String,

    /// Logical name this gateway registers under
    #[serde(default = "default_service_name")]
    pub service_name: String,

    /// Address advertised to the registry (must be reachable by the
    /// registry's health prober)
    #[serde(default = "default_advertise_address")]
    pub advertise_address: String,

    /// Advertised port; falls back to the server port when absent
    pub advertise_port: Option<u16>,

    /// Health-check cadence the registry probes us with
    #[serde(default)]
    pub check: CheckConfig,
}

fn default_registry_url() -> String {
    "http://127.0.0.1:8500".to_string()
}

fn default_service_name() -> String {
    "portico-gateway".to_string()
}

fn default_advertise_address() -> String {
    "127.0.0.1".to_string()
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            url: default_registry_url(),
            service_name: default_service_name(),
            advertise_address: default_advertise_address(),
            advertise_port: None,
            check: CheckConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckConfig {
    #[serde(default = "default_check_interval")]
    pub interval_secs: u64,

    #[serde(default = "default_check_timeout")]
    pub timeout_secs: u64,

    #[serde(default = "default_deregister_after")]
    pub deregister_after_secs: u64,
}

fn default_check_interval() -> u64 {
    10
}

fn default_check_timeout() -> u64 {
    2
}

fn default_deregister_after() -> u64 {
    60
}

impl Default for CheckConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_check_interval(),
            timeout_secs: default_check_timeout(),
            deregister_after_secs: default_deregister_after(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeoutConfig {
    /// Bound on a single registry lookup
    #[serde(default = "default_lookup_timeout")]
    pub lookup_secs: u64,

    /// TCP connect timeout for downstream connections
    #[serde(default = "default_connect_timeout")]
    pub connect_secs: u64,

    /// Whole-request timeout for downstream calls (also the per-entry
    /// deadline inside composite aggregation)
    #[serde(default = "default_request_timeout")]
    pub request_secs: u64,
}

fn default_lookup_timeout() -> u64 {
    5
}

fn default_connect_timeout() -> u64 {
    2
}

fn default_request_timeout() -> u64 {
    10
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            lookup_secs: default_lookup_timeout(),
            connect_secs: default_connect_timeout(),
            request_secs: default_request_timeout(),
        }
    }
}

impl GatewayConfig {
    /// Load configuration from a TOML file
    pub fn load(path: &str) -> Result<Self, Box<dyn std::error::Error>> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// The port peers should reach this gateway on
    pub fn advertise_port(&self) -> u16 {
        self.registry.advertise_port.unwrap_or(self.server.port)
    }
}
