//! porticod - Portico Gateway Daemon
//!
//! Registers itself with a Consul-style registry, then routes inbound
//! HTTP requests to healthy downstream instances by path prefix, fanning
//! composite endpoints out across services concurrently.
//!
//! Usage:
//!   porticod [config.toml]
//!
//! If no config file is provided, defaults are used: bind 0.0.0.0:8080,
//! registry at http://127.0.0.1:8500, no routes.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use portico_core::{HealthCheckSpec, Registration, ServiceRegistry};
use portico_gateway::{create_router, Aggregator, AppState, RouteTable};
use portico_registry::ConsulRegistry;
use portico_resolver::{ConnectionCache, ConnectionConfig, Resolver, ResolverConfig};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod config;
use config::GatewayConfig;

/// Parsed command-line arguments
struct Args {
    /// Daemon config file (TOML)
    config_path: Option<String>,
}

fn parse_args() -> Args {
    let mut result = Args { config_path: None };

    for arg in std::env::args().skip(1) {
        match arg.as_str() {
            "--help" | "-h" => {
                print_help();
                std::process::exit(0);
            }
            value if !value.starts_with('-') => {
                // Positional argument = config file
                result.config_path = Some(value.to_string());
            }
            _ => {
                tracing::warn!("Unknown argument: {}", arg);
            }
        }
    }

    result
}

fn print_help() {
    eprintln!(
        r#"porticod - Portico Gateway Daemon

Usage: porticod [OPTIONS] [config.toml]

Options:
  -h, --help    Print this help message

Examples:
  # Run with defaults (registry at http://127.0.0.1:8500)
  porticod

  # Run with a config file
  porticod portico.toml
"#
    );
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "porticod=info,portico_gateway=info,portico_registry=info,portico_resolver=info"
                    .into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting porticod (Portico Gateway Daemon)");

    let args = parse_args();

    let config = if let Some(ref path) = args.config_path {
        tracing::info!("Loading config from: {}", path);
        GatewayConfig::load(path)
            .map_err(|e| anyhow::anyhow!("Failed to load config '{}': {}", path, e))?
    } else {
        tracing::info!("No config file provided, using defaults");
        GatewayConfig::default()
    };

    let registry: Arc<dyn ServiceRegistry> = Arc::new(
        ConsulRegistry::new(&config.registry.url)
            .with_context(|| format!("Invalid registry URL: {}", config.registry.url))?,
    );

    // Register before serving: a gateway the registry does not know
    // about must not take traffic, so a failure here ends the process.
    let advertise_port = config.advertise_port();
    let instance_id = format!(
        "{}-{}",
        config.registry.service_name,
        uuid::Uuid::new_v4()
    );
    let registration = Registration {
        id: instance_id.clone(),
        name: config.registry.service_name.clone(),
        address: config.registry.advertise_address.clone(),
        port: advertise_port,
        check: HealthCheckSpec {
            target: format!(
                "http://{}:{}/health",
                config.registry.advertise_address, advertise_port
            ),
            interval: Duration::from_secs(config.registry.check.interval_secs),
            timeout: Duration::from_secs(config.registry.check.timeout_secs),
            deregister_after: Duration::from_secs(config.registry.check.deregister_after_secs),
        },
    };

    registry
        .register(&registration)
        .await
        .context("Startup registration failed")?;
    tracing::info!(
        id = %instance_id,
        registry = %config.registry.url,
        "Registered with service registry"
    );

    // Wire the resolution stack: registry -> resolver -> cache -> aggregator
    let resolver_config = ResolverConfig {
        lookup_timeout: Duration::from_secs(config.timeouts.lookup_secs),
        connection: ConnectionConfig {
            connect_timeout: Duration::from_secs(config.timeouts.connect_secs),
            request_timeout: Duration::from_secs(config.timeouts.request_secs),
        },
    };
    let resolver = Resolver::with_config(Arc::clone(&registry), resolver_config);
    let cache = Arc::new(ConnectionCache::new(resolver));
    let aggregator = Aggregator::with_call_timeout(
        Arc::clone(&cache),
        Duration::from_secs(config.timeouts.request_secs),
    );

    let route_table = RouteTable::new(config.routes.clone(), config.composites.clone());
    tracing::info!(
        direct = config.routes.len(),
        composite = config.composites.len(),
        "Route table loaded"
    );

    let state = AppState::new(route_table, cache, aggregator);
    let app = create_router(state);

    // Bind to address
    let addr: SocketAddr = format!("{}:{}", config.server.bind, config.server.port)
        .parse()
        .with_context(|| {
            format!(
                "Invalid bind address {}:{}",
                config.server.bind, config.server.port
            )
        })?;
    tracing::info!("Listening on http://{}", addr);

    // Run the server
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Best-effort: the registry's critical-expiry is the backstop if
    // this fails, so log instead of propagating.
    match registry.deregister(&instance_id).await {
        Ok(()) => tracing::info!(id = %instance_id, "Deregistered from service registry"),
        Err(e) => tracing::warn!(
            id = %instance_id,
            error = %e,
            "Failed to deregister, relying on registry expiry"
        ),
    }

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        return;
    }
    tracing::info!("Shutdown signal received");
}
