//! portico-gateway - routing and aggregation HTTP layer
//!
//! This crate maps inbound request paths to logical service names,
//! forwards direct routes through cached connections, fans composite
//! routes out across services concurrently, and converts every failure
//! into a structured HTTP response.
//!
//! # Usage
//!
//! ```ignore
//! use portico_gateway::{create_router, Aggregator, AppState, RouteTable};
//! use portico_resolver::{ConnectionCache, Resolver};
//!
//! let cache = Arc::new(ConnectionCache::new(Resolver::new(registry)));
//! let state = AppState::new(routes, Arc::clone(&cache), Aggregator::new(cache));
//! let router = create_router(state);
//! ```

pub mod aggregate;
pub mod error;
pub mod handlers;
pub mod routes;
pub mod state;

pub use aggregate::{Aggregator, CompositeRequest, CompositeResult, EntryOutcome, SubRequest};
pub use error::ApiError;
pub use routes::{CompositeEntry, CompositeRoute, DirectRoute, RouteMatch, RouteTable};
pub use state::AppState;

use axum::routing::get;
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Create the gateway router with the given application state.
///
/// `/health` and `/routes` are reserved; everything else falls through
/// to the forwarding handler.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Health check (also the target of our own registry probe)
        .route("/health", get(|| async { "OK" }))
        // Route table introspection
        .route("/routes", get(handlers::list_routes))
        // Everything else is forwarded downstream
        .fallback(handlers::forward)
        // Middleware
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
