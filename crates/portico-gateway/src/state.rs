//! Application state for the gateway HTTP layer

use std::sync::Arc;

use portico_resolver::ConnectionCache;

use crate::aggregate::Aggregator;
use crate::routes::RouteTable;

/// State shared across all handlers.
///
/// Everything is explicitly constructed (in `porticod::main`) and handed
/// in; no component lives in a global.
#[derive(Clone)]
pub struct AppState {
    routes: Arc<RouteTable>,
    cache: Arc<ConnectionCache>,
    aggregator: Arc<Aggregator>,
}

impl AppState {
    pub fn new(routes: RouteTable, cache: Arc<ConnectionCache>, aggregator: Aggregator) -> Self {
        Self {
            routes: Arc::new(routes),
            cache,
            aggregator: Arc::new(aggregator),
        }
    }

    pub fn routes(&self) -> &RouteTable {
        &self.routes
    }

    pub fn cache(&self) -> &ConnectionCache {
        &self.cache
    }

    pub fn aggregator(&self) -> &Aggregator {
        &self.aggregator
    }
}
