//! Aggregator - concurrent fan-out over downstream services
//!
//! Dispatches every entry of a composite request at once, waits for all
//! of them (fan-out/fan-in barrier), and joins the outcomes by service
//! name. No retries; a failed entry invalidates that service's cached
//! connection so the next request re-resolves.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use serde_json::{Map, Value};
use tracing::debug;

use portico_core::{GatewayError, GatewayResult};
use portico_resolver::ConnectionCache;

/// One downstream call of a composite request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubRequest {
    pub service: String,
    pub path: String,
}

/// The set of downstream calls derived from one inbound request.
/// Request-scoped; discarded once the composite result is serialized.
#[derive(Debug, Clone)]
pub struct CompositeRequest {
    pub entries: Vec<SubRequest>,
}

/// What happened to one entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryOutcome {
    Success(Value),
    Failed(String),
}

/// Outcomes of an aggregation, keyed by service name.
#[derive(Debug, Default)]
pub struct CompositeResult {
    entries: BTreeMap<String, EntryOutcome>,
}

impl CompositeResult {
    /// `true` when every entry succeeded
    pub fn is_success(&self) -> bool {
        self.entries
            .values()
            .all(|outcome| matches!(outcome, EntryOutcome::Success(_)))
    }

    /// The outcome recorded for `service`, if any
    pub fn outcome(&self, service: &str) -> Option<&EntryOutcome> {
        self.entries.get(service)
    }

    /// Error message per failed entry
    pub fn errors(&self) -> BTreeMap<&str, &str> {
        self.entries
            .iter()
            .filter_map(|(service, outcome)| match outcome {
                EntryOutcome::Failed(message) => Some((service.as_str(), message.as_str())),
                EntryOutcome::Success(_) => None,
            })
            .collect()
    }

    /// The success body: one named field per entry.
    ///
    /// Only meaningful when [`is_success`](Self::is_success) holds; the
    /// gateway's all-or-nothing policy never serializes partial payloads.
    pub fn into_body(self) -> Value {
        let mut fields = Map::new();
        for (service, outcome) in self.entries {
            if let EntryOutcome::Success(value) = outcome {
                fields.insert(service, value);
            }
        }
        Value::Object(fields)
    }
}

/// Fan-out executor for composite requests.
pub struct Aggregator {
    cache: Arc<ConnectionCache>,
    call_timeout: Duration,
}

impl Aggregator {
    /// Aggregator with the default 10s per-entry deadline
    pub fn new(cache: Arc<ConnectionCache>) -> Self {
        Self::with_call_timeout(cache, Duration::from_secs(10))
    }

    /// Aggregator with a custom per-entry deadline. The deadline covers
    /// the whole entry lifecycle: connection resolution plus the
    /// downstream call.
    pub fn with_call_timeout(cache: Arc<ConnectionCache>, call_timeout: Duration) -> Self {
        Self {
            cache,
            call_timeout,
        }
    }

    /// Run every entry concurrently and wait for all of them.
    ///
    /// Results are joined by service name, not completion order. Entries
    /// that exceed the per-entry deadline fail with the timeout error and
    /// participate in the composite result like any other failure.
    pub async fn aggregate(&self, request: CompositeRequest) -> CompositeResult {
        let calls = request.entries.iter().map(|entry| async move {
            let outcome = match tokio::time::timeout(self.call_timeout, self.dispatch(entry)).await
            {
                Ok(Ok(value)) => EntryOutcome::Success(value),
                Ok(Err(err)) => EntryOutcome::Failed(err.to_string()),
                Err(_) => EntryOutcome::Failed(GatewayError::Timeout.to_string()),
            };
            (entry.service.clone(), outcome)
        });

        let outcomes = join_all(calls).await;

        let result = CompositeResult {
            entries: outcomes.into_iter().collect(),
        };
        debug!(
            entries = result.entries.len(),
            success = result.is_success(),
            "Aggregation complete"
        );
        result
    }

    /// One entry: resolve a connection, issue the call, and on any
    /// failure evict the connection so the next request re-resolves.
    async fn dispatch(&self, entry: &SubRequest) -> GatewayResult<Value> {
        let connection = self.cache.get(&entry.service).await?;

        match connection.get_json(&entry.path).await {
            Ok(value) => Ok(value),
            Err(err) => {
                self.cache.invalidate(&entry.service).await;
                Err(err)
            }
        }
    }
}
