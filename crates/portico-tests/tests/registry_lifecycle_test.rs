//! Registration/health/lookup round trips against a fake Consul agent
//!
//! Exercises `ConsulRegistry` over real HTTP: the fake agent implements
//! the three endpoints the gateway depends on and tracks passing state
//! the way Consul does (registered instances stay critical until their
//! first probe succeeds).

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, put};
use axum::{Json, Router};
use serde_json::{json, Value};

use portico_core::{HealthCheckSpec, Registration, ServiceRegistry};
use portico_registry::ConsulRegistry;
use portico_tests::TestServer;

#[derive(Clone, Debug)]
struct AgentInstance {
    name: String,
    address: String,
    port: u16,
    passing: bool,
    check_target: String,
}

type AgentState = Arc<Mutex<HashMap<String, AgentInstance>>>;

/// Minimal Consul agent: register, deregister, health-filtered lookup.
fn fake_consul(state: AgentState) -> Router {
    Router::new()
        .route(
            "/v1/agent/service/register",
            put(
                |State(state): State<AgentState>, Json(body): Json<Value>| async move {
                    let id = body["ID"].as_str().unwrap_or_default().to_string();
                    if id.is_empty() {
                        return StatusCode::BAD_REQUEST;
                    }
                    let instance = AgentInstance {
                        name: body["Name"].as_str().unwrap_or_default().to_string(),
                        address: body["Address"].as_str().unwrap_or_default().to_string(),
                        port: body["Port"].as_u64().unwrap_or_default() as u16,
                        // Health unknown until the first probe
                        passing: false,
                        check_target: body["Check"]["HTTP"]
                            .as_str()
                            .unwrap_or_default()
                            .to_string(),
                    };
                    state.lock().unwrap().insert(id, instance);
                    StatusCode::OK
                },
            ),
        )
        .route(
            "/v1/agent/service/deregister/{id}",
            put(
                |State(state): State<AgentState>, Path(id): Path<String>| async move {
                    state.lock().unwrap().remove(&id);
                    StatusCode::OK
                },
            ),
        )
        .route(
            "/v1/health/service/{name}",
            get(
                |State(state): State<AgentState>, Path(name): Path<String>| async move {
                    let entries: Vec<Value> = state
                        .lock()
                        .unwrap()
                        .values()
                        .filter(|instance| instance.name == name && instance.passing)
                        .map(|instance| {
                            json!({
                                "Node": { "Address": "consul-node" },
                                "Service": {
                                    "Service": instance.name,
                                    "Address": instance.address,
                                    "Port": instance.port,
                                },
                            })
                        })
                        .collect();
                    Json(Value::Array(entries))
                },
            ),
        )
        .with_state(state)
}

fn mark_passing(state: &AgentState, id: &str) {
    if let Some(instance) = state.lock().unwrap().get_mut(id) {
        instance.passing = true;
    }
}

fn registration(id: &str, name: &str, port: u16) -> Registration {
    Registration {
        id: id.to_string(),
        name: name.to_string(),
        address: "10.0.0.1".to_string(),
        port,
        check: HealthCheckSpec::new(format!("http://10.0.0.1:{}/health", port)),
    }
}

#[tokio::test]
async fn register_then_lookup_round_trip() {
    let state: AgentState = Arc::new(Mutex::new(HashMap::new()));
    let agent = TestServer::start(fake_consul(Arc::clone(&state))).await;
    let registry = ConsulRegistry::new(&agent.base_url()).unwrap();

    registry
        .register(&registration("users-1", "users-service", 9001))
        .await
        .unwrap();

    // The agent received the probe spec
    assert_eq!(
        state.lock().unwrap()["users-1"].check_target,
        "http://10.0.0.1:9001/health"
    );

    // Registered but not yet probed: excluded from healthy lookups
    assert!(registry
        .lookup_healthy("users-service")
        .await
        .unwrap()
        .is_empty());

    // First probe passes
    mark_passing(&state, "users-1");

    let records = registry.lookup_healthy("users-service").await.unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].name, "users-service");
    assert_eq!(records[0].address, "10.0.0.1");
    assert_eq!(records[0].port, 9001);
    assert!(records[0].healthy);
}

#[tokio::test]
async fn registration_is_idempotent() {
    let state: AgentState = Arc::new(Mutex::new(HashMap::new()));
    let agent = TestServer::start(fake_consul(Arc::clone(&state))).await;
    let registry = ConsulRegistry::new(&agent.base_url()).unwrap();

    let reg = registration("users-1", "users-service", 9001);
    registry.register(&reg).await.unwrap();
    registry.register(&reg).await.unwrap();

    assert_eq!(state.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn deregistered_instances_vanish_from_lookups() {
    let state: AgentState = Arc::new(Mutex::new(HashMap::new()));
    let agent = TestServer::start(fake_consul(Arc::clone(&state))).await;
    let registry = ConsulRegistry::new(&agent.base_url()).unwrap();

    registry
        .register(&registration("users-1", "users-service", 9001))
        .await
        .unwrap();
    mark_passing(&state, "users-1");
    assert_eq!(
        registry.lookup_healthy("users-service").await.unwrap().len(),
        1
    );

    registry.deregister("users-1").await.unwrap();
    assert!(registry
        .lookup_healthy("users-service")
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn lookups_only_see_the_requested_service() {
    let state: AgentState = Arc::new(Mutex::new(HashMap::new()));
    let agent = TestServer::start(fake_consul(Arc::clone(&state))).await;
    let registry = ConsulRegistry::new(&agent.base_url()).unwrap();

    registry
        .register(&registration("users-1", "users-service", 9001))
        .await
        .unwrap();
    registry
        .register(&registration("products-1", "products-service", 9002))
        .await
        .unwrap();
    mark_passing(&state, "users-1");
    mark_passing(&state, "products-1");

    let records = registry.lookup_healthy("products-service").await.unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].port, 9002);
}

#[tokio::test]
async fn unreachable_registry_fails_registration() {
    // Nothing listens here
    let registry = ConsulRegistry::new("http://127.0.0.1:1").unwrap();

    let err = registry
        .register(&registration("users-1", "users-service", 9001))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        portico_core::GatewayError::Registration(_)
    ));
}
