#![allow(dead_code)]
use std::sync::Arc;
use vigil_api::app::{AppState, build_router};
use vigil_api::config::{ApiSettings, Settings, default_cors};
use vigil_api::validator::StandardValidator;
use vigil_registry::{MemoryRegistry, Registry};
use vigil_transport::MemoryTransport;

pub type App = axum::routing::RouterIntoService<axum::body::Body, ()>;

/// Router plus handles onto the in-process backends behind it.
pub struct TestContext {
    pub registry: Arc<MemoryRegistry>,
    pub transport: Arc<MemoryTransport>,
    pub app: App,
}

pub fn test_settings() -> Settings {
    Settings {
        api: ApiSettings {
            bind: "127.0.0.1".to_string(),
            port: 0,
            user: None,
            password: None,
        },
        cors: default_cors(),
        checks: serde_json::Map::new(),
        metrics_bind: "127.0.0.1:0".parse().expect("metrics bind"),
    }
}

pub fn context() -> TestContext {
    context_with(test_settings())
}

pub fn context_with(settings: Settings) -> TestContext {
    let registry = Arc::new(MemoryRegistry::new());
    let transport = Arc::new(MemoryTransport::new());
    let state = AppState {
        settings: Arc::new(settings),
        registry: registry.clone(),
        transport: transport.clone(),
        validator: Arc::new(StandardValidator::new()),
    };
    TestContext {
        registry,
        transport,
        app: build_router(state).into_service(),
    }
}

pub async fn read_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    serde_json::from_slice(&bytes).expect("json")
}

pub async fn read_body(response: axum::response::Response) -> Vec<u8> {
    axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body")
        .to_vec()
}

/// Seed a registered client the way POST /clients would store it.
pub async fn seed_client(registry: &MemoryRegistry, name: &str) {
    let client = serde_json::json!({
        "name": name,
        "address": "10.0.0.7",
        "subscriptions": ["roles:web"],
        "keepalives": false,
        "version": vigil_api::config::VERSION,
        "timestamp": 1_700_000_000
    });
    registry
        .set(&vigil_api::keys::client_data(name), &client.to_string())
        .await
        .expect("seed client data");
    registry
        .sadd(vigil_api::keys::CLIENTS_SET, name)
        .await
        .expect("seed client index");
}

/// Seed the latest result for a (client, check) pair.
pub async fn seed_result(
    registry: &MemoryRegistry,
    client: &str,
    check: &str,
    status: i64,
    executed: i64,
    output: &str,
) {
    let result = serde_json::json!({
        "name": check,
        "status": status,
        "output": output,
        "executed": executed
    });
    registry
        .set(
            &vigil_api::keys::result_data(client, check),
            &result.to_string(),
        )
        .await
        .expect("seed result data");
    registry
        .sadd(&vigil_api::keys::result_index(client), check)
        .await
        .expect("seed result index");
}

/// Seed a firing event for a (client, check) pair.
pub fn seed_event(registry: &MemoryRegistry, client: &str, check: &str, status: i64) {
    let event = serde_json::json!({
        "client": {"name": client},
        "check": {
            "name": check,
            "status": status,
            "output": "something is wrong",
            "history": [status, status]
        }
    });
    registry.hset(
        &vigil_api::keys::client_events(client),
        check,
        &event.to_string(),
    );
}
