mod common;

use axum::http::StatusCode;
use common::{context, context_with, read_json, test_settings};
use http_helpers::{empty_request, json_request, raw_request};
use tower::ServiceExt;
use vigil_api::config::VERSION;
use vigil_api::keys;
use vigil_registry::Registry;
use vigil_transport::Exchange;

fn settings_with_checks() -> vigil_api::config::Settings {
    let mut settings = test_settings();
    settings.checks = serde_json::json!({
        "cpu": {
            "command": "check-cpu --warn 80",
            "interval": 60
        },
        "disk": {
            "command": "check-disk",
            "subscribers": ["roles:db"]
        }
    })
    .as_object()
    .cloned()
    .expect("checks");
    settings
}

#[tokio::test]
async fn client_registration_roundtrip() {
    let ctx = context();

    let create = json_request("POST", "/clients", serde_json::json!({"name": "web-01"}));
    let response = ctx.app.clone().oneshot(create).await.expect("create");
    assert_eq!(response.status(), StatusCode::CREATED);
    let payload = read_json(response).await;
    assert_eq!(payload["name"], "web-01");

    let show = empty_request("GET", "/clients/web-01");
    let response = ctx.app.clone().oneshot(show).await.expect("show");
    assert_eq!(response.status(), StatusCode::OK);
    let client = read_json(response).await;
    assert_eq!(client["name"], "web-01");
    assert_eq!(client["keepalives"], false);
    assert_eq!(client["version"], VERSION);
    assert!(client["timestamp"].is_i64() || client["timestamp"].is_u64());

    let list = empty_request("GET", "/clients");
    let response = ctx.app.clone().oneshot(list).await.expect("list");
    assert_eq!(response.status(), StatusCode::OK);
    let clients = read_json(response).await;
    assert_eq!(clients.as_array().expect("array").len(), 1);
}

#[tokio::test]
async fn client_registration_preserves_explicit_keepalives() {
    let ctx = context();
    let create = json_request(
        "POST",
        "/clients",
        serde_json::json!({"name": "web-02", "keepalives": true}),
    );
    let response = ctx.app.clone().oneshot(create).await.expect("create");
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = ctx
        .app
        .clone()
        .oneshot(empty_request("GET", "/clients/web-02"))
        .await
        .expect("show");
    let client = read_json(response).await;
    assert_eq!(client["keepalives"], true);
}

#[tokio::test]
async fn client_registration_rejects_bad_payloads() {
    let ctx = context();
    for body in [
        serde_json::json!({}),
        serde_json::json!({"name": "web 01"}),
        serde_json::json!({"name": 7}),
        serde_json::json!({"name": "web-01", "subscriptions": "roles:web"}),
    ] {
        let response = ctx
            .app
            .clone()
            .oneshot(json_request("POST", "/clients", body))
            .await
            .expect("create");
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    let response = ctx
        .app
        .clone()
        .oneshot(raw_request("POST", "/clients", "not json"))
        .await
        .expect("create");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn missing_client_and_unknown_routes_are_not_found() {
    let ctx = context();
    let response = ctx
        .app
        .clone()
        .oneshot(empty_request("GET", "/clients/missing"))
        .await
        .expect("show");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = ctx
        .app
        .clone()
        .oneshot(empty_request("GET", "/no/such/route"))
        .await
        .expect("unknown");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn dangling_client_index_self_repairs() {
    let ctx = context();
    ctx.registry
        .sadd(keys::CLIENTS_SET, "ghost")
        .await
        .expect("seed");

    let response = ctx
        .app
        .clone()
        .oneshot(empty_request("GET", "/clients"))
        .await
        .expect("list");
    assert_eq!(response.status(), StatusCode::OK);
    let clients = read_json(response).await;
    assert!(clients.as_array().expect("array").is_empty());

    // The removal is fire-and-forget; give the spawned task a moment.
    for _ in 0..50 {
        if ctx
            .registry
            .smembers(keys::CLIENTS_SET)
            .await
            .expect("smembers")
            .is_empty()
        {
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }
    assert!(
        ctx.registry
            .smembers(keys::CLIENTS_SET)
            .await
            .expect("smembers")
            .is_empty()
    );
}

#[tokio::test]
async fn check_definitions_are_returned_verbatim() {
    let ctx = context_with(settings_with_checks());

    let response = ctx
        .app
        .clone()
        .oneshot(empty_request("GET", "/checks"))
        .await
        .expect("checks");
    assert_eq!(response.status(), StatusCode::OK);
    let checks = read_json(response).await;
    assert_eq!(checks["cpu"]["interval"], 60);
    assert_eq!(checks["disk"]["subscribers"][0], "roles:db");

    let response = ctx
        .app
        .clone()
        .oneshot(empty_request("GET", "/checks/cpu"))
        .await
        .expect("check");
    assert_eq!(response.status(), StatusCode::OK);
    let check = read_json(response).await;
    assert_eq!(check["name"], "cpu");
    assert_eq!(check["command"], "check-cpu --warn 80");

    let response = ctx
        .app
        .clone()
        .oneshot(empty_request("GET", "/checks/missing"))
        .await
        .expect("missing check");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn check_request_routes_each_subscription() {
    let ctx = context_with(settings_with_checks());

    let request = json_request(
        "POST",
        "/request",
        serde_json::json!({"check": "cpu", "subscribers": ["direct:hostA", "roles:web"]}),
    );
    let response = ctx.app.clone().oneshot(request).await.expect("request");
    assert_eq!(response.status(), StatusCode::ACCEPTED);
    let payload = read_json(response).await;
    assert!(payload["issued"].is_i64() || payload["issued"].is_u64());

    let published = ctx.transport.published();
    assert_eq!(published.len(), 2);
    assert_eq!(published[0].exchange, Exchange::Direct);
    assert_eq!(published[0].routing_key, "direct:hostA");
    assert_eq!(published[1].exchange, Exchange::Fanout);
    assert_eq!(published[1].routing_key, "roles:web");

    let request_payload: serde_json::Value =
        serde_json::from_slice(&published[0].payload).expect("payload");
    assert_eq!(request_payload["name"], "cpu");
    assert_eq!(request_payload["command"], "check-cpu --warn 80");
}

#[tokio::test]
async fn check_request_inherits_definition_subscribers() {
    let ctx = context_with(settings_with_checks());

    let request = json_request("POST", "/request", serde_json::json!({"check": "disk"}));
    let response = ctx.app.clone().oneshot(request).await.expect("request");
    assert_eq!(response.status(), StatusCode::ACCEPTED);

    let published = ctx.transport.published();
    assert_eq!(published.len(), 1);
    assert_eq!(published[0].exchange, Exchange::Fanout);
    assert_eq!(published[0].routing_key, "roles:db");
}

#[tokio::test]
async fn check_request_validates_input() {
    let ctx = context_with(settings_with_checks());

    let unknown = json_request("POST", "/request", serde_json::json!({"check": "missing"}));
    let response = ctx.app.clone().oneshot(unknown).await.expect("unknown");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let malformed = json_request("POST", "/request", serde_json::json!({"subscribers": []}));
    let response = ctx.app.clone().oneshot(malformed).await.expect("malformed");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let mistyped = json_request(
        "POST",
        "/request",
        serde_json::json!({"check": "cpu", "subscribers": "roles:web"}),
    );
    let response = ctx.app.clone().oneshot(mistyped).await.expect("mistyped");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    assert!(ctx.transport.published().is_empty());
}
