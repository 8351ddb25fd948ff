mod common;

use axum::http::StatusCode;
use common::{context, read_json};
use http_helpers::{empty_request, json_request, raw_request};
use tower::ServiceExt;
use vigil_api::keys;
use vigil_registry::Registry;

#[tokio::test]
async fn stash_path_roundtrip_with_slashes() {
    let ctx = context();

    let create = json_request(
        "POST",
        "/stash/silence/web",
        serde_json::json!({"reason": "maint"}),
    );
    let response = ctx.app.clone().oneshot(create).await.expect("create");
    assert_eq!(response.status(), StatusCode::CREATED);
    let payload = read_json(response).await;
    assert_eq!(payload["path"], "silence/web");

    let response = ctx
        .app
        .clone()
        .oneshot(empty_request("GET", "/stash/silence/web"))
        .await
        .expect("show");
    assert_eq!(response.status(), StatusCode::OK);
    let content = read_json(response).await;
    assert_eq!(content["reason"], "maint");

    let response = ctx
        .app
        .clone()
        .oneshot(empty_request("DELETE", "/stash/silence/web"))
        .await
        .expect("delete");
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert!(
        !ctx.registry
            .exists(&keys::stash_data("silence/web"))
            .await
            .expect("exists")
    );
    assert!(
        ctx.registry
            .smembers(keys::STASHES_SET)
            .await
            .expect("smembers")
            .is_empty()
    );

    let response = ctx
        .app
        .clone()
        .oneshot(empty_request("GET", "/stash/silence/web"))
        .await
        .expect("gone");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = ctx
        .app
        .clone()
        .oneshot(empty_request("DELETE", "/stash/silence/web"))
        .await
        .expect("delete again");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn stash_bodies_must_be_json() {
    let ctx = context();
    let response = ctx
        .app
        .clone()
        .oneshot(raw_request("POST", "/stash/bad", "not json"))
        .await
        .expect("bad body");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn stash_collection_create_honors_expire() {
    let ctx = context();

    let create = json_request(
        "POST",
        "/stashes",
        serde_json::json!({
            "path": "silence/web",
            "content": {"reason": "maint"},
            "expire": 60
        }),
    );
    let response = ctx.app.clone().oneshot(create).await.expect("create");
    assert_eq!(response.status(), StatusCode::CREATED);
    let payload = read_json(response).await;
    assert_eq!(payload["path"], "silence/web");

    let response = ctx
        .app
        .clone()
        .oneshot(empty_request("GET", "/stashes"))
        .await
        .expect("list");
    assert_eq!(response.status(), StatusCode::OK);
    let rows = read_json(response).await;
    let rows = rows.as_array().expect("array");
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["path"], "silence/web");
    assert_eq!(rows[0]["content"]["reason"], "maint");
    let expire = rows[0]["expire"].as_i64().expect("expire");
    assert!((0..=60).contains(&expire), "expire was {expire}");
}

#[tokio::test]
async fn stash_without_expire_reports_no_ttl() {
    let ctx = context();
    let create = json_request(
        "POST",
        "/stashes",
        serde_json::json!({"path": "notes", "content": {"text": "keep"}}),
    );
    let response = ctx.app.clone().oneshot(create).await.expect("create");
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = ctx
        .app
        .clone()
        .oneshot(empty_request("GET", "/stashes"))
        .await
        .expect("list");
    let rows = read_json(response).await;
    assert_eq!(rows[0]["expire"], -1);
}

#[tokio::test]
async fn stash_collection_create_validates_input() {
    let ctx = context();
    for body in [
        serde_json::json!({"content": {"reason": "maint"}}),
        serde_json::json!({"path": "x", "content": "not an object"}),
        serde_json::json!({"path": "x", "content": {}, "expire": "60"}),
        serde_json::json!({"path": 7, "content": {}}),
    ] {
        let response = ctx
            .app
            .clone()
            .oneshot(json_request("POST", "/stashes", body))
            .await
            .expect("invalid");
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}

#[tokio::test]
async fn stash_listing_paginates_and_self_repairs() {
    let ctx = context();
    for index in 0..5 {
        let create = json_request(
            "POST",
            "/stashes",
            serde_json::json!({"path": format!("stash-{index}"), "content": {"index": index}}),
        );
        let response = ctx.app.clone().oneshot(create).await.expect("create");
        assert_eq!(response.status(), StatusCode::CREATED);
    }
    // A dangling path with no value behind it.
    ctx.registry
        .sadd(keys::STASHES_SET, "ghost")
        .await
        .expect("sadd");

    let response = ctx
        .app
        .clone()
        .oneshot(empty_request("GET", "/stashes?limit=2&offset=1"))
        .await
        .expect("list");
    assert_eq!(response.status(), StatusCode::OK);
    let header = response
        .headers()
        .get("X-Pagination")
        .expect("pagination header")
        .to_str()
        .expect("ascii")
        .to_string();
    let header: serde_json::Value = serde_json::from_str(&header).expect("json");
    assert_eq!(header["limit"], 2);
    assert_eq!(header["offset"], 1);
    assert_eq!(header["total"], 5);
    let rows = read_json(response).await;
    assert_eq!(rows.as_array().expect("array").len(), 2);

    for _ in 0..50 {
        let paths = ctx
            .registry
            .smembers(keys::STASHES_SET)
            .await
            .expect("paths");
        if !paths.contains(&"ghost".to_string()) {
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }
    assert!(
        !ctx.registry
            .smembers(keys::STASHES_SET)
            .await
            .expect("paths")
            .contains(&"ghost".to_string())
    );
}
