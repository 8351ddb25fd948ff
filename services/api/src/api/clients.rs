//! Client API handlers.
//!
//! # Purpose
//! Registration, enumeration, per-check history, and deletion of monitored
//! hosts. Deletion resolves the client's firing events first, answers 202,
//! and purges registry state from a detached background task.
use super::error::{ApiError, bad_request, internal, not_found};
use super::types::{HistoryRow, NameResponse};
use super::{attach_pagination, issued, paginate, require_name, self_repair};
use crate::app::AppState;
use crate::config::VERSION;
use crate::model::unix_timestamp;
use crate::{keys, publish};
use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use bytes::Bytes;
use futures::future::join_all;
use serde_json::{Value, json};
use std::collections::HashMap;
use std::time::Duration;

#[utoipa::path(
    post,
    path = "/clients",
    tag = "clients",
    request_body(content = Object, description = "Client registration payload"),
    responses(
        (status = 201, description = "Client registered", body = NameResponse),
        (status = 400, description = "Malformed or invalid payload")
    )
)]
pub(crate) async fn create_client(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Response, ApiError> {
    let mut client = super::params::read_object(&body)?;
    // Registration owns these fields regardless of what the payload claims.
    let keepalives = client
        .get("keepalives")
        .filter(|value| !value.is_null())
        .cloned()
        .unwrap_or(Value::Bool(false));
    client.insert("keepalives".to_string(), keepalives);
    client.insert("version".to_string(), json!(VERSION));
    client.insert("timestamp".to_string(), json!(unix_timestamp()));
    if !state.validator.valid(&client) {
        return Err(bad_request());
    }
    let name = client
        .get("name")
        .and_then(Value::as_str)
        .ok_or_else(bad_request)?
        .to_string();
    // Write the data key before joining the index set; readers that observe
    // the index early fall back to self-repair.
    state
        .registry
        .set(&keys::client_data(&name), &Value::Object(client).to_string())
        .await
        .map_err(|err| internal("failed to store client", &err))?;
    state
        .registry
        .sadd(keys::CLIENTS_SET, &name)
        .await
        .map_err(|err| internal("failed to index client", &err))?;
    Ok((StatusCode::CREATED, Json(NameResponse { name })).into_response())
}

#[utoipa::path(
    get,
    path = "/clients",
    tag = "clients",
    params(
        ("limit" = Option<u64>, Query, description = "Page size"),
        ("offset" = Option<u64>, Query, description = "Page start")
    ),
    responses(
        (status = 200, description = "Registered clients", body = [Object])
    )
)]
pub(crate) async fn list_clients(
    State(state): State<AppState>,
    Query(query): Query<HashMap<String, String>>,
) -> Result<Response, ApiError> {
    let names = state
        .registry
        .smembers(keys::CLIENTS_SET)
        .await
        .map_err(|err| internal("failed to enumerate clients", &err))?;
    let page = paginate(names, &query);
    let data_keys: Vec<String> = page.items.iter().map(|name| keys::client_data(name)).collect();
    let values = join_all(data_keys.iter().map(|key| state.registry.get(key))).await;

    let mut clients = Vec::new();
    for (name, value) in page.items.iter().zip(values) {
        match value.map_err(|err| internal("failed to read client", &err))? {
            Some(raw) => match serde_json::from_str::<Value>(&raw) {
                Ok(client) => clients.push(client),
                Err(err) => {
                    tracing::warn!(error = %err, client = %name, "discarding unparsable client data");
                }
            },
            None => self_repair(&state, keys::CLIENTS_SET, name),
        }
    }
    Ok(attach_pagination(Json(clients).into_response(), page.header))
}

#[utoipa::path(
    get,
    path = "/clients/{name}",
    tag = "clients",
    params(("name" = String, Path, description = "Client name")),
    responses(
        (status = 200, description = "Client data", body = Object),
        (status = 404, description = "Unknown client")
    )
)]
pub(crate) async fn get_client(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<Value>, ApiError> {
    require_name(&name)?;
    let raw = state
        .registry
        .get(&keys::client_data(&name))
        .await
        .map_err(|err| internal("failed to read client", &err))?
        .ok_or_else(not_found)?;
    let client =
        serde_json::from_str(&raw).map_err(|err| internal("stored client is not valid json", &err))?;
    Ok(Json(client))
}

#[utoipa::path(
    get,
    path = "/clients/{name}/history",
    tag = "clients",
    params(("name" = String, Path, description = "Client name")),
    responses(
        (status = 200, description = "Recent status history per check", body = [HistoryRow])
    )
)]
pub(crate) async fn client_history(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<Vec<HistoryRow>>, ApiError> {
    require_name(&name)?;
    let checks = state
        .registry
        .smembers(&keys::result_index(&name))
        .await
        .map_err(|err| internal("failed to enumerate client results", &err))?;

    let client = name.as_str();
    let registry = &state.registry;
    let reads = checks.iter().map(|check| async move {
        let history = registry
            .lrange(&keys::check_history(client, check), -21, -1)
            .await;
        let result = registry.get(&keys::result_data(client, check)).await;
        (history, result)
    });
    let outcomes = join_all(reads).await;

    let mut rows = Vec::new();
    for (check, (history, result)) in checks.iter().zip(outcomes) {
        let history = history.map_err(|err| internal("failed to read check history", &err))?;
        let result = result.map_err(|err| internal("failed to read check result", &err))?;
        let (Some(raw), false) = (result, history.is_empty()) else {
            continue;
        };
        let Ok(last_result) = serde_json::from_str::<Value>(&raw) else {
            tracing::warn!(client = %name, check = %check, "discarding unparsable result data");
            continue;
        };
        let history: Vec<i64> = history
            .iter()
            .map(|status| status.parse().unwrap_or(0))
            .collect();
        rows.push(HistoryRow {
            check: check.clone(),
            last_execution: last_result.get("executed").and_then(Value::as_i64).unwrap_or(0),
            last_status: history.last().copied().unwrap_or(0),
            history,
            last_result,
        });
    }
    Ok(Json(rows))
}

#[utoipa::path(
    delete,
    path = "/clients/{name}",
    tag = "clients",
    params(("name" = String, Path, description = "Client name")),
    responses(
        (status = 202, description = "Deletion issued", body = crate::api::types::IssuedResponse),
        (status = 404, description = "Unknown client")
    )
)]
pub(crate) async fn delete_client(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Response, ApiError> {
    require_name(&name)?;
    let known = state
        .registry
        .exists(&keys::client_data(&name))
        .await
        .map_err(|err| internal("failed to look up client", &err))?;
    if !known {
        return Err(not_found());
    }
    // Resolve every firing event before the purge begins; the resolutions
    // flow through the pipeline like any other result.
    let events = state
        .registry
        .hgetall(&keys::client_events(&name))
        .await
        .map_err(|err| internal("failed to read client events", &err))?;
    for raw in events.values() {
        match serde_json::from_str::<Value>(raw) {
            Ok(event) => publish::event_resolution(state.transport.as_ref(), &event).await,
            Err(err) => {
                tracing::warn!(error = %err, client = %name, "skipping unparsable event during deletion");
            }
        }
    }
    spawn_client_purge(state.clone(), name);
    Ok(issued())
}

// Bounded probe loop: wait for the resolutions to clear the event hash (up
// to five one-second probes), then purge unconditionally.
fn spawn_client_purge(state: AppState, name: String) {
    tokio::spawn(async move {
        let events_key = keys::client_events(&name);
        let mut attempt = 0;
        loop {
            let remaining = match state.registry.hgetall(&events_key).await {
                Ok(events) => events.len(),
                Err(err) => {
                    tracing::warn!(error = %err, client = %name, "event probe failed during deletion");
                    0
                }
            };
            if remaining == 0 || attempt == 5 {
                break;
            }
            attempt += 1;
            tokio::time::sleep(Duration::from_secs(1)).await;
        }
        purge_client(&state, &name).await;
    });
}

async fn purge_client(state: &AppState, name: &str) {
    let registry = state.registry.as_ref();
    if let Err(err) = registry.srem(keys::CLIENTS_SET, name).await {
        tracing::warn!(error = %err, client = %name, "failed to deindex client");
    }
    for key in [
        keys::client_data(name),
        keys::client_signature(name),
        keys::client_events(name),
    ] {
        if let Err(err) = registry.del(&key).await {
            tracing::warn!(error = %err, key = %key, "failed to delete client key");
        }
    }
    let checks = match registry.smembers(&keys::result_index(name)).await {
        Ok(checks) => checks,
        Err(err) => {
            tracing::warn!(error = %err, client = %name, "failed to enumerate results during purge");
            Vec::new()
        }
    };
    for check in checks {
        for key in [keys::result_data(name, &check), keys::check_history(name, &check)] {
            if let Err(err) = registry.del(&key).await {
                tracing::warn!(error = %err, key = %key, "failed to delete result key");
            }
        }
    }
    if let Err(err) = registry.del(&keys::result_index(name)).await {
        tracing::warn!(error = %err, client = %name, "failed to delete result index");
    }
    tracing::info!(client = %name, "client data purged");
}
