//! Event API handlers.
//!
//! # Purpose
//! Events are owned by the rest of the pipeline; the API enumerates them and
//! resolves them by publishing a forced-OK pseudo-result. The stored event
//! disappears only once that result flows back through the pipeline.
use super::error::{ApiError, internal, not_found};
use super::params::{self, Kind, Rule};
use super::{issued, require_name};
use crate::app::AppState;
use crate::{keys, publish};
use axum::Json;
use axum::extract::{Path, State};
use axum::response::Response;
use bytes::Bytes;
use futures::future::join_all;
use serde_json::Value;

#[utoipa::path(
    get,
    path = "/events",
    tag = "events",
    responses(
        (status = 200, description = "Every currently-firing event", body = [Object])
    )
)]
pub(crate) async fn list_events(
    State(state): State<AppState>,
) -> Result<Json<Vec<Value>>, ApiError> {
    let clients = state
        .registry
        .smembers(keys::CLIENTS_SET)
        .await
        .map_err(|err| internal("failed to enumerate clients", &err))?;
    let hash_keys: Vec<String> = clients.iter().map(|client| keys::client_events(client)).collect();
    let hashes = join_all(hash_keys.iter().map(|key| state.registry.hgetall(key))).await;

    let mut events = Vec::new();
    for hash in hashes {
        let hash = hash.map_err(|err| internal("failed to read events", &err))?;
        for raw in hash.values() {
            match serde_json::from_str::<Value>(raw) {
                Ok(event) => events.push(event),
                Err(err) => tracing::warn!(error = %err, "discarding unparsable event data"),
            }
        }
    }
    Ok(Json(events))
}

#[utoipa::path(
    get,
    path = "/events/{client}",
    tag = "events",
    params(("client" = String, Path, description = "Client name")),
    responses(
        (status = 200, description = "Firing events for one client", body = [Object])
    )
)]
pub(crate) async fn list_client_events(
    State(state): State<AppState>,
    Path(client): Path<String>,
) -> Result<Json<Vec<Value>>, ApiError> {
    require_name(&client)?;
    let hash = state
        .registry
        .hgetall(&keys::client_events(&client))
        .await
        .map_err(|err| internal("failed to read events", &err))?;
    let mut events = Vec::new();
    for raw in hash.values() {
        match serde_json::from_str::<Value>(raw) {
            Ok(event) => events.push(event),
            Err(err) => {
                tracing::warn!(error = %err, client = %client, "discarding unparsable event data");
            }
        }
    }
    Ok(Json(events))
}

#[utoipa::path(
    get,
    path = "/events/{client}/{check}",
    tag = "events",
    params(
        ("client" = String, Path, description = "Client name"),
        ("check" = String, Path, description = "Check name")
    ),
    responses(
        (status = 200, description = "The event", body = Object),
        (status = 404, description = "No such event")
    )
)]
pub(crate) async fn get_event(
    State(state): State<AppState>,
    Path((client, check)): Path<(String, String)>,
) -> Result<Json<Value>, ApiError> {
    require_name(&client)?;
    require_name(&check)?;
    let hash = state
        .registry
        .hgetall(&keys::client_events(&client))
        .await
        .map_err(|err| internal("failed to read events", &err))?;
    let raw = hash.get(&check).ok_or_else(not_found)?;
    let event = serde_json::from_str(raw)
        .map_err(|err| internal("stored event is not valid json", &err))?;
    Ok(Json(event))
}

#[utoipa::path(
    delete,
    path = "/events/{client}/{check}",
    tag = "events",
    params(
        ("client" = String, Path, description = "Client name"),
        ("check" = String, Path, description = "Check name")
    ),
    responses(
        (status = 202, description = "Resolution issued", body = crate::api::types::IssuedResponse),
        (status = 404, description = "No such event")
    )
)]
pub(crate) async fn delete_event(
    State(state): State<AppState>,
    Path((client, check)): Path<(String, String)>,
) -> Result<Response, ApiError> {
    require_name(&client)?;
    require_name(&check)?;
    resolve(&state, &client, &check).await
}

#[utoipa::path(
    post,
    path = "/resolve",
    tag = "events",
    request_body(content = Object, description = "Client and check naming the event"),
    responses(
        (status = 202, description = "Resolution issued", body = crate::api::types::IssuedResponse),
        (status = 400, description = "Malformed request"),
        (status = 404, description = "No such event")
    )
)]
pub(crate) async fn resolve_event(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Response, ApiError> {
    let data = params::read_data(
        &body,
        &[
            Rule::required("client", Kind::String),
            Rule::required("check", Kind::String),
        ],
    )?;
    let client = params::string_field(&data, "client")?;
    let check = params::string_field(&data, "check")?;
    resolve(&state, client, check).await
}

async fn resolve(state: &AppState, client: &str, check: &str) -> Result<Response, ApiError> {
    let hash = state
        .registry
        .hgetall(&keys::client_events(client))
        .await
        .map_err(|err| internal("failed to read events", &err))?;
    let raw = hash.get(check).ok_or_else(not_found)?;
    let event: Value = serde_json::from_str(raw)
        .map_err(|err| internal("stored event is not valid json", &err))?;
    publish::event_resolution(state.transport.as_ref(), &event).await;
    Ok(issued())
}
