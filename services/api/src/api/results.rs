//! Result API handlers.
//!
//! # Purpose
//! Enumerates the latest stored result per (client, check) pair, deletes
//! single results, and accepts injected results which are published onto the
//! transport under the API's own client name.
use super::error::{ApiError, internal, not_found};
use super::params::{self, Kind, NAME_PATTERN, Rule};
use super::types::ResultRow;
use super::{issued, require_name};
use crate::app::AppState;
use crate::{keys, publish};
use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::Response;
use bytes::Bytes;
use futures::future::join_all;
use serde_json::Value;

#[utoipa::path(
    post,
    path = "/results",
    tag = "results",
    request_body(content = Object, description = "Check result payload"),
    responses(
        (status = 202, description = "Result issued", body = crate::api::types::IssuedResponse),
        (status = 400, description = "Malformed result")
    )
)]
pub(crate) async fn submit_result(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Response, ApiError> {
    let data = params::read_data(
        &body,
        &[
            Rule::required("name", Kind::String).matching(NAME_PATTERN),
            Rule::required("output", Kind::String),
            Rule::optional("status", Kind::Integer),
            Rule::optional("source", Kind::String).matching(NAME_PATTERN),
        ],
    )?;
    publish::check_result(state.transport.as_ref(), publish::API_CLIENT_NAME, data).await;
    Ok(issued())
}

#[utoipa::path(
    get,
    path = "/results",
    tag = "results",
    responses(
        (status = 200, description = "Latest result for every client and check", body = [ResultRow])
    )
)]
pub(crate) async fn list_results(
    State(state): State<AppState>,
) -> Result<Json<Vec<ResultRow>>, ApiError> {
    let clients = state
        .registry
        .smembers(keys::CLIENTS_SET)
        .await
        .map_err(|err| internal("failed to enumerate clients", &err))?;
    let mut rows = Vec::new();
    for client in &clients {
        rows.extend(client_result_rows(&state, client).await?);
    }
    Ok(Json(rows))
}

#[utoipa::path(
    get,
    path = "/results/{client}",
    tag = "results",
    params(("client" = String, Path, description = "Client name")),
    responses(
        (status = 200, description = "Latest results for one client", body = [ResultRow]),
        (status = 404, description = "Client has no results")
    )
)]
pub(crate) async fn list_client_results(
    State(state): State<AppState>,
    Path(client): Path<String>,
) -> Result<Json<Vec<ResultRow>>, ApiError> {
    require_name(&client)?;
    let known = state
        .registry
        .exists(&keys::result_index(&client))
        .await
        .map_err(|err| internal("failed to look up client results", &err))?;
    if !known {
        return Err(not_found());
    }
    Ok(Json(client_result_rows(&state, &client).await?))
}

#[utoipa::path(
    get,
    path = "/results/{client}/{check}",
    tag = "results",
    params(
        ("client" = String, Path, description = "Client name"),
        ("check" = String, Path, description = "Check name")
    ),
    responses(
        (status = 200, description = "The stored result", body = Object),
        (status = 404, description = "No such result")
    )
)]
pub(crate) async fn get_result(
    State(state): State<AppState>,
    Path((client, check)): Path<(String, String)>,
) -> Result<Json<Value>, ApiError> {
    require_name(&client)?;
    require_name(&check)?;
    let raw = state
        .registry
        .get(&keys::result_data(&client, &check))
        .await
        .map_err(|err| internal("failed to read result", &err))?
        .ok_or_else(not_found)?;
    let result = serde_json::from_str(&raw)
        .map_err(|err| internal("stored result is not valid json", &err))?;
    Ok(Json(result))
}

#[utoipa::path(
    delete,
    path = "/results/{client}/{check}",
    tag = "results",
    params(
        ("client" = String, Path, description = "Client name"),
        ("check" = String, Path, description = "Check name")
    ),
    responses(
        (status = 204, description = "Result deleted"),
        (status = 404, description = "No such result")
    )
)]
pub(crate) async fn delete_result(
    State(state): State<AppState>,
    Path((client, check)): Path<(String, String)>,
) -> Result<StatusCode, ApiError> {
    require_name(&client)?;
    require_name(&check)?;
    let data_key = keys::result_data(&client, &check);
    let known = state
        .registry
        .exists(&data_key)
        .await
        .map_err(|err| internal("failed to look up result", &err))?;
    if !known {
        return Err(not_found());
    }
    state
        .registry
        .srem(&keys::result_index(&client), &check)
        .await
        .map_err(|err| internal("failed to deindex result", &err))?;
    state
        .registry
        .del(&data_key)
        .await
        .map_err(|err| internal("failed to delete result", &err))?;
    Ok(StatusCode::NO_CONTENT)
}

// Missing result values are skipped, not repaired; the index entry may be
// freshly written ahead of its data.
async fn client_result_rows(state: &AppState, client: &str) -> Result<Vec<ResultRow>, ApiError> {
    let checks = state
        .registry
        .smembers(&keys::result_index(client))
        .await
        .map_err(|err| internal("failed to enumerate client results", &err))?;
    let data_keys: Vec<String> = checks
        .iter()
        .map(|check| keys::result_data(client, check))
        .collect();
    let values = join_all(data_keys.iter().map(|key| state.registry.get(key))).await;

    let mut rows = Vec::new();
    for (check, value) in checks.iter().zip(values) {
        let Some(raw) = value.map_err(|err| internal("failed to read result", &err))? else {
            continue;
        };
        match serde_json::from_str::<Value>(&raw) {
            Ok(result) => rows.push(ResultRow {
                client: client.to_string(),
                check: result,
            }),
            Err(err) => {
                tracing::warn!(error = %err, client = %client, check = %check, "discarding unparsable result data");
            }
        }
    }
    Ok(rows)
}
