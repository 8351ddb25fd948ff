//! Stash API handlers.
//!
//! # Purpose
//! Stashes are opaque JSON blobs stored under free-form paths, optionally
//! TTL-bounded. The path routes accept a wildcard tail, so stash paths may
//! contain slashes.
use super::error::{ApiError, bad_request, internal, not_found};
use super::params::{self, Kind, Rule};
use super::types::{PathResponse, StashRow};
use super::{attach_pagination, paginate, self_repair};
use crate::app::AppState;
use crate::keys;
use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use bytes::Bytes;
use futures::future::join_all;
use serde_json::Value;
use std::collections::HashMap;

#[utoipa::path(
    post,
    path = "/stash/{path}",
    tag = "stashes",
    params(("path" = String, Path, description = "Stash path, may contain slashes")),
    request_body(content = Object, description = "Arbitrary JSON stored verbatim"),
    responses(
        (status = 201, description = "Stash stored", body = PathResponse),
        (status = 400, description = "Body is not JSON")
    )
)]
pub(crate) async fn set_stash(
    State(state): State<AppState>,
    Path(path): Path<String>,
    body: Bytes,
) -> Result<Response, ApiError> {
    let content: Value = serde_json::from_slice(&body).map_err(|_| bad_request())?;
    state
        .registry
        .set(&keys::stash_data(&path), &content.to_string())
        .await
        .map_err(|err| internal("failed to store stash", &err))?;
    state
        .registry
        .sadd(keys::STASHES_SET, &path)
        .await
        .map_err(|err| internal("failed to index stash", &err))?;
    Ok((StatusCode::CREATED, Json(PathResponse { path })).into_response())
}

#[utoipa::path(
    get,
    path = "/stash/{path}",
    tag = "stashes",
    params(("path" = String, Path, description = "Stash path")),
    responses(
        (status = 200, description = "Stored stash content", body = Object),
        (status = 404, description = "No such stash")
    )
)]
pub(crate) async fn get_stash(
    State(state): State<AppState>,
    Path(path): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let raw = state
        .registry
        .get(&keys::stash_data(&path))
        .await
        .map_err(|err| internal("failed to read stash", &err))?
        .ok_or_else(not_found)?;
    let content = serde_json::from_str(&raw)
        .map_err(|err| internal("stored stash is not valid json", &err))?;
    Ok(Json(content))
}

#[utoipa::path(
    delete,
    path = "/stash/{path}",
    tag = "stashes",
    params(("path" = String, Path, description = "Stash path")),
    responses(
        (status = 204, description = "Stash deleted"),
        (status = 404, description = "No such stash")
    )
)]
pub(crate) async fn delete_stash(
    State(state): State<AppState>,
    Path(path): Path<String>,
) -> Result<StatusCode, ApiError> {
    let data_key = keys::stash_data(&path);
    let known = state
        .registry
        .exists(&data_key)
        .await
        .map_err(|err| internal("failed to look up stash", &err))?;
    if !known {
        return Err(not_found());
    }
    state
        .registry
        .srem(keys::STASHES_SET, &path)
        .await
        .map_err(|err| internal("failed to deindex stash", &err))?;
    state
        .registry
        .del(&data_key)
        .await
        .map_err(|err| internal("failed to delete stash", &err))?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/stashes",
    tag = "stashes",
    params(
        ("limit" = Option<u64>, Query, description = "Page size"),
        ("offset" = Option<u64>, Query, description = "Page start")
    ),
    responses(
        (status = 200, description = "Every stash with its remaining TTL", body = [StashRow])
    )
)]
pub(crate) async fn list_stashes(
    State(state): State<AppState>,
    Query(query): Query<HashMap<String, String>>,
) -> Result<Response, ApiError> {
    let paths = state
        .registry
        .smembers(keys::STASHES_SET)
        .await
        .map_err(|err| internal("failed to enumerate stashes", &err))?;

    let registry = &state.registry;
    let loads = paths.iter().map(|path| {
        let data_key = keys::stash_data(path);
        async move {
            let value = registry.get(&data_key).await;
            let ttl = registry.ttl(&data_key).await;
            (value, ttl)
        }
    });
    let outcomes = join_all(loads).await;

    let mut rows = Vec::new();
    for (path, (value, ttl)) in paths.iter().zip(outcomes) {
        let value = value.map_err(|err| internal("failed to read stash", &err))?;
        let ttl = ttl.map_err(|err| internal("failed to read stash ttl", &err))?;
        match value {
            Some(raw) => match serde_json::from_str::<Value>(&raw) {
                Ok(content) => rows.push(StashRow {
                    path: path.clone(),
                    content,
                    expire: ttl,
                }),
                Err(err) => {
                    tracing::warn!(error = %err, path = %path, "discarding unparsable stash data");
                }
            },
            None => self_repair(&state, keys::STASHES_SET, path),
        }
    }
    // Unlike the client list, pagination applies to the assembled rows.
    let page = paginate(rows, &query);
    Ok(attach_pagination(
        Json(page.items).into_response(),
        page.header,
    ))
}

#[utoipa::path(
    post,
    path = "/stashes",
    tag = "stashes",
    request_body(content = Object, description = "Path, content, and optional expiry"),
    responses(
        (status = 201, description = "Stash stored", body = PathResponse),
        (status = 400, description = "Malformed request")
    )
)]
pub(crate) async fn create_stash(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Response, ApiError> {
    let data = params::read_data(
        &body,
        &[
            Rule::required("path", Kind::String),
            Rule::required("content", Kind::Object),
            Rule::optional("expire", Kind::Integer),
        ],
    )?;
    let path = params::string_field(&data, "path")?.to_string();
    let content = data.get("content").cloned().unwrap_or(Value::Null);
    let data_key = keys::stash_data(&path);
    state
        .registry
        .set(&data_key, &content.to_string())
        .await
        .map_err(|err| internal("failed to store stash", &err))?;
    state
        .registry
        .sadd(keys::STASHES_SET, &path)
        .await
        .map_err(|err| internal("failed to index stash", &err))?;
    if let Some(expire) = data.get("expire").and_then(Value::as_i64)
        && expire >= 0
    {
        state
            .registry
            .expire(&data_key, expire as u64)
            .await
            .map_err(|err| internal("failed to set stash expiry", &err))?;
    }
    Ok((StatusCode::CREATED, Json(PathResponse { path })).into_response())
}
