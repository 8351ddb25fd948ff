//! Info and health endpoints.
//!
//! # Purpose
//! Reports process and backend status. These are the only routes reachable
//! while a backend is down, so operators can diagnose connectivity.
use super::error::{ApiError, internal, precondition_failed};
use super::types::{BackendStatus, InfoResponse, QueueInfo, TransportInfo, VersionInfo};
use crate::app::AppState;
use crate::config::VERSION;
use crate::publish::{KEEPALIVES_QUEUE, RESULTS_QUEUE};
use axum::Json;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use std::collections::HashMap;

#[utoipa::path(
    get,
    path = "/info",
    tag = "system",
    responses(
        (status = 200, description = "Process version and backend status", body = InfoResponse)
    )
)]
pub(crate) async fn info(State(state): State<AppState>) -> Result<Json<InfoResponse>, ApiError> {
    let connected = state.transport.connected();
    let (keepalives, results) = if connected {
        let keepalives = state
            .transport
            .stats(KEEPALIVES_QUEUE)
            .await
            .map_err(|err| internal("failed to fetch keepalive queue stats", &err))?;
        let results = state
            .transport
            .stats(RESULTS_QUEUE)
            .await
            .map_err(|err| internal("failed to fetch result queue stats", &err))?;
        (Some(QueueInfo::from(keepalives)), Some(QueueInfo::from(results)))
    } else {
        (None, None)
    };
    Ok(Json(InfoResponse {
        sensu: VersionInfo {
            version: VERSION.to_string(),
        },
        transport: TransportInfo {
            keepalives,
            results,
            connected,
        },
        redis: BackendStatus {
            connected: state.registry.connected(),
        },
    }))
}

#[utoipa::path(
    get,
    path = "/health",
    tag = "system",
    params(
        ("consumers" = Option<u64>, Query, description = "Minimum consumers per queue"),
        ("messages" = Option<u64>, Query, description = "Maximum messages per queue")
    ),
    responses(
        (status = 204, description = "Backends connected and thresholds satisfied"),
        (status = 412, description = "Backend down or a threshold failed")
    )
)]
pub(crate) async fn health(
    State(state): State<AppState>,
    Query(query): Query<HashMap<String, String>>,
) -> Result<StatusCode, ApiError> {
    if !state.registry.connected() || !state.transport.connected() {
        return Err(precondition_failed());
    }
    // Non-integer thresholds are treated as absent.
    let min_consumers = query
        .get("consumers")
        .and_then(|value| value.parse::<u64>().ok());
    let max_messages = query
        .get("messages")
        .and_then(|value| value.parse::<u64>().ok());
    if min_consumers.is_some() || max_messages.is_some() {
        for queue in [KEEPALIVES_QUEUE, RESULTS_QUEUE] {
            let stats = state.transport.stats(queue).await.map_err(|err| {
                tracing::warn!(error = %err, queue = queue, "queue stats unavailable");
                precondition_failed()
            })?;
            if min_consumers.is_some_and(|min| stats.consumers < min) {
                return Err(precondition_failed());
            }
            if max_messages.is_some_and(|max| stats.messages > max) {
                return Err(precondition_failed());
            }
        }
    }
    Ok(StatusCode::NO_CONTENT)
}
