//! Control-plane HTTP API module.
//!
//! # Purpose and responsibility
//! Exposes the route handler modules and the helpers they share: pagination,
//! resource-name guarding, the issued-response shape, and fire-and-forget
//! self-repair of dangling set members.
//!
//! # Key invariants and assumptions
//! - Fan-out registry reads join on every in-flight operation before the
//!   response body is emitted.
//! - Self-repair never gates a response and its failure is not a request
//!   error.
pub mod aggregates;
pub mod checks;
pub mod clients;
pub mod error;
pub mod events;
pub mod openapi;
pub(crate) mod params;
pub mod results;
pub mod stashes;
pub mod system;
pub mod types;

use crate::app::AppState;
use crate::model::{self, unix_timestamp};
use axum::Json;
use axum::http::{HeaderName, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use error::{ApiError, not_found};
use std::collections::HashMap;
use std::sync::Arc;
use types::IssuedResponse;

/// 202 with the moment the mutation was accepted.
pub(crate) fn issued() -> Response {
    (
        StatusCode::ACCEPTED,
        Json(IssuedResponse {
            issued: unix_timestamp(),
        }),
    )
        .into_response()
}

/// Routed names outside the resource charset behave like unknown routes.
pub(crate) fn require_name(name: &str) -> Result<(), ApiError> {
    if model::valid_resource_name(name) {
        Ok(())
    } else {
        Err(not_found())
    }
}

pub(crate) struct Page<T> {
    pub items: Vec<T>,
    pub header: Option<HeaderValue>,
}

/// Slice `items` according to `limit`/`offset`, recording the pre-slice total
/// in the pagination header. Without a `limit` the sequence passes through
/// untouched.
pub(crate) fn paginate<T>(items: Vec<T>, query: &HashMap<String, String>) -> Page<T> {
    let Some(limit) = query.get("limit").and_then(|value| value.parse::<usize>().ok()) else {
        return Page {
            items,
            header: None,
        };
    };
    let offset = query
        .get("offset")
        .and_then(|value| value.parse::<usize>().ok())
        .unwrap_or(0);
    let total = items.len();
    let items: Vec<T> = items.into_iter().skip(offset).take(limit).collect();
    let header =
        serde_json::json!({"limit": limit, "offset": offset, "total": total}).to_string();
    Page {
        items,
        header: HeaderValue::try_from(header).ok(),
    }
}

pub(crate) fn attach_pagination(mut response: Response, header: Option<HeaderValue>) -> Response {
    if let Some(header) = header {
        response
            .headers_mut()
            .insert(HeaderName::from_static("x-pagination"), header);
    }
    response
}

/// Drop a dangling member from an index set without gating the response.
pub(crate) fn self_repair(state: &AppState, set: &str, member: &str) {
    metrics::counter!("vigil_self_repair_total").increment(1);
    let registry = Arc::clone(&state.registry);
    let set = set.to_string();
    let member = member.to_string();
    tokio::spawn(async move {
        tracing::debug!(set = %set, member = %member, "removing dangling set member");
        if let Err(err) = registry.srem(&set, &member).await {
            tracing::warn!(error = %err, set = %set, member = %member, "self-repair failed");
        }
    });
}
