//! Check definition and on-demand execution handlers.
//!
//! # Purpose
//! Check definitions live in settings, not the registry; these handlers
//! expose them verbatim and dispatch ad-hoc execution requests onto the
//! transport.
use super::error::{ApiError, not_found};
use super::params::{self, Kind, Rule};
use super::{issued, require_name};
use crate::app::AppState;
use crate::publish;
use axum::Json;
use axum::extract::{Path, State};
use axum::response::Response;
use bytes::Bytes;
use serde_json::{Value, json};

#[utoipa::path(
    get,
    path = "/checks",
    tag = "checks",
    responses(
        (status = 200, description = "Every configured check definition", body = Object)
    )
)]
pub(crate) async fn list_checks(State(state): State<AppState>) -> Json<Value> {
    Json(Value::Object(state.settings.checks.clone()))
}

#[utoipa::path(
    get,
    path = "/checks/{name}",
    tag = "checks",
    params(("name" = String, Path, description = "Check name")),
    responses(
        (status = 200, description = "Named check definition", body = Object),
        (status = 404, description = "Unknown check")
    )
)]
pub(crate) async fn get_check(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<Value>, ApiError> {
    require_name(&name)?;
    let definition = state.settings.checks.get(&name).ok_or_else(not_found)?;
    let mut check = definition.as_object().cloned().unwrap_or_default();
    check.insert("name".to_string(), json!(name));
    Ok(Json(Value::Object(check)))
}

#[utoipa::path(
    post,
    path = "/request",
    tag = "checks",
    request_body(content = Object, description = "Check name with optional subscriber override"),
    responses(
        (status = 202, description = "Execution request issued", body = crate::api::types::IssuedResponse),
        (status = 400, description = "Malformed request"),
        (status = 404, description = "Unknown check")
    )
)]
pub(crate) async fn request_check(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Response, ApiError> {
    let data = params::read_data(
        &body,
        &[
            Rule::required("check", Kind::String),
            Rule::optional("subscribers", Kind::Array),
        ],
    )?;
    let name = params::string_field(&data, "check")?;
    let definition = state.settings.checks.get(name).ok_or_else(not_found)?;
    let mut check = definition.as_object().cloned().unwrap_or_default();
    check.insert("name".to_string(), json!(name));
    // The body's subscriber list wins; otherwise the definition's; otherwise
    // the request fans out to nobody.
    let subscribers = data
        .get("subscribers")
        .filter(|value| !value.is_null())
        .cloned()
        .or_else(|| check.get("subscribers").cloned())
        .unwrap_or_else(|| json!([]));
    check.insert("subscribers".to_string(), subscribers);
    publish::check_request(state.transport.as_ref(), check).await;
    Ok(issued())
}
