//! Aggregate API handlers.
//!
//! # Purpose
//! Aggregates are named sets of `<client>:<check>` members; these handlers
//! summarize the referenced results by severity, group members by client or
//! check, and break one severity down by check and output.
use super::error::{ApiError, bad_request, internal, not_found};
use super::types::{
    AggregateCheckRow, AggregateClientRow, AggregateOverview, NameResponse, OutputSummary,
    SeverityCounts, SeverityGroup,
};
use super::{require_name, self_repair};
use crate::app::AppState;
use crate::keys;
use crate::model::{Severity, unix_timestamp};
use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use futures::future::join_all;
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet, HashMap};

#[utoipa::path(
    get,
    path = "/aggregates",
    tag = "aggregates",
    responses(
        (status = 200, description = "Known aggregates", body = [NameResponse])
    )
)]
pub(crate) async fn list_aggregates(
    State(state): State<AppState>,
) -> Result<Json<Vec<NameResponse>>, ApiError> {
    let names = state
        .registry
        .smembers(keys::AGGREGATES_SET)
        .await
        .map_err(|err| internal("failed to enumerate aggregates", &err))?;
    Ok(Json(
        names.into_iter().map(|name| NameResponse { name }).collect(),
    ))
}

#[utoipa::path(
    get,
    path = "/aggregates/{name}",
    tag = "aggregates",
    params(
        ("name" = String, Path, description = "Aggregate name"),
        ("max_age" = Option<i64>, Query, description = "Exclude results older than this many seconds")
    ),
    responses(
        (status = 200, description = "Severity summary", body = AggregateOverview),
        (status = 404, description = "Unknown or empty aggregate")
    )
)]
pub(crate) async fn get_aggregate(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Query(query): Query<HashMap<String, String>>,
) -> Result<Json<AggregateOverview>, ApiError> {
    require_name(&name)?;
    let records = load_members(&state, &name).await?;
    let max_age = max_age_param(&query);
    let now = unix_timestamp();

    let mut clients = BTreeSet::new();
    let mut checks = BTreeSet::new();
    let mut counts = SeverityCounts::default();
    for record in &records {
        clients.insert(record.client.as_str());
        checks.insert(record.check.as_str());
        let Some(result) = &record.result else {
            continue;
        };
        if is_stale(result, max_age, now) {
            counts.stale += 1;
            continue;
        }
        counts.total += 1;
        match severity_of(result) {
            Severity::Ok => counts.ok += 1,
            Severity::Warning => counts.warning += 1,
            Severity::Critical => counts.critical += 1,
            Severity::Unknown => counts.unknown += 1,
        }
    }
    Ok(Json(AggregateOverview {
        clients: clients.len() as u64,
        checks: checks.len() as u64,
        results: counts,
    }))
}

#[utoipa::path(
    delete,
    path = "/aggregates/{name}",
    tag = "aggregates",
    params(("name" = String, Path, description = "Aggregate name")),
    responses(
        (status = 204, description = "Aggregate deleted"),
        (status = 404, description = "Unknown aggregate")
    )
)]
pub(crate) async fn delete_aggregate(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<StatusCode, ApiError> {
    require_name(&name)?;
    let names = state
        .registry
        .smembers(keys::AGGREGATES_SET)
        .await
        .map_err(|err| internal("failed to enumerate aggregates", &err))?;
    if !names.contains(&name) {
        return Err(not_found());
    }
    state
        .registry
        .srem(keys::AGGREGATES_SET, &name)
        .await
        .map_err(|err| internal("failed to deindex aggregate", &err))?;
    state
        .registry
        .del(&keys::aggregate_members(&name))
        .await
        .map_err(|err| internal("failed to delete aggregate members", &err))?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/aggregates/{name}/clients",
    tag = "aggregates",
    params(("name" = String, Path, description = "Aggregate name")),
    responses(
        (status = 200, description = "Members grouped by client", body = [AggregateClientRow]),
        (status = 404, description = "Unknown or empty aggregate")
    )
)]
pub(crate) async fn aggregate_clients(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<Vec<AggregateClientRow>>, ApiError> {
    require_name(&name)?;
    let mut grouped: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for (client, check) in member_pairs(&state, &name).await? {
        grouped.entry(client).or_default().push(check);
    }
    Ok(Json(
        grouped
            .into_iter()
            .map(|(name, checks)| AggregateClientRow { name, checks })
            .collect(),
    ))
}

#[utoipa::path(
    get,
    path = "/aggregates/{name}/checks",
    tag = "aggregates",
    params(("name" = String, Path, description = "Aggregate name")),
    responses(
        (status = 200, description = "Members grouped by check", body = [AggregateCheckRow]),
        (status = 404, description = "Unknown or empty aggregate")
    )
)]
pub(crate) async fn aggregate_checks(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<Vec<AggregateCheckRow>>, ApiError> {
    require_name(&name)?;
    let mut grouped: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for (client, check) in member_pairs(&state, &name).await? {
        grouped.entry(check).or_default().push(client);
    }
    Ok(Json(
        grouped
            .into_iter()
            .map(|(name, clients)| AggregateCheckRow { name, clients })
            .collect(),
    ))
}

#[utoipa::path(
    get,
    path = "/aggregates/{name}/results/{severity}",
    tag = "aggregates",
    params(
        ("name" = String, Path, description = "Aggregate name"),
        ("severity" = String, Path, description = "ok, warning, critical, or unknown"),
        ("max_age" = Option<i64>, Query, description = "Exclude results older than this many seconds")
    ),
    responses(
        (status = 200, description = "Matching results grouped by check and output", body = [SeverityGroup]),
        (status = 400, description = "Invalid severity"),
        (status = 404, description = "Unknown or empty aggregate")
    )
)]
pub(crate) async fn aggregate_results(
    State(state): State<AppState>,
    Path((name, severity)): Path<(String, String)>,
    Query(query): Query<HashMap<String, String>>,
) -> Result<Json<Vec<SeverityGroup>>, ApiError> {
    require_name(&name)?;
    let severity: Severity = severity.parse().map_err(|_| bad_request())?;
    let records = load_members(&state, &name).await?;
    let max_age = max_age_param(&query);
    let now = unix_timestamp();

    let mut grouped: BTreeMap<String, BTreeMap<String, Vec<String>>> = BTreeMap::new();
    for record in records {
        let Some(result) = record.result else {
            continue;
        };
        if severity_of(&result) != severity || is_stale(&result, max_age, now) {
            continue;
        }
        let output = result
            .get("output")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        grouped
            .entry(record.check)
            .or_default()
            .entry(output)
            .or_default()
            .push(record.client);
    }
    Ok(Json(
        grouped
            .into_iter()
            .map(|(check, outputs)| SeverityGroup {
                check,
                summary: outputs
                    .into_iter()
                    .map(|(output, clients)| OutputSummary {
                        output,
                        total: clients.len() as u64,
                        clients,
                    })
                    .collect(),
            })
            .collect(),
    ))
}

struct MemberRecord {
    client: String,
    check: String,
    result: Option<Value>,
}

// Enumerate `<client>:<check>` members; an empty aggregate is a 404.
async fn member_pairs(state: &AppState, name: &str) -> Result<Vec<(String, String)>, ApiError> {
    let members = state
        .registry
        .smembers(&keys::aggregate_members(name))
        .await
        .map_err(|err| internal("failed to enumerate aggregate members", &err))?;
    if members.is_empty() {
        return Err(not_found());
    }
    Ok(members
        .iter()
        .filter_map(|member| {
            member
                .split_once(':')
                .map(|(client, check)| (client.to_string(), check.to_string()))
        })
        .collect())
}

// Fetch every referenced result; dangling members self-repair and are
// carried forward without a result.
async fn load_members(state: &AppState, name: &str) -> Result<Vec<MemberRecord>, ApiError> {
    let pairs = member_pairs(state, name).await?;
    let data_keys: Vec<String> = pairs
        .iter()
        .map(|(client, check)| keys::result_data(client, check))
        .collect();
    let values = join_all(data_keys.iter().map(|key| state.registry.get(key))).await;

    let members_key = keys::aggregate_members(name);
    let mut records = Vec::with_capacity(pairs.len());
    for ((client, check), value) in pairs.into_iter().zip(values) {
        let value = value.map_err(|err| internal("failed to read result", &err))?;
        let result = match value {
            Some(raw) => match serde_json::from_str::<Value>(&raw) {
                Ok(result) => Some(result),
                Err(err) => {
                    tracing::warn!(error = %err, client = %client, check = %check, "discarding unparsable result data");
                    None
                }
            },
            None => {
                self_repair(state, &members_key, &format!("{client}:{check}"));
                None
            }
        };
        records.push(MemberRecord {
            client,
            check,
            result,
        });
    }
    Ok(records)
}

fn severity_of(result: &Value) -> Severity {
    result
        .get("status")
        .and_then(Value::as_i64)
        .map(Severity::from_status)
        .unwrap_or(Severity::Unknown)
}

fn max_age_param(query: &HashMap<String, String>) -> Option<i64> {
    query
        .get("max_age")
        .and_then(|value| value.parse::<i64>().ok())
}

fn is_stale(result: &Value, max_age: Option<i64>, now: i64) -> bool {
    let Some(max_age) = max_age else {
        return false;
    };
    let executed = result.get("executed").and_then(Value::as_i64).unwrap_or(0);
    executed < now - max_age
}
