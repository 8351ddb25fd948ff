//! OpenAPI schema aggregation for the control-plane API.
//!
//! # Purpose
//! Collects all routes and schema types into a single OpenAPI document served
//! as plain JSON for docs and client generation.
use crate::api::{
    aggregates, checks, clients, events, results, stashes, system,
    types::{
        AggregateCheckRow, AggregateClientRow, AggregateOverview, BackendStatus, ErrorResponse,
        HistoryRow, InfoResponse, IssuedResponse, NameResponse, OutputSummary, PathResponse,
        QueueInfo, ResultRow, SeverityCounts, SeverityGroup, StashRow, TransportInfo, VersionInfo,
    },
};
use axum::Json;
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "vigil-api",
        description = "Vigil monitoring platform control-plane HTTP API"
    ),
    paths(
        system::info,
        system::health,
        clients::create_client,
        clients::list_clients,
        clients::get_client,
        clients::client_history,
        clients::delete_client,
        checks::list_checks,
        checks::get_check,
        checks::request_check,
        events::list_events,
        events::list_client_events,
        events::get_event,
        events::delete_event,
        events::resolve_event,
        results::submit_result,
        results::list_results,
        results::list_client_results,
        results::get_result,
        results::delete_result,
        aggregates::list_aggregates,
        aggregates::get_aggregate,
        aggregates::delete_aggregate,
        aggregates::aggregate_clients,
        aggregates::aggregate_checks,
        aggregates::aggregate_results,
        stashes::set_stash,
        stashes::get_stash,
        stashes::delete_stash,
        stashes::list_stashes,
        stashes::create_stash
    ),
    components(schemas(
        ErrorResponse,
        IssuedResponse,
        NameResponse,
        PathResponse,
        VersionInfo,
        QueueInfo,
        TransportInfo,
        BackendStatus,
        InfoResponse,
        HistoryRow,
        ResultRow,
        SeverityCounts,
        AggregateOverview,
        AggregateClientRow,
        AggregateCheckRow,
        OutputSummary,
        SeverityGroup,
        StashRow
    )),
    tags(
        (name = "system", description = "Process and backend status"),
        (name = "clients", description = "Registered client management"),
        (name = "checks", description = "Check definitions and execution requests"),
        (name = "events", description = "Firing events and resolutions"),
        (name = "results", description = "Stored and injected check results"),
        (name = "aggregates", description = "Named result aggregates"),
        (name = "stashes", description = "Ad-hoc key/value stashes")
    )
)]
pub struct ApiDoc;

pub(crate) async fn document() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
