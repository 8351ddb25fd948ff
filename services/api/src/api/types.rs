//! HTTP API request/response types.
//!
//! # Purpose
//! Defines the payload shapes the control plane emits. Resources whose bodies
//! are stored verbatim in the registry (clients, events, results, stashes)
//! travel as raw JSON values instead.
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

/// Body attached to connectivity failures by the request pipeline.
#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct ErrorResponse {
    pub error: String,
}

/// 202 body for every accepted asynchronous mutation.
#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct IssuedResponse {
    pub issued: i64,
}

/// Minimal row naming a resource (created clients, aggregate listings).
#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct NameResponse {
    pub name: String,
}

/// 201 body for stash writes.
#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct PathResponse {
    pub path: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct VersionInfo {
    pub version: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone, Copy)]
pub struct QueueInfo {
    pub messages: u64,
    pub consumers: u64,
}

impl From<vigil_transport::QueueStats> for QueueInfo {
    fn from(stats: vigil_transport::QueueStats) -> Self {
        Self {
            messages: stats.messages,
            consumers: stats.consumers,
        }
    }
}

/// Transport section of the info document; per-queue fields are null while
/// the bus is disconnected.
#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct TransportInfo {
    pub keepalives: Option<QueueInfo>,
    pub results: Option<QueueInfo>,
    pub connected: bool,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct BackendStatus {
    pub connected: bool,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct InfoResponse {
    pub sensu: VersionInfo,
    pub transport: TransportInfo,
    pub redis: BackendStatus,
}

/// One check's recent execution history for a client.
#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct HistoryRow {
    pub check: String,
    pub history: Vec<i64>,
    pub last_execution: i64,
    pub last_status: i64,
    #[schema(value_type = Object)]
    pub last_result: Value,
}

/// One (client, check) result pair from the result enumerations.
#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct ResultRow {
    pub client: String,
    #[schema(value_type = Object)]
    pub check: Value,
}

/// Severity tally across an aggregate's results.
#[derive(Debug, Default, Serialize, Deserialize, ToSchema, Clone, Copy)]
pub struct SeverityCounts {
    pub ok: u64,
    pub warning: u64,
    pub critical: u64,
    pub unknown: u64,
    pub total: u64,
    pub stale: u64,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct AggregateOverview {
    pub clients: u64,
    pub checks: u64,
    pub results: SeverityCounts,
}

/// Aggregate members grouped by client.
#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct AggregateClientRow {
    pub name: String,
    pub checks: Vec<String>,
}

/// Aggregate members grouped by check.
#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct AggregateCheckRow {
    pub name: String,
    pub clients: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct OutputSummary {
    pub output: String,
    pub total: u64,
    pub clients: Vec<String>,
}

/// Results of one severity within an aggregate, grouped by check then output.
#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct SeverityGroup {
    pub check: String,
    pub summary: Vec<OutputSummary>,
}

/// One stash with its remaining TTL (-1 when the key never expires).
#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct StashRow {
    pub path: String,
    #[schema(value_type = Object)]
    pub content: Value,
    pub expire: i64,
}
