//! HTTP application wiring.
//!
//! # Purpose
//! Builds the Axum router, stacks the request pipeline, and defines the
//! shared application state injected into handlers.
//!
//! # Notes
//! This module centralizes route composition to keep `main` small and
//! testable. The stash routes take a wildcard tail, so they are registered
//! under their own `/stash/` prefix and cannot shadow the specific routes.
use crate::api;
use crate::config::Settings;
use crate::pipeline;
use crate::validator::ClientValidator;
use axum::Router;
use axum::middleware::{from_fn, from_fn_with_state};
use axum::routing::{get, post};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use vigil_registry::Registry;
use vigil_transport::Transport;

#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub registry: Arc<dyn Registry>,
    pub transport: Arc<dyn Transport>,
    pub validator: Arc<dyn ClientValidator>,
}

pub fn build_router(state: AppState) -> Router {
    let trace_layer =
        TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
            tracing::info_span!(
                "http.request",
                method = %request.method(),
                uri = %request.uri()
            )
        });

    Router::new()
        .route("/info", get(api::system::info))
        .route("/health", get(api::system::health))
        .route("/openapi.json", get(api::openapi::document))
        .route(
            "/clients",
            get(api::clients::list_clients).post(api::clients::create_client),
        )
        .route(
            "/clients/:name",
            get(api::clients::get_client).delete(api::clients::delete_client),
        )
        .route("/clients/:name/history", get(api::clients::client_history))
        .route("/checks", get(api::checks::list_checks))
        .route("/checks/:name", get(api::checks::get_check))
        .route("/request", post(api::checks::request_check))
        .route("/events", get(api::events::list_events))
        .route("/events/:client", get(api::events::list_client_events))
        .route(
            "/events/:client/:check",
            get(api::events::get_event).delete(api::events::delete_event),
        )
        .route("/resolve", post(api::events::resolve_event))
        .route(
            "/results",
            get(api::results::list_results).post(api::results::submit_result),
        )
        .route("/results/:client", get(api::results::list_client_results))
        .route(
            "/results/:client/:check",
            get(api::results::get_result).delete(api::results::delete_result),
        )
        .route("/aggregates", get(api::aggregates::list_aggregates))
        .route(
            "/aggregates/:name",
            get(api::aggregates::get_aggregate).delete(api::aggregates::delete_aggregate),
        )
        .route(
            "/aggregates/:name/clients",
            get(api::aggregates::aggregate_clients),
        )
        .route(
            "/aggregates/:name/checks",
            get(api::aggregates::aggregate_checks),
        )
        .route(
            "/aggregates/:name/results/:severity",
            get(api::aggregates::aggregate_results),
        )
        .route(
            "/stashes",
            get(api::stashes::list_stashes).post(api::stashes::create_stash),
        )
        .route(
            "/stash/*path",
            get(api::stashes::get_stash)
                .post(api::stashes::set_stash)
                .delete(api::stashes::delete_stash),
        )
        .layer(
            // Outermost first: trace span, request log, response headers,
            // connectivity gate, authentication, preflight short-circuit.
            ServiceBuilder::new()
                .layer(trace_layer)
                .layer(from_fn(pipeline::log_request))
                .layer(from_fn_with_state(state.clone(), pipeline::response_headers))
                .layer(from_fn_with_state(state.clone(), pipeline::connectivity_gate))
                .layer(from_fn_with_state(state.clone(), pipeline::authenticate))
                .layer(from_fn(pipeline::preflight)),
        )
        .with_state(state)
}
