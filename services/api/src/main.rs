// Vigil API (HTTP)
// ----------------
// This binary is the control-plane API for the Vigil monitoring platform. It
// exposes a JSON/HTTP interface over the live state of a monitored fleet:
// registered clients, check definitions, the latest results, firing events,
// named aggregates, and ad-hoc stashes. Mutations are dispatched onto the
// message transport; persisted state lives in the shared registry.
//
// Backends:
// - The registry and transport contracts are trait objects; this binary wires
//   the in-process backends, which is what local development runs against.
// - Deployments replace them with real store/bus drivers behind the same
//   traits.
use anyhow::Result;
use std::sync::Arc;
use vigil_api::app::AppState;
use vigil_api::config::Settings;
use vigil_api::observability;
use vigil_api::server::ApiServer;
use vigil_api::validator::StandardValidator;
use vigil_registry::{MemoryRegistry, Registry};
use vigil_transport::{MemoryTransport, Transport};

#[tokio::main]
async fn main() -> Result<()> {
    let metrics_handle = observability::init_observability("vigil-api");

    let settings = Settings::from_env_or_yaml()?;
    let bind = settings.bind_addr()?;
    let metrics_bind = settings.metrics_bind;

    let registry: Arc<dyn Registry> = Arc::new(MemoryRegistry::new());
    let transport: Arc<dyn Transport> = Arc::new(MemoryTransport::new());
    tracing::info!(
        checks = settings.checks.len(),
        authenticated = settings.api.user.is_some() && settings.api.password.is_some(),
        "control plane backends ready"
    );

    let state = AppState {
        settings: Arc::new(settings),
        registry,
        transport,
        validator: Arc::new(StandardValidator::new()),
    };

    tokio::spawn(observability::serve_metrics(metrics_handle, metrics_bind));

    ApiServer::new(state, bind).run().await
}
