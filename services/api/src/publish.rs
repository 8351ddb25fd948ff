//! Transport publication of check requests, check results, and event
//! resolutions.
//!
//! # Purpose
//! Encapsulates the routing rules for outbound messages: subscription strings
//! select the exchange for check requests, and results always land on the
//! `results` queue. Publish failures are logged and never surfaced to HTTP
//! callers, whose responses have already been issued.
use crate::model::unix_timestamp;
use bytes::Bytes;
use serde_json::{Map, Value, json};
use vigil_transport::{Exchange, Transport};

/// Queue carrying client keepalives, inspected by info/health.
pub const KEEPALIVES_QUEUE: &str = "keepalives";
/// Queue carrying check results.
pub const RESULTS_QUEUE: &str = "results";
/// Client name attached to results injected through the API.
pub const API_CLIENT_NAME: &str = "sensu-api";
/// Output of the pseudo-result that resolves an event.
pub const RESOLUTION_OUTPUT: &str = "Resolving on request of the API";

// Subscriptions of the form "<type>:<topic>" route to the direct exchange
// when the type is point-to-point; everything else fans out. The routing key
// is always the full subscription string.
fn exchange_for(subscription: &str) -> Exchange {
    match subscription.split(':').next() {
        Some("direct") | Some("roundrobin") => Exchange::Direct,
        _ => Exchange::Fanout,
    }
}

fn encode(payload: &Value) -> Bytes {
    Bytes::from(payload.to_string())
}

/// Dispatch an on-demand execution of `check` to each of its subscribers.
pub async fn check_request(transport: &dyn Transport, mut check: Map<String, Value>) {
    check.insert("issued".to_string(), json!(unix_timestamp()));
    let subscribers: Vec<String> = check
        .get("subscribers")
        .and_then(Value::as_array)
        .map(|subscribers| {
            subscribers
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();
    let payload = encode(&Value::Object(check));
    for subscription in subscribers {
        let exchange = exchange_for(&subscription);
        metrics::counter!("vigil_transport_publishes_total", "exchange" => exchange.as_str())
            .increment(1);
        if let Err(err) = transport
            .publish(exchange, &subscription, payload.clone())
            .await
        {
            tracing::error!(
                error = %err,
                subscription = %subscription,
                "failed to publish check request"
            );
        }
    }
}

/// Publish a check result on behalf of `client_name`.
pub async fn check_result(transport: &dyn Transport, client_name: &str, mut check: Map<String, Value>) {
    let now = unix_timestamp();
    check.insert("issued".to_string(), json!(now));
    check.insert("executed".to_string(), json!(now));
    if matches!(check.get("status"), None | Some(Value::Null)) {
        check.insert("status".to_string(), json!(0));
    }
    let payload = encode(&json!({"client": client_name, "check": Value::Object(check)}));
    metrics::counter!("vigil_transport_publishes_total", "exchange" => Exchange::Direct.as_str())
        .increment(1);
    if let Err(err) = transport
        .publish(Exchange::Direct, RESULTS_QUEUE, payload)
        .await
    {
        tracing::error!(error = %err, client = client_name, "failed to publish check result");
    }
}

/// Publish the pseudo-result that resolves a stored event.
pub async fn event_resolution(transport: &dyn Transport, event: &Value) {
    let Some(client_name) = event.pointer("/client/name").and_then(Value::as_str) else {
        tracing::error!("event missing client name, skipping resolution");
        return;
    };
    let mut check = event
        .get("check")
        .and_then(Value::as_object)
        .cloned()
        .unwrap_or_default();
    check.insert("output".to_string(), json!(RESOLUTION_OUTPUT));
    check.insert("status".to_string(), json!(0));
    check.insert("force_resolve".to_string(), json!(true));
    // The stored event may carry the status history; the resolving result
    // must not.
    check.remove("history");
    check_result(transport, client_name, check).await;
}
