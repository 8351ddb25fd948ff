//! Cross-cutting request pipeline.
//!
//! # Purpose
//! Implements the pre-dispatch phase every request passes through: request
//! logging, response content-type and CORS headers, backend connectivity
//! gating, HTTP Basic authentication, and the preflight short-circuit.
//!
//! # Ordering
//! The layers run outermost-first in exactly this order; the header layer
//! wraps the gate and the authenticator so even their error responses carry
//! the CORS headers.
use crate::api::error::unauthorized;
use crate::api::types::ErrorResponse;
use crate::app::AppState;
use axum::Json;
use axum::body::Body;
use axum::extract::{ConnectInfo, Request, State};
use axum::http::{HeaderName, HeaderValue, Method, StatusCode, header};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use std::net::SocketAddr;

/// Log the request line and consumed body, then hand the handler a rebuilt,
/// re-readable request.
pub async fn log_request(request: Request, next: Next) -> Response {
    let (parts, body) = request.into_parts();
    let bytes = match axum::body::to_bytes(body, usize::MAX).await {
        Ok(bytes) => bytes,
        Err(err) => {
            tracing::warn!(error = %err, "failed to read request body");
            return StatusCode::BAD_REQUEST.into_response();
        }
    };
    let remote = parts
        .extensions
        .get::<ConnectInfo<SocketAddr>>()
        .map(|info| info.0.to_string())
        .unwrap_or_else(|| "-".to_string());
    let user_agent = parts
        .headers
        .get(header::USER_AGENT)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("-");
    tracing::info!(
        method = %parts.method,
        path = parts.uri.path(),
        remote = %remote,
        user_agent = user_agent,
        uri = %parts.uri,
        body = %String::from_utf8_lossy(&bytes),
        "api request"
    );
    next.run(Request::from_parts(parts, Body::from(bytes))).await
}

/// Stamp every response with the JSON content type and the configured CORS
/// headers.
pub async fn response_headers(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let mut response = next.run(request).await;
    let headers = response.headers_mut();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/json"),
    );
    for (key, value) in &state.settings.cors {
        let name = format!("Access-Control-Allow-{key}");
        match (
            HeaderName::try_from(name.as_str()),
            HeaderValue::try_from(value.as_str()),
        ) {
            (Ok(name), Ok(value)) => {
                headers.insert(name, value);
            }
            _ => tracing::warn!(header = %name, "invalid cors header pair"),
        }
    }
    response
}

/// Refuse to dispatch when either backend is down; info and health stay
/// reachable so operators can see why, and preflight answers regardless.
pub async fn connectivity_gate(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    if request.method() == Method::OPTIONS {
        return next.run(request).await;
    }
    let path = request.uri().path();
    if path != "/info" && path != "/health" {
        if !state.registry.connected() {
            return backend_down("not connected to the registry");
        }
        if !state.transport.connected() {
            return backend_down("not connected to the transport");
        }
    }
    next.run(request).await
}

fn backend_down(message: &str) -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse {
            error: message.to_string(),
        }),
    )
        .into_response()
}

/// Enforce HTTP Basic credentials when both are configured. Preflight
/// requests are exempt.
pub async fn authenticate(State(state): State<AppState>, request: Request, next: Next) -> Response {
    if request.method() == Method::OPTIONS {
        return next.run(request).await;
    }
    let (user, password) = match (&state.settings.api.user, &state.settings.api.password) {
        (Some(user), Some(password)) => (user.as_str(), password.as_str()),
        _ => return next.run(request).await,
    };
    if credentials_match(request.headers().get(header::AUTHORIZATION), user, password) {
        next.run(request).await
    } else {
        let mut response = unauthorized().into_response();
        response.headers_mut().insert(
            header::WWW_AUTHENTICATE,
            HeaderValue::from_static("Basic realm=\"Restricted Area\""),
        );
        response
    }
}

fn credentials_match(authorization: Option<&HeaderValue>, user: &str, password: &str) -> bool {
    let Some(value) = authorization.and_then(|value| value.to_str().ok()) else {
        return false;
    };
    let Some(encoded) = value.strip_prefix("Basic ") else {
        return false;
    };
    let Ok(decoded) = BASE64.decode(encoded.trim()) else {
        return false;
    };
    let Ok(decoded) = String::from_utf8(decoded) else {
        return false;
    };
    match decoded.split_once(':') {
        Some((candidate_user, candidate_password)) => {
            candidate_user == user && candidate_password == password
        }
        None => false,
    }
}

/// Answer CORS preflight directly; the header layer above has already done
/// the real work.
pub async fn preflight(request: Request, next: Next) -> Response {
    if request.method() == Method::OPTIONS {
        return StatusCode::OK.into_response();
    }
    next.run(request).await
}

#[cfg(test)]
mod tests {
    use super::*;

    fn basic(value: &str) -> HeaderValue {
        HeaderValue::try_from(format!("Basic {}", BASE64.encode(value))).expect("header")
    }

    #[test]
    fn matching_credentials_pass() {
        let header = basic("ops:secret");
        assert!(credentials_match(Some(&header), "ops", "secret"));
    }

    #[test]
    fn wrong_or_malformed_credentials_fail() {
        assert!(!credentials_match(None, "ops", "secret"));

        let wrong = basic("ops:wrong");
        assert!(!credentials_match(Some(&wrong), "ops", "secret"));

        let missing_colon = basic("opssecret");
        assert!(!credentials_match(Some(&missing_colon), "ops", "secret"));

        let not_basic = HeaderValue::from_static("Bearer token");
        assert!(!credentials_match(Some(&not_basic), "ops", "secret"));

        let not_base64 = HeaderValue::from_static("Basic !!!");
        assert!(!credentials_match(Some(&not_base64), "ops", "secret"));
    }

    #[test]
    fn passwords_may_contain_colons() {
        let header = basic("ops:se:cret");
        assert!(credentials_match(Some(&header), "ops", "se:cret"));
    }
}
