//! Built-in endpoints: probes and security echoes.
//!
//! The echo handlers only run after the kernel admitted the request, so the
//! extensions they read are always present on configured routes.

use axum::{body::Bytes, extract::State, Extension, Json};
use serde_json::{json, Value};

use crate::http::request::RequestContext;
use crate::http::server::SharedState;
use crate::security::SecurityContext;

pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

pub async fn readiness(State(state): State<SharedState>) -> Json<Value> {
    Json(json!({
        "status": "ready",
        "actors": state.registry.len(),
        "routes": state.routes.len(),
    }))
}

pub async fn version() -> Json<Value> {
    Json(json!({
        "name": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Echo the caller's identity and the (already decrypted) payload.
pub async fn echo(
    context: Option<Extension<SecurityContext>>,
    Extension(request): Extension<RequestContext>,
    body: Bytes,
) -> Json<Value> {
    let actor = context.map(|Extension(ctx)| {
        json!({
            "id": ctx.actor_id(),
            "type": ctx.actor_type().as_str(),
            "role": ctx.role().as_str(),
            "scopes": ctx.scopes(),
        })
    });

    Json(json!({
        "status": "ok",
        "route": request.route_id,
        "trace_id": request.trace_id,
        "actor": actor,
        "payload": payload(&body),
    }))
}

/// JSON bodies echo as JSON, anything else as lossy text.
fn payload(body: &[u8]) -> Value {
    if body.is_empty() {
        return Value::Null;
    }
    serde_json::from_slice(body)
        .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(body).into_owned()))
}
