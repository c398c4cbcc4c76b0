//! Shared utilities for integration tests.

#![allow(dead_code)]

use axum::body::Body;
use axum::http::{HeaderMap, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use std::collections::BTreeMap;
use tower::ServiceExt;
use uuid::Uuid;

use cabinet_gateway::config::{ActorConfig, GatewayConfig};
use cabinet_gateway::http::SharedState;
use cabinet_gateway::security::signer::RequestSigner;
use cabinet_gateway::security::{ActorType, HierarchyRole};
use cabinet_gateway::GatewayServer;

pub const USER: RequestSigner<'static> = RequestSigner {
    actor: "user:user-123",
    key_id: "key-1",
    secret: "secret-key-user-123",
};

pub const ADMIN: RequestSigner<'static> = RequestSigner {
    actor: "user:admin-1",
    key_id: "key-2",
    secret: "admin-secret",
};

/// Registered, but holds no scopes.
pub const INTEGRATION: RequestSigner<'static> = RequestSigner {
    actor: "integration:crm-sync",
    key_id: "k1",
    secret: "crm-secret",
};

pub fn actor(
    actor_type: ActorType,
    id: &str,
    role: HierarchyRole,
    scopes: &[&str],
    kid: &str,
    secret: &str,
) -> ActorConfig {
    ActorConfig {
        actor_type,
        id: id.to_string(),
        role,
        scopes: scopes.iter().map(|s| s.to_string()).collect(),
        keys: BTreeMap::from([(kid.to_string(), secret.to_string())]),
    }
}

/// Default routes plus the three test actors.
pub fn test_config() -> GatewayConfig {
    let mut config = GatewayConfig::default();
    config.listener.bind_address = "127.0.0.1:0".into();
    config.actors = vec![
        actor(ActorType::User, "user-123", HierarchyRole::User, &["security.echo"], "key-1", "secret-key-user-123"),
        actor(ActorType::User, "admin-1", HierarchyRole::Admin, &["security.echo"], "key-2", "admin-secret"),
        actor(ActorType::Integration, "crm-sync", HierarchyRole::User, &[], "k1", "crm-secret"),
    ];
    config
}

pub fn app() -> (Router, SharedState) {
    app_with(test_config())
}

pub fn app_with(config: GatewayConfig) -> (Router, SharedState) {
    let server = GatewayServer::new(config);
    (server.router(), server.state())
}

pub fn fresh_nonce() -> String {
    Uuid::new_v4().simple().to_string()
}

/// A signed request as a well-behaved client would send it.
pub fn signed(signer: RequestSigner<'_>, path: &str, body: &str, nonce: &str) -> Request<Body> {
    build(signer, "POST", path, body, nonce, "trace-it-0001", false)
}

pub fn encrypted(signer: RequestSigner<'_>, path: &str, body: &str, nonce: &str) -> Request<Body> {
    build(signer, "POST", path, body, nonce, "trace-it-0001", true)
}

pub fn build(
    signer: RequestSigner<'_>,
    method: &str,
    path: &str,
    body: &str,
    nonce: &str,
    trace_id: &str,
    encrypt: bool,
) -> Request<Body> {
    let signed = signer
        .sign(method, path, body.as_bytes(), nonce, trace_id, encrypt)
        .unwrap();

    let mut builder = Request::builder()
        .method(method)
        .uri(path)
        .header("content-type", "application/json");
    for (name, value) in signed.headers {
        builder = builder.header(name, value);
    }
    builder.body(Body::from(signed.body)).unwrap()
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub json: Value,
}

impl TestResponse {
    /// The violation code of a 403 body.
    pub fn code(&self) -> &str {
        self.json["error"]["code"].as_str().unwrap_or_default()
    }
}

pub async fn send(app: &Router, request: Request<Body>) -> TestResponse {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    TestResponse { status, headers, json }
}
