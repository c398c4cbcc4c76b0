//! End-to-end tests of the security kernel through the axum router.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde_json::json;

use cabinet_gateway::security::encryption::{EncryptedEnvelope, SymmetricEncryption};
use cabinet_gateway::security::signer::ENVELOPE_VERSION;

mod common;
use common::{app, build, encrypted, fresh_nonce, send, signed, ADMIN, INTEGRATION, USER};

#[tokio::test]
async fn test_public_route_needs_no_headers() {
    let (app, _) = app();
    let res = send(&app, Request::get("/health").body(Body::empty()).unwrap()).await;

    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.json["status"], "ok");
    let request_id = res.headers["x-request-id"].to_str().unwrap();
    assert_eq!(request_id.len(), 32);
}

#[tokio::test]
async fn test_request_id_is_sanitized_and_echoed() {
    let (app, _) = app();
    let request = Request::get("/version")
        .header("x-request-id", "abc 123/<x>")
        .body(Body::empty())
        .unwrap();
    let res = send(&app, request).await;

    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.headers["x-request-id"], "abc123x");
    assert_eq!(res.json["name"], "cabinet-gateway");
}

#[tokio::test]
async fn test_unknown_path_is_not_found() {
    let (app, _) = app();
    let res = send(&app, Request::get("/nope").body(Body::empty()).unwrap()).await;

    assert_eq!(res.status, StatusCode::NOT_FOUND);
    assert_eq!(res.json, json!({ "error": "not_found" }));
    assert!(res.headers.contains_key("x-request-id"));
}

#[tokio::test]
async fn test_handler_without_requirements_fails_closed() {
    let (app, _) = app();
    let request = signed(USER, "/security/missing-requirements", "{}", &fresh_nonce());
    let res = send(&app, request).await;

    assert_eq!(res.status, StatusCode::FORBIDDEN);
    assert_eq!(
        res.json,
        json!({ "error": { "kind": "security_denied", "code": "missing_requirements" } })
    );
}

#[tokio::test]
async fn test_signed_echo_reaches_handler() {
    let (app, _) = app();
    let request = signed(USER, "/security/echo", r#"{"title":"bike"}"#, &fresh_nonce());
    let res = send(&app, request).await;

    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.json["actor"]["id"], "user-123");
    assert_eq!(res.json["actor"]["role"], "user");
    assert_eq!(res.json["route"], "POST /security/echo");
    assert_eq!(res.json["trace_id"], "trace-it-0001");
    assert_eq!(res.json["payload"], json!({ "title": "bike" }));
}

#[tokio::test]
async fn test_missing_actor_header() {
    let (app, _) = app();
    let request = Request::post("/security/echo").body(Body::from("{}")).unwrap();
    let res = send(&app, request).await;

    assert_eq!(res.status, StatusCode::FORBIDDEN);
    assert_eq!(res.code(), "missing_header");
}

#[tokio::test]
async fn test_unknown_actor_is_authentication_failure() {
    let (app, _) = app();
    let mut request = signed(USER, "/security/echo", "{}", &fresh_nonce());
    request
        .headers_mut()
        .insert("x-actor-id", "user:ghost".parse().unwrap());

    assert_eq!(send(&app, request).await.code(), "authentication_failed");
}

#[tokio::test]
async fn test_replayed_request_is_rejected() {
    let (app, _) = app();
    let nonce = fresh_nonce();

    let first = send(&app, signed(USER, "/security/echo", "{}", &nonce)).await;
    assert_eq!(first.status, StatusCode::OK);

    let replay = send(&app, signed(USER, "/security/echo", "{}", &nonce)).await;
    assert_eq!(replay.status, StatusCode::FORBIDDEN);
    assert_eq!(replay.code(), "nonce_reuse");
}

#[tokio::test]
async fn test_short_nonce_is_invalid() {
    let (app, _) = app();
    let res = send(&app, signed(USER, "/security/echo", "{}", "short-nonce")).await;
    assert_eq!(res.code(), "nonce_invalid");
}

#[tokio::test]
async fn test_signature_checked_before_scope() {
    let (app, _) = app();

    // Correctly signed but without the scope
    let res = send(&app, signed(INTEGRATION, "/security/echo", "{}", &fresh_nonce())).await;
    assert_eq!(res.code(), "scope_missing");

    // Same actor, bad signature: the earlier step wins
    let mut request = signed(INTEGRATION, "/security/echo", "{}", &fresh_nonce());
    request
        .headers_mut()
        .insert("x-signature", "AAAA".parse().unwrap());
    let res = send(&app, request).await;
    assert_eq!(res.code(), "signature_invalid");
}

#[tokio::test]
async fn test_query_string_is_signed() {
    let (app, _) = app();

    let res = send(&app, signed(USER, "/security/echo?draft=1", "{}", &fresh_nonce())).await;
    assert_eq!(res.status, StatusCode::OK);

    // Signed without the query, sent with it
    let mut request = signed(USER, "/security/echo", "{}", &fresh_nonce());
    *request.uri_mut() = "/security/echo?draft=1".parse().unwrap();
    let res = send(&app, request).await;
    assert_eq!(res.code(), "signature_invalid");
}

#[tokio::test]
async fn test_trace_id_defaults_to_request_id() {
    let (app, _) = app();
    let mut request = build(USER, "POST", "/security/echo", "{}", &fresh_nonce(), "req-fixed-0001", false);
    request.headers_mut().remove("x-trace-id");
    request
        .headers_mut()
        .insert("x-request-id", "req-fixed-0001".parse().unwrap());

    let res = send(&app, request).await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.json["trace_id"], "req-fixed-0001");
}

#[tokio::test]
async fn test_rate_limit_two_per_minute() {
    let (app, _) = app();

    let codes: Vec<StatusCode> = {
        let mut codes = Vec::new();
        for _ in 0..3 {
            let res = send(&app, signed(USER, "/security/echo", "{}", &fresh_nonce())).await;
            codes.push(res.status);
        }
        codes
    };
    assert_eq!(codes, vec![StatusCode::OK, StatusCode::OK, StatusCode::FORBIDDEN]);

    let res = send(&app, signed(USER, "/security/echo", "{}", &fresh_nonce())).await;
    assert_eq!(res.code(), "rate_limited");

    // Another route has its own budget
    let res = send(&app, encrypted(USER, "/security/encrypted-echo", "{}", &fresh_nonce())).await;
    assert_eq!(res.status, StatusCode::OK);
}

#[tokio::test]
async fn test_encrypted_echo_sees_plaintext() {
    let (app, _) = app();
    let request = encrypted(USER, "/security/encrypted-echo", r#"{"price":120}"#, &fresh_nonce());
    let res = send(&app, request).await;

    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.json["payload"], json!({ "price": 120 }));
}

#[tokio::test]
async fn test_plain_body_on_encrypted_route() {
    let (app, _) = app();

    // Header missing
    let res = send(&app, signed(USER, "/security/encrypted-echo", "{}", &fresh_nonce())).await;
    assert_eq!(res.code(), "missing_header");

    // Header present, body not an envelope
    let mut request = signed(USER, "/security/encrypted-echo", "hello", &fresh_nonce());
    request
        .headers_mut()
        .insert("x-encryption", ENVELOPE_VERSION.parse().unwrap());
    let res = send(&app, request).await;
    assert_eq!(res.code(), "encryption_invalid");
}

#[tokio::test]
async fn test_tampered_envelope_fails_decryption() {
    let (app, _) = app();

    let mut envelope: EncryptedEnvelope = SymmetricEncryption
        .encrypt(b"{\"price\":120}", None, USER.secret)
        .unwrap();
    let mut ct = STANDARD.decode(&envelope.ct).unwrap();
    ct[0] ^= 0x01;
    envelope.ct = STANDARD.encode(ct);
    let body = serde_json::to_string(&envelope).unwrap();

    // Signed over the tampered bytes, so only the tag check can catch it
    let mut request = signed(USER, "/security/encrypted-echo", &body, &fresh_nonce());
    request
        .headers_mut()
        .insert("x-encryption", ENVELOPE_VERSION.parse().unwrap());
    let res = send(&app, request).await;
    assert_eq!(res.code(), "decryption_failed");
}

#[tokio::test]
async fn test_admin_echo_requires_admin_role() {
    let (app, _) = app();

    let res = send(&app, signed(USER, "/security/admin-echo", "{}", &fresh_nonce())).await;
    assert_eq!(res.code(), "role_insufficient");

    let res = send(&app, signed(ADMIN, "/security/admin-echo", "{}", &fresh_nonce())).await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.json["actor"]["role"], "admin");
}

#[tokio::test]
async fn test_oversized_body_rejected() {
    let mut config = common::test_config();
    config.security.max_body_size = 64;
    let (app, _) = common::app_with(config);

    let body = "x".repeat(65);
    let res = send(&app, signed(USER, "/security/echo", &body, &fresh_nonce())).await;
    assert_eq!(res.status, StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(res.json, json!({ "error": "payload_too_large" }));
}

#[tokio::test]
async fn test_denied_request_leaves_rate_budget_untouched() {
    let (app, state) = app();

    let mut request = signed(USER, "/security/echo", "{}", &fresh_nonce());
    request
        .headers_mut()
        .insert("x-signature", "AAAA".parse().unwrap());
    assert_eq!(send(&app, request).await.code(), "signature_invalid");
    assert_eq!(state.rate_limiter.tracked_keys(), 0);

    for _ in 0..2 {
        let res = send(&app, signed(USER, "/security/echo", "{}", &fresh_nonce())).await;
        assert_eq!(res.status, StatusCode::OK);
    }
}
