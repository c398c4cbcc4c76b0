//! Security kernel middleware.
//!
//! # Responsibilities
//! - Resolve the route's requirements; no entry means deny
//! - Buffer the body (bounded) so it can be signed and decrypted
//! - Run the security pipeline and map a violation to a 403
//! - Hand the handler a request carrying `SecurityContext` and `RequestContext`
//!
//! # Design Decisions
//! - Installed with `route_layer`, so only paths with a handler reach it
//! - Denials are logged with request coordinates, never with secrets or bodies
//! - The handler sees the decrypted body, never the envelope

use axum::{
    body::Body,
    extract::State,
    http::{header, Method, Request},
    middleware::Next,
    response::{IntoResponse, Response},
};
use http_body_util::LengthLimitError;
use std::error::Error as _;
use std::time::Instant;

use crate::http::request::{request_id_from, trace_id_from, RequestContext};
use crate::http::response::GatewayError;
use crate::http::server::SharedState;
use crate::observability::metrics;
use crate::security::{SecuredRequest, SecurityContext, SecurityViolation};

pub async fn security_kernel(
    State(state): State<SharedState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let started = Instant::now();
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let request_id = request_id_from(request.headers());
    let trace_id = trace_id_from(request.headers(), &request_id);

    tracing::info!(
        request_id = %request_id,
        trace_id = %trace_id,
        method = %method,
        path = %path,
        "request_start"
    );

    let Some(route) = state.routes.resolve(method.as_str(), &path) else {
        let response = deny(SecurityViolation::MissingRequirements, None, &request_id, &trace_id, &method, &path, "none");
        return finish(response, &request_id, &method, "none", started);
    };
    let route_id = route.route_id.to_string();
    let requirements = route.requirements;

    let (mut parts, body) = request.into_parts();
    let body = match axum::body::to_bytes(body, state.max_body_size).await {
        Ok(body) => body,
        Err(e) => {
            tracing::warn!(
                request_id = %request_id,
                route = %route_id,
                error = %e,
                "Request body rejected"
            );
            let response = body_error(&e).into_response();
            return finish(response, &request_id, &method, &route_id, started);
        }
    };

    let signed_path = parts
        .uri
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| path.clone());
    let mut secured = SecuredRequest::new(
        parts.method.clone(),
        signed_path,
        std::mem::take(&mut parts.headers),
        body,
    );

    if let Err(violation) = state
        .pipeline
        .enforce(&mut secured, requirements, &route_id, &trace_id)
    {
        let response = deny(violation, secured.context.as_ref(), &request_id, &trace_id, &method, &path, &route_id);
        return finish(response, &request_id, &method, &route_id, started);
    }

    parts.headers = secured.headers;
    if requirements.requires_encryption {
        parts.headers.remove(header::CONTENT_LENGTH);
    }
    if let Some(context) = secured.context {
        parts.extensions.insert(context);
    }
    parts.extensions.insert(RequestContext {
        request_id: request_id.clone(),
        trace_id,
        route_id: route_id.clone(),
    });

    let response = next.run(Request::from_parts(parts, Body::from(secured.body))).await;
    finish(response, &request_id, &method, &route_id, started)
}

/// Only an exceeded size cap is a 413; a stream that broke mid-upload is a 400.
fn body_error(error: &axum::Error) -> GatewayError {
    let mut source: Option<&(dyn std::error::Error + 'static)> = Some(error);
    while let Some(err) = source {
        if err.is::<LengthLimitError>() {
            return GatewayError::PayloadTooLarge;
        }
        source = err.source();
    }
    GatewayError::BadRequest
}

fn deny(
    violation: SecurityViolation,
    context: Option<&SecurityContext>,
    request_id: &str,
    trace_id: &str,
    method: &Method,
    path: &str,
    route_id: &str,
) -> Response {
    tracing::warn!(
        code = violation.code(),
        request_id = %request_id,
        trace_id = %trace_id,
        method = %method,
        path = %path,
        route = %route_id,
        actor_id = context.map(SecurityContext::actor_id),
        "security_denied"
    );
    metrics::record_security_denied(violation.code());
    GatewayError::Denied(violation).into_response()
}

fn finish(response: Response, request_id: &str, method: &Method, route_id: &str, started: Instant) -> Response {
    let status = response.status().as_u16();
    tracing::info!(
        request_id = %request_id,
        route = %route_id,
        status,
        duration_ms = started.elapsed().as_millis() as u64,
        "request_end"
    );
    metrics::record_request(method.as_str(), status, route_id, started);
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[tokio::test]
    async fn test_oversized_body_is_payload_too_large() {
        let error = axum::body::to_bytes(Body::from(vec![0u8; 64]), 16)
            .await
            .unwrap_err();
        assert_eq!(body_error(&error), GatewayError::PayloadTooLarge);
    }

    #[test]
    fn test_broken_body_stream_is_bad_request() {
        let reset = axum::Error::new(io::Error::new(io::ErrorKind::ConnectionReset, "reset"));
        assert_eq!(body_error(&reset), GatewayError::BadRequest);
    }
}
