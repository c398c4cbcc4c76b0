//! Request correlation.
//!
//! # Responsibilities
//! - Assign every request an id (sanitized `x-request-id` or a fresh UUID v4)
//! - Derive the trace id used in the signature and in logs
//! - Echo the request id on every response, including 404s
//!
//! # Design Decisions
//! - Request ID added as early as possible for tracing
//! - Client-supplied ids are filtered to `[A-Za-z0-9._-]`, never trusted raw

use axum::{
    body::Body,
    http::{HeaderMap, HeaderValue, Request},
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

use crate::security::headers::{self, header_str, sanitize_correlation_id};

/// Correlation data attached to every request that passed the security kernel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    pub request_id: String,
    pub trace_id: String,
    /// Registered route key, e.g. `"POST /security/echo"`.
    pub route_id: String,
}

fn sanitized_header(headers: &HeaderMap, name: &str) -> Option<String> {
    header_str(headers, name)
        .map(sanitize_correlation_id)
        .filter(|id| !id.is_empty())
}

/// Incoming `x-request-id` if usable, otherwise a new UUID v4 in simple form.
pub fn request_id_from(headers: &HeaderMap) -> String {
    sanitized_header(headers, headers::REQUEST_ID)
        .unwrap_or_else(|| Uuid::new_v4().simple().to_string())
}

/// Incoming `x-trace-id` if usable, otherwise the request id.
pub fn trace_id_from(headers: &HeaderMap, request_id: &str) -> String {
    sanitized_header(headers, headers::TRACE).unwrap_or_else(|| request_id.to_string())
}

/// Outermost middleware: normalizes `x-request-id` on the way in and sets it on the way out.
pub async fn request_id_middleware(mut request: Request<Body>, next: Next) -> Response {
    let request_id = request_id_from(request.headers());
    let value = HeaderValue::from_str(&request_id).ok();

    if let Some(value) = &value {
        request.headers_mut().insert(headers::REQUEST_ID, value.clone());
    }

    let mut response = next.run(request).await;
    if let Some(value) = value {
        response.headers_mut().insert(headers::REQUEST_ID, value);
    }
    response
}
