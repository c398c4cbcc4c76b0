//! Error responses produced by the gateway itself.
//!
//! # Design Decisions
//! - Every security denial is a 403 whose body names only the violation code
//! - Bodies are JSON so clients can branch on `error.code`

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::security::SecurityViolation;

/// Failures answered before (or instead of) a handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GatewayError {
    Denied(SecurityViolation),
    NotFound,
    PayloadTooLarge,
    /// The body stream failed before it was fully read.
    BadRequest,
}

impl From<SecurityViolation> for GatewayError {
    fn from(violation: SecurityViolation) -> Self {
        GatewayError::Denied(violation)
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        match self {
            GatewayError::Denied(violation) => (
                StatusCode::FORBIDDEN,
                Json(json!({
                    "error": {
                        "kind": "security_denied",
                        "code": violation.code(),
                    }
                })),
            )
                .into_response(),
            GatewayError::NotFound => {
                (StatusCode::NOT_FOUND, Json(json!({ "error": "not_found" }))).into_response()
            }
            GatewayError::PayloadTooLarge => (
                StatusCode::PAYLOAD_TOO_LARGE,
                Json(json!({ "error": "payload_too_large" })),
            )
                .into_response(),
            GatewayError::BadRequest => {
                (StatusCode::BAD_REQUEST, Json(json!({ "error": "bad_request" }))).into_response()
            }
        }
    }
}

/// Router fallback for paths no handler serves.
pub async fn not_found() -> GatewayError {
    GatewayError::NotFound
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        let denied = GatewayError::from(SecurityViolation::NonceReuse).into_response();
        assert_eq!(denied.status(), StatusCode::FORBIDDEN);
        assert_eq!(GatewayError::NotFound.into_response().status(), StatusCode::NOT_FOUND);
        assert_eq!(
            GatewayError::PayloadTooLarge.into_response().status(),
            StatusCode::PAYLOAD_TOO_LARGE
        );
        assert_eq!(GatewayError::BadRequest.into_response().status(), StatusCode::BAD_REQUEST);
    }
}
