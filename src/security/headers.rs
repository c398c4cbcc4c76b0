//! Protocol header names.
//!
//! # Responsibilities
//! - Name every wire header the security protocol reads
//! - Sanitize client-supplied correlation identifiers
//!
//! # Design Decisions
//! - Names are lowercase; `HeaderMap` lookups are case-insensitive anyway
//! - These names are a compatibility surface for clients, never rename them

use axum::http::HeaderMap;

/// Actor identity, formatted `"<type>:<id>"`.
pub const ACTOR: &str = "x-actor-id";

/// Single-use nonce.
pub const NONCE: &str = "x-nonce";

/// Trace identifier included in the string-to-sign.
pub const TRACE: &str = "x-trace-id";

/// Identifier of the actor key used to sign (and encrypt).
pub const KEY_ID: &str = "x-key-id";

/// Base64 HMAC-SHA256 signature.
pub const SIGNATURE: &str = "x-signature";

/// Presence marks an encrypted body; value is the envelope version.
pub const ENCRYPTION: &str = "x-encryption";

/// Request correlation identifier, echoed on every response.
pub const REQUEST_ID: &str = "x-request-id";

/// Maximum length kept from client-supplied request and trace ids.
const MAX_CORRELATION_ID_LEN: usize = 128;

/// Read a header as UTF-8 text. Non-UTF-8 values are treated as absent.
pub fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|value| value.to_str().ok())
}

/// Truncate to 128 chars and drop everything outside `[A-Za-z0-9._-]`.
pub fn sanitize_correlation_id(raw: &str) -> String {
    raw.chars()
        .take(MAX_CORRELATION_ID_LEN)
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
        .collect()
}
