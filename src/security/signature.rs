//! Request signing: string-to-sign construction, canonicalization, HMAC verification.
//!
//! # Wire Format
//! ```text
//! CABINET-HMAC-SHA256
//! <METHOD>
//! <path[?query]>
//! <hex sha256 of body>
//! <nonce>
//! <key id>
//! <trace id>
//! ```
//! Lines are joined with `\n`, no trailing newline. The signature header
//! carries `base64(HMAC-SHA256(secret, canonical))` using the standard alphabet.
//!
//! # Design Decisions
//! - The body enters as a digest, so body bytes can never supply a separator
//! - Every other field comes from the request line or a header value, neither
//!   of which may contain CR or LF, so each field is exactly one line

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

/// First line of every string-to-sign; versions the format.
pub const SIGNING_ALGORITHM: &str = "CABINET-HMAC-SHA256";

/// Builds the string-to-sign from request coordinates and protocol fields.
#[derive(Debug, Clone, Copy, Default)]
pub struct StringToSignBuilder;

impl StringToSignBuilder {
    pub fn build(
        &self,
        method: &str,
        path: &str,
        body: &[u8],
        nonce: &str,
        key_id: &str,
        trace_id: &str,
    ) -> String {
        let method = method.to_ascii_uppercase();
        let body_digest = hex::encode(Sha256::digest(body));
        [
            SIGNING_ALGORITHM,
            method.as_str(),
            path,
            body_digest.as_str(),
            nonce,
            key_id,
            trace_id,
        ]
        .join("\n")
    }
}

/// Normalizes line endings and incidental whitespace.
#[derive(Debug, Clone, Copy, Default)]
pub struct Canonicalizer;

impl Canonicalizer {
    /// CRLF and lone CR become LF, trailing spaces and tabs are stripped from
    /// each line, and trailing empty lines are dropped.
    pub fn canonicalize(&self, string_to_sign: &str) -> String {
        let unified = string_to_sign.replace("\r\n", "\n").replace('\r', "\n");
        let mut lines: Vec<&str> = unified
            .split('\n')
            .map(|line| line.trim_end_matches([' ', '\t']))
            .collect();
        while lines.len() > 1 && lines.last().is_some_and(|line| line.is_empty()) {
            lines.pop();
        }
        lines.join("\n")
    }
}

/// Checks a provided signature against the canonical string.
#[derive(Debug, Clone, Copy, Default)]
pub struct SignatureVerifier;

impl SignatureVerifier {
    /// Constant-time comparison of the expected and provided base64 signatures.
    pub fn verify(&self, canonical: &str, secret: &str, provided: &str) -> bool {
        let expected = sign(canonical, secret);
        expected.as_bytes().ct_eq(provided.as_bytes()).into()
    }
}

/// Compute the signature header value for a canonical string.
pub fn sign(canonical: &str, secret: &str) -> String {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .unwrap_or_else(|_| unreachable!("HMAC accepts keys of any length"));
    mac.update(canonical.as_bytes());
    STANDARD.encode(mac.finalize().into_bytes())
}
