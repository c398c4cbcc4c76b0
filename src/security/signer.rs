//! Client side of the protocol: produce the headers and body a gateway accepts.
//!
//! Used by `gateway-cli` and by the integration tests.

use crate::security::encryption::SymmetricEncryption;
use crate::security::headers;
use crate::security::signature::{sign, Canonicalizer, StringToSignBuilder};

/// Envelope version sent in `x-encryption`.
pub const ENVELOPE_VERSION: &str = "v1";

/// Credentials of one actor key.
#[derive(Clone, Copy)]
pub struct RequestSigner<'a> {
    /// `"user:<id>"` or `"integration:<id>"`.
    pub actor: &'a str,
    pub key_id: &'a str,
    pub secret: &'a str,
}

/// Wire-ready request parts.
#[derive(Debug, Clone)]
pub struct SignedRequest {
    pub headers: Vec<(&'static str, String)>,
    pub body: Vec<u8>,
}

impl RequestSigner<'_> {
    /// Sign `body` for `method path` (path includes any query string).
    ///
    /// With `encrypt`, the body is first sealed into a JSON envelope and the
    /// signature covers the envelope bytes. Returns `None` only if sealing fails.
    pub fn sign(
        &self,
        method: &str,
        path: &str,
        body: &[u8],
        nonce: &str,
        trace_id: &str,
        encrypt: bool,
    ) -> Option<SignedRequest> {
        let body = if encrypt {
            let envelope = SymmetricEncryption.encrypt(body, None, self.secret)?;
            serde_json::to_vec(&envelope).ok()?
        } else {
            body.to_vec()
        };

        let string_to_sign =
            StringToSignBuilder.build(method, path, &body, nonce, self.key_id, trace_id);
        let signature = sign(&Canonicalizer.canonicalize(&string_to_sign), self.secret);

        let mut wire = vec![
            (headers::ACTOR, self.actor.to_string()),
            (headers::NONCE, nonce.to_string()),
            (headers::TRACE, trace_id.to_string()),
            (headers::KEY_ID, self.key_id.to_string()),
            (headers::SIGNATURE, signature),
        ];
        if encrypt {
            wire.push((headers::ENCRYPTION, ENVELOPE_VERSION.to_string()));
        }

        Some(SignedRequest { headers: wire, body })
    }
}
