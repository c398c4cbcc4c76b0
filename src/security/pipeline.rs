//! The security pipeline: a fixed sequence of guarded steps.
//!
//! # Step Order
//! ```text
//! auth → nonce → signature → encryption → authorization → rate limit
//! ```
//! Each step either does nothing (its requirement is off), succeeds and may
//! annotate the request, or returns a `SecurityViolation` that ends the chain.
//!
//! # Design Decisions
//! - The order is hard-coded in `enforce`; it is part of the protocol
//! - Nonce before signature: replays are rejected before any HMAC work
//! - Signature before encryption: unauthenticated ciphertext is never opened
//! - Authorization after identity and integrity are established
//! - Rate limit last: rejected traffic never burns a real actor's budget
//! - Side effects are not rolled back; a consumed nonce stays consumed

use axum::body::Bytes;
use axum::http::{HeaderMap, Method};
use std::sync::Arc;

use crate::routing::RouteRequirements;
use crate::security::context::{parse_actor_reference, SecurityContext};
use crate::security::encryption::{EncryptedEnvelope, SymmetricEncryption};
use crate::security::headers::{self, header_str};
use crate::security::nonce::{NonceFormat, NonceStore};
use crate::security::rate_limit::RateLimiter;
use crate::security::registry::ActorRegistry;
use crate::security::signature::{Canonicalizer, SignatureVerifier, StringToSignBuilder};
use crate::security::violation::SecurityViolation;

/// The parts of an HTTP request the pipeline reads and annotates.
#[derive(Debug, Clone)]
pub struct SecuredRequest {
    pub method: Method,
    /// Path including the query string, exactly as signed by the client.
    pub path: String,
    pub headers: HeaderMap,
    pub body: Bytes,
    /// Set by the auth step.
    pub context: Option<SecurityContext>,
}

impl SecuredRequest {
    pub fn new(method: Method, path: impl Into<String>, headers: HeaderMap, body: Bytes) -> Self {
        Self {
            method,
            path: path.into(),
            headers,
            body,
            context: None,
        }
    }

    /// A header the step cannot proceed without. Absence and an unreadable
    /// (non-UTF-8) value are reported differently.
    fn required_header(
        &self,
        name: &str,
        unreadable: SecurityViolation,
    ) -> Result<&str, SecurityViolation> {
        self.headers
            .get(name)
            .ok_or(SecurityViolation::MissingHeader)?
            .to_str()
            .map_err(|_| unreadable)
    }
}

/// Composes the security checks over shared stores.
pub struct SecurityPipeline {
    registry: Arc<ActorRegistry>,
    nonces: Arc<dyn NonceStore>,
    nonce_format: NonceFormat,
    rate_limiter: Arc<RateLimiter>,
    builder: StringToSignBuilder,
    canonicalizer: Canonicalizer,
    verifier: SignatureVerifier,
    encryption: SymmetricEncryption,
}

impl SecurityPipeline {
    pub fn new(
        registry: Arc<ActorRegistry>,
        nonces: Arc<dyn NonceStore>,
        nonce_format: NonceFormat,
        rate_limiter: Arc<RateLimiter>,
    ) -> Self {
        Self {
            registry,
            nonces,
            nonce_format,
            rate_limiter,
            builder: StringToSignBuilder,
            canonicalizer: Canonicalizer,
            verifier: SignatureVerifier,
            encryption: SymmetricEncryption,
        }
    }

    /// Run every applicable step in order. On success the request carries its
    /// `SecurityContext` (for authenticated routes) and a decrypted body (for
    /// encrypted routes).
    pub fn enforce(
        &self,
        request: &mut SecuredRequest,
        requirements: &RouteRequirements,
        route_id: &str,
        trace_id: &str,
    ) -> Result<(), SecurityViolation> {
        self.authenticate(request, requirements)?;
        let nonce = self.consume_nonce(request, requirements)?;
        self.verify_signature(request, requirements, &nonce, trace_id)?;
        self.decrypt_body(request, requirements)?;
        self.authorize(request, requirements)?;
        self.check_rate_limit(request, requirements, route_id)?;

        tracing::debug!(
            route = %route_id,
            actor_id = request.context.as_ref().map(SecurityContext::actor_id),
            "Security pipeline passed"
        );
        Ok(())
    }

    fn authenticate(
        &self,
        request: &mut SecuredRequest,
        requirements: &RouteRequirements,
    ) -> Result<(), SecurityViolation> {
        if !requirements.requires_auth {
            return Ok(());
        }

        let header =
            request.required_header(headers::ACTOR, SecurityViolation::AuthenticationFailed)?;
        let (actor_type, actor_id) =
            parse_actor_reference(header).ok_or(SecurityViolation::AuthenticationFailed)?;
        let actor = self
            .registry
            .find(actor_type, actor_id)
            .ok_or(SecurityViolation::AuthenticationFailed)?;

        request.context = Some(SecurityContext::from(actor.as_ref()));
        Ok(())
    }

    /// Returns the consumed nonce, or an empty string when the route takes none.
    fn consume_nonce(
        &self,
        request: &SecuredRequest,
        requirements: &RouteRequirements,
    ) -> Result<String, SecurityViolation> {
        if !requirements.requires_nonce {
            return Ok(String::new());
        }

        let nonce = request.required_header(headers::NONCE, SecurityViolation::NonceInvalid)?;
        if !self.nonce_format.is_valid(nonce) {
            return Err(SecurityViolation::NonceInvalid);
        }
        if !self.nonces.consume(nonce) {
            return Err(SecurityViolation::NonceReuse);
        }
        Ok(nonce.to_string())
    }

    fn verify_signature(
        &self,
        request: &SecuredRequest,
        requirements: &RouteRequirements,
        nonce: &str,
        trace_id: &str,
    ) -> Result<(), SecurityViolation> {
        if !requirements.requires_signature {
            return Ok(());
        }

        let context = request
            .context
            .as_ref()
            .ok_or(SecurityViolation::AuthenticationFailed)?;
        if !request.headers.contains_key(headers::KEY_ID)
            || !request.headers.contains_key(headers::SIGNATURE)
        {
            return Err(SecurityViolation::MissingHeader);
        }
        let kid = request.required_header(headers::KEY_ID, SecurityViolation::SignatureInvalid)?;
        let signature =
            request.required_header(headers::SIGNATURE, SecurityViolation::SignatureInvalid)?;
        // An unknown key id reads as a bad signature, not as a missing key
        let secret = context.key_for(kid).ok_or(SecurityViolation::SignatureInvalid)?;

        let string_to_sign = self.builder.build(
            request.method.as_str(),
            &request.path,
            &request.body,
            nonce,
            kid,
            trace_id,
        );
        let canonical = self.canonicalizer.canonicalize(&string_to_sign);

        if self.verifier.verify(&canonical, secret, signature) {
            Ok(())
        } else {
            Err(SecurityViolation::SignatureInvalid)
        }
    }

    fn decrypt_body(
        &self,
        request: &mut SecuredRequest,
        requirements: &RouteRequirements,
    ) -> Result<(), SecurityViolation> {
        if !requirements.requires_encryption {
            return Ok(());
        }

        let context = request
            .context
            .as_ref()
            .ok_or(SecurityViolation::AuthenticationFailed)?;
        if !request.headers.contains_key(headers::ENCRYPTION) {
            return Err(SecurityViolation::MissingHeader);
        }
        // An unreadable key id resolves to no key
        let kid = header_str(&request.headers, headers::KEY_ID).unwrap_or_default();
        let secret = context
            .key_for(kid)
            .ok_or(SecurityViolation::EncryptionKeyMissing)?;

        let envelope: EncryptedEnvelope = serde_json::from_slice(&request.body)
            .map_err(|_| SecurityViolation::EncryptionInvalid)?;
        let plaintext = self
            .encryption
            .decrypt(&envelope, secret)
            .ok_or(SecurityViolation::DecryptionFailed)?;

        request.body = Bytes::from(plaintext);
        Ok(())
    }

    fn authorize(
        &self,
        request: &SecuredRequest,
        requirements: &RouteRequirements,
    ) -> Result<(), SecurityViolation> {
        let Some(context) = request.context.as_ref() else {
            return Ok(());
        };

        if !requirements
            .required_scopes
            .iter()
            .all(|scope| context.has_scope(scope))
        {
            return Err(SecurityViolation::ScopeMissing);
        }
        if !context.role().is_at_least(requirements.min_role) {
            return Err(SecurityViolation::RoleInsufficient);
        }
        Ok(())
    }

    fn check_rate_limit(
        &self,
        request: &SecuredRequest,
        requirements: &RouteRequirements,
        route_id: &str,
    ) -> Result<(), SecurityViolation> {
        if !requirements.requires_auth {
            return Ok(());
        }

        let context = request
            .context
            .as_ref()
            .ok_or(SecurityViolation::AuthenticationFailed)?;
        if self
            .rate_limiter
            .allow(context.actor_id(), route_id, requirements.rate_limit_per_minute)
        {
            Ok(())
        } else {
            Err(SecurityViolation::RateLimited)
        }
    }
}
