//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (windows > 0, addresses parse, nonce bounds)
//! - Reject route policies the pipeline cannot satisfy
//! - Detect duplicate routes and actors
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: GatewayConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::HashSet;
use std::net::SocketAddr;
use thiserror::Error;

use crate::config::schema::{ActorConfig, GatewayConfig, RouteConfig};
use crate::security::context::HierarchyRole;

const METHODS: [&str; 7] = ["GET", "HEAD", "POST", "PUT", "PATCH", "DELETE", "OPTIONS"];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{field} '{value}' is not a socket address")]
    InvalidAddress { field: &'static str, value: String },

    #[error("{0} must be greater than zero")]
    Zero(&'static str),

    #[error("security.nonce_min_len ({min}) must not exceed security.nonce_max_len ({max})")]
    NonceBounds { min: usize, max: usize },

    #[error("route '{0}': unsupported method")]
    InvalidMethod(String),

    #[error("route '{0}': path must start with '/'")]
    InvalidPath(String),

    #[error("route '{0}' is defined more than once")]
    DuplicateRoute(String),

    #[error("route '{route}': {field} requires requires_auth")]
    RequiresAuth { route: String, field: &'static str },

    #[error("route '{0}': requires_encryption needs requires_signature")]
    EncryptionWithoutSignature(String),

    #[error("actor with an empty id")]
    EmptyActorId,

    #[error("actor '{0}' is defined more than once")]
    DuplicateActor(String),

    #[error("actor '{actor}': key '{kid}' has an empty id or secret")]
    EmptyKey { actor: String, kid: String },
}

pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidAddress {
            field: "listener.bind_address",
            value: config.listener.bind_address.clone(),
        });
    }
    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::InvalidAddress {
            field: "observability.metrics_address",
            value: config.observability.metrics_address.clone(),
        });
    }

    let security = &config.security;
    for (field, value) in [
        ("timeouts.request_secs", config.timeouts.request_secs),
        ("security.max_body_size", security.max_body_size as u64),
        ("security.nonce_min_len", security.nonce_min_len as u64),
        ("security.nonce_ttl_secs", security.nonce_ttl_secs),
        ("security.rate_limit_window_secs", security.rate_limit_window_secs),
        ("security.sweep_interval_secs", security.sweep_interval_secs),
    ] {
        if value == 0 {
            errors.push(ValidationError::Zero(field));
        }
    }
    if security.nonce_min_len > security.nonce_max_len {
        errors.push(ValidationError::NonceBounds {
            min: security.nonce_min_len,
            max: security.nonce_max_len,
        });
    }

    let mut route_keys = HashSet::new();
    for route in &config.routes {
        let key = route.key();
        if !route_keys.insert(key.clone()) {
            errors.push(ValidationError::DuplicateRoute(key.clone()));
        }
        validate_route(route, &key, &mut errors);
    }

    let mut actor_refs = HashSet::new();
    for actor in &config.actors {
        validate_actor(actor, &mut actor_refs, &mut errors);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn validate_route(route: &RouteConfig, key: &str, errors: &mut Vec<ValidationError>) {
    if !METHODS.contains(&route.method.to_ascii_uppercase().as_str()) {
        errors.push(ValidationError::InvalidMethod(key.to_string()));
    }
    if !route.path.starts_with('/') {
        errors.push(ValidationError::InvalidPath(key.to_string()));
    }

    let req = &route.requirements;
    if !req.requires_auth {
        for (field, set) in [
            ("requires_nonce", req.requires_nonce),
            ("requires_signature", req.requires_signature),
            ("requires_encryption", req.requires_encryption),
            ("required_scopes", !req.required_scopes.is_empty()),
            ("min_role", req.min_role > HierarchyRole::User),
        ] {
            if set {
                errors.push(ValidationError::RequiresAuth {
                    route: key.to_string(),
                    field,
                });
            }
        }
    }
    if req.requires_encryption && !req.requires_signature {
        errors.push(ValidationError::EncryptionWithoutSignature(key.to_string()));
    }
}

fn validate_actor(
    actor: &ActorConfig,
    seen: &mut HashSet<String>,
    errors: &mut Vec<ValidationError>,
) {
    if actor.id.is_empty() {
        errors.push(ValidationError::EmptyActorId);
        return;
    }

    let reference = format!("{}:{}", actor.actor_type, actor.id);
    for (kid, secret) in &actor.keys {
        if kid.is_empty() || secret.is_empty() {
            errors.push(ValidationError::EmptyKey {
                actor: reference.clone(),
                kid: kid.clone(),
            });
        }
    }
    if !seen.insert(reference.clone()) {
        errors.push(ValidationError::DuplicateActor(reference));
    }
}
