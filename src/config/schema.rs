//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gateway.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::routing::RouteRequirements;
use crate::security::context::{ActorType, HierarchyRole};

/// Root configuration for the gateway.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Pipeline limits and store tuning.
    pub security: SecurityConfig,

    /// Registered callers and their signing keys.
    pub actors: Vec<ActorConfig>,

    /// Security requirements per routed endpoint.
    pub routes: Vec<RouteConfig>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            listener: ListenerConfig::default(),
            timeouts: TimeoutConfig::default(),
            observability: ObservabilityConfig::default(),
            security: SecurityConfig::default(),
            actors: Vec::new(),
            routes: default_routes(),
        }
    }
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Request timeout (total time for request/response) in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 30 }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error). `RUST_LOG` wins when set.
    pub log_level: String,

    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Security pipeline configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Maximum body size in bytes.
    pub max_body_size: usize,

    pub nonce_min_len: usize,
    pub nonce_max_len: usize,

    /// How long a consumed nonce is remembered.
    pub nonce_ttl_secs: u64,

    /// Sliding window length for per-route rate limits.
    pub rate_limit_window_secs: u64,

    /// Interval of the background nonce and rate-limit sweepers.
    pub sweep_interval_secs: u64,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            max_body_size: 1024 * 1024, // 1MB
            nonce_min_len: 16,
            nonce_max_len: 128,
            nonce_ttl_secs: 24 * 60 * 60,
            rate_limit_window_secs: 60,
            sweep_interval_secs: 60,
        }
    }
}

/// A registered caller.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ActorConfig {
    #[serde(rename = "type")]
    pub actor_type: ActorType,

    pub id: String,

    #[serde(default)]
    pub role: HierarchyRole,

    #[serde(default)]
    pub scopes: Vec<String>,

    /// Signing/encryption secrets by key id.
    #[serde(default)]
    pub keys: BTreeMap<String, String>,
}

/// Security requirements for one `METHOD /path` key.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RouteConfig {
    pub method: String,

    /// Literal path or pattern with `{param}` segments.
    pub path: String,

    #[serde(flatten)]
    pub requirements: RouteRequirements,
}

impl RouteConfig {
    pub fn new(method: &str, path: &str, requirements: RouteRequirements) -> Self {
        Self {
            method: method.to_string(),
            path: path.to_string(),
            requirements,
        }
    }

    pub fn key(&self) -> String {
        format!("{} {}", self.method.to_ascii_uppercase(), self.path)
    }
}

/// Probes are public; the echo endpoints exercise the full pipeline.
pub fn default_routes() -> Vec<RouteConfig> {
    vec![
        RouteConfig::new("GET", "/health", RouteRequirements::public()),
        RouteConfig::new("GET", "/readiness", RouteRequirements::public()),
        RouteConfig::new("GET", "/version", RouteRequirements::public()),
        RouteConfig::new(
            "POST",
            "/security/echo",
            RouteRequirements::signed(["security.echo"], HierarchyRole::User, 2),
        ),
        RouteConfig::new(
            "POST",
            "/security/encrypted-echo",
            RouteRequirements::encrypted(["security.echo"], HierarchyRole::User, 2),
        ),
        RouteConfig::new(
            "POST",
            "/security/admin-echo",
            RouteRequirements::signed(["security.echo"], HierarchyRole::Admin, 2),
        ),
    ]
}
